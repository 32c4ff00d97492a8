//! Threshold evaluation and freshness gating for glucose readings.
//!
//! Pure logic: no database access, no clock reads. The caller passes the
//! current time so runs and tests are deterministic.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};

use crate::alert::{alert_message, AlertDecision, AlertKind};
use crate::glucose::MeasuredAt;
use crate::thresholds::ClinicalThresholds;
use crate::types::{PatientId, Timestamp};

/// Maximum age of a measurement that may still raise an alert.
pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(300); // 5 minutes

/// Inputs to the freshness gate that come from configuration.
#[derive(Debug, Clone, Copy)]
pub struct FreshnessPolicy {
    pub window: Duration,
    /// Offset used to read timestamps that carry no zone.
    pub reference_offset: FixedOffset,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self {
            window: DEFAULT_FRESHNESS_WINDOW,
            reference_offset: Utc.fix(),
        }
    }
}

/// Result of evaluating one reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// `low <= value <= high`.
    InRange,
    /// Out of range, but measured too long ago to act on.
    Stale {
        kind: AlertKind,
        age: chrono::Duration,
    },
    /// Out of range and fresh.
    Alert(AlertDecision),
}

impl Evaluation {
    pub fn into_decision(self) -> Option<AlertDecision> {
        match self {
            Evaluation::Alert(decision) => Some(decision),
            _ => None,
        }
    }
}

/// Evaluate a reading against thresholds and the freshness window.
///
/// Bounds are strict on both sides: a value equal to a threshold never
/// alerts. A measurement dated in the future (clock skew) counts as fresh.
pub fn evaluate(
    patient_id: PatientId,
    value: i32,
    thresholds: ClinicalThresholds,
    measured_at: MeasuredAt,
    now: Timestamp,
    policy: &FreshnessPolicy,
) -> Evaluation {
    let (kind, threshold) = if value < thresholds.low() {
        (AlertKind::Low, thresholds.low())
    } else if value > thresholds.high() {
        (AlertKind::High, thresholds.high())
    } else {
        return Evaluation::InRange;
    };

    let measured_at = measured_at.normalize(policy.reference_offset);
    let age = now.signed_duration_since(measured_at);
    let window = chrono::Duration::from_std(policy.window).unwrap_or(chrono::Duration::MAX);
    if age > window {
        return Evaluation::Stale { kind, age };
    }

    Evaluation::Alert(AlertDecision {
        patient_id,
        value,
        kind,
        severity: kind.severity(),
        message: alert_message(kind, value, threshold),
        measured_at,
        decided_at: now,
    })
}

// ---------------------------------------------------------------------------
// Repeat-alert cooldown
// ---------------------------------------------------------------------------

/// Suppresses repeated alerts for the same patient and kind.
///
/// A zero cooldown disables suppression, so a persisting excursion alerts
/// on every run. An in-range reading clears the patient's entries, so a
/// new excursion always alerts immediately.
#[derive(Debug, Default)]
pub struct AlertCooldownTracker {
    cooldown: Duration,
    last_alert: HashMap<(PatientId, AlertKind), Timestamp>,
}

impl AlertCooldownTracker {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_alert: HashMap::new(),
        }
    }

    /// Whether a delivered alert of the same patient and kind is still
    /// inside the cooldown window at `decision.decided_at`.
    pub fn is_suppressed(&self, decision: &AlertDecision) -> bool {
        if self.cooldown.is_zero() {
            return false;
        }

        let Some(last) = self.last_alert.get(&(decision.patient_id, decision.kind)) else {
            return false;
        };
        let elapsed = decision.decided_at.signed_duration_since(*last);
        let cooldown = chrono::Duration::from_std(self.cooldown).unwrap_or(chrono::Duration::MAX);
        elapsed < cooldown
    }

    /// Start the cooldown window. Only delivered alerts count; a lost
    /// alert must not hold back the next one.
    pub fn record_delivered(&mut self, decision: &AlertDecision) {
        if self.cooldown.is_zero() {
            return;
        }
        self.last_alert
            .insert((decision.patient_id, decision.kind), decision.decided_at);
    }

    /// Forget any suppression state for a patient back in range.
    pub fn clear_patient(&mut self, patient_id: PatientId) {
        self.last_alert.retain(|(id, _), _| *id != patient_id);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
