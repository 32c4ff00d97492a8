//! Glucose alert types handed from the evaluator to the dispatcher.

use std::fmt;

use serde::Serialize;

use crate::types::{PatientId, Timestamp};

/// Which bound was crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertKind {
    Low,
    High,
}

impl AlertKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertKind::Low => "LOW",
            AlertKind::High => "HIGH",
        }
    }

    /// Fixed severity per kind: lows are critical, highs are warnings.
    pub fn severity(self) -> AlertSeverity {
        match self {
            AlertKind::Low => AlertSeverity::Critical,
            AlertKind::High => AlertSeverity::Warning,
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertSeverity {
    Critical,
    Warning,
}

impl AlertSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertSeverity::Critical => "CRITICAL",
            AlertSeverity::Warning => "WARNING",
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An out-of-range reading that passed the freshness gate.
///
/// Transient: the core never stores it. Its serialized form is the
/// payload every alert sink receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertDecision {
    pub patient_id: PatientId,
    /// Glucose value in mg/dL.
    pub value: i32,
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub message: String,
    pub measured_at: Timestamp,
    pub decided_at: Timestamp,
}

/// Deterministic alert text for a value that crossed `threshold`.
pub fn alert_message(kind: AlertKind, value: i32, threshold: i32) -> String {
    match kind {
        AlertKind::Low => format!(
            "CRITICAL: Low glucose alert - {value} mg/dL detected (below {threshold} mg/dL)"
        ),
        AlertKind::High => format!(
            "WARNING: High glucose alert - {value} mg/dL detected (above {threshold} mg/dL)"
        ),
    }
}
