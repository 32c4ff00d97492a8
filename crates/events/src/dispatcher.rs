//! Failure-isolated alert dispatch.
//!
//! [`AlertDispatcher`] owns one [`AlertSink`], bounds every send with a
//! timeout, and converts every failure (including a panicking sink) into a
//! [`DispatchOutcome`]. Nothing escapes `dispatch` as an error.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use glucowatch_core::alert::AlertDecision;
use serde::Serialize;

use crate::delivery::{AlertSink, DeliveryError};

/// Why an alert was not delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchFailure {
    /// The sink did not finish within the dispatch timeout.
    Timeout,
    /// Network or HTTP-level failure.
    Transport,
    /// The sink refused the alert.
    Rejected,
    /// The alert row could not be written.
    Storage,
    /// The payload could not be encoded.
    Encoding,
    /// The sink panicked.
    Internal,
}

impl DispatchFailure {
    pub fn as_str(self) -> &'static str {
        match self {
            DispatchFailure::Timeout => "timeout",
            DispatchFailure::Transport => "transport",
            DispatchFailure::Rejected => "rejected",
            DispatchFailure::Storage => "storage",
            DispatchFailure::Encoding => "encoding",
            DispatchFailure::Internal => "internal",
        }
    }
}

impl fmt::Display for DispatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&DeliveryError> for DispatchFailure {
    fn from(e: &DeliveryError) -> Self {
        match e {
            DeliveryError::Request(err) if err.is_timeout() => DispatchFailure::Timeout,
            DeliveryError::Request(_) | DeliveryError::HttpStatus(_) => DispatchFailure::Transport,
            DeliveryError::Database(_) => DispatchFailure::Storage,
            DeliveryError::Encode(_) => DispatchFailure::Encoding,
            DeliveryError::Rejected(_) => DispatchFailure::Rejected,
        }
    }
}

/// Result of one dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatchOutcome {
    pub delivered: bool,
    /// Set exactly when `delivered` is false.
    pub failure: Option<DispatchFailure>,
}

impl DispatchOutcome {
    pub fn delivered() -> Self {
        Self {
            delivered: true,
            failure: None,
        }
    }

    pub fn failed(failure: DispatchFailure) -> Self {
        Self {
            delivered: false,
            failure: Some(failure),
        }
    }
}

/// Delivers alert decisions to a configured sink.
///
/// Constructed once at startup and shared with the monitor; there is no
/// process-wide instance.
#[derive(Clone)]
pub struct AlertDispatcher {
    sink: Arc<dyn AlertSink>,
    timeout: Duration,
}

impl AlertDispatcher {
    /// Use the sink's own default timeout.
    pub fn new(sink: Arc<dyn AlertSink>) -> Self {
        let timeout = sink.default_timeout();
        Self { sink, timeout }
    }

    /// Override the sink's default timeout.
    pub fn with_timeout(sink: Arc<dyn AlertSink>, timeout: Duration) -> Self {
        Self { sink, timeout }
    }

    pub fn sink_kind(&self) -> &'static str {
        self.sink.kind()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send one alert. Never fails; the outcome says what happened.
    pub async fn dispatch(&self, alert: &AlertDecision) -> DispatchOutcome {
        let send = AssertUnwindSafe(self.sink.send(alert)).catch_unwind();

        let outcome = match tokio::time::timeout(self.timeout, send).await {
            Ok(Ok(Ok(()))) => DispatchOutcome::delivered(),
            Ok(Ok(Err(e))) => {
                tracing::error!(
                    sink = self.sink.kind(),
                    patient_id = %alert.patient_id,
                    error = %e,
                    "Alert delivery failed"
                );
                DispatchOutcome::failed(DispatchFailure::from(&e))
            }
            Ok(Err(_panic)) => {
                tracing::error!(
                    sink = self.sink.kind(),
                    patient_id = %alert.patient_id,
                    "Alert sink panicked"
                );
                DispatchOutcome::failed(DispatchFailure::Internal)
            }
            Err(_elapsed) => {
                tracing::error!(
                    sink = self.sink.kind(),
                    patient_id = %alert.patient_id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Alert delivery timed out"
                );
                DispatchOutcome::failed(DispatchFailure::Timeout)
            }
        };

        if outcome.delivered {
            tracing::warn!(
                sink = self.sink.kind(),
                patient_id = %alert.patient_id,
                kind = %alert.kind,
                severity = %alert.severity,
                value = alert.value,
                "Glucose alert dispatched"
            );
        }
        outcome
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
