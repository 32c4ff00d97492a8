//! External delivery targets for glucose alerts.
//!
//! Every target implements [`AlertSink`]. Which one runs is a deployment
//! choice made in [`crate::config`], not a code change.

use std::time::Duration;

use async_trait::async_trait;
use glucowatch_core::alert::AlertDecision;

pub mod database;
pub mod webhook;

/// Sink-level delivery failure.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote endpoint returned a non-2xx status code.
    #[error("Sink returned HTTP {0}")]
    HttpStatus(u16),

    /// Writing the alert row failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The payload could not be encoded.
    #[error("Encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// The sink refused the alert (e.g. nobody is listening on the bus).
    #[error("Alert rejected: {0}")]
    Rejected(String),
}

/// Sends an alert payload to one delivery target.
///
/// Implementations may retry internally, but only a bounded number of
/// times; the final failure is returned as an error.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Short name used in logs and configuration (`"webhook"`, ...).
    fn kind(&self) -> &'static str;

    /// Upper bound on one `send`, retries included.
    fn default_timeout(&self) -> Duration;

    async fn send(&self, alert: &AlertDecision) -> Result<(), DeliveryError>;
}
