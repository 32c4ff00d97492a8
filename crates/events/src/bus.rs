//! In-process alert bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`AlertBus`] fans every dispatched alert out to any number of
//! subscribers in the same process. It is the `bus` sink, used for local
//! development and by tests that observe dispatch.

use std::time::Duration;

use async_trait::async_trait;
use glucowatch_core::alert::AlertDecision;
use tokio::sync::broadcast;

use crate::delivery::{AlertSink, DeliveryError};

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// Publishing to a channel never blocks; this only bounds a misbehaving
/// implementation.
const SEND_TIMEOUT: Duration = Duration::from_secs(3);

/// In-process fan-out alert bus.
///
/// # Usage
///
/// ```rust
/// use glucowatch_events::AlertBus;
///
/// let bus = AlertBus::default();
/// let _rx = bus.subscribe();
/// assert_eq!(bus.subscriber_count(), 1);
/// ```
pub struct AlertBus {
    sender: broadcast::Sender<AlertDecision>,
}

impl AlertBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest unconsumed alerts are dropped and
    /// slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AlertDecision> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for AlertBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl AlertSink for AlertBus {
    fn kind(&self) -> &'static str {
        "bus"
    }

    fn default_timeout(&self) -> Duration {
        SEND_TIMEOUT
    }

    /// An alert published with zero subscribers reaches nobody, so it is
    /// reported as rejected rather than delivered.
    async fn send(&self, alert: &AlertDecision) -> Result<(), DeliveryError> {
        self.sender
            .send(alert.clone())
            .map(|_| ())
            .map_err(|_| DeliveryError::Rejected("no subscribers on alert bus".into()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
