//! Alert delivery for the glucose monitor.
//!
//! - [`AlertSink`]: sends an alert payload to one delivery target.
//! - [`AlertBus`]: in-process publish/subscribe sink backed by
//!   `tokio::sync::broadcast`.
//! - [`delivery`]: external sinks (webhook, database table).
//! - [`AlertDispatcher`]: wraps a sink with a timeout and reports a typed
//!   [`DispatchOutcome`] instead of raising.
//! - [`SinkConfig`]: selects and builds the sink from configuration.

pub mod bus;
pub mod config;
pub mod delivery;
pub mod dispatcher;

pub use bus::AlertBus;
pub use config::{SinkConfig, SinkConfigError, SinkTarget};
pub use delivery::database::DatabaseSink;
pub use delivery::webhook::WebhookSink;
pub use delivery::{AlertSink, DeliveryError};
pub use dispatcher::{AlertDispatcher, DispatchFailure, DispatchOutcome};
