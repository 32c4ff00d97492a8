//! Sink selection from environment variables.

use std::sync::Arc;
use std::time::Duration;

use glucowatch_db::DbPool;

use crate::bus::AlertBus;
use crate::delivery::database::DatabaseSink;
use crate::delivery::webhook::WebhookSink;
use crate::delivery::AlertSink;
use crate::dispatcher::AlertDispatcher;

/// Invalid or incomplete sink configuration.
#[derive(Debug, thiserror::Error)]
pub enum SinkConfigError {
    #[error("Unknown ALERT_SINK '{0}' (expected database, webhook or bus)")]
    UnknownSink(String),

    #[error("ALERT_WEBHOOK_URL is required when ALERT_SINK=webhook")]
    MissingWebhookUrl,

    #[error("Invalid {name}: '{value}'")]
    Invalid { name: &'static str, value: String },

    #[error("Failed to build webhook client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Which delivery target alerts go to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkTarget {
    Database,
    Webhook { url: String },
    Bus,
}

/// Alert sink configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    pub target: SinkTarget,
    /// Overrides the sink's own dispatch timeout.
    pub timeout: Option<Duration>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            target: SinkTarget::Database,
            timeout: None,
        }
    }
}

impl SinkConfig {
    /// Load sink configuration from environment variables.
    ///
    /// | Env Var                   | Default        |
    /// |---------------------------|----------------|
    /// | `ALERT_SINK`              | `database`     |
    /// | `ALERT_WEBHOOK_URL`       | (none)         |
    /// | `ALERT_SINK_TIMEOUT_SECS` | sink default   |
    pub fn from_env() -> Result<Self, SinkConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`SinkConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SinkConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset, matching the worker's own settings.
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let sink = get("ALERT_SINK").unwrap_or_else(|| "database".into());
        let target = match sink.to_ascii_lowercase().as_str() {
            "database" | "db" => SinkTarget::Database,
            "bus" => SinkTarget::Bus,
            "webhook" => {
                let url = get("ALERT_WEBHOOK_URL").ok_or(SinkConfigError::MissingWebhookUrl)?;
                SinkTarget::Webhook { url }
            }
            _ => return Err(SinkConfigError::UnknownSink(sink)),
        };

        let timeout = match get("ALERT_SINK_TIMEOUT_SECS") {
            None => None,
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
                _ => {
                    return Err(SinkConfigError::Invalid {
                        name: "ALERT_SINK_TIMEOUT_SECS",
                        value: raw,
                    })
                }
            },
        };

        Ok(Self { target, timeout })
    }

    /// Construct the configured sink.
    ///
    /// `bus` is used only for the bus target; callers that want to observe
    /// alerts in-process keep their own handle to it.
    pub fn build_sink(
        &self,
        pool: DbPool,
        bus: Arc<AlertBus>,
    ) -> Result<Arc<dyn AlertSink>, SinkConfigError> {
        let sink: Arc<dyn AlertSink> = match &self.target {
            SinkTarget::Database => Arc::new(DatabaseSink::new(pool)),
            SinkTarget::Webhook { url } => Arc::new(WebhookSink::new(url.clone())?),
            SinkTarget::Bus => bus,
        };
        Ok(sink)
    }

    /// Construct the sink and wrap it in a dispatcher.
    pub fn build_dispatcher(
        &self,
        pool: DbPool,
        bus: Arc<AlertBus>,
    ) -> Result<AlertDispatcher, SinkConfigError> {
        let sink = self.build_sink(pool, bus)?;
        Ok(match self.timeout {
            Some(timeout) => AlertDispatcher::with_timeout(sink, timeout),
            None => AlertDispatcher::new(sink),
        })
    }
}
