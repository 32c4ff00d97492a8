//! Worker configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use chrono::FixedOffset;
use glucowatch_core::error::CoreError;
use glucowatch_core::evaluation::{FreshnessPolicy, DEFAULT_FRESHNESS_WINDOW};
use glucowatch_core::fallback::{DEFAULT_FALLBACK_MAX, DEFAULT_FALLBACK_MIN};
use glucowatch_core::thresholds::{ClinicalThresholds, DEFAULT_HIGH_THRESHOLD, DEFAULT_LOW_THRESHOLD};
use glucowatch_dexcom::api::DEFAULT_REQUEST_TIMEOUT;
use glucowatch_dexcom::Region;
use glucowatch_events::{SinkConfig, SinkConfigError};

use crate::monitor::MonitorSettings;
use crate::scheduler::{DEFAULT_POLL_INTERVAL, DEFAULT_SHUTDOWN_GRACE};

/// Invalid worker configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid {name}: '{value}' ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    Domain(#[from] CoreError),

    #[error(transparent)]
    Sink(#[from] SinkConfigError),
}

/// Log output format for the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Everything the worker binary needs to start.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub poll_interval: Duration,
    pub shutdown_grace: Duration,
    pub monitor: MonitorSettings,
    pub dexcom_region: Region,
    pub dexcom_timeout: Duration,
    pub fallback_min: i32,
    pub fallback_max: i32,
    pub sink: SinkConfig,
    pub log_format: LogFormat,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default      |
    /// |--------------------------------|--------------|
    /// | `DATABASE_URL`                 | (required)   |
    /// | `POLL_INTERVAL_SECS`           | `60`         |
    /// | `FRESHNESS_WINDOW_SECS`        | `300`        |
    /// | `DEFAULT_LOW_THRESHOLD`        | `70`         |
    /// | `DEFAULT_HIGH_THRESHOLD`       | `200`        |
    /// | `REFERENCE_UTC_OFFSET_MINUTES` | `0`          |
    /// | `MONITOR_CONCURRENCY`          | `4`          |
    /// | `SHUTDOWN_GRACE_SECS`          | `30`         |
    /// | `ALERT_REPEAT_COOLDOWN_SECS`   | `0`          |
    /// | `DEXCOM_REGION`                | `ous`        |
    /// | `DEXCOM_REQUEST_TIMEOUT_SECS`  | `10`         |
    /// | `FALLBACK_MIN_VALUE`           | `10`         |
    /// | `FALLBACK_MAX_VALUE`           | `250`        |
    /// | `LOG_FORMAT`                   | `pretty`     |
    ///
    /// Sink variables are documented on [`SinkConfig::from_env`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`WorkerConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(&lookup);

        let database_url = env
            .get("DATABASE_URL")
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let poll_interval = env.secs("POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL, false)?;
        let shutdown_grace = env.secs("SHUTDOWN_GRACE_SECS", DEFAULT_SHUTDOWN_GRACE, true)?;
        let window = env.secs("FRESHNESS_WINDOW_SECS", DEFAULT_FRESHNESS_WINDOW, true)?;
        let repeat_cooldown = env.secs("ALERT_REPEAT_COOLDOWN_SECS", Duration::ZERO, true)?;

        let offset_minutes: i32 = env.parse("REFERENCE_UTC_OFFSET_MINUTES", 0)?;
        let reference_offset = FixedOffset::east_opt(offset_minutes * 60).ok_or_else(|| {
            ConfigError::Invalid {
                name: "REFERENCE_UTC_OFFSET_MINUTES",
                value: offset_minutes.to_string(),
                reason: "must be within +/- 1439 minutes".into(),
            }
        })?;

        let default_thresholds = ClinicalThresholds::new(
            env.parse("DEFAULT_LOW_THRESHOLD", DEFAULT_LOW_THRESHOLD)?,
            env.parse("DEFAULT_HIGH_THRESHOLD", DEFAULT_HIGH_THRESHOLD)?,
        )?;

        let concurrency: usize = env.parse("MONITOR_CONCURRENCY", 4)?;
        if concurrency == 0 {
            return Err(ConfigError::Invalid {
                name: "MONITOR_CONCURRENCY",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }

        let fallback_min = env.parse("FALLBACK_MIN_VALUE", DEFAULT_FALLBACK_MIN)?;
        let fallback_max = env.parse("FALLBACK_MAX_VALUE", DEFAULT_FALLBACK_MAX)?;
        if fallback_min > fallback_max {
            return Err(ConfigError::Invalid {
                name: "FALLBACK_MIN_VALUE",
                value: fallback_min.to_string(),
                reason: format!("exceeds FALLBACK_MAX_VALUE ({fallback_max})"),
            });
        }

        let log_format = match env.get("LOG_FORMAT").as_deref() {
            None | Some("pretty") | Some("text") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "LOG_FORMAT",
                    value: other.into(),
                    reason: "expected pretty or json".into(),
                })
            }
        };

        Ok(Self {
            database_url,
            poll_interval,
            shutdown_grace,
            monitor: MonitorSettings {
                default_thresholds,
                freshness: FreshnessPolicy {
                    window,
                    reference_offset,
                },
                concurrency,
                repeat_cooldown,
            },
            dexcom_region: env.parse("DEXCOM_REGION", Region::default())?,
            dexcom_timeout: env.secs("DEXCOM_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT, false)?,
            fallback_min,
            fallback_max,
            sink: SinkConfig::from_lookup(&lookup)?,
            log_format,
        })
    }
}

/// Typed access to a variable source. Blank values count as unset.
struct Env<'a, F>(&'a F);

impl<F> Env<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(name) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
                name,
                reason: e.to_string(),
                value: raw,
            }),
        }
    }

    fn secs(
        &self,
        name: &'static str,
        default: Duration,
        allow_zero: bool,
    ) -> Result<Duration, ConfigError> {
        let secs: u64 = self.parse(name, default.as_secs())?;
        if secs == 0 && !allow_zero {
            return Err(ConfigError::Invalid {
                name,
                value: "0".into(),
                reason: "must be greater than zero".into(),
            });
        }
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    use assert_matches::assert_matches;
    use glucowatch_events::SinkTarget;

    fn load(vars: &[(&str, &str)]) -> Result<WorkerConfig, ConfigError> {
        let mut map: HashMap<String, String> = HashMap::new();
        map.insert("DATABASE_URL".into(), "postgres://localhost/glucowatch".into());
        for (k, v) in vars {
            map.insert(k.to_string(), v.to_string());
        }
        WorkerConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.shutdown_grace, Duration::from_secs(30));
        assert_eq!(config.monitor.freshness.window, Duration::from_secs(300));
        assert_eq!(config.monitor.default_thresholds.low(), 70);
        assert_eq!(config.monitor.default_thresholds.high(), 200);
        assert_eq!(config.monitor.concurrency, 4);
        assert_eq!(config.monitor.repeat_cooldown, Duration::ZERO);
        assert_eq!(config.dexcom_region, Region::Ous);
        assert_eq!(config.dexcom_timeout, Duration::from_secs(10));
        assert_eq!((config.fallback_min, config.fallback_max), (10, 250));
        assert_eq!(config.sink.target, SinkTarget::Database);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn database_url_is_required() {
        let result = WorkerConfig::from_lookup(|_| None);
        assert_matches!(result, Err(ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("POLL_INTERVAL_SECS", "15"),
            ("FRESHNESS_WINDOW_SECS", "120"),
            ("DEFAULT_LOW_THRESHOLD", "80"),
            ("DEFAULT_HIGH_THRESHOLD", "180"),
            ("REFERENCE_UTC_OFFSET_MINUTES", "-300"),
            ("MONITOR_CONCURRENCY", "1"),
            ("DEXCOM_REGION", "us"),
            ("ALERT_SINK", "bus"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();

        assert_eq!(config.poll_interval, Duration::from_secs(15));
        assert_eq!(config.monitor.freshness.window, Duration::from_secs(120));
        assert_eq!(config.monitor.default_thresholds.low(), 80);
        assert_eq!(config.monitor.default_thresholds.high(), 180);
        assert_eq!(
            config.monitor.freshness.reference_offset.local_minus_utc(),
            -300 * 60
        );
        assert_eq!(config.monitor.concurrency, 1);
        assert_eq!(config.dexcom_region, Region::Us);
        assert_eq!(config.sink.target, SinkTarget::Bus);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn inverted_default_thresholds_are_rejected() {
        assert_matches!(
            load(&[("DEFAULT_LOW_THRESHOLD", "200"), ("DEFAULT_HIGH_THRESHOLD", "70")]),
            Err(ConfigError::Domain(CoreError::Validation(_)))
        );
    }

    #[test]
    fn malformed_numbers_name_the_variable() {
        assert_matches!(
            load(&[("POLL_INTERVAL_SECS", "soon")]),
            Err(ConfigError::Invalid { name: "POLL_INTERVAL_SECS", .. })
        );
        assert_matches!(
            load(&[("POLL_INTERVAL_SECS", "0")]),
            Err(ConfigError::Invalid { name: "POLL_INTERVAL_SECS", .. })
        );
        assert_matches!(
            load(&[("MONITOR_CONCURRENCY", "0")]),
            Err(ConfigError::Invalid { name: "MONITOR_CONCURRENCY", .. })
        );
        assert_matches!(
            load(&[("REFERENCE_UTC_OFFSET_MINUTES", "1440")]),
            Err(ConfigError::Invalid { name: "REFERENCE_UTC_OFFSET_MINUTES", .. })
        );
    }

    #[test]
    fn sink_errors_propagate() {
        assert_matches!(
            load(&[("ALERT_SINK", "webhook")]),
            Err(ConfigError::Sink(SinkConfigError::MissingWebhookUrl))
        );
    }
}
