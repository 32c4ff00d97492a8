use std::time::Duration;

use glucowatch_dexcom::api::DEFAULT_REQUEST_TIMEOUT;
use glucowatch_dexcom::Region;

/// Invalid server configuration.
#[derive(Debug, thiserror::Error)]
#[error("Invalid {name}: '{value}'")]
pub struct ConfigError {
    pub name: &'static str,
    pub value: String,
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Dexcom Share region used to verify linked credentials.
    pub dexcom_region: Region,
    pub dexcom_timeout: Duration,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                 |
    /// |-------------------------------|-------------------------|
    /// | `HOST`                        | `0.0.0.0`               |
    /// | `PORT`                        | `3000`                  |
    /// | `CORS_ORIGINS`                | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`        | `30`                    |
    /// | `DEXCOM_REGION`               | `ous`                   |
    /// | `DEXCOM_REQUEST_TIMEOUT_SECS` | `10`                    |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`ServerConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());
        let invalid = |name: &'static str, value: String| ConfigError { name, value };

        let host = var("HOST", "0.0.0.0");

        let port = var("PORT", "3000");
        let port: u16 = port.parse().map_err(|_| invalid("PORT", port))?;

        let cors_origins: Vec<String> = var("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let timeout = var("REQUEST_TIMEOUT_SECS", "30");
        let request_timeout_secs: u64 = timeout
            .parse()
            .map_err(|_| invalid("REQUEST_TIMEOUT_SECS", timeout))?;

        let region = var("DEXCOM_REGION", Region::default().as_str());
        let dexcom_region: Region = region
            .parse()
            .map_err(|_| invalid("DEXCOM_REGION", region))?;

        let dexcom_timeout = match lookup("DEXCOM_REQUEST_TIMEOUT_SECS") {
            None => DEFAULT_REQUEST_TIMEOUT,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => return Err(invalid("DEXCOM_REQUEST_TIMEOUT_SECS", raw)),
            },
        };

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            dexcom_region,
            dexcom_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.cors_origins, vec!["http://localhost:5173"]);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.dexcom_region, Region::Ous);
        assert_eq!(config.dexcom_timeout, Duration::from_secs(10));
    }

    #[test]
    fn splits_cors_origins() {
        let config = ServerConfig::from_lookup(|name| {
            (name == "CORS_ORIGINS").then(|| "http://a.test, ,http://b.test".to_string())
        })
        .unwrap();
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn bad_port_is_reported() {
        let err = ServerConfig::from_lookup(|name| (name == "PORT").then(|| "http".to_string()))
            .unwrap_err();
        assert_eq!(err.name, "PORT");
        assert_eq!(err.to_string(), "Invalid PORT: 'http'");
    }
}
