use anyhow::{Context, Result};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Runtime settings for the poller, read from the environment.
///
/// | variable                 | default                       |
/// |--------------------------|-------------------------------|
/// | `BUS_API_BASE_URL`       | `http://localhost:8080/api`   |
/// | `BUS_POLL_INTERVAL_SECS` | `10`                          |
/// | `BUS_HTTP_TIMEOUT_SECS`  | `30`                          |
#[derive(Debug, Clone, PartialEq)]
pub struct PollerConfig {
    pub base_url: String,
    pub interval: Duration,
    pub http_timeout: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl PollerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; unset keys use defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let secs = |key: &str, default: Duration| -> Result<Duration> {
            match lookup(key) {
                Some(raw) => {
                    let secs: u64 = raw
                        .trim()
                        .parse()
                        .with_context(|| format!("{key} must be a whole number of seconds, got '{raw}'"))?;
                    Ok(Duration::from_secs(secs))
                }
                None => Ok(default),
            }
        };

        Ok(Self {
            base_url: lookup("BUS_API_BASE_URL").unwrap_or(defaults.base_url),
            interval: secs("BUS_POLL_INTERVAL_SECS", defaults.interval)?,
            http_timeout: secs("BUS_HTTP_TIMEOUT_SECS", defaults.http_timeout)?,
        })
    }
}
