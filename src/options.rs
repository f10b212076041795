use std::time::Duration;

use crate::{retry::RetryPolicy, upload::MAX_FILE_SIZE, GodofredaError, Result};

/// Base URL used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Configures HTTP timeout, retry, health polling and upload behavior.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Retry policy applied to every tracked call.
    pub retry: RetryPolicy,
    /// Start the health poller when a [`crate::GodofredaApi`] is created.
    pub auto_check_health: bool,
    /// Milliseconds between health polls.
    pub health_check_interval_ms: u64,
    /// Maximum accepted upload size in bytes.
    pub max_upload_bytes: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            retry: RetryPolicy::default(),
            auto_check_health: true,
            health_check_interval_ms: 30_000,
            max_upload_bytes: MAX_FILE_SIZE,
        }
    }
}

impl ClientOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms.max(1))
    }

    /// Overrides defaults from `GODOFREDA_TIMEOUT_MS` and
    /// `GODOFREDA_HEALTH_INTERVAL_MS` when they are set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();
        if let Some(value) = lookup("GODOFREDA_TIMEOUT_MS") {
            options.timeout_ms = parse_millis("GODOFREDA_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = lookup("GODOFREDA_HEALTH_INTERVAL_MS") {
            let interval = parse_millis("GODOFREDA_HEALTH_INTERVAL_MS", &value)?;
            if interval == 0 {
                return Err(GodofredaError::Config(
                    "GODOFREDA_HEALTH_INTERVAL_MS must be positive".to_owned(),
                ));
            }
            options.health_check_interval_ms = interval;
        }
        Ok(options)
    }
}

fn parse_millis(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|err| GodofredaError::Config(format!("{key}={value:?} is not a number: {err}")))
}
