//! Configuration for the ledger

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::command_dispatcher::RetryPolicy;
use crate::projections::Period;

pub const ENV_RETRY_MAX_ATTEMPTS: &str = "BANKLEDGER_RETRY_MAX_ATTEMPTS";
pub const ENV_RETRY_BACKOFF_MS: &str = "BANKLEDGER_RETRY_BACKOFF_MS";
pub const ENV_TOP_N: &str = "BANKLEDGER_TOP_N";
pub const ENV_PERIOD: &str = "BANKLEDGER_PERIOD";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Ledger configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Conflict retry behaviour of the command service
    pub retry: RetryConfig,

    /// Read model reporting
    pub projections: ProjectionConfig,
}

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per command, the first one included (minimum 1)
    pub max_attempts: u32,

    /// Fixed pause between attempts (milliseconds)
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 0,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.backoff_ms))
    }
}

/// Projection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Rows in the top-balances report
    pub top_n: usize,

    /// Net-flow bucket width
    pub period: Period,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            top_n: 10,
            period: Period::Month,
        }
    }
}

impl LedgerConfig {
    /// Defaults overlaid with the `BANKLEDGER_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_RETRY_MAX_ATTEMPTS) {
            config.retry.max_attempts = parse(ENV_RETRY_MAX_ATTEMPTS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_RETRY_BACKOFF_MS) {
            config.retry.backoff_ms = parse(ENV_RETRY_BACKOFF_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_TOP_N) {
            config.projections.top_n = parse(ENV_TOP_N, &raw)?;
        }
        if let Some(raw) = lookup(ENV_PERIOD) {
            config.projections.period = raw
                .parse()
                .map_err(|message| ConfigError::Invalid { key: ENV_PERIOD, message })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON document; missing sections take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "retry.max_attempts",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn parse<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        message: format!("'{raw}': {e}"),
    })
}
