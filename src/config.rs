//! Configuration types, built from environment variables.

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_REDIS_URL: &str = "redis://localhost";
pub const DEFAULT_QUEUE_KEY: &str = "MAGNIT:NEW";
pub const DEFAULT_RESULT_KEY: &str = "MAGNIT:DONE";
pub const DEFAULT_FAIL_KEY: &str = "MAGNIT:FAIL";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_CLAIM_TIMEOUT_SECS: u64 = 1;

/// Names of the broker structures shared by producers and consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyConfig {
    /// Pending queue (list).
    pub queue_key: String,
    /// Done outcome hash.
    pub result_key: String,
    /// Failed outcome hash.
    pub fail_key: String,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            queue_key: DEFAULT_QUEUE_KEY.to_string(),
            result_key: DEFAULT_RESULT_KEY.to_string(),
            fail_key: DEFAULT_FAIL_KEY.to_string(),
        }
    }
}

/// Worker tuning.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How long a single claim attempt waits before re-checking for
    /// cancellation.
    pub claim_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            claim_timeout: Duration::from_secs(DEFAULT_CLAIM_TIMEOUT_SECS),
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub redis_url: String,
    pub keys: KeyConfig,
    pub bind_addr: SocketAddr,
    pub worker: WorkerConfig,
}

impl Config {
    /// Build config from environment variables, falling back to defaults for
    /// anything unset or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let bind_raw = var("MAGNIT_BIND_ADDR", DEFAULT_BIND_ADDR);
        let bind_addr: SocketAddr =
            bind_raw
                .parse()
                .map_err(|e: std::net::AddrParseError| ConfigError::InvalidValue {
                    key: "MAGNIT_BIND_ADDR".to_string(),
                    message: format!("{bind_raw:?}: {e}"),
                })?;

        let timeout_raw = var(
            "MAGNIT_CLAIM_TIMEOUT_SECS",
            &DEFAULT_CLAIM_TIMEOUT_SECS.to_string(),
        );
        let claim_timeout_secs: u64 =
            timeout_raw
                .parse()
                .map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue {
                    key: "MAGNIT_CLAIM_TIMEOUT_SECS".to_string(),
                    message: format!("{timeout_raw:?}: {e}"),
                })?;
        if claim_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "MAGNIT_CLAIM_TIMEOUT_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            redis_url: var("REDIS_URL", DEFAULT_REDIS_URL),
            keys: KeyConfig {
                queue_key: var("QUEUE_KEY", DEFAULT_QUEUE_KEY),
                result_key: var("RESULT_KEY", DEFAULT_RESULT_KEY),
                fail_key: var("FAIL_KEY", DEFAULT_FAIL_KEY),
            },
            bind_addr,
            worker: WorkerConfig {
                claim_timeout: Duration::from_secs(claim_timeout_secs),
            },
        })
    }
}
