//! Error types for magnit-calc.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors raised by the durable queue/store.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("Failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("{command} on {key} failed: {reason}")]
    Command {
        command: &'static str,
        key: String,
        reason: String,
    },
}

/// Task (de)serialization errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Malformed task payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Expected a {expected} task, found {found}")]
    UnexpectedState {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Invalid task id bytes (length {0})")]
    InvalidId(usize),
}

/// Arithmetic evaluation faults. These end up as `Failed` tasks, never as
/// transport errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalcError {
    #[error("float division by zero")]
    DivisionByZero,
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
