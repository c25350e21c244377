//! Error types for Queuecut.

use thiserror::Error;

/// Top-level error type for Queuecut operations that touch the outside world.
///
/// The simulation core itself never fails fatally; its recoverable outcomes
/// live in per-module error enums in `queuecut-gameplay`.
#[derive(Debug, Error)]
pub enum QueuecutError {
    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value is outside the range the simulation accepts
    #[error("Invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Offending field
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// Config file could not be parsed
    #[error("Failed to parse config: {0}")]
    Parse(String),
}

/// Result type alias for Queuecut operations.
pub type QueuecutResult<T> = Result<T, QueuecutError>;
