//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building or loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A threshold or ratio fell outside `[0, 1]` (or was not finite).
    #[error("invalid {name} '{value}': must be between 0.0 and 1.0")]
    ThresholdOutOfRange { name: &'static str, value: f32 },

    /// Two thresholds are individually valid but contradict each other.
    #[error("inconsistent thresholds: {reason}")]
    InconsistentThresholds { reason: String },

    /// A count, duration or factor that must be positive was zero or negative.
    #[error("invalid {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },

    /// An environment variable was set but could not be parsed.
    #[error("failed to parse {name}='{value}': {reason}")]
    EnvParseError {
        name: &'static str,
        value: String,
        reason: String,
    },

    /// Specified path does not exist on the filesystem.
    #[error("path does not exist: {path}")]
    PathNotFound { path: PathBuf },

    /// Path exists but is not a file (when a file was expected).
    #[error("path is not a file: {path}")]
    NotAFile { path: PathBuf },

    /// Path exists but is not a directory (when a directory was expected).
    #[error("path is not a directory: {path}")]
    NotADirectory { path: PathBuf },
}
