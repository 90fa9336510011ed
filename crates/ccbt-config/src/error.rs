//! Error types for configuration loading and validation.

use thiserror::Error;

/// Errors raised while loading, validating, or saving the daemon's
/// unified configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the config file failed.
    #[error("failed to access config file {path}")]
    Io {
        /// Path that could not be accessed.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The config file's contents were not valid JSON, or did not match
    /// the expected schema.
    #[error("failed to parse config file {path}")]
    Parse {
        /// Path whose contents failed to parse.
        path: String,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
    /// A field failed validation.
    #[error("invalid configuration field {field}: {reason}")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
        /// Human-readable reason the value was rejected.
        reason: String,
    },
    /// The process has no resolvable home directory (`$HOME` unset).
    #[error("cannot resolve a home directory: $HOME is not set")]
    NoHomeDirectory,
}

/// Convenience alias for fallible configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
