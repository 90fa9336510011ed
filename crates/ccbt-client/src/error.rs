//! Error types for the IPC client.

use thiserror::Error;

/// Errors raised while discovering, connecting to, or calling the daemon.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The underlying HTTP request failed (connect, TLS, timeout, or a
    /// transport-level error).
    #[error("IPC request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The daemon responded with a `{error, code, details?}` envelope.
    #[error("{message}")]
    Remote {
        /// Stable error code from the envelope.
        code: String,
        /// Human-readable message from the envelope.
        message: String,
    },
    /// The response body was not valid JSON, or didn't match the
    /// expected shape.
    #[error("failed to decode daemon response: {0}")]
    Decode(#[from] serde_json::Error),
    /// No daemon appears to be reachable at the discovered address.
    #[error("no daemon is running at {addr}")]
    NotRunning {
        /// The address the readiness probe targeted.
        addr: String,
    },
    /// The configuration layer could not be read.
    #[error(transparent)]
    Config(#[from] ccbt_config::ConfigError),
    /// A PID file was present but its contents were not a plausible
    /// process id.
    #[error("malformed PID file at {path}")]
    InvalidPid {
        /// Path of the offending PID file.
        path: String,
    },
}

/// Convenience alias for fallible client operations.
pub type ClientResult<T> = Result<T, ClientError>;
