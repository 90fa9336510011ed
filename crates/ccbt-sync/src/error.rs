//! Error types for the sync manager.

use thiserror::Error;

/// Errors raised by [`crate::SyncManager`].
#[derive(Debug, Error)]
pub enum SyncError {
    /// Persisting or restoring `consensus_state.json` failed.
    #[error("sync state I/O failed during {operation}: {source}")]
    Io {
        /// The operation being performed when the error occurred.
        operation: &'static str,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// `consensus_state.json` contained malformed JSON.
    #[error("sync state JSON was malformed: {0}")]
    Json(#[from] serde_json::Error),
    /// A chunk hash was not exactly 32 bytes.
    #[error("chunk hash must be exactly 32 bytes")]
    InvalidChunkHash,
}

/// Convenience alias for fallible sync manager operations.
pub type SyncResult<T> = Result<T, SyncError>;
