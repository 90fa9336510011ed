//! Error types for Raft node operations.

use thiserror::Error;

/// Primary error type for Raft node operations.
#[derive(Debug, Error)]
pub enum RaftError {
    /// Persisting state to disk failed. Per contract, the in-memory state
    /// is left unchanged and the RPC handler that triggered the save must
    /// abort rather than acknowledge.
    #[error("failed to persist raft state to {path}")]
    PersistenceFailed {
        /// State file path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The on-disk state file could not be parsed as JSON; callers fall
    /// back to default state rather than treat this as fatal, but the
    /// error is still surfaced for logging.
    #[error("failed to parse raft state file")]
    Corrupt(#[from] serde_json::Error),
}

/// Convenience alias for Raft results.
pub type RaftResult<T> = Result<T, RaftError>;
