//! Error types for the folder manager.

use thiserror::Error;

/// Errors raised by [`crate::FolderManager`].
#[derive(Debug, Error)]
pub enum FolderError {
    /// The folder path does not exist or is not a directory.
    #[error("folder path {path} is not a directory")]
    NotADirectory {
        /// The offending path.
        path: String,
    },
    /// An underlying allowlist operation failed.
    #[error(transparent)]
    Allowlist(#[from] ccbt_allowlist::AllowlistError),
    /// An underlying sync manager operation failed.
    #[error(transparent)]
    Sync(#[from] ccbt_sync::SyncError),
    /// An underlying folder watcher operation failed.
    #[error(transparent)]
    Watcher(#[from] ccbt_watcher::WatcherError),
}

/// Convenience alias for fallible folder manager operations.
pub type FolderResult<T> = Result<T, FolderError>;
