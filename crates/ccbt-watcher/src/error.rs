//! Error types for folder watching.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while snapshotting a watched folder.
#[derive(Debug, Error)]
pub enum WatcherError {
    /// The watched root does not exist or is not a directory.
    #[error("watch root is not a directory: {path}")]
    NotADirectory {
        /// The offending path.
        path: PathBuf,
    },
    /// An I/O error occurred while walking the folder tree.
    #[error("failed to walk folder tree")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for watcher results.
pub type WatcherResult<T> = Result<T, WatcherError>;
