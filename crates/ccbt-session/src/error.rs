//! Error types for the session manager.

use thiserror::Error;

/// Errors raised by [`crate::SessionManager`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// No folder is registered under the given key.
    #[error("unknown folder: {key}")]
    UnknownFolder {
        /// The key that was looked up.
        key: String,
    },
    /// A folder is already registered under the given key.
    #[error("folder already registered: {key}")]
    DuplicateFolder {
        /// The key that collided.
        key: String,
    },
    /// Constructing or starting the underlying folder manager failed.
    #[error(transparent)]
    Folder(#[from] ccbt_folder::FolderError),
}

/// Convenience alias for fallible session manager operations.
pub type SessionResult<T> = Result<T, SessionError>;
