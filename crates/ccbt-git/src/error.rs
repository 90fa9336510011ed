//! Error types for git anchor operations.

use thiserror::Error;

/// Primary error type for git anchor operations.
///
/// This only surfaces for genuine infrastructure failures (the `git`
/// binary missing, or a command exceeding its timeout). A `git` invocation
/// that simply fails (bad ref, no repo) is not an error at this layer —
/// see [`crate::GitAnchor`] for how that distinction is handled.
#[derive(Debug, Error)]
pub enum GitError {
    /// The `git` executable could not be found on `PATH`.
    #[error("git executable not found; is git installed?")]
    CommandNotFound,
    /// The command did not complete within the configured timeout.
    #[error("git command timed out after {timeout_secs}s")]
    Timeout {
        /// Configured timeout, in seconds.
        timeout_secs: u64,
    },
    /// Spawning or communicating with the `git` process failed.
    #[error("failed to run git command")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for git anchor results.
pub type GitResult<T> = Result<T, GitError>;
