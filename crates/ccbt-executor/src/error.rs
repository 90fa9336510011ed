//! Error kinds shared by every command, mirroring spec.md §7.
//!
//! The executor never raises these to its caller: [`crate::Executor::execute`]
//! catches every [`ExecutorError`] and folds it into a
//! [`crate::CommandResult`] with `success = false`. The enum exists so
//! adapters have a closed, stable vocabulary to report through rather than
//! each inventing ad-hoc strings.

use thiserror::Error;

/// Stable error code surfaced in [`crate::CommandResult::code`] and, at the
/// IPC boundary, in the `{error, code, details?}` envelope (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// No credentials were presented where the route requires them.
    AuthRequired,
    /// Credentials were presented but did not verify.
    AuthError,
    /// The request body was not valid JSON.
    InvalidJson,
    /// An input parameter failed validation.
    ValidationError,
    /// The referenced resource does not exist.
    NotFound,
    /// The request conflicts with current state.
    Conflict,
    /// The operation did not complete within its budget.
    Timeout,
    /// A dependency this command needs is not wired in (e.g. no torrent
    /// engine is attached).
    Unavailable,
    /// A filesystem or subprocess I/O operation failed.
    IoError,
    /// A consensus round failed to reach agreement.
    ConsensusFailure,
    /// A structured field (e.g. a `.tonic` field) was malformed.
    InvalidField,
    /// A file path escaped its folder root.
    InvalidPath,
    /// A key was not exactly the required length.
    InvalidKeyLength,
    /// An unclassified internal failure.
    InternalError,
}

impl ErrorCode {
    /// Stable wire string for this code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthRequired => "AUTH_REQUIRED",
            Self::AuthError => "AUTH_ERROR",
            Self::InvalidJson => "INVALID_JSON",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::Timeout => "TIMEOUT",
            Self::Unavailable => "UNAVAILABLE",
            Self::IoError => "IO_ERROR",
            Self::ConsensusFailure => "CONSENSUS_FAILURE",
            Self::InvalidField => "INVALID_FIELD",
            Self::InvalidPath => "INVALID_PATH",
            Self::InvalidKeyLength => "INVALID_KEY_LENGTH",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

/// Error raised while validating or dispatching a command. Never escapes
/// [`crate::Executor::execute`] — it is always converted to a
/// [`crate::CommandResult`].
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// No adapter is registered to handle this command name.
    #[error("unknown command: {name}")]
    UnknownCommand {
        /// The dotted command name that was looked up.
        name: String,
    },
    /// The input parameters failed validation before dispatch.
    #[error("invalid parameters for {command}: {reason}")]
    InvalidParams {
        /// The command whose parameters were rejected.
        command: String,
        /// Human-readable reason.
        reason: String,
    },
    /// The adapter reported a specific, coded failure.
    #[error("{message}")]
    Coded {
        /// Stable error code.
        code: ErrorCode,
        /// Human-readable message.
        message: String,
    },
    /// The folder manager, session manager, or another lower layer
    /// returned an error that doesn't need its own variant here.
    #[error(transparent)]
    Folder(#[from] ccbt_folder::FolderError),
    /// The session manager returned an error.
    #[error(transparent)]
    Session(#[from] ccbt_session::SessionError),
    /// The allowlist store returned an error.
    #[error(transparent)]
    Allowlist(#[from] ccbt_allowlist::AllowlistError),
    /// The tonic codec returned an error.
    #[error(transparent)]
    Tonic(#[from] ccbt_tonic::TonicError),
    /// The config layer returned an error.
    #[error(transparent)]
    Config(#[from] ccbt_config::ConfigError),
}

impl ExecutorError {
    /// Map this error to its stable [`ErrorCode`] for the command result
    /// envelope.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownCommand { .. } => ErrorCode::NotFound,
            Self::InvalidParams { .. } => ErrorCode::ValidationError,
            Self::Coded { code, .. } => *code,
            Self::Folder(ccbt_folder::FolderError::NotADirectory { .. }) => ErrorCode::ValidationError,
            Self::Folder(ccbt_folder::FolderError::Watcher(_)) => ErrorCode::IoError,
            Self::Folder(ccbt_folder::FolderError::Sync(_) | ccbt_folder::FolderError::Allowlist(_)) => ErrorCode::InternalError,
            Self::Session(ccbt_session::SessionError::UnknownFolder { .. }) => ErrorCode::NotFound,
            Self::Session(ccbt_session::SessionError::DuplicateFolder { .. }) => ErrorCode::Conflict,
            Self::Session(ccbt_session::SessionError::Folder(_)) => ErrorCode::InternalError,
            Self::Allowlist(ccbt_allowlist::AllowlistError::InvalidKeyLength { .. }) => ErrorCode::InvalidKeyLength,
            Self::Allowlist(_) => ErrorCode::IoError,
            Self::Tonic(ccbt_tonic::TonicError::InvalidPath { .. }) => ErrorCode::InvalidPath,
            Self::Tonic(ccbt_tonic::TonicError::InvalidField { .. }) => ErrorCode::InvalidField,
            Self::Tonic(_) => ErrorCode::ValidationError,
            Self::Config(_) => ErrorCode::InternalError,
        }
    }
}

/// Convenience alias for fallible executor operations.
pub type ExecutorResult<T> = Result<T, ExecutorError>;
