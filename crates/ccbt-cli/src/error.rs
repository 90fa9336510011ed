//! CLI-local error type and the exit-code mapping spec.md §6 fixes:
//! `0` success, `1` user error, `2` daemon unreachable, `3` internal error.

use std::fmt;

/// What went wrong while running one CLI invocation.
#[derive(Debug)]
pub enum CliError {
    /// No daemon answered the readiness probe at the discovered address.
    DaemonUnreachable {
        /// The address the probe targeted.
        addr: String,
    },
    /// The daemon rejected the request as the caller's fault: a bad
    /// argument, a missing resource, a conflict, or failed credentials.
    UserError {
        /// Stable error code from the command envelope.
        code: String,
        /// Human-readable message from the command envelope.
        message: String,
    },
    /// Everything else: I/O, timeouts, consensus failures, or an
    /// unclassified internal error.
    Internal(anyhow::Error),
}

pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Map to the process exit code spec.md §6 defines.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::DaemonUnreachable { .. } => 2,
            Self::UserError { .. } => 1,
            Self::Internal(_) => 3,
        }
    }

    /// Classify a command-envelope failure by its stable error code.
    #[must_use]
    pub fn from_command_failure(code: Option<String>, message: Option<String>) -> Self {
        let code = code.unwrap_or_else(|| "INTERNAL_ERROR".to_string());
        let message = message.unwrap_or_else(|| "command failed".to_string());
        match code.as_str() {
            "VALIDATION_ERROR" | "INVALID_FIELD" | "INVALID_PATH" | "INVALID_KEY_LENGTH" | "NOT_FOUND" | "CONFLICT" | "AUTH_REQUIRED" | "AUTH_ERROR" => {
                Self::UserError { code, message }
            }
            _ => Self::Internal(anyhow::anyhow!("{message} ({code})")),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DaemonUnreachable { addr } => write!(f, "no daemon is running at {addr} — start the daemon first"),
            Self::UserError { code, message } => write!(f, "{message} ({code})"),
            Self::Internal(err) => write!(f, "{err:#}"),
        }
    }
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}
