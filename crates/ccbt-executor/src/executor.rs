//! [`Executor`]: the single dispatch point every command boundary goes
//! through (spec.md §4.11, §9 "single executor indirection").

use std::sync::Arc;

use tracing::{instrument, warn};

use crate::adapter::SessionAdapter;
use crate::error::ErrorCode;
use crate::model::CommandResult;

/// Dispatches named commands to whichever [`SessionAdapter`] it was built
/// with (local or daemon), converting every outcome — success or failure
/// — into a [`CommandResult`] that never needs `?` at the call site.
pub struct Executor {
    adapter: Arc<dyn SessionAdapter>,
}

impl Executor {
    /// Construct an executor bound to `adapter`.
    #[must_use]
    pub fn new(adapter: Arc<dyn SessionAdapter>) -> Self {
        Self { adapter }
    }

    /// Run `command` with `params`, validating the boundary conventions
    /// spec.md §4.11 requires (lowercase 64-char hex `info_hash`) before
    /// handing off to the adapter.
    #[instrument(name = "executor.execute", skip(self, params), fields(command))]
    pub async fn execute(&self, command: &str, params: serde_json::Value) -> CommandResult {
        if let Err(reason) = validate_info_hash(&params) {
            return CommandResult::err(ErrorCode::ValidationError, reason);
        }

        match self.adapter.dispatch(command, params).await {
            Ok(data) => CommandResult::ok(data),
            Err(err) => {
                warn!(command, error = %err, "command failed");
                CommandResult::err(err.code(), err.to_string())
            }
        }
    }
}

/// `info_hash` parameters at the command boundary must be lowercase hex
/// strings of length 64 (spec.md §4.11). Absent is fine; present-but-wrong
/// is rejected before dispatch so every adapter can assume the invariant.
fn validate_info_hash(params: &serde_json::Value) -> Result<(), String> {
    let Some(value) = params.get("info_hash") else { return Ok(()) };
    let Some(hex) = value.as_str() else {
        return Err("info_hash must be a string".to_string());
    };
    if hex.len() != 64 || !hex.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()) {
        return Err("info_hash must be a 64-character lowercase hex string".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::error::{ExecutorError, ExecutorResult};

    struct EchoAdapter;

    #[async_trait]
    impl SessionAdapter for EchoAdapter {
        async fn dispatch(&self, command: &str, params: serde_json::Value) -> ExecutorResult<serde_json::Value> {
            match command {
                "echo" => Ok(params),
                "boom" => Err(ExecutorError::Coded { code: ErrorCode::InternalError, message: "boom".to_string() }),
                _ => Err(ExecutorError::UnknownCommand { name: command.to_string() }),
            }
        }
    }

    fn executor() -> Executor {
        Executor::new(Arc::new(EchoAdapter))
    }

    #[tokio::test]
    async fn successful_dispatch_is_wrapped_in_ok_result() {
        let result = executor().execute("echo", json!({"a": 1})).await;
        assert!(result.success);
        assert_eq!(result.data, Some(json!({"a": 1})));
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn adapter_error_never_escapes_as_a_raised_error() {
        let result = executor().execute("boom", json!({})).await;
        assert!(!result.success);
        assert_eq!(result.code.as_deref(), Some("INTERNAL_ERROR"));
    }

    #[tokio::test]
    async fn unknown_command_is_not_found() {
        let result = executor().execute("nope", json!({})).await;
        assert!(!result.success);
        assert_eq!(result.code.as_deref(), Some("NOT_FOUND"));
    }

    #[tokio::test]
    async fn malformed_info_hash_is_rejected_before_dispatch() {
        let result = executor().execute("echo", json!({"info_hash": "ABCDEF"})).await;
        assert!(!result.success);
        assert_eq!(result.code.as_deref(), Some("VALIDATION_ERROR"));
    }

    #[tokio::test]
    async fn well_formed_info_hash_passes_through() {
        let hash = "a".repeat(64);
        let result = executor().execute("echo", json!({"info_hash": hash})).await;
        assert!(result.success);
    }
}
