//! The `{error, code, details?}` envelope every non-2xx response uses
//! (spec.md §6), and the panic/error-wrap middleware that guarantees a
//! handler failure never takes the server down.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ccbt_executor::ErrorCode;
use serde::Serialize;
use thiserror::Error;

/// An IPC-boundary error response.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    status: StatusCode,
    error: String,
    code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl ApiError {
    /// Construct an error with an explicit status code, message, and
    /// stable [`ErrorCode`].
    #[must_use]
    pub fn new(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> Self {
        Self { status, error: message.into(), code: code.as_str().to_string(), details: None }
    }

    /// Attach structured details (e.g. validation failures).
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// `401 AUTH_REQUIRED`.
    #[must_use]
    pub fn auth_required(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, ErrorCode::AuthRequired, message)
    }

    /// `400 VALIDATION_ERROR`.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorCode::ValidationError, message)
    }

    /// `404 NOT_FOUND`.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, ErrorCode::NotFound, message)
    }

    /// `500 INTERNAL_ERROR`.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::InternalError, message)
    }

    /// Map a [`ccbt_executor::CommandResult`] that failed into the
    /// matching HTTP status for its stable code.
    #[must_use]
    pub fn from_command_failure(code_str: &str, message: &str) -> Self {
        let status = match code_str {
            "AUTH_REQUIRED" | "AUTH_ERROR" => StatusCode::UNAUTHORIZED,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "CONFLICT" => StatusCode::CONFLICT,
            "TIMEOUT" => StatusCode::REQUEST_TIMEOUT,
            "VALIDATION_ERROR" | "INVALID_FIELD" | "INVALID_PATH" | "INVALID_KEY_LENGTH" | "INVALID_JSON" => StatusCode::BAD_REQUEST,
            "UNAVAILABLE" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self { status, error: message.to_string(), code: code_str.to_string(), details: None }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        match serde_json::to_value(&self) {
            Ok(body) => (status, Json(body)).into_response(),
            Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response(),
        }
    }
}

/// Errors from binding, serving, or self-verifying the IPC listener
/// (spec.md §4.12 "startup verification"), distinct from [`ApiError`]
/// which is the per-request wire envelope.
#[derive(Debug, Error)]
pub enum ApiServerError {
    /// The listener could not be bound or accept failed fatally.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The background serve task panicked or was cancelled.
    #[error("server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    /// The self-verification HTTP probe could not complete.
    #[error("self-verification request failed: {0}")]
    Probe(#[from] reqwest::Error),
    /// Every self-verification attempt failed within the startup budget.
    #[error("failed to self-verify IPC listener after {attempts} attempt(s)")]
    SelfVerifyFailed {
        /// Number of attempts made before giving up.
        attempts: u32,
    },
}

/// Handler invoked by `CatchPanicLayer` when a route handler panics.
/// Per spec.md §4.12, an uncaught failure below the middleware MUST
/// produce a 500 and must never take the process down.
pub fn handle_panic(_err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    tracing::error!("panicked while handling a request");
    ApiError::internal("internal server error").into_response()
}
