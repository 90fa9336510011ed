//! Application-level error type for the daemon boot sequence.

use thiserror::Error;

/// Result alias for daemon bootstrap operations.
pub type AppResult<T> = Result<T, AppError>;

/// Errors that can abort daemon startup.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be resolved.
    #[error("configuration operation failed: {operation}")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        #[source]
        source: ccbt_config::ConfigError,
    },
    /// Telemetry initialization failed.
    #[error("telemetry operation failed: {operation}")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        #[source]
        source: ccbt_telemetry::TelemetryError,
    },
    /// The IPC server failed to start or run.
    #[error("api server operation failed: {operation}")]
    ApiServer {
        /// Operation identifier.
        operation: &'static str,
        /// Source API server error.
        #[source]
        source: ccbt_api::ApiServerError,
    },
    /// Writing or reading the PID file failed.
    #[error("pid file operation failed: {operation}")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Source IO error.
        #[source]
        source: std::io::Error,
    },
    /// A configured value was out of range.
    #[error("invalid configuration: {field} ({reason})")]
    InvalidConfig {
        /// Field name that failed validation.
        field: &'static str,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
}

impl AppError {
    pub(crate) const fn config(operation: &'static str, source: ccbt_config::ConfigError) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(operation: &'static str, source: ccbt_telemetry::TelemetryError) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn api_server(operation: &'static str, source: ccbt_api::ApiServerError) -> Self {
        Self::ApiServer { operation, source }
    }

    pub(crate) const fn io(operation: &'static str, source: std::io::Error) -> Self {
        Self::Io { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_error_helpers_build_variants() {
        let config = AppError::config("load", ccbt_config::ConfigError::NoHomeDirectory);
        assert!(matches!(config, AppError::Config { .. }));

        let api = AppError::api_server("serve", ccbt_api::ApiServerError::SelfVerifyFailed { attempts: 10 });
        assert!(matches!(api, AppError::ApiServer { .. }));
    }
}
