//! Error types for telemetry initialisation and metrics collection.

use thiserror::Error;

/// Errors raised by telemetry helpers.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Installing the tracing subscriber failed (e.g. a subscriber was
    /// already installed globally).
    #[error("failed to install tracing subscriber")]
    SubscriberInstall(#[from] tracing_subscriber::util::TryInitError),
    /// Constructing or registering a Prometheus collector failed.
    #[error("failed to register metrics collector {name}")]
    MetricsRegister {
        /// Metric identifier tied to the failure.
        name: &'static str,
        /// Underlying Prometheus error.
        #[source]
        source: prometheus::Error,
    },
    /// Encoding the Prometheus text exposition format failed.
    #[error("failed to encode metrics")]
    MetricsEncode(#[source] prometheus::Error),
    /// The encoded metrics buffer was not valid UTF-8.
    #[error("metrics output was not valid utf-8")]
    MetricsUtf8(#[from] std::string::FromUtf8Error),
}

/// Result alias for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
