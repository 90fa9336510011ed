//! Tracing subscriber initialisation.
//!
//! Centralises logging setup (fmt or JSON) behind a single entry point so
//! the daemon, the CLI, and tests all install the same shape of
//! subscriber.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::TelemetryResult;
use crate::log_stream::log_stream_writer;

/// Default logging target when `RUST_LOG` is not set.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Output format for the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Emit logs as structured JSON objects (the daemon's default).
    Json,
    /// Emit human-readable, pretty-printed logs (the CLI's default).
    Pretty,
}

impl LogFormat {
    /// Choose a sensible default for the current build profile.
    #[must_use]
    pub const fn infer() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

/// Logging configuration passed to [`init_logging`].
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level string (e.g. `info`, `debug`), used when `RUST_LOG` is
    /// not set.
    pub level: String,
    /// Output format selection.
    pub format: LogFormat,
    /// Whether log lines are also broadcast on the in-memory log stream
    /// the IPC server exposes for diagnostics.
    pub stream_logs: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: DEFAULT_LOG_LEVEL.to_string(), format: LogFormat::infer(), stream_logs: true }
    }
}

/// Install the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if a subscriber has already been installed globally.
pub fn init_logging(config: &LoggingConfig) -> TelemetryResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    if config.stream_logs {
        let writer = log_stream_writer();
        match config.format {
            LogFormat::Json => tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_target(false).with_thread_ids(false).with_writer(writer))
                .try_init()?,
            LogFormat::Pretty => tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(false).with_thread_ids(false).with_writer(writer))
                .try_init()?,
        }
    } else {
        match config.format {
            LogFormat::Json => tracing_subscriber::registry().with(filter).with(fmt::layer().json().with_target(false).with_thread_ids(false)).try_init()?,
            LogFormat::Pretty => tracing_subscriber::registry().with(filter).with(fmt::layer().with_target(false).with_thread_ids(false)).try_init()?,
        }
    }

    Ok(())
}
