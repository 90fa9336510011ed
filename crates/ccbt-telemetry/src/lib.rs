#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unreachable_pub,
    clippy::all,
    rustdoc::broken_intra_doc_links
)]
#![allow(clippy::module_name_repetitions)]

//! Logging, metrics, and log-stream primitives shared across the ccbt
//! workspace.
//!
//! Layout: `init.rs` (tracing subscriber setup), `metrics.rs` (Prometheus
//! registry), `log_stream.rs` (live log broadcasting for diagnostics).

mod error;
mod init;
mod log_stream;
mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use init::{init_logging, LogFormat, LoggingConfig, DEFAULT_LOG_LEVEL};
pub use log_stream::log_stream_receiver;
pub use metrics::{Metrics, MetricsSnapshot};
