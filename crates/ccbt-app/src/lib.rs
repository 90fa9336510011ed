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

//! Daemon bootstrap wiring: loads the unified config, installs telemetry,
//! constructs the session manager and executor, and serves the IPC
//! listener until shutdown.

mod bootstrap;
mod error;
mod pidfile;

pub use bootstrap::run_app;
pub use error::{AppError, AppResult};
