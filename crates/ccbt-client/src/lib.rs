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

//! Typed IPC client (component C13): the counterpart of the `ccbt-api`
//! HTTP/WebSocket surface, used by the CLI and any future TUI.
//!
//! [`IpcClient`] owns daemon discovery, a lazily (re)built HTTP
//! connection pool safe to use across Tokio runtimes, and the
//! readiness probe; [`DaemonAdapter`] wraps it to implement
//! `ccbt_executor::SessionAdapter` so callers dispatch through the exact
//! same [`ccbt_executor::Executor`] a daemon-embedded caller would use.

mod adapter;
mod client;
mod discover;
mod error;
mod pid;

pub use adapter::DaemonAdapter;
pub use client::IpcClient;
pub use discover::{discover_addr, discover_port};
pub use error::{ClientError, ClientResult};
pub use pid::{get_daemon_pid, pid_file_path};
