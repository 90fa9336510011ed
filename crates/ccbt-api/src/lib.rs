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

//! Authenticated HTTP + WebSocket IPC surface (component C12).
//!
//! [`ApiServer`] mounts the fixed route surface spec.md §4.12 describes
//! under `/api/v1`, running every request through an authentication
//! middleware (Ed25519 signature, falling back to an API key) and a
//! panic-catching layer, and delegating every handler's business logic
//! to a shared [`ccbt_executor::Executor`]. `/api/v1/events` upgrades to
//! a filtered, rate-limited WebSocket event stream backed by
//! [`ccbt_events::EventBus`].

mod auth;
mod error;
mod routes;
mod server;
mod state;
mod ws;

pub use error::{ApiError, ApiServerError};
pub use server::ApiServer;
pub use state::ApiState;
