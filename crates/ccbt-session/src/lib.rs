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

//! Session manager (component C10): keyed registry of synchronized
//! folders, plus the externally-provided torrent registry.
//!
//! See [`SessionManager`] for the main entry point.

mod error;
mod manager;
mod model;

pub use error::{SessionError, SessionResult};
pub use manager::SessionManager;
pub use model::{AddFolderArgs, GlobalStats, TorrentRegistry};
