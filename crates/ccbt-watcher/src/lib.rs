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

//! Polling-based folder watcher: periodically re-walks a directory tree and
//! publishes created/modified/deleted events to a broadcast channel.

mod error;
mod model;
mod watcher;

pub use error::{WatcherError, WatcherResult};
pub use model::WatchEvent;
pub use watcher::FolderWatcher;
