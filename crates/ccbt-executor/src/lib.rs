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

//! Command executor and session adapter (component C11).
//!
//! [`Executor`] is the single dispatch point both the CLI and a remote
//! daemon client go through; it never raises, always returning a
//! [`CommandResult`]. [`SessionAdapter`] is the trait two variants
//! implement: [`LocalAdapter`] here (in-process), and `ccbt-client`'s
//! daemon adapter (over the IPC wire). No other path from UI code to
//! engine code is sanctioned (spec.md §9).

mod adapter;
mod error;
mod executor;
mod model;

pub use adapter::{LocalAdapter, SessionAdapter};
pub use error::{ErrorCode, ExecutorError, ExecutorResult};
pub use executor::Executor;
pub use model::{AddFolderArgs, CommandResult, ConfigView, CreateTonicArgs, CreateTonicResult, FolderKeyArgs};
