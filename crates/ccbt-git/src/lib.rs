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

//! Git commit anchoring for synchronized folders: current-commit tracking,
//! diffing, change detection, and optional auto-commit, all driven through
//! the `git` executable as a subprocess.

mod anchor;
mod error;

pub use anchor::{GitAnchor, RepoInfo};
pub use error::{GitError, GitResult};
