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

//! Byzantine-threshold / weighted vote aggregator used by the `consensus`
//! sync policy when Raft is not configured.
//!
//! See [`ByzantineAggregator`] for the main entry point.

mod aggregator;
mod error;
mod model;

pub use aggregator::ByzantineAggregator;
pub use error::{ByzantineError, ByzantineResult};
pub use model::{Tally, Vote};
