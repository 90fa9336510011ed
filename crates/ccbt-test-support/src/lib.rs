#![forbid(unsafe_code)]
#![deny(warnings, dead_code, unused, unused_imports, unreachable_pub, clippy::all)]

//! Fixtures shared across `ccbt-*` test suites: scratch folders on disk,
//! a manually-advanced clock, and an in-process Raft transport for
//! simulated multi-node clusters. Not published; `dev-dependency` only.

mod clock;
mod folder;
mod raft_cluster;

pub use clock::TestClock;
pub use folder::FixtureFolder;
pub use raft_cluster::InMemoryTransport;
