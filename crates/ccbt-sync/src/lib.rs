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
#![allow(clippy::module_name_repetitions, clippy::too_many_arguments)]

//! Per-folder update queue and policy-driven commit pipeline (component C8).
//!
//! See [`SyncManager`] for the main entry point. Four sync policies are
//! implemented: `designated`, `best_effort`, `broadcast`, and `consensus`
//! (the latter routed through either a Raft node, a Byzantine aggregator,
//! or a simple-majority fallback used for tests).

mod election;
mod error;
mod manager;
mod model;
mod persistence;
mod queue;

pub use election::{elect_source, score_peer, DEFAULT_SOURCE_ELECTION_INTERVAL_SECS};
pub use error::{SyncError, SyncResult};
pub use manager::{SyncManager, CONSENSUS_TIMEOUT, DEFAULT_MAX_QUEUE_SIZE, DEFAULT_MAX_RETRIES, NON_CONSENSUS_TIMEOUT};
pub use model::{ConflictResolver, LatestWinsResolver, PeerSyncState, PersistedSyncState, SyncStats, UpdateEntry, UpdateHandler};
pub use queue::UpdateQueue;
