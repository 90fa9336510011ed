//! Data model for queued updates, peer state, and aggregate statistics.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use ccbt_tonic::ChunkHash;
use serde::{Deserialize, Serialize};

/// A single queued per-chunk update awaiting application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateEntry {
    /// Folder-relative path the update applies to.
    pub file_path: String,
    /// Content hash of the chunk carrying the update.
    pub chunk_hash: ChunkHash,
    /// Git ref this update is anchored to, if any.
    pub git_ref: Option<String>,
    /// Unix timestamp (seconds) the update was enqueued.
    pub timestamp: i64,
    /// Priority; higher values are applied first.
    pub priority: i32,
    /// Peer that originated the update, if known.
    pub source_peer: Option<String>,
    /// Number of times this entry has been retried after handler failure.
    pub retry_count: u32,
    /// Maximum retries before the entry is dropped.
    pub max_retries: u32,
}

impl UpdateEntry {
    /// Construct a new entry with `retry_count = 0`.
    #[must_use]
    pub fn new(file_path: impl Into<String>, chunk_hash: ChunkHash, git_ref: Option<String>, timestamp: i64, priority: i32, source_peer: Option<String>, max_retries: u32) -> Self {
        Self {
            file_path: file_path.into(),
            chunk_hash,
            git_ref,
            timestamp,
            priority,
            source_peer,
            retry_count: 0,
            max_retries,
        }
    }

    /// Identifies this entry's `(file_path, chunk_hash)` pair, used to
    /// detect duplicate/conflicting queue entries.
    #[must_use]
    pub fn key(&self) -> (&str, ChunkHash) {
        (&self.file_path, self.chunk_hash)
    }
}

/// Per-peer synchronization state tracked by the sync manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerSyncState {
    /// Peer identifier.
    pub peer_id: String,
    /// Opaque peer info (address, display name, etc.), passed through.
    pub peer_info: serde_json::Value,
    /// Last time this peer successfully synced, if ever.
    pub last_sync_time: Option<i64>,
    /// The Git ref this peer last reported.
    pub current_git_ref: Option<String>,
    /// Chunk hashes this peer is known to have.
    pub chunk_hashes: HashSet<ChunkHash>,
    /// Whether this peer is the current designated source.
    pub is_source: bool,
    /// Sync progress in `[0, 1]`.
    pub sync_progress: f64,
    /// Last time any message was received from this peer (Unix seconds).
    pub last_contact: i64,
}

impl PeerSyncState {
    /// Construct a fresh state record for a peer first seen at `now`.
    #[must_use]
    pub fn new(peer_id: impl Into<String>, now: i64) -> Self {
        Self {
            peer_id: peer_id.into(),
            peer_info: serde_json::Value::Null,
            last_sync_time: None,
            current_git_ref: None,
            chunk_hashes: HashSet::new(),
            is_source: false,
            sync_progress: 0.0,
            last_contact: now,
        }
    }
}

/// Aggregate counters exposed via `get_status`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SyncStats {
    /// Updates successfully applied.
    pub updates_applied: u64,
    /// Updates skipped (not eligible under the active policy).
    pub updates_skipped: u64,
    /// Updates dropped after exhausting `max_retries`.
    pub updates_failed: u64,
    /// Updates dropped because the queue was full at enqueue time.
    pub updates_dropped_queue_full: u64,
}

/// Persisted sync-manager state, written to
/// `<folder>/.xet/consensus_state.json` on stop and restored on start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedSyncState {
    /// Active sync mode at the time of persistence.
    pub sync_mode: String,
    /// Consensus threshold used by the simple-ratio fallback.
    pub consensus_threshold: f64,
    /// Outstanding per-chunk votes, hex-encoded chunk hash to peer votes.
    pub consensus_votes: HashMap<String, HashMap<String, bool>>,
}

/// Resolves a conflict between two queued updates to the same file,
/// returning the version that should be applied; the other is discarded.
///
/// Supplied externally by the folder manager (spec.md §4.8, `best_effort`).
#[async_trait]
pub trait ConflictResolver: Send + Sync {
    /// Pick the winner between two conflicting updates to the same file.
    async fn resolve(&self, a: UpdateEntry, b: UpdateEntry) -> UpdateEntry;
}

/// Applies a single update to local state; the sole side-effecting hook
/// the policy engine invokes. Supplied by the folder manager.
#[async_trait]
pub trait UpdateHandler: Send + Sync {
    /// Apply `entry`. An `Err` triggers the policy's retry logic.
    async fn apply(&self, entry: &UpdateEntry) -> Result<(), String>;
}

/// A [`ConflictResolver`] that always keeps the higher-priority update,
/// breaking ties by the later timestamp. Used when the folder manager
/// does not supply its own resolver.
pub struct LatestWinsResolver;

#[async_trait]
impl ConflictResolver for LatestWinsResolver {
    async fn resolve(&self, a: UpdateEntry, b: UpdateEntry) -> UpdateEntry {
        if (b.priority, b.timestamp) > (a.priority, a.timestamp) {
            b
        } else {
            a
        }
    }
}
