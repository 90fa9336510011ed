//! Configuration and status snapshots for a single synchronized folder.

use ccbt_tonic::SyncMode;
use serde::{Deserialize, Serialize};

/// Configuration used to construct a [`crate::FolderManager`].
#[derive(Debug, Clone)]
pub struct FolderConfig {
    /// Absolute path of the synchronized folder.
    pub path: std::path::PathBuf,
    /// Initial sync policy.
    pub sync_mode: SyncMode,
    /// Path to the encrypted allowlist file, if peer gating is enabled.
    pub allowlist_path: Option<std::path::PathBuf>,
    /// Whether to auto-commit changes to the folder's git repo, if any.
    pub auto_commit: bool,
    /// This node's own peer id, used for designated-source bookkeeping and
    /// the Byzantine consensus self-vote.
    pub self_peer_id: String,
    /// Consensus threshold used by the simple-majority fallback.
    pub consensus_threshold: f64,
    /// Poll interval for the folder watcher.
    pub watch_interval: std::time::Duration,
}

/// Structured status snapshot returned by `get_status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderStatus {
    /// Folder path, as a string for wire transport.
    pub path: String,
    /// Current sync policy.
    pub sync_mode: String,
    /// Number of updates currently queued.
    pub queue_depth: usize,
    /// Number of peers the sync manager is tracking.
    pub peer_count: usize,
    /// Average sync progress across tracked peers, in `[0, 1]`.
    pub average_sync_progress: f64,
    /// Current git ref, if the folder is a git repository.
    pub current_git_ref: Option<String>,
    /// Aggregate counters from the sync manager.
    pub updates_applied: u64,
    /// Updates dropped after exhausting retries.
    pub updates_failed: u64,
}
