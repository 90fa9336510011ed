//! Request and snapshot types for the session manager.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use ccbt_tonic::SyncMode;
use serde::{Deserialize, Serialize};

/// Arguments to [`crate::SessionManager::add_folder`].
#[derive(Debug, Clone)]
pub struct AddFolderArgs {
    /// Absolute path of the folder to synchronize.
    pub path: PathBuf,
    /// Initial sync policy.
    pub sync_mode: SyncMode,
    /// Path to the encrypted allowlist file, if peer gating is enabled.
    pub allowlist_path: Option<PathBuf>,
    /// Whether to auto-commit changes to the folder's git repo, if any.
    pub auto_commit: bool,
    /// This node's own peer id.
    pub self_peer_id: String,
    /// Consensus threshold used by the simple-majority fallback.
    pub consensus_threshold: f64,
    /// Poll interval for the folder watcher.
    pub watch_interval: Duration,
    /// Info-hash to key this folder by, if known (e.g. joining an
    /// existing `.tonic`). Falls back to the canonicalized path otherwise.
    pub info_hash_hex: Option<String>,
}

/// Aggregate statistics across every registered folder, plus the
/// externally-provided torrent count when a [`TorrentRegistry`] is wired
/// in.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GlobalStats {
    /// Number of registered folders.
    pub folder_count: usize,
    /// Sum of each folder's queue depth.
    pub total_queue_depth: usize,
    /// Sum of each folder's applied-update counter.
    pub total_updates_applied: u64,
    /// Sum of each folder's failed-update counter.
    pub total_updates_failed: u64,
    /// Mean of each folder's average sync progress, in `[0, 1]`.
    pub average_sync_progress: f64,
    /// Number of torrents tracked by the externally-provided registry, if
    /// any (`0` when no registry is wired in; the torrent system itself is
    /// out of scope here).
    pub torrent_count: usize,
}

/// Trait the (externally provided) torrent engine's session registry
/// would implement. The torrent wire protocol and engine are out of
/// scope; this is the seam a future adapter plugs into, declared the way
/// an external engine trait is declared without being embedded.
#[async_trait]
pub trait TorrentRegistry: Send + Sync {
    /// Number of torrents currently tracked.
    async fn torrent_count(&self) -> usize;
}
