//! [`FolderManager`]: binds the allowlist, git anchor, watcher, and sync
//! manager owned by a single synchronized folder (spec.md §4.9).

use std::sync::Arc;

use ccbt_allowlist::AllowlistStore;
use ccbt_git::GitAnchor;
use ccbt_sync::{LatestWinsResolver, SyncManager};
use ccbt_tonic::{ChunkHash, SyncMode};
use ccbt_watcher::{FolderWatcher, WatchEvent};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{instrument, warn};

use crate::error::{FolderError, FolderResult};
use crate::handler::DefaultUpdateHandler;
use crate::model::{FolderConfig, FolderStatus};

/// Owns exactly one [`SyncManager`], one [`FolderWatcher`], and
/// (optionally) one [`AllowlistStore`] and [`GitAnchor`], per spec.md §3.
pub struct FolderManager {
    config: FolderConfig,
    allowlist: Option<Arc<AllowlistStore>>,
    git: Option<Arc<GitAnchor>>,
    watcher: Arc<FolderWatcher>,
    sync: Arc<SyncManager>,
    current_git_ref: Arc<RwLock<Option<String>>>,
    watch_task: RwLock<Option<JoinHandle<()>>>,
}

impl FolderManager {
    /// Construct a manager for `config`. Does not touch the filesystem or
    /// start any background task; call [`Self::start`] for that.
    #[must_use]
    pub fn new(config: FolderConfig) -> FolderResult<Self> {
        if !config.path.is_dir() {
            return Err(FolderError::NotADirectory { path: config.path.display().to_string() });
        }

        let allowlist = config.allowlist_path.as_ref().map(|path| Arc::new(AllowlistStore::new(path.clone())));
        let git = Some(Arc::new(GitAnchor::new(config.path.clone(), config.auto_commit)));
        let watcher = FolderWatcher::with_poll_interval(&config.path, config.watch_interval);
        let sync = Arc::new(SyncManager::new(config.path.clone(), config.sync_mode, config.consensus_threshold, config.self_peer_id.clone()));

        Ok(Self {
            config,
            allowlist,
            git,
            watcher,
            sync,
            current_git_ref: Arc::new(RwLock::new(None)),
            watch_task: RwLock::new(None),
        })
    }

    /// The folder's sync manager, for callers that need direct access
    /// (e.g. to wire a Raft node or Byzantine aggregator before starting).
    #[must_use]
    pub fn sync_manager(&self) -> &Arc<SyncManager> {
        &self.sync
    }

    /// The folder's path.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.config.path
    }

    /// Load the allowlist (if configured), start the watcher, and begin
    /// translating file-system events into queued updates.
    ///
    /// # Errors
    ///
    /// Returns an error if the allowlist fails to load or the watcher
    /// fails to take its initial snapshot.
    #[instrument(name = "folder.start", skip(self), fields(path = %self.config.path.display()))]
    pub async fn start(&self) -> FolderResult<()> {
        if let Some(allowlist) = &self.allowlist {
            allowlist.load().await?;
        }

        self.sync
            .set_handler(
                Arc::new(DefaultUpdateHandler::new(self.git.clone(), self.config.auto_commit, Arc::clone(&self.current_git_ref))),
                Arc::new(LatestWinsResolver),
            )
            .await;

        if let Some(git) = &self.git {
            *self.current_git_ref.write().await = git.current_commit().await;
        }

        let mut events = self.watcher.subscribe();
        self.watcher.start().await?;

        let sync = Arc::clone(&self.sync);
        let root = self.config.path.clone();
        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => Self::handle_watch_event(&sync, &root, event).await,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        *self.watch_task.write().await = Some(handle);

        Ok(())
    }

    async fn handle_watch_event(sync: &Arc<SyncManager>, root: &std::path::Path, event: WatchEvent) {
        let (relative_path, priority) = match &event {
            WatchEvent::Created(p) => (p.clone(), 1),
            WatchEvent::Modified(p) => (p.clone(), 0),
            WatchEvent::Deleted(_) => return,
        };

        let absolute = root.join(&relative_path);
        let contents = match tokio::fs::read(&absolute).await {
            Ok(contents) => contents,
            Err(err) => {
                warn!(path = %relative_path.display(), error = %err, "failed to read changed file, skipping");
                return;
            }
        };

        let chunk_hash: ChunkHash = Sha256::digest(&contents).into();
        let file_path = relative_path.to_string_lossy().into_owned();
        sync.queue_update(file_path, chunk_hash, None, priority, None).await;
    }

    /// Process the queue once under the active policy.
    ///
    /// # Errors
    ///
    /// Propagates errors from the underlying sync manager (e.g. a
    /// consensus round that timed out).
    pub async fn sync(&self) -> FolderResult<usize> {
        Ok(self.sync.process_updates().await?)
    }

    /// Change the active sync policy.
    pub async fn set_sync_mode(&self, mode: SyncMode) {
        self.sync.set_sync_mode(mode).await;
    }

    /// Snapshot the folder's current status for IPC surfacing.
    pub async fn get_status(&self) -> FolderStatus {
        let stats = self.sync.stats().await;
        let peers = self.sync.peer_states().await;
        let average_sync_progress = if peers.is_empty() {
            0.0
        } else {
            peers.iter().map(|p| p.sync_progress).sum::<f64>() / peers.len() as f64
        };

        FolderStatus {
            path: self.config.path.display().to_string(),
            sync_mode: self.sync.sync_mode().await.as_str().to_string(),
            queue_depth: self.sync.queue_depth().await,
            peer_count: peers.len(),
            average_sync_progress,
            current_git_ref: self.current_git_ref.read().await.clone(),
            updates_applied: stats.updates_applied,
            updates_failed: stats.updates_failed,
        }
    }

    /// Stop the watcher and sync manager, persisting consensus state.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting the sync manager's state fails.
    pub async fn stop(&self) -> FolderResult<()> {
        if let Some(handle) = self.watch_task.write().await.take() {
            handle.abort();
        }
        self.watcher.stop().await;
        self.sync.stop().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(path: std::path::PathBuf) -> FolderConfig {
        FolderConfig {
            path,
            sync_mode: SyncMode::BestEffort,
            allowlist_path: None,
            auto_commit: false,
            self_peer_id: "local".to_string(),
            consensus_threshold: 0.5,
            watch_interval: Duration::from_millis(30),
        }
    }

    #[tokio::test]
    async fn new_rejects_missing_directory() {
        let config = config(std::path::PathBuf::from("/does/not/exist/ccbt-folder-test"));
        assert!(matches!(FolderManager::new(config), Err(FolderError::NotADirectory { .. })));
    }

    #[tokio::test]
    async fn detects_new_file_and_syncs_it() {
        let dir = tempfile::tempdir().unwrap();
        let manager = FolderManager::new(config(dir.path().to_path_buf())).unwrap();
        manager.start().await.unwrap();

        tokio::fs::write(dir.path().join("a.txt"), b"hello").await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(manager.sync().await.unwrap(), 1);
        let status = manager.get_status().await;
        assert_eq!(status.updates_applied, 1);
        assert_eq!(status.queue_depth, 0);

        manager.stop().await.unwrap();
    }

    #[tokio::test]
    async fn get_status_reports_empty_folder() {
        let dir = tempfile::tempdir().unwrap();
        let manager = FolderManager::new(config(dir.path().to_path_buf())).unwrap();
        manager.start().await.unwrap();

        let status = manager.get_status().await;
        assert_eq!(status.queue_depth, 0);
        assert_eq!(status.peer_count, 0);
        assert!((status.average_sync_progress - 0.0).abs() < f64::EPSILON);

        manager.stop().await.unwrap();
    }
}
