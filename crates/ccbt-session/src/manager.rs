//! [`SessionManager`]: keyed registry of [`FolderManager`]s, per spec.md
//! §4.10.

use std::collections::HashMap;
use std::sync::Arc;

use ccbt_events::{Event, EventBus, EventType};
use ccbt_folder::{FolderConfig, FolderManager, FolderStatus};
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{info, instrument};

use crate::error::{SessionError, SessionResult};
use crate::model::{AddFolderArgs, GlobalStats, TorrentRegistry};

/// Owns every [`FolderManager`] the daemon is currently synchronizing,
/// keyed by folder_key (an info-hash hex string, or the folder's
/// canonicalized absolute path when no info-hash is known).
pub struct SessionManager {
    folders: RwLock<HashMap<String, Arc<FolderManager>>>,
    events: Option<Arc<EventBus>>,
    torrents: Option<Arc<dyn TorrentRegistry>>,
}

impl SessionManager {
    /// Construct an empty session manager, optionally wired to an event
    /// bus and an externally-provided torrent registry.
    #[must_use]
    pub fn new(events: Option<Arc<EventBus>>, torrents: Option<Arc<dyn TorrentRegistry>>) -> Self {
        Self { folders: RwLock::new(HashMap::new()), events, torrents }
    }

    fn publish(&self, event_type: EventType, folder_key: &str, data: serde_json::Value) {
        if let Some(events) = &self.events {
            events.publish(Event::new(event_type, Some(folder_key.to_string()), data));
        }
    }

    /// Register and start a new synchronized folder, returning its key.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::DuplicateFolder`] if the computed key is
    /// already registered, or propagates a [`ccbt_folder::FolderError`]
    /// from construction or startup.
    #[instrument(name = "session.add_folder", skip(self, args), fields(path = %args.path.display()))]
    pub async fn add_folder(&self, args: AddFolderArgs) -> SessionResult<String> {
        let key = args.info_hash_hex.clone().unwrap_or_else(|| {
            args.path.canonicalize().unwrap_or_else(|_| args.path.clone()).display().to_string()
        });

        let mut folders = self.folders.write().await;
        if folders.contains_key(&key) {
            return Err(SessionError::DuplicateFolder { key });
        }

        let config = FolderConfig {
            path: args.path,
            sync_mode: args.sync_mode,
            allowlist_path: args.allowlist_path,
            auto_commit: args.auto_commit,
            self_peer_id: args.self_peer_id,
            consensus_threshold: args.consensus_threshold,
            watch_interval: args.watch_interval,
        };
        let manager = Arc::new(FolderManager::new(config)?);
        manager.start().await?;

        folders.insert(key.clone(), Arc::clone(&manager));
        drop(folders);

        info!(folder_key = %key, "folder registered");
        self.publish(EventType::TorrentAdded, &key, json!({ "folder_key": key, "path": manager.path().display().to_string() }));
        Ok(key)
    }

    /// Stop and unregister a folder.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownFolder`] if `key` is not registered.
    #[instrument(name = "session.remove_folder", skip(self))]
    pub async fn remove_folder(&self, key: &str) -> SessionResult<()> {
        let manager = self.folders.write().await.remove(key).ok_or_else(|| SessionError::UnknownFolder { key: key.to_string() })?;
        manager.stop().await?;
        self.publish(EventType::TorrentRemoved, key, json!({ "folder_key": key }));
        Ok(())
    }

    /// List every registered folder's key.
    pub async fn list_folders(&self) -> Vec<String> {
        self.folders.read().await.keys().cloned().collect()
    }

    /// Fetch a single folder's status snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownFolder`] if `key` is not registered.
    pub async fn get_folder_status(&self, key: &str) -> SessionResult<FolderStatus> {
        let manager = self.folder(key).await?;
        Ok(manager.get_status().await)
    }

    /// Process one sync pass for a single folder, publishing a
    /// folder-update event if any entries were applied.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownFolder`] if `key` is not registered,
    /// or propagates the underlying sync error.
    pub async fn sync_folder(&self, key: &str) -> SessionResult<usize> {
        let manager = self.folder(key).await?;
        let applied = manager.sync().await?;
        if applied > 0 {
            self.publish(EventType::FolderUpdateApplied, key, json!({ "folder_key": key, "applied": applied }));
        }
        Ok(applied)
    }

    /// Look up a registered folder manager by key, cloning the `Arc`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownFolder`] if `key` is not registered.
    pub async fn folder(&self, key: &str) -> SessionResult<Arc<FolderManager>> {
        self.folders.read().await.get(key).cloned().ok_or_else(|| SessionError::UnknownFolder { key: key.to_string() })
    }

    /// Aggregate statistics across every registered folder.
    pub async fn get_global_stats(&self) -> GlobalStats {
        let folders = self.folders.read().await;
        let mut stats = GlobalStats { folder_count: folders.len(), ..GlobalStats::default() };

        let mut progress_sum = 0.0;
        for manager in folders.values() {
            let status = manager.get_status().await;
            stats.total_queue_depth += status.queue_depth;
            stats.total_updates_applied += status.updates_applied;
            stats.total_updates_failed += status.updates_failed;
            progress_sum += status.average_sync_progress;
        }
        if !folders.is_empty() {
            stats.average_sync_progress = progress_sum / folders.len() as f64;
        }
        drop(folders);

        if let Some(torrents) = &self.torrents {
            stats.torrent_count = torrents.torrent_count().await;
        }
        stats
    }

    /// Stop every registered folder, e.g. on daemon shutdown.
    ///
    /// # Errors
    ///
    /// Propagates the first error encountered stopping any folder; all
    /// folders are attempted regardless.
    pub async fn shutdown(&self) -> SessionResult<()> {
        let mut folders = self.folders.write().await;
        let mut first_error = None;
        for (key, manager) in folders.drain() {
            if let Err(err) = manager.stop().await {
                tracing::warn!(folder_key = %key, error = %err, "failed to stop folder cleanly");
                first_error.get_or_insert(SessionError::from(err));
            }
        }
        drop(folders);
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccbt_tonic::SyncMode;
    use std::time::Duration;

    fn args(path: std::path::PathBuf) -> AddFolderArgs {
        AddFolderArgs {
            path,
            sync_mode: SyncMode::BestEffort,
            allowlist_path: None,
            auto_commit: false,
            self_peer_id: "local".to_string(),
            consensus_threshold: 0.5,
            watch_interval: Duration::from_millis(30),
            info_hash_hex: None,
        }
    }

    #[tokio::test]
    async fn add_list_and_remove_folder() {
        let dir = tempfile::tempdir().unwrap();
        let session = SessionManager::new(None, None);

        let key = session.add_folder(args(dir.path().to_path_buf())).await.unwrap();
        assert_eq!(session.list_folders().await, vec![key.clone()]);

        let status = session.get_folder_status(&key).await.unwrap();
        assert_eq!(status.queue_depth, 0);

        session.remove_folder(&key).await.unwrap();
        assert!(session.list_folders().await.is_empty());
    }

    #[tokio::test]
    async fn add_folder_rejects_duplicate_key() {
        let dir = tempfile::tempdir().unwrap();
        let session = SessionManager::new(None, None);
        session.add_folder(args(dir.path().to_path_buf())).await.unwrap();

        let err = session.add_folder(args(dir.path().to_path_buf())).await.unwrap_err();
        assert!(matches!(err, SessionError::DuplicateFolder { .. }));
    }

    #[tokio::test]
    async fn get_global_stats_aggregates_across_folders() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        let session = SessionManager::new(None, None);
        session.add_folder(args(dir_a.path().to_path_buf())).await.unwrap();
        session.add_folder(args(dir_b.path().to_path_buf())).await.unwrap();

        let stats = session.get_global_stats().await;
        assert_eq!(stats.folder_count, 2);
        assert_eq!(stats.torrent_count, 0);
    }

    #[tokio::test]
    async fn unknown_folder_key_errors() {
        let session = SessionManager::new(None, None);
        assert!(matches!(session.get_folder_status("missing").await, Err(SessionError::UnknownFolder { .. })));
        assert!(matches!(session.remove_folder("missing").await, Err(SessionError::UnknownFolder { .. })));
    }
}
