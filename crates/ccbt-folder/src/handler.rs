//! Default [`ccbt_sync::UpdateHandler`] wired in by [`crate::FolderManager`].

use std::sync::Arc;

use async_trait::async_trait;
use ccbt_git::GitAnchor;
use ccbt_sync::UpdateEntry;
use tokio::sync::RwLock;
use tracing::info;

/// Applies a committed update by logging it, refreshing the folder's
/// current git ref, and auto-committing if the folder manager was
/// configured to do so.
///
/// Grounded in spec.md §4.9: "On `sync()`: call `process_updates` with a
/// default handler that (a) logs the applied update, (b) refreshes the
/// current git ref into the sync manager, (c) runs `auto_commit_if_changes`
/// if auto-commit is enabled."
pub struct DefaultUpdateHandler {
    git: Option<Arc<GitAnchor>>,
    auto_commit: bool,
    current_git_ref: Arc<RwLock<Option<String>>>,
}

impl DefaultUpdateHandler {
    pub(crate) fn new(git: Option<Arc<GitAnchor>>, auto_commit: bool, current_git_ref: Arc<RwLock<Option<String>>>) -> Self {
        Self { git, auto_commit, current_git_ref }
    }
}

#[async_trait]
impl ccbt_sync::UpdateHandler for DefaultUpdateHandler {
    async fn apply(&self, entry: &UpdateEntry) -> Result<(), String> {
        info!(file_path = %entry.file_path, source_peer = ?entry.source_peer, "applying update");

        if let Some(git) = &self.git {
            let new_ref = if self.auto_commit {
                git.auto_commit_if_changes().await
            } else {
                git.current_commit().await
            };
            if new_ref.is_some() {
                *self.current_git_ref.write().await = new_ref;
            }
        }

        Ok(())
    }
}
