//! The [`SessionAdapter`] trait and its in-process implementation.
//!
//! Two variants implement this one trait (spec.md §4.11): [`LocalAdapter`]
//! here, routing directly to an in-process [`ccbt_session::SessionManager`],
//! and `ccbt-client`'s daemon adapter, routing the same command names
//! through the IPC client. [`crate::Executor`] is generic over the trait so
//! the CLI and TUI never fork behavior between the two.

use std::sync::Arc;

use async_trait::async_trait;
use ccbt_session::SessionManager;
use serde_json::json;
use walkdir::WalkDir;

use crate::error::{ErrorCode, ExecutorError, ExecutorResult};
use crate::model::{AddFolderArgs, ConfigView, CreateTonicArgs, CreateTonicResult, FolderKeyArgs};

/// Dispatches a single named command to wherever it is actually handled.
///
/// Implementations MUST NOT raise; every failure is an `Err(ExecutorError)`
/// that [`crate::Executor::execute`] folds into a `CommandResult`.
#[async_trait]
pub trait SessionAdapter: Send + Sync {
    /// Run `command` with the given input record, returning its declared
    /// output record as JSON.
    async fn dispatch(&self, command: &str, params: serde_json::Value) -> ExecutorResult<serde_json::Value>;
}

/// Routes every command directly to an in-process [`SessionManager`] (and
/// the config layer, for `config.*`). This is what the daemon itself uses;
/// [`super::Executor`] wraps it the same way it would wrap a daemon
/// adapter, so daemon-side handlers exercise the identical dispatch path
/// as a remote CLI invocation.
pub struct LocalAdapter {
    session: Arc<SessionManager>,
    config_path: std::path::PathBuf,
}

impl LocalAdapter {
    /// Construct an adapter bound to `session`, reading/writing config at
    /// `config_path`.
    #[must_use]
    pub fn new(session: Arc<SessionManager>, config_path: std::path::PathBuf) -> Self {
        Self { session, config_path }
    }

    async fn create_tonic(&self, params: serde_json::Value) -> ExecutorResult<serde_json::Value> {
        let args: CreateTonicArgs = serde_json::from_value(params).map_err(|err| ExecutorError::InvalidParams { command: "xet.create_tonic".to_string(), reason: err.to_string() })?;
        let sync_mode = args.parsed_sync_mode()?;

        let root = std::path::PathBuf::from(&args.folder_path);
        let files = scan_folder(&root)?;

        let options = ccbt_tonic::tonic::CreateOptions { announce: args.announce.clone(), ..Default::default() };
        let metadata = ccbt_tonic::tonic::create(args.folder_name.clone(), files, sync_mode, options)?;
        let info_hash = ccbt_tonic::tonic::info_hash(&metadata);
        let info_hash_hex = data_encoding::HEXLOWER.encode(&info_hash);

        if let Some(output_path) = &args.output_path {
            let bytes = ccbt_tonic::tonic::encode(&metadata);
            tokio::fs::write(output_path, bytes).await.map_err(|source| ExecutorError::Coded { code: ErrorCode::IoError, message: format!("failed to write .tonic to {output_path}: {source}") })?;
        }

        let link = if args.generate_link {
            let mut link = ccbt_tonic::TonicLink::new(info_hash);
            link.display_name = Some(args.folder_name);
            link.mode = Some(sync_mode);
            if let Some(announce) = args.announce {
                link.trackers.push(announce);
            }
            Some(link.to_uri())
        } else {
            None
        };

        let result = CreateTonicResult { info_hash: info_hash_hex, total_length: metadata.info.total_length, file_count: metadata.info.files.len(), link };
        Ok(serde_json::to_value(result).expect("CreateTonicResult always serializes"))
    }

    async fn add_folder(&self, params: serde_json::Value) -> ExecutorResult<serde_json::Value> {
        let args: AddFolderArgs = serde_json::from_value(params).map_err(|err| ExecutorError::InvalidParams { command: "xet.add_folder".to_string(), reason: err.to_string() })?;
        let session_args = args.into_session_args()?;
        let key = self.session.add_folder(session_args).await?;
        Ok(json!({ "folder_key": key }))
    }

    async fn remove_folder(&self, params: serde_json::Value) -> ExecutorResult<serde_json::Value> {
        let args: FolderKeyArgs = serde_json::from_value(params).map_err(|err| ExecutorError::InvalidParams { command: "xet.remove_folder".to_string(), reason: err.to_string() })?;
        self.session.remove_folder(&args.folder_key).await?;
        Ok(json!({ "removed": true }))
    }

    async fn list_folders(&self) -> ExecutorResult<serde_json::Value> {
        Ok(json!({ "folders": self.session.list_folders().await }))
    }

    async fn folder_status(&self, params: serde_json::Value) -> ExecutorResult<serde_json::Value> {
        let args: FolderKeyArgs = serde_json::from_value(params).map_err(|err| ExecutorError::InvalidParams { command: "xet.folder_status".to_string(), reason: err.to_string() })?;
        let status = self.session.get_folder_status(&args.folder_key).await?;
        Ok(serde_json::to_value(status).expect("FolderStatus always serializes"))
    }

    async fn sync_folder(&self, params: serde_json::Value) -> ExecutorResult<serde_json::Value> {
        let args: FolderKeyArgs = serde_json::from_value(params).map_err(|err| ExecutorError::InvalidParams { command: "xet.sync".to_string(), reason: err.to_string() })?;
        let applied = self.session.sync_folder(&args.folder_key).await?;
        Ok(json!({ "applied": applied }))
    }

    async fn session_stats(&self) -> ExecutorResult<serde_json::Value> {
        let stats = self.session.get_global_stats().await;
        Ok(serde_json::to_value(stats).expect("GlobalStats always serializes"))
    }

    async fn config_get(&self) -> ExecutorResult<serde_json::Value> {
        let config = ccbt_config::load(&self.config_path)?;
        Ok(serde_json::to_value(ConfigView::from(&config)).expect("ConfigView always serializes"))
    }

    async fn config_update(&self, params: serde_json::Value) -> ExecutorResult<serde_json::Value> {
        let mut config = ccbt_config::load(&self.config_path)?;
        if let Some(port) = params.get("ipc_port").and_then(serde_json::Value::as_u64) {
            config.ipc_port = u16::try_from(port).map_err(|_| ExecutorError::InvalidParams { command: "config.update".to_string(), reason: "ipc_port out of range".to_string() })?;
        }
        if let Some(enabled) = params.get("tls_enabled").and_then(serde_json::Value::as_bool) {
            config.tls_enabled = enabled;
        }
        config.validate()?;
        ccbt_config::save(&self.config_path, &config)?;
        Ok(serde_json::to_value(ConfigView::from(&config)).expect("ConfigView always serializes"))
    }
}

#[async_trait]
impl SessionAdapter for LocalAdapter {
    async fn dispatch(&self, command: &str, params: serde_json::Value) -> ExecutorResult<serde_json::Value> {
        match command {
            "xet.create_tonic" => self.create_tonic(params).await,
            "xet.add_folder" => self.add_folder(params).await,
            "xet.remove_folder" => self.remove_folder(params).await,
            "xet.list_folders" => self.list_folders().await,
            "xet.folder_status" => self.folder_status(params).await,
            "xet.sync" => self.sync_folder(params).await,
            "session.stats" => self.session_stats().await,
            "config.get" => self.config_get().await,
            "config.update" => self.config_update(params).await,
            // The BitTorrent engine, NAT traversal, and tracker scraping
            // are external collaborators we only declare a trait for
            // (spec.md §1); no torrent engine is wired into this daemon
            // build, so these commands are always unavailable.
            "torrent.add" | "torrent.list" | "torrent.get" | "torrent.remove" | "torrent.pause" | "torrent.resume" | "torrent.cancel" | "scrape.get_result" | "security.get_blacklist" | "security.get_whitelist" => {
                Err(ExecutorError::Coded { code: ErrorCode::Unavailable, message: format!("{command}: no torrent engine is attached to this daemon") })
            }
            _ => Err(ExecutorError::UnknownCommand { name: command.to_string() }),
        }
    }
}

/// Walk `root`, hashing every regular file's content with SHA-256 to stand
/// in for the external chunker/per-file hash (spec.md §1 Non-goals: the
/// chunker itself is out of scope; this is the same placeholder
/// `ccbt-folder`'s watcher uses for newly observed files).
fn scan_folder(root: &std::path::Path) -> ExecutorResult<Vec<ccbt_tonic::FileMetadata>> {
    use sha2::{Digest, Sha256};

    let mut files = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let Some(relative_str) = relative.to_str() else { continue };

        let contents = std::fs::read(entry.path()).map_err(|source| ExecutorError::Coded { code: ErrorCode::IoError, message: format!("failed to read {}: {source}", entry.path().display()) })?;
        let file_hash: [u8; 32] = Sha256::digest(&contents).into();

        files.push(ccbt_tonic::FileMetadata { path: relative_str.replace(std::path::MAIN_SEPARATOR, "/"), file_hash, chunk_hashes: vec![file_hash], size: contents.len() as u64 });
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn adapter() -> (LocalAdapter, tempfile::TempDir) {
        let config_dir = tempfile::tempdir().unwrap();
        let session = Arc::new(SessionManager::new(None, None));
        (LocalAdapter::new(session, config_dir.path().join("config.json")), config_dir)
    }

    #[tokio::test]
    async fn create_tonic_hashes_folder_contents() {
        let (adapter, _guard) = adapter();
        let folder = tempfile::tempdir().unwrap();
        std::fs::write(folder.path().join("a.txt"), b"hello").unwrap();

        let params = json!({
            "folder_path": folder.path().to_string_lossy(),
            "folder_name": "demo",
            "sync_mode": "best_effort",
            "generate_link": true,
        });
        let result = adapter.dispatch("xet.create_tonic", params).await.unwrap();
        let parsed: CreateTonicResult = serde_json::from_value(result).unwrap();

        assert_eq!(parsed.total_length, 5);
        assert_eq!(parsed.file_count, 1);
        assert_eq!(parsed.info_hash.len(), 64);
        assert!(parsed.link.unwrap().starts_with("tonic?:xt=urn:xet:"));
    }

    #[tokio::test]
    async fn create_tonic_rejects_unknown_sync_mode() {
        let (adapter, _guard) = adapter();
        let folder = tempfile::tempdir().unwrap();
        let params = json!({
            "folder_path": folder.path().to_string_lossy(),
            "folder_name": "demo",
            "sync_mode": "quorum",
        });
        let err = adapter.dispatch("xet.create_tonic", params).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidField);
    }

    #[tokio::test]
    async fn add_list_status_and_remove_folder_round_trip() {
        let (adapter, _guard) = adapter();
        let folder = tempfile::tempdir().unwrap();

        let add_params = json!({
            "path": folder.path().to_string_lossy(),
            "sync_mode": "best_effort",
            "self_peer_id": "local",
        });
        let added = adapter.dispatch("xet.add_folder", add_params).await.unwrap();
        let key = added.get("folder_key").unwrap().as_str().unwrap().to_string();

        let listed = adapter.dispatch("xet.list_folders", json!({})).await.unwrap();
        assert_eq!(listed.get("folders").unwrap().as_array().unwrap().len(), 1);

        let status = adapter.dispatch("xet.folder_status", json!({"folder_key": key})).await.unwrap();
        assert_eq!(status.get("queue_depth").unwrap().as_u64(), Some(0));

        let removed = adapter.dispatch("xet.remove_folder", json!({"folder_key": key})).await.unwrap();
        assert_eq!(removed.get("removed").unwrap().as_bool(), Some(true));
    }

    #[tokio::test]
    async fn torrent_commands_are_unavailable_without_an_attached_engine() {
        let (adapter, _guard) = adapter();
        let err = adapter.dispatch("torrent.add", json!({})).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unavailable);
    }

    #[tokio::test]
    async fn unknown_command_is_rejected() {
        let (adapter, _guard) = adapter();
        let err = adapter.dispatch("bogus.command", json!({})).await.unwrap_err();
        assert!(matches!(err, ExecutorError::UnknownCommand { .. }));
    }
}
