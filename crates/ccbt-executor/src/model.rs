//! Declared input/output records for each named command, plus the
//! envelope every dispatch returns (spec.md §4.11).

use std::time::Duration;

use ccbt_tonic::{SyncMode, TonicError};
use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;

/// Outcome of a single command dispatch. The executor never raises to its
/// caller; every path ends here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    /// Whether the command completed successfully.
    pub success: bool,
    /// The command's declared output record, present iff `success`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Human-readable error message, present iff `!success`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Stable error code, present iff `!success`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl CommandResult {
    /// Build a successful result.
    #[must_use]
    pub fn ok(data: serde_json::Value) -> Self {
        Self { success: true, data: Some(data), error: None, code: None }
    }

    /// Build a failed result from an error message and stable code.
    #[must_use]
    pub fn err(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(message.into()), code: Some(code.as_str().to_string()) }
    }
}

/// `xet.create_tonic` input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTonicArgs {
    /// The folder to snapshot into a `.tonic`.
    pub folder_path: String,
    /// Display name recorded as `info.name`.
    pub folder_name: String,
    /// Initial sync policy, one of `designated|best_effort|broadcast|consensus`.
    pub sync_mode: String,
    /// Primary tracker announce URL, if any.
    #[serde(default)]
    pub announce: Option<String>,
    /// Where to write the encoded `.tonic` bytes; when absent, only the
    /// info-hash and link are returned.
    #[serde(default)]
    pub output_path: Option<String>,
    /// Whether to also emit a `tonic?:` link in the response.
    #[serde(default)]
    pub generate_link: bool,
}

impl CreateTonicArgs {
    /// Parse [`Self::sync_mode`] into the codec's closed enum.
    ///
    /// # Errors
    ///
    /// Returns [`TonicError::InvalidField`] for an unrecognized tag.
    pub fn parsed_sync_mode(&self) -> Result<SyncMode, TonicError> {
        SyncMode::parse(&self.sync_mode)
    }
}

/// `xet.create_tonic` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTonicResult {
    /// Lowercase hex info-hash of the created `.tonic`.
    pub info_hash: String,
    /// Total byte length across every file.
    pub total_length: u64,
    /// Number of files included.
    pub file_count: usize,
    /// `tonic?:` link, present iff `generate_link` was set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// `xet.add_folder` input; mirrors [`ccbt_session::AddFolderArgs`] with
/// wire-friendly primitive types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddFolderArgs {
    /// Absolute path of the folder to synchronize.
    pub path: String,
    /// Initial sync policy, one of `designated|best_effort|broadcast|consensus`.
    pub sync_mode: String,
    /// Path to the encrypted allowlist file, if peer gating is enabled.
    #[serde(default)]
    pub allowlist_path: Option<String>,
    /// Whether to auto-commit changes to the folder's git repo, if any.
    #[serde(default)]
    pub auto_commit: bool,
    /// This node's own peer id.
    pub self_peer_id: String,
    /// Consensus threshold used by the simple-majority fallback.
    #[serde(default = "default_consensus_threshold")]
    pub consensus_threshold: f64,
    /// Poll interval for the folder watcher, in milliseconds.
    #[serde(default = "default_watch_interval_ms")]
    pub watch_interval_ms: u64,
    /// Info-hash to key this folder by, if known.
    #[serde(default)]
    pub info_hash_hex: Option<String>,
}

const fn default_consensus_threshold() -> f64 {
    0.5
}

const fn default_watch_interval_ms() -> u64 {
    2_000
}

impl AddFolderArgs {
    /// Convert to the session manager's native argument type.
    ///
    /// # Errors
    ///
    /// Returns [`TonicError::InvalidField`] if `sync_mode` is not one of
    /// the four recognized tags.
    pub fn into_session_args(self) -> Result<ccbt_session::AddFolderArgs, TonicError> {
        Ok(ccbt_session::AddFolderArgs {
            path: std::path::PathBuf::from(self.path),
            sync_mode: SyncMode::parse(&self.sync_mode)?,
            allowlist_path: self.allowlist_path.map(std::path::PathBuf::from),
            auto_commit: self.auto_commit,
            self_peer_id: self.self_peer_id,
            consensus_threshold: self.consensus_threshold,
            watch_interval: Duration::from_millis(self.watch_interval_ms),
            info_hash_hex: self.info_hash_hex,
        })
    }
}

/// `xet.remove_folder` / `xet.sync` / `xet.folder_status` input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderKeyArgs {
    /// The folder key returned by `xet.add_folder`.
    pub folder_key: String,
}

/// `config.get` output / `config.update` input: the subset of
/// [`ccbt_config::UnifiedConfig`] that is safe to round-trip over IPC
/// (the API key is never echoed back).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigView {
    /// Port the IPC server binds to.
    pub ipc_port: u16,
    /// Whether an API key is configured.
    pub api_key_configured: bool,
    /// Whether the IPC server terminates TLS.
    pub tls_enabled: bool,
    /// WebSocket heartbeat interval, in seconds.
    pub websocket_heartbeat_secs: u64,
}

impl From<&ccbt_config::UnifiedConfig> for ConfigView {
    fn from(config: &ccbt_config::UnifiedConfig) -> Self {
        Self {
            ipc_port: config.ipc_port,
            api_key_configured: config.api_key.is_some(),
            tls_enabled: config.tls_enabled,
            websocket_heartbeat_secs: config.websocket_heartbeat_interval.as_secs(),
        }
    }
}
