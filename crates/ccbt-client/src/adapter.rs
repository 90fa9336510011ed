//! [`DaemonAdapter`]: the remote counterpart of
//! `ccbt_executor::LocalAdapter`, routing the same command names over
//! HTTP to a running daemon (spec.md §4.11, §4.13).

use async_trait::async_trait;
use ccbt_executor::{ErrorCode, ExecutorError, ExecutorResult, SessionAdapter};
use serde_json::Value;

use crate::client::IpcClient;
use crate::error::ClientError;

/// Implements [`SessionAdapter`] by forwarding every command to the IPC
/// server over HTTP. The CLI and TUI build an [`crate::IpcClient`] once
/// and wrap it in this adapter so they share the exact same
/// `Executor::execute` dispatch path a daemon-embedded caller would use.
pub struct DaemonAdapter {
    client: IpcClient,
}

impl DaemonAdapter {
    /// Construct an adapter forwarding through `client`.
    #[must_use]
    pub fn new(client: IpcClient) -> Self {
        Self { client }
    }
}

fn string_field<'a>(params: &'a Value, field: &'static str, command: &str) -> ExecutorResult<&'a str> {
    params.get(field).and_then(Value::as_str).ok_or_else(|| ExecutorError::InvalidParams { command: command.to_string(), reason: format!("missing required field `{field}`") })
}

fn map_client_error(err: ClientError) -> ExecutorError {
    match err {
        ClientError::Remote { code, message } => ExecutorError::Coded { code: parse_error_code(&code), message },
        other => ExecutorError::Coded { code: ErrorCode::IoError, message: other.to_string() },
    }
}

fn parse_error_code(code: &str) -> ErrorCode {
    match code {
        "AUTH_REQUIRED" => ErrorCode::AuthRequired,
        "AUTH_ERROR" => ErrorCode::AuthError,
        "INVALID_JSON" => ErrorCode::InvalidJson,
        "VALIDATION_ERROR" => ErrorCode::ValidationError,
        "NOT_FOUND" => ErrorCode::NotFound,
        "CONFLICT" => ErrorCode::Conflict,
        "TIMEOUT" => ErrorCode::Timeout,
        "UNAVAILABLE" => ErrorCode::Unavailable,
        "CONSENSUS_FAILURE" => ErrorCode::ConsensusFailure,
        "INVALID_FIELD" => ErrorCode::InvalidField,
        "INVALID_PATH" => ErrorCode::InvalidPath,
        "INVALID_KEY_LENGTH" => ErrorCode::InvalidKeyLength,
        _ => ErrorCode::InternalError,
    }
}

#[async_trait]
impl SessionAdapter for DaemonAdapter {
    async fn dispatch(&self, command: &str, params: Value) -> ExecutorResult<Value> {
        use reqwest::Method;

        let result = match command {
            "xet.create_tonic" => self.client.request(Method::POST, "/xet/create_tonic", Some(params)).await,
            "xet.add_folder" => self.client.request(Method::POST, "/xet/folders", Some(params)).await,
            "xet.list_folders" => self.client.request(Method::GET, "/xet/folders", None).await,
            "xet.remove_folder" => {
                let key = string_field(&params, "folder_key", command)?;
                self.client.request(Method::DELETE, &format!("/xet/folders/{key}"), None).await
            }
            "xet.folder_status" => {
                let key = string_field(&params, "folder_key", command)?;
                self.client.request(Method::GET, &format!("/xet/folders/{key}"), None).await
            }
            "xet.sync" => {
                let key = string_field(&params, "folder_key", command)?;
                self.client.request(Method::POST, &format!("/xet/folders/{key}/sync"), None).await
            }
            "session.stats" => self.client.request(Method::GET, "/session/stats", None).await,
            "config.get" => self.client.request(Method::GET, "/config", None).await,
            "config.update" => self.client.request(Method::PUT, "/config", Some(params)).await,
            "torrent.add" => self.client.request(Method::POST, "/torrent", Some(params)).await,
            "torrent.list" => self.client.request(Method::GET, "/torrent", None).await,
            "torrent.get" => {
                let hash = string_field(&params, "info_hash", command)?;
                self.client.request(Method::GET, &format!("/torrent/{hash}"), None).await
            }
            "torrent.remove" => {
                let hash = string_field(&params, "info_hash", command)?;
                self.client.request(Method::DELETE, &format!("/torrent/{hash}"), None).await
            }
            "torrent.pause" => {
                let hash = string_field(&params, "info_hash", command)?;
                self.client.request(Method::POST, &format!("/torrent/{hash}/pause"), None).await
            }
            "torrent.resume" => {
                let hash = string_field(&params, "info_hash", command)?;
                self.client.request(Method::POST, &format!("/torrent/{hash}/resume"), None).await
            }
            "torrent.cancel" => {
                let hash = string_field(&params, "info_hash", command)?;
                self.client.request(Method::POST, &format!("/torrent/{hash}/cancel"), None).await
            }
            "scrape.get_result" => {
                let hash = string_field(&params, "info_hash", command)?;
                self.client.request(Method::GET, &format!("/scrape/{hash}"), None).await
            }
            "security.get_blacklist" => self.client.request(Method::GET, "/security/blacklist", None).await,
            "security.get_whitelist" => self.client.request(Method::GET, "/security/whitelist", None).await,
            _ => return Err(ExecutorError::UnknownCommand { name: command.to_string() }),
        };

        result.map_err(map_client_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    #[tokio::test]
    async fn unknown_command_is_rejected_locally_without_a_request() {
        let client = IpcClient::new(SocketAddr::from(([127, 0, 0, 1], 1)), None);
        let adapter = DaemonAdapter::new(client);
        let err = adapter.dispatch("nope", serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ExecutorError::UnknownCommand { .. }));
    }

    #[tokio::test]
    async fn missing_folder_key_is_rejected_before_any_request() {
        let client = IpcClient::new(SocketAddr::from(([127, 0, 0, 1], 1)), None);
        let adapter = DaemonAdapter::new(client);
        let err = adapter.dispatch("xet.sync", serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ExecutorError::InvalidParams { .. }));
    }
}
