//! Route handlers. Every handler's body is "validate shape, build a
//! command envelope, delegate to the executor" (spec.md §4.12: "no
//! handler implements business logic inline beyond argument validation").

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::ApiState;

/// `GET /api/v1/status`.
#[derive(Debug, Serialize)]
struct StatusResponse {
    status: &'static str,
    pid: u32,
    uptime_secs: u64,
    timestamp: f64,
}

pub async fn status(State(state): State<Arc<ApiState>>) -> Json<StatusResponse> {
    Json(StatusResponse { status: "running", pid: std::process::id(), uptime_secs: state.uptime_secs(), timestamp: unix_timestamp() })
}

/// `GET /api/v1/metrics`. Unauthenticated per spec.md §4.12; never
/// returns `401`.
pub async fn metrics(State(state): State<Arc<ApiState>>) -> Response {
    match state.metrics.render() {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "failed to render metrics");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

fn unix_timestamp() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs_f64()).unwrap_or(0.0)
}

/// Run a named command through the executor and translate its
/// [`ccbt_executor::CommandResult`] into an HTTP response.
async fn dispatch(state: &ApiState, command: &str, params: Value) -> Result<Json<Value>, ApiError> {
    let result = state.executor.execute(command, params).await;
    state.metrics.inc_http_request(command, if result.success { 200 } else { 400 });
    if result.success {
        Ok(Json(result.data.unwrap_or(Value::Null)))
    } else {
        let code = result.code.unwrap_or_else(|| "INTERNAL_ERROR".to_string());
        let message = result.error.unwrap_or_else(|| "command failed".to_string());
        Err(ApiError::from_command_failure(&code, &message))
    }
}

pub async fn create_tonic(State(state): State<Arc<ApiState>>, Json(body): Json<Value>) -> Result<Json<Value>, ApiError> {
    dispatch(&state, "xet.create_tonic", body).await
}

pub async fn add_folder(State(state): State<Arc<ApiState>>, Json(body): Json<Value>) -> Result<Json<Value>, ApiError> {
    dispatch(&state, "xet.add_folder", body).await
}

pub async fn list_folders(State(state): State<Arc<ApiState>>) -> Result<Json<Value>, ApiError> {
    dispatch(&state, "xet.list_folders", json!({})).await
}

pub async fn folder_status(State(state): State<Arc<ApiState>>, Path(folder_key): Path<String>) -> Result<Json<Value>, ApiError> {
    dispatch(&state, "xet.folder_status", json!({ "folder_key": folder_key })).await
}

pub async fn remove_folder(State(state): State<Arc<ApiState>>, Path(folder_key): Path<String>) -> Result<Json<Value>, ApiError> {
    dispatch(&state, "xet.remove_folder", json!({ "folder_key": folder_key })).await
}

pub async fn sync_folder(State(state): State<Arc<ApiState>>, Path(folder_key): Path<String>) -> Result<Json<Value>, ApiError> {
    dispatch(&state, "xet.sync", json!({ "folder_key": folder_key })).await
}

pub async fn session_stats(State(state): State<Arc<ApiState>>) -> Result<Json<Value>, ApiError> {
    dispatch(&state, "session.stats", json!({})).await
}

pub async fn config_get(State(state): State<Arc<ApiState>>) -> Result<Json<Value>, ApiError> {
    dispatch(&state, "config.get", json!({})).await
}

pub async fn config_update(State(state): State<Arc<ApiState>>, Json(body): Json<Value>) -> Result<Json<Value>, ApiError> {
    dispatch(&state, "config.update", body).await
}

/// Declared-but-external surface: the BitTorrent engine, tracker
/// scraping, and IP-filter CRUD are collaborators this daemon build
/// never wires an adapter for (spec.md §1 Non-goals). These routes still
/// go through the executor so auth, the error envelope, and metrics
/// behave identically to every in-scope route; they always answer
/// `503 UNAVAILABLE`.
pub async fn torrent_add(State(state): State<Arc<ApiState>>, Json(body): Json<Value>) -> Result<Json<Value>, ApiError> {
    dispatch(&state, "torrent.add", body).await
}

pub async fn torrent_list(State(state): State<Arc<ApiState>>) -> Result<Json<Value>, ApiError> {
    dispatch(&state, "torrent.list", json!({})).await
}

pub async fn torrent_get(State(state): State<Arc<ApiState>>, Path(info_hash): Path<String>) -> Result<Json<Value>, ApiError> {
    dispatch(&state, "torrent.get", json!({ "info_hash": info_hash })).await
}

pub async fn torrent_remove(State(state): State<Arc<ApiState>>, Path(info_hash): Path<String>) -> Result<Json<Value>, ApiError> {
    dispatch(&state, "torrent.remove", json!({ "info_hash": info_hash })).await
}

pub async fn torrent_pause(State(state): State<Arc<ApiState>>, Path(info_hash): Path<String>) -> Result<Json<Value>, ApiError> {
    dispatch(&state, "torrent.pause", json!({ "info_hash": info_hash })).await
}

pub async fn torrent_resume(State(state): State<Arc<ApiState>>, Path(info_hash): Path<String>) -> Result<Json<Value>, ApiError> {
    dispatch(&state, "torrent.resume", json!({ "info_hash": info_hash })).await
}

pub async fn torrent_cancel(State(state): State<Arc<ApiState>>, Path(info_hash): Path<String>) -> Result<Json<Value>, ApiError> {
    dispatch(&state, "torrent.cancel", json!({ "info_hash": info_hash })).await
}

pub async fn scrape_get_result(State(state): State<Arc<ApiState>>, Path(info_hash): Path<String>) -> Result<Json<Value>, ApiError> {
    dispatch(&state, "scrape.get_result", json!({ "info_hash": info_hash })).await
}

pub async fn security_get_blacklist(State(state): State<Arc<ApiState>>) -> Result<Json<Value>, ApiError> {
    dispatch(&state, "security.get_blacklist", json!({})).await
}

pub async fn security_get_whitelist(State(state): State<Arc<ApiState>>) -> Result<Json<Value>, ApiError> {
    dispatch(&state, "security.get_whitelist", json!({})).await
}
