//! `/api/v1/events` WebSocket upgrade (spec.md §4.12).
//!
//! Authentication is performed inline from the upgrade request's query
//! string rather than the shared `route_layer` middleware, since a
//! WebSocket handshake cannot carry a JSON body for the Ed25519 message
//! hash and browsers cannot always set custom headers on the upgrade
//! request.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use ccbt_events::{EventPriority, EventType, SubscriptionFilter};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{verify_api_key, verify_ed25519, HEADER_API_KEY, HEADER_PUBLIC_KEY, HEADER_SIGNATURE, HEADER_TIMESTAMP};
use crate::error::ApiError;
use crate::state::ApiState;

/// Upgrade query parameters carrying the same credentials the HTTP
/// middleware reads from headers.
#[derive(Debug, Deserialize, Default)]
pub struct AuthQuery {
    api_key: Option<String>,
    signature: Option<String>,
    public_key: Option<String>,
    timestamp: Option<String>,
}

pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<Arc<ApiState>>, Query(query): Query<AuthQuery>) -> Result<Response, ApiError> {
    if !authenticate(&query, &state) {
        state.metrics.inc_auth_failure();
        return Err(ApiError::auth_required("missing or invalid credentials"));
    }
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state)))
}

fn authenticate(query: &AuthQuery, state: &ApiState) -> bool {
    let mut headers = HeaderMap::new();
    if let (Some(sig), Some(key), Some(ts)) = (&query.signature, &query.public_key, &query.timestamp) {
        if let (Ok(v1), Ok(v2), Ok(v3)) = (sig.parse(), key.parse(), ts.parse()) {
            headers.insert(HEADER_SIGNATURE, v1);
            headers.insert(HEADER_PUBLIC_KEY, v2);
            headers.insert(HEADER_TIMESTAMP, v3);
        }
    }
    if let Some(api_key) = &query.api_key {
        if let Ok(value) = api_key.parse() {
            headers.insert(HEADER_API_KEY, value);
        }
    }

    let max_skew_secs = i64::try_from(state.config.auth_timestamp_skew.as_secs()).unwrap_or(i64::MAX);
    verify_ed25519(&headers, "GET", "/api/v1/events", b"", max_skew_secs).unwrap_or(false) || verify_api_key(&headers, state.config.api_key.as_deref())
}

/// Client `{action: "subscribe", data: {...}}` / `{action: "ping"}`
/// payload.
#[derive(Debug, Deserialize)]
struct ClientMessage {
    action: String,
    #[serde(default)]
    data: HashMap<String, Value>,
}

async fn handle_socket(mut socket: WebSocket, state: Arc<ApiState>) {
    let mut subscription = state.events.subscribe(SubscriptionFilter::all(), f64::INFINITY);
    let mut heartbeat = tokio::time::interval(state.config.websocket_heartbeat_interval);
    heartbeat.tick().await;

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = handle_client_message(&text, &mut subscription) {
                            if socket.send(Message::Text(reply.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
            event = subscription.next() => {
                let Some(event) = event else { break };
                state.metrics.inc_event(event.event_type.as_str());
                let Ok(text) = serde_json::to_string(&event) else { continue };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            _ = heartbeat.tick() => {
                if socket.send(Message::Text(json!({"action": "ping"}).to_string().into())).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// Handle one decoded client frame, returning the text to send back (if
/// any). Malformed or unknown actions produce an `{action:"error",...}`
/// reply without closing the connection, per spec.md §4.12.
fn handle_client_message(text: &str, subscription: &mut ccbt_events::EventSubscription) -> Option<String> {
    let parsed: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(err) => return Some(json!({"action": "error", "error": format!("malformed message: {err}")}).to_string()),
    };

    match parsed.action.as_str() {
        "ping" => Some(json!({"action": "pong"}).to_string()),
        "subscribe" => {
            subscription.set_filter(parse_filter(&parsed.data));
            if let Some(rate_limit) = parsed.data.get("rate_limit").and_then(Value::as_f64) {
                subscription.set_rate_limit(rate_limit);
            }
            None
        }
        other => Some(json!({"action": "error", "error": format!("unknown action: {other}")}).to_string()),
    }
}

fn parse_filter(data: &HashMap<String, Value>) -> SubscriptionFilter {
    let event_types = data
        .get("event_types")
        .and_then(Value::as_array)
        .map(|values| values.iter().filter_map(|v| serde_json::from_value::<EventType>(v.clone()).ok()).collect())
        .unwrap_or_default();
    let info_hash = data.get("info_hash").and_then(Value::as_str).map(str::to_string);
    let priority_filter = data.get("priority_filter").and_then(|v| serde_json::from_value::<EventPriority>(v.clone()).ok());
    SubscriptionFilter { event_types, info_hash, priority_filter }
}
