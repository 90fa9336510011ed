//! The HTTP transport: lazy, per-event-loop [`reqwest::Client`]
//! construction, connection pool caps, and the readiness probe
//! (spec.md §4.13).

use std::net::SocketAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use data_encoding::HEXLOWER;
use ed25519_dalek::{Signer, SigningKey};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};

const READINESS_TIMEOUT: Duration = Duration::from_secs(3);
const TCP_PRECHECK_TIMEOUT: Duration = Duration::from_millis(500);

// `reqwest` exposes only a per-host idle cap; the overall pool budget
// spec.md §4.13 describes (~10 total, ~5 on Windows) binds a client
// that talks to multiple hosts; a single-daemon client is fully
// governed by the per-host cap below.
#[cfg(not(target_os = "windows"))]
const POOL_MAX_IDLE_PER_HOST: usize = 5;
#[cfg(target_os = "windows")]
const POOL_MAX_IDLE_PER_HOST: usize = 3;

/// Typed HTTP transport to a single local daemon. Cheap to clone; the
/// underlying `reqwest::Client` is rebuilt the first time it is used
/// from a different (or newly-created) Tokio runtime, since an HTTP
/// connection pool tied to a dead event loop produces "event loop is
/// closed" errors on next use.
pub struct IpcClient {
    addr: SocketAddr,
    base_url: String,
    api_key: Option<String>,
    signing_key: Option<SigningKey>,
    bound: Mutex<Option<BoundClient>>,
}

struct BoundClient {
    runtime_id: tokio::runtime::Id,
    client: reqwest::Client,
}

impl IpcClient {
    /// Construct a client targeting `addr`, authenticating with
    /// `api_key` if present.
    #[must_use]
    pub fn new(addr: SocketAddr, api_key: Option<String>) -> Self {
        Self { addr, base_url: format!("http://{addr}/api/v1"), api_key, signing_key: None, bound: Mutex::new(None) }
    }

    /// Construct a client that signs every request with `signing_key`
    /// (tried by the server before the API key), in addition to whatever
    /// `api_key` is configured as a fallback.
    #[must_use]
    pub fn with_signing_key(addr: SocketAddr, api_key: Option<String>, signing_key: SigningKey) -> Self {
        Self { addr, base_url: format!("http://{addr}/api/v1"), api_key, signing_key: Some(signing_key), bound: Mutex::new(None) }
    }

    /// Return a `reqwest::Client` bound to the caller's current Tokio
    /// runtime, rebuilding it if the previously bound runtime is gone.
    async fn client(&self) -> ClientResult<reqwest::Client> {
        let current = tokio::runtime::Handle::current().id();
        let mut guard = self.bound.lock().await;

        if let Some(bound) = guard.as_ref() {
            if bound.runtime_id == current {
                return Ok(bound.client.clone());
            }
            debug!("rebuilding IPC client: runtime changed since last use");
        }

        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .pool_idle_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(30))
            .build()?;
        *guard = Some(BoundClient { runtime_id: current, client: client.clone() });
        Ok(client)
    }

    /// Issue a request against `path` (relative to `/api/v1`), optionally
    /// with a JSON body, and decode either the success payload or the
    /// `{error, code, details?}` envelope.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Request`] on transport failure,
    /// [`ClientError::Remote`] if the daemon answered with a non-2xx
    /// envelope, or [`ClientError::Decode`] if the body could not be
    /// parsed.
    pub async fn request(&self, method: reqwest::Method, path: &str, body: Option<Value>) -> ClientResult<Value> {
        let client = self.client().await?;
        let url = format!("{}{path}", self.base_url);
        let full_path = format!("/api/v1{path}");
        let body_bytes = match &body {
            Some(body) => serde_json::to_vec(body)?,
            None => Vec::new(),
        };

        let mut request = client.request(method.clone(), &url);
        if let Some(signing_key) = &self.signing_key {
            let timestamp = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
            let body_hash = HEXLOWER.encode(&Sha256::digest(&body_bytes));
            let message = format!("{method} {full_path}\n{timestamp}\n{body_hash}");
            let signature = signing_key.sign(message.as_bytes());
            request = request
                .header("X-CCBT-Signature", HEXLOWER.encode(&signature.to_bytes()))
                .header("X-CCBT-Public-Key", HEXLOWER.encode(&signing_key.verifying_key().to_bytes()))
                .header("X-CCBT-Timestamp", timestamp.to_string());
        } else if let Some(api_key) = &self.api_key {
            request = request.header("X-CCBT-API-Key", api_key);
        }
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if status.is_success() {
            if bytes.is_empty() {
                return Ok(Value::Null);
            }
            return Ok(serde_json::from_slice(&bytes)?);
        }

        let envelope: Value = serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::Null);
        let code = envelope.get("code").and_then(Value::as_str).unwrap_or("INTERNAL_ERROR").to_string();
        let message = envelope.get("error").and_then(Value::as_str).unwrap_or("request failed").to_string();
        Err(ClientError::Remote { code, message })
    }

    /// Short TCP pre-check followed by `GET /status` with a bounded
    /// timeout; returns `true` only on a structurally valid response
    /// (spec.md §4.13).
    pub async fn is_daemon_running(&self) -> bool {
        let precheck = tokio::time::timeout(TCP_PRECHECK_TIMEOUT, tokio::net::TcpStream::connect(self.addr)).await;
        // A pre-check failure is inconclusive on some platforms (e.g.
        // Windows' WSAEWOULDBLOCK on a non-blocking connect); the HTTP
        // probe below is the authoritative check either way.
        if matches!(precheck, Ok(Err(_))) {
            warn!(addr = %self.addr, "TCP pre-check failed; attempting HTTP probe anyway");
        }

        let probe = tokio::time::timeout(READINESS_TIMEOUT, self.request(reqwest::Method::GET, "/status", None)).await;
        matches!(probe, Ok(Ok(value)) if value.get("status").is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_daemon_is_not_running() {
        let client = IpcClient::new(SocketAddr::from(([127, 0, 0, 1], 1)), None);
        assert!(!client.is_daemon_running().await);
    }

    #[tokio::test]
    async fn signing_key_is_preferred_over_api_key() {
        use aes_gcm::aead::OsRng;

        let signing_key = SigningKey::generate(&mut OsRng);
        let client = IpcClient::with_signing_key(SocketAddr::from(([127, 0, 0, 1], 1)), Some("ignored".to_string()), signing_key);
        // Unreachable daemon: this only exercises the request-building
        // path (no panics while signing) rather than a live round-trip.
        assert!(!client.is_daemon_running().await);
    }

    #[tokio::test]
    async fn client_rebinds_across_runtimes() {
        let client = IpcClient::new(SocketAddr::from(([127, 0, 0, 1], 8080)), None);
        let first = client.client().await.unwrap();
        let second = client.client().await.unwrap();
        // Same runtime: no rebuild needed, but both calls must succeed
        // without panicking regardless.
        drop(first);
        drop(second);
    }
}
