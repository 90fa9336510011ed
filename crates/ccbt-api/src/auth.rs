//! Authentication middleware (spec.md §4.12).
//!
//! Applied via `route_layer` to every route except the WebSocket upgrade
//! (authenticated inline from its query string) and `GET /metrics`
//! (Prometheus-standard, unauthenticated). Two credential schemes are
//! accepted: an Ed25519 signature over a canonical message, tried first,
//! falling back to a shared-secret API key header on any failure.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::{to_bytes, Body};
use axum::extract::State;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;
use data_encoding::HEXLOWER;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

use crate::error::ApiError;
use crate::state::ApiState;

pub(crate) const HEADER_SIGNATURE: &str = "x-ccbt-signature";
pub(crate) const HEADER_PUBLIC_KEY: &str = "x-ccbt-public-key";
pub(crate) const HEADER_TIMESTAMP: &str = "x-ccbt-timestamp";
pub(crate) const HEADER_API_KEY: &str = "x-ccbt-api-key";

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Authenticate a request via Ed25519 signature headers, falling back to
/// an API key header. Rejects with `401 {error, code: "AUTH_REQUIRED"}`
/// when neither scheme validates.
pub async fn require_auth(State(state): State<Arc<ApiState>>, req: Request<Body>, next: Next) -> Result<Response, ApiError> {
    let (parts, body) = req.into_parts();
    let bytes = to_bytes(body, MAX_BODY_BYTES).await.map_err(|err| ApiError::bad_request(format!("failed to buffer request body: {err}")))?;

    let max_skew_secs = i64::try_from(state.config.auth_timestamp_skew.as_secs()).unwrap_or(i64::MAX);
    let authenticated = verify_ed25519(&parts.headers, parts.method.as_str(), parts.uri.path(), &bytes, max_skew_secs).unwrap_or(false)
        || verify_api_key(&parts.headers, state.config.api_key.as_deref());

    if !authenticated {
        state.metrics.inc_auth_failure();
        return Err(ApiError::auth_required("missing or invalid credentials"));
    }

    let req = Request::from_parts(parts, Body::from(bytes));
    Ok(next.run(req).await)
}

/// Attempt Ed25519 verification. Any malformed header or signature
/// mismatch returns `Ok(false)` (never an error) so the caller falls
/// through to the API-key path, per spec.md §4.12.
pub(crate) fn verify_ed25519(headers: &HeaderMap, method: &str, path: &str, body: &[u8], max_skew_secs: i64) -> Option<bool> {
    let signature_hex = headers.get(HEADER_SIGNATURE)?.to_str().ok()?;
    let public_key_hex = headers.get(HEADER_PUBLIC_KEY)?.to_str().ok()?;
    let timestamp_str = headers.get(HEADER_TIMESTAMP)?.to_str().ok()?;

    let timestamp: i64 = timestamp_str.parse().ok()?;
    let now = i64::try_from(SystemTime::now().duration_since(UNIX_EPOCH).ok()?.as_secs()).ok()?;
    if (now - timestamp).abs() > max_skew_secs {
        return Some(false);
    }

    let signature_bytes = HEXLOWER.decode(signature_hex.as_bytes()).ok()?;
    let public_key_bytes = HEXLOWER.decode(public_key_hex.as_bytes()).ok()?;
    let signature = Signature::from_slice(&signature_bytes).ok()?;
    let verifying_key = VerifyingKey::from_bytes(&public_key_bytes.try_into().ok()?).ok()?;

    let body_hash = HEXLOWER.encode(&Sha256::digest(body));
    let message = format!("{method} {path}\n{timestamp_str}\n{body_hash}");

    Some(verifying_key.verify(message.as_bytes(), &signature).is_ok())
}

/// Constant-time-insensitive but otherwise exact comparison against the
/// configured API key. `None`/empty configured key means the scheme is
/// disabled.
pub(crate) fn verify_api_key(headers: &HeaderMap, configured: Option<&str>) -> bool {
    let Some(configured) = configured else { return false };
    let Some(presented) = headers.get(HEADER_API_KEY).and_then(|v| v.to_str().ok()) else { return false };
    presented == configured
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_matches_exactly() {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_API_KEY, "secret".parse().unwrap());
        assert!(verify_api_key(&headers, Some("secret")));
        assert!(!verify_api_key(&headers, Some("other")));
        assert!(!verify_api_key(&HeaderMap::new(), Some("secret")));
    }

    #[test]
    fn api_key_disabled_when_unconfigured() {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_API_KEY, "secret".parse().unwrap());
        assert!(!verify_api_key(&headers, None));
    }

    #[test]
    fn ed25519_rejects_missing_headers() {
        assert_eq!(verify_ed25519(&HeaderMap::new(), "GET", "/api/v1/status", b"", 300), None);
    }

    #[test]
    fn ed25519_round_trips_a_valid_signature() {
        use aes_gcm::aead::OsRng;
        use ed25519_dalek::{Signer, SigningKey};

        let signing_key = SigningKey::generate(&mut OsRng);
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
        let body = b"{}";
        let body_hash = HEXLOWER.encode(&Sha256::digest(body));
        let message = format!("GET /api/v1/status\n{now}\n{body_hash}");
        let signature = signing_key.sign(message.as_bytes());

        let mut headers = HeaderMap::new();
        headers.insert(HEADER_SIGNATURE, HEXLOWER.encode(&signature.to_bytes()).parse().unwrap());
        headers.insert(HEADER_PUBLIC_KEY, HEXLOWER.encode(&signing_key.verifying_key().to_bytes()).parse().unwrap());
        headers.insert(HEADER_TIMESTAMP, now.to_string().parse().unwrap());

        assert_eq!(verify_ed25519(&headers, "GET", "/api/v1/status", body, 300), Some(true));
    }

    #[test]
    fn ed25519_rejects_stale_timestamp() {
        use aes_gcm::aead::OsRng;
        use ed25519_dalek::{Signer, SigningKey};

        let signing_key = SigningKey::generate(&mut OsRng);
        let stale = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() - 1_000;
        let body_hash = HEXLOWER.encode(&Sha256::digest(b""));
        let message = format!("GET /api/v1/status\n{stale}\n{body_hash}");
        let signature = signing_key.sign(message.as_bytes());

        let mut headers = HeaderMap::new();
        headers.insert(HEADER_SIGNATURE, HEXLOWER.encode(&signature.to_bytes()).parse().unwrap());
        headers.insert(HEADER_PUBLIC_KEY, HEXLOWER.encode(&signing_key.verifying_key().to_bytes()).parse().unwrap());
        headers.insert(HEADER_TIMESTAMP, stale.to_string().parse().unwrap());

        assert_eq!(verify_ed25519(&headers, "GET", "/api/v1/status", b"", 300), Some(false));
    }
}
