//! Router assembly, the bind/serve loop, and startup self-verification
//! (spec.md §4.12).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use ccbt_config::UnifiedConfig;
use ccbt_events::EventBus;
use ccbt_executor::Executor;
use ccbt_telemetry::Metrics;
use tokio::net::{TcpListener, TcpStream};
use tower_http::catch_panic::CatchPanicLayer;
use tracing::{info, warn};

use crate::auth::require_auth;
use crate::error::ApiServerError;
use crate::routes;
use crate::state::ApiState;
use crate::ws;

const SELF_VERIFY_ATTEMPTS: u32 = 10;
const SELF_VERIFY_BACKOFF: Duration = Duration::from_millis(200);

/// The IPC server: an axum [`Router`] plus the shared state every handler
/// closes over.
pub struct ApiServer {
    router: Router,
    state: Arc<ApiState>,
}

impl ApiServer {
    /// Assemble the router. No network I/O happens until [`Self::serve`].
    #[must_use]
    pub fn new(executor: Arc<Executor>, events: Arc<EventBus>, metrics: Metrics, config: Arc<UnifiedConfig>) -> Self {
        let state = Arc::new(ApiState::new(executor, events, metrics, config));
        let router = Self::build_router(&state);
        Self { router, state }
    }

    fn build_router(state: &Arc<ApiState>) -> Router {
        let require_auth_layer = middleware::from_fn_with_state(Arc::clone(state), require_auth);

        let public = Router::new().route("/metrics", get(routes::metrics)).route("/events", get(ws::upgrade));

        let protected = Router::new()
            .route("/status", get(routes::status))
            .route("/xet/create_tonic", post(routes::create_tonic))
            .route("/xet/folders", get(routes::list_folders).post(routes::add_folder))
            .route("/xet/folders/{folder_key}", get(routes::folder_status).delete(routes::remove_folder))
            .route("/xet/folders/{folder_key}/sync", post(routes::sync_folder))
            .route("/session/stats", get(routes::session_stats))
            .route("/config", get(routes::config_get).put(routes::config_update))
            .route("/torrent", post(routes::torrent_add).get(routes::torrent_list))
            .route("/torrent/{info_hash}", get(routes::torrent_get).delete(routes::torrent_remove))
            .route("/torrent/{info_hash}/pause", post(routes::torrent_pause))
            .route("/torrent/{info_hash}/resume", post(routes::torrent_resume))
            .route("/torrent/{info_hash}/cancel", post(routes::torrent_cancel))
            .route("/scrape/{info_hash}", get(routes::scrape_get_result))
            .route("/security/blacklist", get(routes::security_get_blacklist))
            .route("/security/whitelist", get(routes::security_get_whitelist))
            .route_layer(require_auth_layer);

        Router::new()
            .nest("/api/v1", public.merge(protected))
            .layer(CatchPanicLayer::custom(crate::error::handle_panic))
            .with_state(Arc::clone(state))
    }

    /// Bind `addr`, serve until cancelled, and self-verify the listener
    /// is actually answering requests before returning.
    ///
    /// # Errors
    ///
    /// Returns [`ApiServerError`] if binding fails, if the background
    /// serve task fails, or if self-verification does not succeed within
    /// its bounded retry budget.
    pub async fn serve(self, addr: SocketAddr) -> Result<(), ApiServerError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, "IPC server listening");

        let verify_addr = SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST), local_addr.port());
        let config = Arc::clone(&self.state.config);
        let serve_task = tokio::spawn(async move { axum::serve(listener, self.router.into_make_service()).await });

        self_verify(verify_addr, &config).await?;
        info!("IPC server self-verification succeeded");

        serve_task.await??;
        Ok(())
    }
}

/// Retry a TCP connect followed by `GET /api/v1/status` a bounded number
/// of times, to avoid the "socket open but HTTP not ready" race observed
/// on Windows (spec.md §4.12).
async fn self_verify(addr: SocketAddr, config: &UnifiedConfig) -> Result<(), ApiServerError> {
    let client = reqwest::Client::builder().timeout(Duration::from_secs(3)).build()?;
    let url = format!("http://{addr}/api/v1/status");

    for attempt in 1..=SELF_VERIFY_ATTEMPTS {
        if TcpStream::connect(addr).await.is_ok() {
            let mut request = client.get(&url);
            if let Some(api_key) = &config.api_key {
                request = request.header("X-CCBT-API-Key", api_key);
            }
            if let Ok(response) = request.send().await {
                if response.status().is_success() {
                    return Ok(());
                }
            }
        }
        warn!(attempt, "IPC self-verification attempt failed; retrying");
        tokio::time::sleep(SELF_VERIFY_BACKOFF).await;
    }

    Err(ApiServerError::SelfVerifyFailed { attempts: SELF_VERIFY_ATTEMPTS })
}

#[cfg(test)]
impl ApiServer {
    fn router_for_test(&self) -> Router {
        self.router.clone()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use ccbt_executor::{Executor, LocalAdapter};
    use ccbt_session::SessionManager;
    use tower::ServiceExt;

    use super::*;

    fn test_server() -> ApiServer {
        let session = Arc::new(SessionManager::new(None, None));
        let adapter = Arc::new(LocalAdapter::new(session, std::path::PathBuf::from("/tmp/ccbt-api-test-config.json")));
        let executor = Arc::new(Executor::new(adapter));
        let events = Arc::new(EventBus::new());
        let metrics = Metrics::new().unwrap();
        let config = UnifiedConfig { api_key: Some("test-key".to_string()), ..UnifiedConfig::default() };
        ApiServer::new(executor, events, metrics, Arc::new(config))
    }

    #[tokio::test]
    async fn status_without_credentials_is_rejected() {
        let router = test_server().router_for_test();
        let response = router.oneshot(Request::builder().uri("/api/v1/status").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn status_with_api_key_succeeds() {
        let router = test_server().router_for_test();
        let request = Request::builder().uri("/api/v1/status").header("x-ccbt-api-key", "test-key").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_never_requires_authentication() {
        let router = test_server().router_for_test();
        let response = router.oneshot(Request::builder().uri("/api/v1/metrics").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unavailable_torrent_route_reports_service_unavailable() {
        let router = test_server().router_for_test();
        let request = Request::builder().uri("/api/v1/torrent").header("x-ccbt-api-key", "test-key").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
