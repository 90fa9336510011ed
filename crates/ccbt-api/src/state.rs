//! Shared application state threaded through every handler via
//! [`axum::extract::State`].

use std::sync::Arc;
use std::time::Instant;

use ccbt_config::UnifiedConfig;
use ccbt_events::EventBus;
use ccbt_executor::Executor;
use ccbt_telemetry::Metrics;

/// State cloned (cheaply — everything inside is an `Arc`) into every
/// request handler and the WebSocket upgrade handler.
#[derive(Clone)]
pub struct ApiState {
    /// The single dispatch point every handler delegates business logic
    /// to (spec.md §4.12: "no handler implements business logic inline
    /// beyond argument validation").
    pub executor: Arc<Executor>,
    /// Fan-out for WebSocket subscribers.
    pub events: Arc<EventBus>,
    /// Prometheus-backed counters, exposed at `GET /api/v1/metrics`.
    pub metrics: Metrics,
    /// The daemon's active configuration, for the authentication
    /// middleware and `config.get`/`config.update`.
    pub config: Arc<UnifiedConfig>,
    /// Process start time, for the status route's uptime field.
    pub started_at: Instant,
}

impl ApiState {
    /// Construct fresh application state.
    #[must_use]
    pub fn new(executor: Arc<Executor>, events: Arc<EventBus>, metrics: Metrics, config: Arc<UnifiedConfig>) -> Self {
        Self { executor, events, metrics, config, started_at: Instant::now() }
    }

    /// Seconds the daemon has been running.
    #[must_use]
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
