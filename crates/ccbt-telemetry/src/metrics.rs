//! Prometheus-backed metrics registry shared across the daemon.
//!
//! Metric *export* wire format and dashboards are out of scope; this
//! module only owns collector registration and the counters/gauges the
//! rest of the workspace increments as it does work.

use std::sync::Arc;

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{TelemetryError, TelemetryResult};

/// Prometheus-backed metrics registry, cheaply cloneable.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    events_emitted_total: IntCounterVec,
    updates_applied_total: IntCounter,
    updates_failed_total: IntCounter,
    queue_depth: IntGauge,
    raft_elections_total: IntCounter,
    consensus_rounds_total: IntCounterVec,
    auth_failures_total: IntCounter,
}

/// Point-in-time snapshot of the most relevant counters and gauges,
/// served alongside `GET /api/v1/status`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    /// Total updates applied across every folder.
    pub updates_applied_total: u64,
    /// Total updates dropped after exhausting retries.
    pub updates_failed_total: u64,
    /// Current aggregate queue depth across every folder.
    pub queue_depth: i64,
    /// Total Raft leader elections observed.
    pub raft_elections_total: u64,
    /// Total authentication failures observed by the IPC server.
    pub auth_failures_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors
    /// registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any collector cannot be constructed or
    /// registered.
    pub fn new() -> TelemetryResult<Self> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(Opts::new("http_requests_total", "Total HTTP requests received"), &["route", "code"])
            .map_err(|source| TelemetryError::MetricsRegister { name: "http_requests_total", source })?;
        let events_emitted_total = IntCounterVec::new(Opts::new("events_emitted_total", "Domain events emitted by type"), &["type"])
            .map_err(|source| TelemetryError::MetricsRegister { name: "events_emitted_total", source })?;
        let updates_applied_total = IntCounter::with_opts(Opts::new("updates_applied_total", "Folder-sync updates successfully applied"))
            .map_err(|source| TelemetryError::MetricsRegister { name: "updates_applied_total", source })?;
        let updates_failed_total = IntCounter::with_opts(Opts::new("updates_failed_total", "Folder-sync updates dropped after exhausting retries"))
            .map_err(|source| TelemetryError::MetricsRegister { name: "updates_failed_total", source })?;
        let queue_depth = IntGauge::with_opts(Opts::new("queue_depth", "Aggregate update queue depth across every folder"))
            .map_err(|source| TelemetryError::MetricsRegister { name: "queue_depth", source })?;
        let raft_elections_total = IntCounter::with_opts(Opts::new("raft_elections_total", "Raft leader elections observed"))
            .map_err(|source| TelemetryError::MetricsRegister { name: "raft_elections_total", source })?;
        let consensus_rounds_total = IntCounterVec::new(Opts::new("consensus_rounds_total", "Consensus rounds by outcome"), &["outcome"])
            .map_err(|source| TelemetryError::MetricsRegister { name: "consensus_rounds_total", source })?;
        let auth_failures_total = IntCounter::with_opts(Opts::new("auth_failures_total", "IPC requests rejected by the authentication middleware"))
            .map_err(|source| TelemetryError::MetricsRegister { name: "auth_failures_total", source })?;

        registry.register(Box::new(http_requests_total.clone())).map_err(|source| TelemetryError::MetricsRegister { name: "http_requests_total", source })?;
        registry.register(Box::new(events_emitted_total.clone())).map_err(|source| TelemetryError::MetricsRegister { name: "events_emitted_total", source })?;
        registry.register(Box::new(updates_applied_total.clone())).map_err(|source| TelemetryError::MetricsRegister { name: "updates_applied_total", source })?;
        registry.register(Box::new(updates_failed_total.clone())).map_err(|source| TelemetryError::MetricsRegister { name: "updates_failed_total", source })?;
        registry.register(Box::new(queue_depth.clone())).map_err(|source| TelemetryError::MetricsRegister { name: "queue_depth", source })?;
        registry.register(Box::new(raft_elections_total.clone())).map_err(|source| TelemetryError::MetricsRegister { name: "raft_elections_total", source })?;
        registry.register(Box::new(consensus_rounds_total.clone())).map_err(|source| TelemetryError::MetricsRegister { name: "consensus_rounds_total", source })?;
        registry.register(Box::new(auth_failures_total.clone())).map_err(|source| TelemetryError::MetricsRegister { name: "auth_failures_total", source })?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                http_requests_total,
                events_emitted_total,
                updates_applied_total,
                updates_failed_total,
                queue_depth,
                raft_elections_total,
                consensus_rounds_total,
                auth_failures_total,
            }),
        })
    }

    /// Increment the HTTP request counter for a route and status code.
    pub fn inc_http_request(&self, route: &str, status: u16) {
        self.inner.http_requests_total.with_label_values(&[route, &status.to_string()]).inc();
    }

    /// Increment the emitted-event counter for one event type.
    pub fn inc_event(&self, event_type: &str) {
        self.inner.events_emitted_total.with_label_values(&[event_type]).inc();
    }

    /// Record that an update was applied.
    pub fn inc_updates_applied(&self) {
        self.inner.updates_applied_total.inc();
    }

    /// Record that an update was dropped after exhausting retries.
    pub fn inc_updates_failed(&self) {
        self.inner.updates_failed_total.inc();
    }

    /// Set the aggregate queue-depth gauge.
    pub fn set_queue_depth(&self, depth: i64) {
        self.inner.queue_depth.set(depth);
    }

    /// Record a Raft leader election.
    pub fn inc_raft_election(&self) {
        self.inner.raft_elections_total.inc();
    }

    /// Record a consensus round's outcome (`"committed"` or `"timed_out"`).
    pub fn inc_consensus_round(&self, outcome: &str) {
        self.inner.consensus_rounds_total.with_label_values(&[outcome]).inc();
    }

    /// Record an authentication failure.
    pub fn inc_auth_failure(&self) {
        self.inner.auth_failures_total.inc();
    }

    /// Render the registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the collectors cannot be encoded, or the
    /// encoded buffer is not valid UTF-8.
    pub fn render(&self) -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).map_err(TelemetryError::MetricsEncode)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Take a point-in-time snapshot of the most relevant gauges and
    /// counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            updates_applied_total: self.inner.updates_applied_total.get(),
            updates_failed_total: self.inner.updates_failed_total.get(),
            queue_depth: self.inner.queue_depth.get(),
            raft_elections_total: self.inner.raft_elections_total.get(),
            auth_failures_total: self.inner.auth_failures_total.get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_snapshot_reflects_updates() {
        let metrics = Metrics::new().unwrap();
        metrics.inc_http_request("/api/v1/status", 200);
        metrics.inc_event("folder_update_applied");
        metrics.inc_updates_applied();
        metrics.inc_updates_failed();
        metrics.set_queue_depth(3);
        metrics.inc_raft_election();
        metrics.inc_consensus_round("committed");
        metrics.inc_auth_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.updates_applied_total, 1);
        assert_eq!(snapshot.updates_failed_total, 1);
        assert_eq!(snapshot.queue_depth, 3);
        assert_eq!(snapshot.raft_elections_total, 1);
        assert_eq!(snapshot.auth_failures_total, 1);

        let rendered = metrics.render().unwrap();
        assert!(rendered.contains("updates_applied_total"));
        assert!(rendered.contains("consensus_rounds_total"));
    }
}
