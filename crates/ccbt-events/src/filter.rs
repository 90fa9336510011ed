//! Per-subscriber filtering and token-bucket rate limiting.

use std::collections::HashSet;
use std::time::Instant;

use tokio::sync::Mutex;

use crate::model::{Event, EventPriority, EventType};

/// A subscriber's selection criteria, built from the WebSocket
/// `{action: "subscribe", data: {...}}` payload.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionFilter {
    /// Event types to include; empty means "all types".
    pub event_types: HashSet<EventType>,
    /// Restrict to events tagged with this info-hash, if set.
    pub info_hash: Option<String>,
    /// Restrict to events at or above this priority class, if set.
    pub priority_filter: Option<EventPriority>,
}

impl SubscriptionFilter {
    /// A filter that admits every event (the default subscription).
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Whether `event` passes this filter's type/info-hash/priority
    /// criteria (rate limiting is separate; see [`RateLimiter`]).
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        if !self.event_types.is_empty() && !self.event_types.contains(&event.event_type) {
            return false;
        }
        if let Some(hash) = &self.info_hash {
            if event.info_hash.as_deref() != Some(hash.as_str()) {
                return false;
            }
        }
        if let Some(min_priority) = self.priority_filter {
            if priority_rank(event.event_type.priority()) < priority_rank(min_priority) {
                return false;
            }
        }
        true
    }
}

const fn priority_rank(priority: EventPriority) -> u8 {
    match priority {
        EventPriority::Low => 0,
        EventPriority::Normal => 1,
        EventPriority::High => 2,
        EventPriority::Critical => 3,
    }
}

/// Per-subscriber token-bucket rate limiter.
///
/// Overflow events are dropped silently for that subscriber; the bucket
/// refills continuously at `rate` tokens/second up to `rate` tokens of
/// burst capacity.
pub struct RateLimiter {
    rate_per_second: f64,
    state: Mutex<BucketState>,
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    /// Construct a limiter admitting up to `rate_per_second` events/second.
    #[must_use]
    pub fn new(rate_per_second: f64) -> Self {
        Self {
            rate_per_second: rate_per_second.max(0.0),
            state: Mutex::new(BucketState { tokens: rate_per_second.max(0.0), last_refill: Instant::now() }),
        }
    }

    /// An unbounded limiter: every event is admitted.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::new(f64::INFINITY)
    }

    /// Attempt to consume one token. Returns `true` if the event should be
    /// delivered, `false` if it should be silently dropped.
    pub async fn try_acquire(&self) -> bool {
        if self.rate_per_second.is_infinite() {
            return true;
        }
        if self.rate_per_second <= 0.0 {
            return false;
        }

        let mut state = self.state.lock().await;
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill);
        state.last_refill = now;
        state.tokens = (state.tokens + elapsed.as_secs_f64() * self.rate_per_second).min(self.rate_per_second);

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(event_type: EventType, info_hash: Option<&str>) -> Event {
        Event::new(event_type, info_hash.map(str::to_string), json!({}))
    }

    #[test]
    fn empty_type_set_matches_everything() {
        let filter = SubscriptionFilter::all();
        assert!(filter.matches(&event(EventType::TorrentAdded, None)));
        assert!(filter.matches(&event(EventType::PieceFailed, None)));
    }

    #[test]
    fn type_filter_restricts_to_selected_types() {
        let filter = SubscriptionFilter { event_types: HashSet::from([EventType::TorrentAdded]), ..Default::default() };
        assert!(filter.matches(&event(EventType::TorrentAdded, None)));
        assert!(!filter.matches(&event(EventType::TorrentRemoved, None)));
    }

    #[test]
    fn info_hash_filter_restricts_by_hash() {
        let filter = SubscriptionFilter { info_hash: Some("abc".to_string()), ..Default::default() };
        assert!(filter.matches(&event(EventType::TorrentAdded, Some("abc"))));
        assert!(!filter.matches(&event(EventType::TorrentAdded, Some("def"))));
        assert!(!filter.matches(&event(EventType::TorrentAdded, None)));
    }

    #[test]
    fn priority_filter_excludes_lower_priority_events() {
        let filter = SubscriptionFilter { priority_filter: Some(EventPriority::High), ..Default::default() };
        assert!(filter.matches(&event(EventType::PeerBanned, None)));
        assert!(!filter.matches(&event(EventType::Progress, None)));
    }

    #[tokio::test]
    async fn rate_limiter_admits_burst_then_throttles() {
        let limiter = RateLimiter::new(2.0);
        assert!(limiter.try_acquire().await);
        assert!(limiter.try_acquire().await);
        assert!(!limiter.try_acquire().await);
    }

    #[tokio::test]
    async fn zero_rate_drops_everything() {
        let limiter = RateLimiter::new(0.0);
        assert!(!limiter.try_acquire().await);
    }

    #[tokio::test]
    async fn unbounded_never_throttles() {
        let limiter = RateLimiter::unbounded();
        for _ in 0..100 {
            assert!(limiter.try_acquire().await);
        }
    }
}
