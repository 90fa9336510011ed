//! Typed event fan-out to filtered, rate-limited subscribers.

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::filter::{RateLimiter, SubscriptionFilter};
use crate::model::Event;

const DEFAULT_CHANNEL_CAPACITY: usize = 1_024;

/// Central event bus. Every published [`Event`] is fanned out to every
/// live [`EventSubscription`], each of which applies its own filter and
/// rate limit independently — a slow or narrowly-filtered subscriber never
/// affects another.
///
/// Per-folder ordering is preserved per subscriber because the underlying
/// `tokio::broadcast` channel delivers to each receiver in publish order;
/// there is no global order across folders (per spec.md §5).
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    /// Construct a bus with the given broadcast buffer capacity. A
    /// subscriber that falls behind by more than `capacity` events will
    /// observe a lagged-receiver gap (events are dropped for it, not for
    /// other subscribers).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Construct a bus with the default buffer capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Publish an event to every current subscriber. A bus with no
    /// subscribers silently discards the event (matching `broadcast`'s
    /// `send` semantics, which error only to signal "no receivers").
    pub fn publish(&self, event: Event) {
        if self.sender.send(event).is_err() {
            debug!("event published with no active subscribers");
        }
    }

    /// Current number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Subscribe with a filter and a per-subscriber rate limit
    /// (events/second; pass `f64::INFINITY` for unbounded).
    #[must_use]
    pub fn subscribe(&self, filter: SubscriptionFilter, rate_limit_per_second: f64) -> EventSubscription {
        EventSubscription {
            receiver: self.sender.subscribe(),
            filter,
            limiter: RateLimiter::new(rate_limit_per_second),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A single subscriber's live event stream: a filter, a rate limiter, and
/// the underlying broadcast receiver.
pub struct EventSubscription {
    receiver: broadcast::Receiver<Event>,
    filter: SubscriptionFilter,
    limiter: RateLimiter,
}

impl EventSubscription {
    /// Replace this subscription's filter (used when a WebSocket client
    /// sends a new `subscribe` message mid-connection).
    pub fn set_filter(&mut self, filter: SubscriptionFilter) {
        self.filter = filter;
    }

    /// Replace this subscription's rate limit (events/second; pass
    /// `f64::INFINITY` for unbounded). Resets the token bucket, matching
    /// the behavior of subscribing fresh at the new rate.
    pub fn set_rate_limit(&mut self, rate_limit_per_second: f64) {
        self.limiter = RateLimiter::new(rate_limit_per_second);
    }

    /// Await the next event that passes both the filter and the rate
    /// limiter. Events that fail either check are skipped transparently;
    /// this never returns a dropped event.
    ///
    /// Returns `None` once the bus has been dropped and the backlog is
    /// exhausted.
    pub async fn next(&mut self) -> Option<Event> {
        loop {
            let event = match self.receiver.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "subscriber lagged; some events were dropped for it");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            };

            if !self.filter.matches(&event) {
                continue;
            }
            if !self.limiter.try_acquire().await {
                continue;
            }
            return Some(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EventType;
    use serde_json::json;
    use std::collections::HashSet;

    fn event(event_type: EventType) -> Event {
        Event::new(event_type, None, json!({"n": 1}))
    }

    #[tokio::test]
    async fn subscriber_receives_published_events() {
        let bus = EventBus::with_capacity(16);
        let mut sub = bus.subscribe(SubscriptionFilter::all(), f64::INFINITY);

        bus.publish(event(EventType::TorrentAdded));
        let received = sub.next().await.unwrap();
        assert_eq!(received.event_type, EventType::TorrentAdded);
    }

    #[tokio::test]
    async fn filtered_subscriber_only_sees_matching_events() {
        let bus = EventBus::with_capacity(16);
        let filter = SubscriptionFilter { event_types: HashSet::from([EventType::PeerConnected]), ..Default::default() };
        let mut sub = bus.subscribe(filter, f64::INFINITY);

        bus.publish(event(EventType::TorrentAdded));
        bus.publish(event(EventType::PeerConnected));

        let received = sub.next().await.unwrap();
        assert_eq!(received.event_type, EventType::PeerConnected);
    }

    #[tokio::test]
    async fn independent_subscribers_have_independent_rate_limits() {
        let bus = EventBus::with_capacity(16);
        let mut fast = bus.subscribe(SubscriptionFilter::all(), f64::INFINITY);
        let mut slow = bus.subscribe(SubscriptionFilter::all(), 0.0);

        bus.publish(event(EventType::Progress));
        assert!(fast.next().await.is_some());

        bus.publish(event(EventType::Progress));
        let slow_result = tokio::time::timeout(std::time::Duration::from_millis(50), slow.next()).await;
        assert!(slow_result.is_err(), "rate-limited subscriber should not receive any events");
    }

    #[tokio::test]
    async fn subscriber_count_tracks_live_subscriptions() {
        let bus = EventBus::with_capacity(16);
        assert_eq!(bus.subscriber_count(), 0);
        let sub_a = bus.subscribe(SubscriptionFilter::all(), f64::INFINITY);
        let sub_b = bus.subscribe(SubscriptionFilter::all(), f64::INFINITY);
        assert_eq!(bus.subscriber_count(), 2);
        drop(sub_a);
        drop(sub_b);
    }
}
