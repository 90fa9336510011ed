#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unreachable_pub,
    clippy::all,
    rustdoc::broken_intra_doc_links
)]
#![allow(clippy::module_name_repetitions)]

//! Typed, filtered, rate-limited event fan-out (component C14).
//!
//! [`EventBus`] dispatches [`Event`]s to WebSocket subscribers and
//! in-process listeners (the sync manager's observers, the TUI). Each
//! [`EventSubscription`] applies its own [`SubscriptionFilter`] (by event
//! type, info-hash, and priority class) and its own token-bucket rate
//! limit; a slow subscriber's dropped events never affect another.

mod bus;
mod error;
mod filter;
mod model;

pub use bus::{EventBus, EventSubscription};
pub use error::{EventBusError, EventBusResult};
pub use filter::{RateLimiter, SubscriptionFilter};
pub use model::{Event, EventPriority, EventType};
