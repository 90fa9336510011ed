//! Error types for the event bus.

use thiserror::Error;

/// Errors raised by [`crate::EventBus`] and its subscribers.
#[derive(Debug, Error)]
pub enum EventBusError {
    /// The bus's broadcast channel was closed (all senders dropped).
    #[error("event bus is closed")]
    Closed,
}

/// Convenience alias for fallible event bus operations.
pub type EventBusResult<T> = Result<T, EventBusError>;
