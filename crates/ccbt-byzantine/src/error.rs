//! Error types for the Byzantine vote aggregator.

use thiserror::Error;

/// Errors raised by [`crate::ByzantineAggregator`].
#[derive(Debug, Error)]
pub enum ByzantineError {
    /// `fault_threshold` was outside the valid `[0, 1)` range.
    #[error("fault_threshold must satisfy 0 <= f < 1, got {value}")]
    InvalidFaultThreshold {
        /// The rejected value.
        value: f64,
    },
    /// A weight supplied for a vote was negative.
    #[error("vote weight must be non-negative, got {value}")]
    InvalidWeight {
        /// The rejected value.
        value: f64,
    },
}

/// Convenience alias for fallible Byzantine aggregator operations.
pub type ByzantineResult<T> = Result<T, ByzantineError>;
