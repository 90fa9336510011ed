//! A deterministic, manually-advanced clock for components that would
//! otherwise read `SystemTime::now()` (source-peer scoring in the sync
//! manager, event-bus timestamps), so tests can assert on exact elapsed
//! time instead of racing the wall clock.

use std::sync::atomic::{AtomicI64, Ordering};

/// A clock whose "current time" only moves when the test tells it to.
pub struct TestClock {
    unix_secs: AtomicI64,
}

impl TestClock {
    /// Start the clock at `unix_secs`.
    #[must_use]
    pub fn at(unix_secs: i64) -> Self {
        Self { unix_secs: AtomicI64::new(unix_secs) }
    }

    /// Current reading, seconds since the Unix epoch.
    pub fn now(&self) -> i64 {
        self.unix_secs.load(Ordering::SeqCst)
    }

    /// Move the clock forward by `secs` and return the new reading.
    pub fn advance(&self, secs: i64) -> i64 {
        self.unix_secs.fetch_add(secs, Ordering::SeqCst) + secs
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::at(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_moves_and_returns_new_time() {
        let clock = TestClock::at(1_000);
        assert_eq!(clock.advance(60), 1_060);
        assert_eq!(clock.now(), 1_060);
    }
}
