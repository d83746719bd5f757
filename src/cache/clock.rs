//! Time sources for entry timestamps and freshness checks

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

/// Source of the current time in epoch milliseconds
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall clock backed by `chrono::Utc`
///
/// Makes no attempt to handle the system clock moving backwards: an entry
/// written before such a jump looks younger than it is.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Manually driven clock for deterministic tests
///
/// Clones share the same underlying time, so a test can keep one handle and
/// advance the clock a cache was built with.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    /// Creates a clock reading `start_millis`
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start_millis)),
        }
    }

    /// Sets the current time
    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    /// Moves the clock forward by `by`, saturating at `i64::MAX`
    pub fn advance(&self, by: Duration) {
        let by = duration_millis(by);
        // The closure always returns Some, so the update cannot fail
        let _ = self
            .now
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |now| Some(now.saturating_add(by)));
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Returns true if an entry stamped at `timestamp` is still fresh at `now`.
///
/// Freshness is strict: an entry whose age equals the TTL is stale.
pub fn is_fresh_at(now: i64, timestamp: i64, ttl: Duration) -> bool {
    now.saturating_sub(timestamp) < duration_millis(ttl)
}

/// Whole milliseconds in `d`, saturating at `i64::MAX`
pub fn duration_millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}
