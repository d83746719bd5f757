//! Observability hook for cache activity
//!
//! The cache never surfaces storage problems to its callers. Instead every
//! notable outcome is reported as a `CacheEvent` to an injected
//! `CacheObserver`. The default observer forwards to `tracing`.

use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use super::slot::SlotId;

/// The cache operation an event relates to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOp {
    Read,
    Write,
    Clear,
    /// Deleting a stale entry found during a read
    Evict,
}

impl fmt::Display for CacheOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CacheOp::Read => "read",
            CacheOp::Write => "write",
            CacheOp::Clear => "clear",
            CacheOp::Evict => "evict",
        };
        f.write_str(name)
    }
}

/// Something that happened inside the cache
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEvent {
    /// A fresh entry was returned
    Hit { slot: SlotId, age: Duration },
    /// Nothing was stored for the slot
    Miss { slot: SlotId },
    /// A stale entry was found and evicted
    Expired { slot: SlotId, age: Duration },
    /// A new entry was stored
    Written { slot: SlotId },
    /// The slot was cleared explicitly
    Cleared { slot: SlotId },
    /// The storage medium returned an error
    StorageFailure {
        slot: SlotId,
        op: CacheOp,
        error: String,
    },
    /// A stored value did not match the expected entry shape
    DecodeFailure { slot: SlotId, error: String },
}

/// Milliseconds for log fields, saturating at `u64::MAX`
fn age_millis(age: Duration) -> u64 {
    u64::try_from(age.as_millis()).unwrap_or(u64::MAX)
}

/// Receives cache events
pub trait CacheObserver: Send + Sync {
    fn on_event(&self, event: &CacheEvent);
}

/// Observer that logs events through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl CacheObserver for TracingObserver {
    fn on_event(&self, event: &CacheEvent) {
        match event {
            CacheEvent::Hit { slot, age } => {
                tracing::debug!(slot = %slot, age_ms = age_millis(*age), "cache hit");
            }
            CacheEvent::Miss { slot } => {
                tracing::debug!(slot = %slot, "cache miss");
            }
            CacheEvent::Expired { slot, age } => {
                tracing::info!(slot = %slot, age_ms = age_millis(*age), "evicted stale entry");
            }
            CacheEvent::Written { slot } => {
                tracing::debug!(slot = %slot, "cache write");
            }
            CacheEvent::Cleared { slot } => {
                tracing::info!(slot = %slot, "cache cleared");
            }
            CacheEvent::StorageFailure { slot, op, error } => {
                tracing::warn!(slot = %slot, op = %op, error = %error, "cache storage failure");
            }
            CacheEvent::DecodeFailure { slot, error } => {
                tracing::warn!(slot = %slot, error = %error, "discarding undecodable cache entry");
            }
        }
    }
}

/// Observer that keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<CacheEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events seen so far
    pub fn events(&self) -> Vec<CacheEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of failure events (storage or decode)
    pub fn failure_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    CacheEvent::StorageFailure { .. } | CacheEvent::DecodeFailure { .. }
                )
            })
            .count()
    }
}

impl CacheObserver for RecordingObserver {
    fn on_event(&self, event: &CacheEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}
