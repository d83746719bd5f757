use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::clock::is_fresh_at;

/// A stored value and the time it was written
///
/// Serialized as `{"timestamp": <epoch ms>, "data": <value>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// When the entry was written (epoch milliseconds)
    pub timestamp: i64,
    /// The cached payload
    pub data: T,
}

impl<T> CacheEntry<T> {
    pub fn new(timestamp: i64, data: T) -> Self {
        Self { timestamp, data }
    }

    /// Age of the entry at `now`, clamped to zero if the clock went backwards
    pub fn age_at(&self, now: i64) -> Duration {
        Duration::from_millis(now.saturating_sub(self.timestamp).max(0) as u64)
    }

    pub fn is_fresh_at(&self, now: i64, ttl: Duration) -> bool {
        is_fresh_at(now, self.timestamp, ttl)
    }
}
