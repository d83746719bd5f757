//! TTL cache over an async key-value store
//!
//! `TtlCache` stores one `CacheEntry` per slot and serves it until the slot's
//! TTL has elapsed. Stale entries are removed lazily when a read finds them;
//! there is no background sweep. Every storage or decode failure is reported to
//! the observer and then treated as a miss (reads) or a no-op (writes, clears).

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::clock::{is_fresh_at, Clock, SystemClock};
use super::entry::CacheEntry;
use super::observer::{CacheEvent, CacheObserver, CacheOp, TracingObserver};
use super::slot::{AuthDataSlot, PlansDataSlot, Slot, SlotId, UserDataSlot};
use super::store::{KeyValueStore, StoreError, StoreResult};

/// Errors for untyped writes whose input does not fit the slot
#[derive(Debug, Error)]
pub enum CacheError {
    /// The supplied JSON does not decode into the slot's value type
    #[error("Invalid value for slot {slot}: {source}")]
    InvalidValue {
        slot: SlotId,
        #[source]
        source: serde_json::Error,
    },
}

/// Freshness of a slot as seen by `inspect`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    /// Nothing stored
    Absent,
    /// Stored and younger than the slot's TTL
    Fresh { age: Duration },
    /// Stored but past its TTL; the next read will evict it
    Stale { age: Duration },
    /// Stored but unreadable (storage error or malformed entry)
    Unreadable,
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotStatus::Absent => write!(f, "absent"),
            SlotStatus::Fresh { age } => write!(f, "fresh (age {}s)", age.as_secs()),
            SlotStatus::Stale { age } => write!(f, "stale (age {}s)", age.as_secs()),
            SlotStatus::Unreadable => write!(f, "unreadable"),
        }
    }
}

/// Slot-based cache with per-slot TTLs
///
/// Cloning is cheap and clones share the same store, clock and observer, so a
/// single instance can be created at startup and handed to every consumer.
#[derive(Clone)]
pub struct TtlCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    observer: Arc<dyn CacheObserver>,
}

impl fmt::Debug for TtlCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlCache").finish_non_exhaustive()
    }
}

impl TtlCache {
    /// Creates a cache over `store` using the system clock and tracing observer
    pub fn new<S: KeyValueStore + 'static>(store: Arc<S>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replaces the time source
    pub fn with_clock<C: Clock + 'static>(self, clock: C) -> Self {
        Self {
            clock: Arc::new(clock),
            ..self
        }
    }

    /// Replaces the observer that receives cache events
    pub fn with_observer<O: CacheObserver + 'static>(self, observer: Arc<O>) -> Self {
        Self { observer, ..self }
    }

    /// Stores `value` in slot `S`, replacing any previous entry and resetting its age
    pub async fn write<S: Slot>(&self, value: &S::Value) {
        self.write_entry(S::ID, value).await;
    }

    /// Returns the value in slot `S` if one is stored and still fresh
    ///
    /// A stale entry is deleted from storage and reported as absent. Storage and
    /// decode failures are reported to the observer and also yield `None`.
    pub async fn read<S: Slot>(&self) -> Option<S::Value> {
        self.read_entry::<S::Value>(S::ID).await
    }

    /// Removes the entry for `slot`, if any
    pub async fn clear(&self, slot: SlotId) {
        match self.store.delete(slot.key()).await {
            Ok(()) => self.observer.on_event(&CacheEvent::Cleared { slot }),
            Err(e) => self.report_failure(slot, CacheOp::Clear, &e),
        }
    }

    /// Clears every slot
    pub async fn clear_all(&self) {
        join_all(SlotId::ALL.iter().map(|slot| self.clear(*slot))).await;
    }

    /// Returns true if something written at `timestamp` is still within `ttl` now
    pub fn is_fresh(&self, timestamp: i64, ttl: Duration) -> bool {
        is_fresh_at(self.clock.now_millis(), timestamp, ttl)
    }

    /// Reports the state of `slot` without evicting or decoding its payload
    pub async fn inspect(&self, slot: SlotId) -> SlotStatus {
        let raw = match self.store.get(slot.key()).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return SlotStatus::Absent,
            Err(e) => {
                self.report_failure(slot, CacheOp::Read, &e);
                return SlotStatus::Unreadable;
            }
        };

        let entry: CacheEntry<IgnoredAny> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                self.report_failure(slot, CacheOp::Read, &StoreError::from(e));
                return SlotStatus::Unreadable;
            }
        };

        let now = self.clock.now_millis();
        let age = entry.age_at(now);
        if entry.is_fresh_at(now, slot.ttl()) {
            SlotStatus::Fresh { age }
        } else {
            SlotStatus::Stale { age }
        }
    }

    /// Untyped read of `slot`, with the same freshness and eviction rules as `read`
    pub async fn read_raw(&self, slot: SlotId) -> Option<Value> {
        self.read_entry::<Value>(slot).await
    }

    /// Untyped write of `slot`
    ///
    /// The value must decode into the slot's value type. Storage failures are
    /// still absorbed; only a mismatched value is returned as an error.
    pub async fn write_raw(&self, slot: SlotId, value: Value) -> Result<(), CacheError> {
        let checked = match slot {
            SlotId::UserData => check_shape::<UserDataSlot>(&value),
            SlotId::PlansData => check_shape::<PlansDataSlot>(&value),
            SlotId::AuthData => check_shape::<AuthDataSlot>(&value),
        };
        checked.map_err(|source| CacheError::InvalidValue { slot, source })?;

        self.write_entry(slot, &value).await;
        Ok(())
    }

    async fn write_entry<T: Serialize + ?Sized>(&self, slot: SlotId, value: &T) {
        let entry = CacheEntry::new(self.clock.now_millis(), value);
        let result = match serde_json::to_string(&entry) {
            Ok(json) => self.store.set(slot.key(), json).await,
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(()) => self.observer.on_event(&CacheEvent::Written { slot }),
            Err(e) => self.report_failure(slot, CacheOp::Write, &e),
        }
    }

    async fn read_entry<T: DeserializeOwned>(&self, slot: SlotId) -> Option<T> {
        let raw = match self.store.get(slot.key()).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                self.observer.on_event(&CacheEvent::Miss { slot });
                return None;
            }
            Err(e) => {
                self.report_failure(slot, CacheOp::Read, &e);
                return None;
            }
        };

        let entry: CacheEntry<T> = match decode(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                self.report_failure(slot, CacheOp::Read, &e);
                return None;
            }
        };

        let now = self.clock.now_millis();
        let age = entry.age_at(now);
        if entry.is_fresh_at(now, slot.ttl()) {
            self.observer.on_event(&CacheEvent::Hit { slot, age });
            return Some(entry.data);
        }

        self.evict(slot, age).await;
        None
    }

    /// Deletes a stale entry; failure does not affect the read that found it
    async fn evict(&self, slot: SlotId, age: Duration) {
        match self.store.delete(slot.key()).await {
            Ok(()) => self.observer.on_event(&CacheEvent::Expired { slot, age }),
            Err(e) => self.report_failure(slot, CacheOp::Evict, &e),
        }
    }

    fn report_failure(&self, slot: SlotId, op: CacheOp, error: &StoreError) {
        let event = match (op, error) {
            (CacheOp::Read, StoreError::Serialization(e)) => CacheEvent::DecodeFailure {
                slot,
                error: e.to_string(),
            },
            _ => CacheEvent::StorageFailure {
                slot,
                op,
                error: error.to_string(),
            },
        };
        self.observer.on_event(&event);
    }
}

fn decode<T: DeserializeOwned>(raw: &str) -> StoreResult<CacheEntry<T>> {
    Ok(serde_json::from_str(raw)?)
}

fn check_shape<S: Slot>(value: &Value) -> Result<(), serde_json::Error> {
    <S::Value as Deserialize>::deserialize(value).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;
    use crate::cache::observer::RecordingObserver;
    use crate::cache::store::{FileStore, MemoryStore};
    use crate::data::{AuthData, Plan};
    use async_trait::async_trait;
    use serde_json::json;
    use tempfile::TempDir;

    /// Store whose every call fails
    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> StoreResult<Option<String>> {
            Err(StoreError::Unavailable("offline".to_string()))
        }

        async fn set(&self, _key: &str, _value: String) -> StoreResult<()> {
            Err(StoreError::Unavailable("offline".to_string()))
        }

        async fn delete(&self, _key: &str) -> StoreResult<()> {
            Err(StoreError::Unavailable("offline".to_string()))
        }
    }

    /// Store that reads fine but refuses deletes
    #[derive(Default)]
    struct NoDeleteStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl KeyValueStore for NoDeleteStore {
        async fn get(&self, key: &str) -> StoreResult<Option<String>> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: String) -> StoreResult<()> {
            self.inner.set(key, value).await
        }

        async fn delete(&self, _key: &str) -> StoreResult<()> {
            Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }
    }

    fn auth(user: &str) -> AuthData {
        AuthData {
            username: user.to_string(),
            ..Default::default()
        }
    }

    fn create_test_cache() -> (TtlCache, Arc<MemoryStore>, ManualClock, Arc<RecordingObserver>) {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(1_000_000);
        let observer = Arc::new(RecordingObserver::new());
        let cache = TtlCache::new(store.clone())
            .with_clock(clock.clone())
            .with_observer(observer.clone());
        (cache, store, clock, observer)
    }

    #[tokio::test]
    async fn test_read_after_write_returns_value() {
        let (cache, _store, _clock, observer) = create_test_cache();

        cache.write::<AuthDataSlot>(&auth("a")).await;

        assert_eq!(cache.read::<AuthDataSlot>().await, Some(auth("a")));
        assert!(matches!(
            observer.events().last(),
            Some(CacheEvent::Hit { slot: SlotId::AuthData, .. })
        ));
    }

    #[tokio::test]
    async fn test_read_missing_reports_miss() {
        let (cache, _store, _clock, observer) = create_test_cache();

        assert!(cache.read::<PlansDataSlot>().await.is_none());
        assert_eq!(observer.events(), vec![CacheEvent::Miss { slot: SlotId::PlansData }]);
    }

    #[tokio::test]
    async fn test_stored_entry_has_timestamp_and_data() {
        let (cache, store, _clock, _observer) = create_test_cache();
        let plans = vec![Plan {
            id: "1".to_string(),
            name: "Basic".to_string(),
            ..Default::default()
        }];

        cache.write::<PlansDataSlot>(&plans).await;

        let raw = store.get("plansData").await.unwrap().expect("entry stored");
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, json!({"timestamp": 1_000_000, "data": [{"id": "1", "name": "Basic"}]}));
    }

    #[tokio::test]
    async fn test_stale_read_evicts_entry() {
        let (cache, store, clock, observer) = create_test_cache();

        cache.write::<AuthDataSlot>(&auth("a")).await;
        clock.advance(SlotId::AuthData.ttl());

        assert!(cache.read::<AuthDataSlot>().await.is_none());
        assert!(store.get("authData").await.unwrap().is_none());
        assert!(matches!(
            observer.events().last(),
            Some(CacheEvent::Expired { slot: SlotId::AuthData, .. })
        ));
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_absent_and_reported() {
        let (cache, store, _clock, observer) = create_test_cache();
        store.set("userData", "not json".to_string()).await.unwrap();

        assert!(cache.read::<UserDataSlot>().await.is_none());
        assert!(matches!(
            observer.events().last(),
            Some(CacheEvent::DecodeFailure { slot: SlotId::UserData, .. })
        ));
    }

    #[tokio::test]
    async fn test_wrong_shape_entry_is_absent() {
        let (cache, store, _clock, observer) = create_test_cache();
        store
            .set("plansData", r#"{"timestamp":1000000,"data":{"not":"a list"}}"#.to_string())
            .await
            .unwrap();

        assert!(cache.read::<PlansDataSlot>().await.is_none());
        assert_eq!(observer.failure_count(), 1);
    }

    #[tokio::test]
    async fn test_broken_store_never_fails_caller() {
        let observer = Arc::new(RecordingObserver::new());
        let cache = TtlCache::new(Arc::new(BrokenStore)).with_observer(observer.clone());

        cache.write::<AuthDataSlot>(&auth("a")).await;
        assert!(cache.read::<AuthDataSlot>().await.is_none());
        cache.clear(SlotId::AuthData).await;
        cache.clear_all().await;
        assert_eq!(cache.inspect(SlotId::AuthData).await, SlotStatus::Unreadable);

        assert!(observer.events().iter().all(|e| matches!(e, CacheEvent::StorageFailure { .. })));
        assert_eq!(observer.failure_count(), 7);
    }

    #[tokio::test]
    async fn test_failed_eviction_still_reads_absent() {
        let store = Arc::new(NoDeleteStore::default());
        let clock = ManualClock::new(0);
        let observer = Arc::new(RecordingObserver::new());
        let cache = TtlCache::new(store.clone())
            .with_clock(clock.clone())
            .with_observer(observer.clone());

        cache.write::<AuthDataSlot>(&auth("a")).await;
        clock.advance(Duration::from_secs(3600));

        assert!(cache.read::<AuthDataSlot>().await.is_none());
        assert!(matches!(
            observer.events().last(),
            Some(CacheEvent::StorageFailure { op: CacheOp::Evict, .. })
        ));
        assert!(store.get("authData").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let (cache, store, _clock, _observer) = create_test_cache();

        cache.clear(SlotId::PlansData).await;
        cache.write::<AuthDataSlot>(&auth("a")).await;
        cache.clear(SlotId::AuthData).await;
        cache.clear(SlotId::AuthData).await;

        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_clear_all_leaves_store_empty() {
        let (cache, store, _clock, _observer) = create_test_cache();
        cache.write::<AuthDataSlot>(&auth("a")).await;
        cache.write::<PlansDataSlot>(&vec![]).await;
        assert_eq!(store.len().await, 2);

        cache.clear_all().await;

        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_is_fresh_uses_cache_clock() {
        let (cache, _store, clock, _observer) = create_test_cache();
        clock.set(10_000);

        assert!(cache.is_fresh(9_000, Duration::from_millis(1_001)));
        assert!(!cache.is_fresh(9_000, Duration::from_millis(1_000)));
    }

    #[tokio::test]
    async fn test_inspect_does_not_evict() {
        let (cache, store, clock, _observer) = create_test_cache();
        assert_eq!(cache.inspect(SlotId::UserData).await, SlotStatus::Absent);

        cache.write::<AuthDataSlot>(&auth("a")).await;
        clock.advance(Duration::from_secs(30));
        assert_eq!(
            cache.inspect(SlotId::AuthData).await,
            SlotStatus::Fresh { age: Duration::from_secs(30) }
        );

        clock.advance(Duration::from_secs(100));
        assert_eq!(
            cache.inspect(SlotId::AuthData).await,
            SlotStatus::Stale { age: Duration::from_secs(130) }
        );
        assert!(store.get("authData").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_write_raw_validates_shape() {
        let (cache, _store, _clock, _observer) = create_test_cache();

        let err = cache
            .write_raw(SlotId::PlansData, json!({"id": "1"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("plansData"));

        cache
            .write_raw(SlotId::AuthData, json!({"username": "a", "custom": true}))
            .await
            .expect("valid auth data");
        assert_eq!(
            cache.read_raw(SlotId::AuthData).await,
            Some(json!({"username": "a", "custom": true}))
        );
    }

    #[tokio::test]
    async fn test_file_store_backed_cache() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = Arc::new(FileStore::with_dir(temp_dir.path().to_path_buf()));
        let cache = TtlCache::new(store);

        cache.write::<AuthDataSlot>(&auth("file")).await;

        assert!(temp_dir.path().join("authData.json").exists());
        assert_eq!(cache.read::<AuthDataSlot>().await, Some(auth("file")));

        cache.clear_all().await;
        assert!(!temp_dir.path().join("authData.json").exists());
    }

    #[test]
    fn test_slot_status_display() {
        assert_eq!(SlotStatus::Absent.to_string(), "absent");
        assert_eq!(
            SlotStatus::Fresh { age: Duration::from_secs(61) }.to_string(),
            "fresh (age 61s)"
        );
    }
}
