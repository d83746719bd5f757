//! Cache-then-fetch helpers for data loaders
//!
//! Screens that show subscriber data try the cache first and only hit the
//! billing API on a miss. Data-sensitive flows (plan upgrade, login) clear the
//! whole cache before loading so they always start from fresh data.

use std::future::Future;

use crate::cache::{Slot, TtlCache};

/// Returns the cached value for slot `S`, or fetches and caches it on a miss
///
/// A fetch error is returned as-is and leaves the cache untouched.
pub async fn load_or_fetch<S, F, Fut, E>(cache: &TtlCache, fetch: F) -> Result<S::Value, E>
where
    S: Slot,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<S::Value, E>>,
{
    // Check cache first
    if let Some(cached) = cache.read::<S>().await {
        return Ok(cached);
    }

    let value = fetch().await?;
    cache.write::<S>(&value).await;
    Ok(value)
}

/// Drops every cached slot, then loads slot `S` from the source
pub async fn refresh<S, F, Fut, E>(cache: &TtlCache, fetch: F) -> Result<S::Value, E>
where
    S: Slot,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<S::Value, E>>,
{
    cache.clear_all().await;
    load_or_fetch::<S, F, Fut, E>(cache, fetch).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{AuthDataSlot, ManualClock, MemoryStore, PlansDataSlot, SlotId};
    use crate::data::{AuthData, Plan};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn plan(id: &str) -> Plan {
        Plan {
            id: id.to_string(),
            name: format!("Plan {}", id),
            ..Default::default()
        }
    }

    fn create_test_cache() -> (TtlCache, ManualClock) {
        let clock = ManualClock::new(0);
        let cache = TtlCache::new(Arc::new(MemoryStore::new())).with_clock(clock.clone());
        (cache, clock)
    }

    #[tokio::test]
    async fn test_miss_fetches_and_caches() {
        let (cache, _clock) = create_test_cache();
        let calls = AtomicUsize::new(0);

        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(vec![plan("1")])
        };
        let first = load_or_fetch::<PlansDataSlot, _, _, _>(&cache, fetch).await.unwrap();

        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(vec![plan("2")])
        };
        let second = load_or_fetch::<PlansDataSlot, _, _, _>(&cache, fetch).await.unwrap();

        assert_eq!(first, vec![plan("1")]);
        assert_eq!(second, vec![plan("1")], "Second load should come from cache");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        let (cache, clock) = create_test_cache();
        cache.write::<PlansDataSlot>(&vec![plan("old")]).await;
        clock.advance(SlotId::PlansData.ttl());

        let result = load_or_fetch::<PlansDataSlot, _, _, _>(&cache, || async {
            Ok::<_, String>(vec![plan("new")])
        })
        .await
        .unwrap();

        assert_eq!(result, vec![plan("new")]);
        assert_eq!(cache.read::<PlansDataSlot>().await, Some(vec![plan("new")]));
    }

    #[tokio::test]
    async fn test_fetch_error_leaves_cache_empty() {
        let (cache, _clock) = create_test_cache();

        let result = load_or_fetch::<AuthDataSlot, _, _, _>(&cache, || async {
            Err::<AuthData, _>("Session expired".to_string())
        })
        .await;

        assert_eq!(result.unwrap_err(), "Session expired");
        assert!(cache.read::<AuthDataSlot>().await.is_none());
    }

    #[tokio::test]
    async fn test_refresh_bypasses_fresh_entries() {
        let (cache, _clock) = create_test_cache();
        let stale_auth = AuthData {
            username: "previous-user".to_string(),
            ..Default::default()
        };
        cache.write::<AuthDataSlot>(&stale_auth).await;
        cache.write::<PlansDataSlot>(&vec![plan("1")]).await;

        let fresh_auth = AuthData {
            username: "current-user".to_string(),
            ..Default::default()
        };
        let expected = fresh_auth.clone();
        let result = refresh::<AuthDataSlot, _, _, _>(&cache, || async move {
            Ok::<_, String>(fresh_auth)
        })
        .await
        .unwrap();

        assert_eq!(result, expected);
        assert_eq!(cache.read::<AuthDataSlot>().await, Some(expected));
        assert!(cache.read::<PlansDataSlot>().await.is_none(), "Other slots are cleared too");
    }
}
