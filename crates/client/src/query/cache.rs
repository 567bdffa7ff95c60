//! Typed entries over an in-memory cache.
//!
//! Entries are type-erased so one cache can hold every operation's
//! result type; callers downcast through the typed accessors. Staleness
//! is computed against the entry's fetch instant rather than delegated
//! to the cache's own expiry, so a stale entry keeps serving data until
//! a refetch replaces it.

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::future::Cache;

use super::key::QueryKey;

const MAX_ENTRIES: u64 = 1_000;

/// Hard eviction horizon. Entries older than this are dropped outright;
/// staleness within the horizon only marks them for refetch.
const EVICTION_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Clone)]
struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    fetched_at: Instant,
    invalidated: bool,
}

/// Keyed result cache shared by every query operation.
pub struct QueryCache {
    entries: Cache<QueryKey, CacheEntry>,
}

impl QueryCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(MAX_ENTRIES)
                .time_to_live(EVICTION_TTL)
                .build(),
        }
    }

    /// The cached value for `key` when present and within `stale_time`,
    /// and not marked invalidated.
    pub async fn get_fresh<T: Send + Sync + 'static>(
        &self,
        key: &QueryKey,
        stale_time: Duration,
    ) -> Option<Arc<T>> {
        let entry = self.entries.get(key).await?;
        if entry.invalidated || entry.fetched_at.elapsed() >= stale_time {
            return None;
        }
        entry.value.downcast::<T>().ok()
    }

    /// The cached value for `key` regardless of freshness.
    ///
    /// Callers that fail a refetch use this to keep showing the last
    /// good data alongside the error.
    pub async fn peek<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
        let entry = self.entries.get(key).await?;
        entry.value.downcast::<T>().ok()
    }

    /// Store a freshly fetched value, clearing any invalidation mark.
    pub async fn insert<T: Send + Sync + 'static>(&self, key: QueryKey, value: Arc<T>) {
        self.entries
            .insert(
                key,
                CacheEntry {
                    value,
                    fetched_at: Instant::now(),
                    invalidated: false,
                },
            )
            .await;
        // Flush the write buffer so iteration-based invalidation sees
        // this entry immediately.
        self.entries.run_pending_tasks().await;
    }

    /// Mark every entry whose key starts with `prefix` as stale.
    ///
    /// Data stays in place; the next read misses the freshness check
    /// and triggers a refetch.
    pub async fn invalidate_prefix(&self, prefix: &QueryKey) {
        self.entries.run_pending_tasks().await;
        let matching: Vec<(Arc<QueryKey>, CacheEntry)> = self
            .entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .collect();
        for (key, mut entry) in matching {
            entry.invalidated = true;
            self.entries.insert((*key).clone(), entry).await;
        }
        self.entries.run_pending_tasks().await;
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        self.entries.invalidate_all();
        self.entries.run_pending_tasks().await;
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STALE_TIME: Duration = Duration::from_secs(300);

    #[tokio::test]
    async fn test_insert_then_get_fresh() {
        let cache = QueryCache::new();
        let key = QueryKey::new("getAllProducts");
        cache.insert(key.clone(), Arc::new(vec![1_i64, 2, 3])).await;

        let value: Arc<Vec<i64>> = cache.get_fresh(&key, STALE_TIME).await.unwrap();
        assert_eq!(*value, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_wrong_type_misses() {
        let cache = QueryCache::new();
        let key = QueryKey::new("getAllProducts");
        cache.insert(key.clone(), Arc::new(vec![1_i64])).await;

        let value: Option<Arc<String>> = cache.get_fresh(&key, STALE_TIME).await;
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_zero_stale_time_is_always_stale() {
        let cache = QueryCache::new();
        let key = QueryKey::new("getAllProducts");
        cache.insert(key.clone(), Arc::new(1_i64)).await;

        let fresh: Option<Arc<i64>> = cache.get_fresh(&key, Duration::ZERO).await;
        assert!(fresh.is_none());

        // Stale, not gone.
        let peeked: Arc<i64> = cache.peek(&key).await.unwrap();
        assert_eq!(*peeked, 1);
    }

    #[tokio::test]
    async fn test_invalidate_prefix_marks_without_dropping() {
        let cache = QueryCache::new();
        let filtered = QueryKey::new("getAllProducts").with("shoes");
        let other = QueryKey::new("getAllCategories");
        cache.insert(filtered.clone(), Arc::new(1_i64)).await;
        cache.insert(other.clone(), Arc::new(2_i64)).await;

        cache.invalidate_prefix(&QueryKey::new("getAllProducts")).await;

        let fresh: Option<Arc<i64>> = cache.get_fresh(&filtered, STALE_TIME).await;
        assert!(fresh.is_none());
        let peeked: Arc<i64> = cache.peek(&filtered).await.unwrap();
        assert_eq!(*peeked, 1);

        let untouched: Arc<i64> = cache.get_fresh(&other, STALE_TIME).await.unwrap();
        assert_eq!(*untouched, 2);
    }

    #[tokio::test]
    async fn test_reinsert_clears_invalidation() {
        let cache = QueryCache::new();
        let key = QueryKey::new("getProfile");
        cache.insert(key.clone(), Arc::new(1_i64)).await;
        cache.invalidate_prefix(&key).await;
        cache.insert(key.clone(), Arc::new(2_i64)).await;

        let fresh: Arc<i64> = cache.get_fresh(&key, STALE_TIME).await.unwrap();
        assert_eq!(*fresh, 2);
    }
}
