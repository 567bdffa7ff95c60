//! Query execution: caching, coalescing, retry, pagination, mutations.
//!
//! Every read goes through [`QueryClient::query`] or the infinite-query
//! pair; every write goes through [`QueryClient::mutation`], which runs
//! the post-success pipeline in a fixed order: write-through to the
//! local store, cache invalidation, then caller notification.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, instrument, warn};

use super::cache::QueryCache;
use super::key::QueryKey;
use super::pagination::INITIAL_PAGE;
use crate::error::Result;
use crate::store::StoreError;

/// Backoff delays never grow past this.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Tuning knobs for query execution.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// How long a cached result counts as fresh.
    pub stale_time: Duration,
    /// Retries after the first failed attempt.
    pub retry: u32,
    /// Delay before the first retry; doubles each attempt.
    pub retry_base_delay: Duration,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(300),
            retry: 3,
            retry_base_delay: Duration::from_secs(1),
        }
    }
}

/// Whether a failed mutation may be retried.
///
/// Retrying a non-idempotent request can apply the change twice, so
/// only mutations declared idempotent get the retry schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Idempotent,
    NonIdempotent,
}

/// The result of a successful mutation.
///
/// A failed write-through does not fail the mutation; the remote write
/// already happened and the caches were invalidated, so the store
/// failure is carried alongside the data for the caller to report.
#[derive(Debug)]
pub struct MutationOutcome<T> {
    pub data: T,
    pub write_error: Option<StoreError>,
}

/// The accumulated pages of an infinite query.
#[derive(Debug, Clone)]
pub struct PageSnapshot<T> {
    pages: Arc<Vec<Vec<T>>>,
    next_page: Option<u32>,
}

impl<T> PageSnapshot<T> {
    pub fn pages(&self) -> &[Vec<T>] {
        &self.pages
    }

    #[must_use]
    pub fn next_page(&self) -> Option<u32> {
        self.next_page
    }

    #[must_use]
    pub fn has_next_page(&self) -> bool {
        self.next_page.is_some()
    }
}

impl<T: Clone> PageSnapshot<T> {
    /// All fetched items in page order.
    #[must_use]
    pub fn items(&self) -> Vec<T> {
        self.pages.iter().flatten().cloned().collect()
    }
}

/// The shared query engine.
///
/// Cheap to clone; all clones share one cache and one set of in-flight
/// locks, so concurrent callers of the same key coalesce onto a single
/// fetch.
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<QueryClientInner>,
}

struct QueryClientInner {
    cache: QueryCache,
    locks: Mutex<HashMap<QueryKey, Arc<tokio::sync::Mutex<()>>>>,
    options: QueryOptions,
}

impl QueryClient {
    #[must_use]
    pub fn new(options: QueryOptions) -> Self {
        Self {
            inner: Arc::new(QueryClientInner {
                cache: QueryCache::new(),
                locks: Mutex::new(HashMap::new()),
                options,
            }),
        }
    }

    /// Run a cached read.
    ///
    /// A fresh cache hit returns without calling `fetch`. On a miss or
    /// stale hit, one caller fetches (with the retry schedule) while
    /// concurrent callers of the same key wait and reuse the result.
    /// `sync` runs once per successful fetch, before the data is
    /// returned, and never on a cache hit.
    ///
    /// # Errors
    ///
    /// Returns the fetch error after retries are exhausted. The stale
    /// value, if any, stays cached; read it back with [`Self::cached`].
    #[instrument(skip(self, fetch, sync), fields(key = %key))]
    pub async fn query<T, F, Fut, S>(&self, key: QueryKey, fetch: F, mut sync: S) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
        S: FnMut(&T),
    {
        let stale_time = self.inner.options.stale_time;
        if let Some(hit) = self.inner.cache.get_fresh::<T>(&key, stale_time).await {
            debug!("cache hit");
            return Ok(hit);
        }

        let lock = self.key_lock(&key);
        let result = {
            let _guard = lock.lock().await;

            // A concurrent caller may have fetched while we waited.
            if let Some(hit) = self.inner.cache.get_fresh::<T>(&key, stale_time).await {
                debug!("coalesced onto concurrent fetch");
                Ok(hit)
            } else {
                match self.fetch_with_retry(&fetch, self.inner.options.retry).await {
                    Ok(data) => {
                        sync(&data);
                        let data = Arc::new(data);
                        self.inner.cache.insert(key.clone(), Arc::clone(&data)).await;
                        Ok(data)
                    }
                    Err(error) => Err(error),
                }
            }
        };
        self.release_key_lock(&key, &lock);
        result
    }

    /// The cached value for `key`, fresh or stale.
    pub async fn cached<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
        self.inner.cache.peek::<T>(key).await
    }

    /// Run a cached paginated read, fetching the first page on a miss.
    ///
    /// A stale or invalidated entry restarts the sequence from the
    /// first page rather than refetching every accumulated page.
    /// `get_next` derives the next cursor from the pages fetched so
    /// far; `sync` receives the newly fetched items after each fetch.
    ///
    /// # Errors
    ///
    /// Returns the fetch error after retries are exhausted.
    #[instrument(skip(self, fetch, get_next, sync), fields(key = %key))]
    pub async fn infinite_query<T, F, Fut, N, S>(
        &self,
        key: QueryKey,
        fetch: F,
        get_next: N,
        mut sync: S,
    ) -> Result<PageSnapshot<T>>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(u32) -> Fut,
        Fut: Future<Output = Result<Vec<T>>>,
        N: Fn(&[Vec<T>]) -> Option<u32>,
        S: FnMut(&[T]),
    {
        let stale_time = self.inner.options.stale_time;
        if let Some(pages) = self
            .inner
            .cache
            .get_fresh::<Vec<Vec<T>>>(&key, stale_time)
            .await
        {
            let next_page = get_next(&pages);
            return Ok(PageSnapshot { pages, next_page });
        }

        let lock = self.key_lock(&key);
        let result = {
            let _guard = lock.lock().await;

            if let Some(pages) = self
                .inner
                .cache
                .get_fresh::<Vec<Vec<T>>>(&key, stale_time)
                .await
            {
                let next_page = get_next(&pages);
                Ok(PageSnapshot { pages, next_page })
            } else {
                match self
                    .fetch_with_retry(&(|| fetch(INITIAL_PAGE)), self.inner.options.retry)
                    .await
                {
                    Ok(first) => {
                        sync(&first);
                        let pages = Arc::new(vec![first]);
                        self.inner.cache.insert(key.clone(), Arc::clone(&pages)).await;
                        let next_page = get_next(&pages);
                        Ok(PageSnapshot { pages, next_page })
                    }
                    Err(error) => Err(error),
                }
            }
        };
        self.release_key_lock(&key, &lock);
        result
    }

    /// Append the next page to an infinite query.
    ///
    /// Returns the current snapshot unchanged when the sequence is
    /// already exhausted. Concurrent callers append at most one page
    /// between them: whoever loses the lock race observes the grown
    /// page list and returns it without fetching.
    ///
    /// # Errors
    ///
    /// Returns the fetch error after retries are exhausted; the pages
    /// fetched so far stay cached.
    #[instrument(skip(self, fetch, get_next, sync), fields(key = %key))]
    pub async fn fetch_next_page<T, F, Fut, N, S>(
        &self,
        key: QueryKey,
        fetch: F,
        get_next: N,
        mut sync: S,
    ) -> Result<PageSnapshot<T>>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(u32) -> Fut,
        Fut: Future<Output = Result<Vec<T>>>,
        N: Fn(&[Vec<T>]) -> Option<u32>,
        S: FnMut(&[T]),
    {
        let current = self.inner.cache.peek::<Vec<Vec<T>>>(&key).await;
        let seen_len = current.as_ref().map_or(0, |pages| pages.len());
        let Some(next) = current.as_deref().map_or(Some(INITIAL_PAGE), |p| get_next(p)) else {
            // Exhausted; nothing to fetch.
            return Ok(PageSnapshot {
                pages: current.unwrap_or_default(),
                next_page: None,
            });
        };

        let lock = self.key_lock(&key);
        let result = {
            let _guard = lock.lock().await;

            if let Some(pages) = self.inner.cache.peek::<Vec<Vec<T>>>(&key).await
                && pages.len() > seen_len
            {
                debug!("coalesced onto concurrent page fetch");
                let next_page = get_next(&pages);
                Ok(PageSnapshot { pages, next_page })
            } else {
                match self
                    .fetch_with_retry(&(|| fetch(next)), self.inner.options.retry)
                    .await
                {
                    Ok(page) => {
                        sync(&page);
                        let mut pages: Vec<Vec<T>> = self
                            .inner
                            .cache
                            .peek::<Vec<Vec<T>>>(&key)
                            .await
                            .map(|p| (*p).clone())
                            .unwrap_or_default();
                        pages.push(page);
                        let pages = Arc::new(pages);
                        self.inner.cache.insert(key.clone(), Arc::clone(&pages)).await;
                        let next_page = get_next(&pages);
                        Ok(PageSnapshot { pages, next_page })
                    }
                    Err(error) => Err(error),
                }
            }
        };
        self.release_key_lock(&key, &lock);
        result
    }

    /// Run a mutation and its post-success pipeline.
    ///
    /// On fetch success the pipeline runs in order: `write_through`
    /// against the local store, invalidation of every key in
    /// `invalidate`, then `notify`. Invalidation and notification run
    /// even when the write-through fails; the store failure is returned
    /// in the outcome instead of aborting the pipeline.
    ///
    /// # Errors
    ///
    /// Returns the remote error when the mutation itself fails.
    /// [`MutationKind::NonIdempotent`] mutations fail on the first
    /// attempt; idempotent ones use the retry schedule.
    #[instrument(skip(self, input, fetch, write_through, notify), fields(kind = ?kind))]
    pub async fn mutation<T, I, F, Fut, W, N>(
        &self,
        kind: MutationKind,
        input: I,
        fetch: F,
        write_through: W,
        invalidate: &[QueryKey],
        notify: N,
    ) -> Result<MutationOutcome<T>>
    where
        T: Send + Sync + 'static,
        I: Clone,
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<T>>,
        W: FnOnce(&T, &I) -> std::result::Result<(), StoreError>,
        N: FnOnce(&T, &I),
    {
        let retries = match kind {
            MutationKind::Idempotent => self.inner.options.retry,
            MutationKind::NonIdempotent => 0,
        };
        let data = self
            .fetch_with_retry(&(|| fetch(input.clone())), retries)
            .await?;

        let write_error = write_through(&data, &input).err();
        if let Some(error) = &write_error {
            warn!(error = %error, "write-through to local store failed");
        }
        for key in invalidate {
            self.invalidate(key).await;
        }
        notify(&data, &input);

        Ok(MutationOutcome { data, write_error })
    }

    /// Mark every cached entry under `prefix` stale.
    pub async fn invalidate(&self, prefix: &QueryKey) {
        debug!(prefix = %prefix, "invalidating");
        self.inner.cache.invalidate_prefix(prefix).await;
    }

    /// Drop the entire cache. Used on sign-out.
    pub async fn clear(&self) {
        self.inner.cache.clear().await;
    }

    async fn fetch_with_retry<T, F, Fut>(&self, fetch: &F, retries: u32) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match fetch().await {
                Ok(data) => return Ok(data),
                Err(error) if attempt < retries => {
                    let delay = backoff_delay(self.inner.options.retry_base_delay, attempt);
                    debug!(
                        error = %error,
                        attempt,
                        delay_ms = delay.as_millis(),
                        "fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    fn key_lock(&self, key: &QueryKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .inner
            .locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Arc::clone(locks.entry(key.clone()).or_default())
    }

    /// Drop the per-key lock entry once no other task holds or awaits
    /// it, so the map does not grow with every distinct key.
    fn release_key_lock(&self, key: &QueryKey, lock: &Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self
            .inner
            .locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        // Two strong counts: ours and the map's. Anything higher means
        // another task is using this key.
        if Arc::strong_count(lock) == 2 {
            locks.remove(key);
        }
    }
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new(QueryOptions::default())
    }
}

/// Exponential backoff doubling from `base`, capped at 30 seconds.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2_u32.saturating_pow(attempt);
    base.saturating_mul(factor).min(MAX_RETRY_DELAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::{ApiError, ErrorHandlerRegistry, RawFailure};

    fn fail(status: u16) -> ApiError {
        ErrorHandlerRegistry::with_defaults().classify(&RawFailure::from_status(status, None))
    }

    fn fast_options() -> QueryOptions {
        QueryOptions {
            stale_time: Duration::from_secs(300),
            retry: 3,
            retry_base_delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let base = Duration::from_secs(1);
        assert_eq!(backoff_delay(base, 0), Duration::from_secs(1));
        assert_eq!(backoff_delay(base, 1), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, 2), Duration::from_secs(4));
        assert_eq!(backoff_delay(base, 10), MAX_RETRY_DELAY);
    }

    #[tokio::test]
    async fn test_fresh_hit_skips_fetch() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let client = QueryClient::new(fast_options());
        let key = QueryKey::new("getProfile");
        let calls = AtomicU32::new(0);

        for _ in 0..3 {
            let value = client
                .query(
                    key.clone(),
                    || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(42_i64)
                    },
                    |_| {},
                )
                .await
                .unwrap();
            assert_eq!(*value, 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_schedule_then_give_up() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let client = QueryClient::new(fast_options());
        let calls = AtomicU32::new(0);

        let result: Result<Arc<i64>> = client
            .query(
                QueryKey::new("getAllProducts"),
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(fail(500))
                },
                |_| {},
            )
            .await;

        assert!(result.is_err());
        // 1 initial attempt + 3 retries.
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_stale_data_survives_failed_refetch() {
        let client = QueryClient::new(QueryOptions {
            stale_time: Duration::ZERO,
            retry: 0,
            retry_base_delay: Duration::from_millis(1),
        });
        let key = QueryKey::new("getAllCategories");

        let value = client
            .query(key.clone(), || async { Ok(7_i64) }, |_| {})
            .await
            .unwrap();
        assert_eq!(*value, 7);

        // Zero stale-time forces a refetch, which fails.
        let result: Result<Arc<i64>> = client
            .query(key.clone(), || async { Err(fail(500)) }, |_| {})
            .await;
        assert!(result.is_err());

        let stale: Arc<i64> = client.cached(&key).await.unwrap();
        assert_eq!(*stale, 7);
    }

    #[tokio::test]
    async fn test_concurrent_callers_coalesce() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let client = QueryClient::new(fast_options());
        let key = QueryKey::new("getAllProducts");
        let calls = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let client = client.clone();
            let key = key.clone();
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                client
                    .query(
                        key,
                        || {
                            let calls = Arc::clone(&calls);
                            async move {
                                calls.fetch_add(1, Ordering::SeqCst);
                                tokio::time::sleep(Duration::from_millis(10)).await;
                                Ok(1_i64)
                            }
                        },
                        |_| {},
                    )
                    .await
            }));
        }
        for handle in handles {
            assert_eq!(*handle.await.unwrap().unwrap(), 1);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_key_locks_released_after_use() {
        let client = QueryClient::new(fast_options());

        for id in 1..=20_i64 {
            let key = QueryKey::new("getProductById").with(&id);
            let value = client
                .query(key, || async { Ok(1_i64) }, |_| {})
                .await
                .unwrap();
            assert_eq!(*value, 1);
        }
        // A failed fetch releases its lock entry too.
        let result: Result<Arc<i64>> = client
            .query(
                QueryKey::new("getAllProducts"),
                || async { Err(fail(500)) },
                |_| {},
            )
            .await;
        assert!(result.is_err());

        let locks = client.inner.locks.lock().unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let client = QueryClient::new(fast_options());
        let key = QueryKey::new("getAllProducts");
        let calls = AtomicU32::new(0);

        let fetch = || async {
            Ok(i64::from(calls.fetch_add(1, Ordering::SeqCst)))
        };

        let first = client.query(key.clone(), fetch, |_| {}).await.unwrap();
        assert_eq!(*first, 0);

        client.invalidate(&QueryKey::new("getAllProducts")).await;

        let second = client.query(key.clone(), fetch, |_| {}).await.unwrap();
        assert_eq!(*second, 1);
    }

    #[tokio::test]
    async fn test_non_idempotent_mutation_never_retries() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let client = QueryClient::new(fast_options());
        let calls = AtomicU32::new(0);

        let result = client
            .mutation(
                MutationKind::NonIdempotent,
                (),
                |()| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<i64, _>(fail(500))
                },
                |_, _| Ok(()),
                &[],
                |_, _| {},
            )
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_mutation_pipeline_order() {
        use std::sync::Mutex as StdMutex;

        let client = QueryClient::new(fast_options());
        let key = QueryKey::new("getAllProducts");

        // Seed the cache so invalidation has something to mark.
        client
            .query(key.clone(), || async { Ok(1_i64) }, |_| {})
            .await
            .unwrap();

        let steps: Arc<StdMutex<Vec<&'static str>>> = Arc::new(StdMutex::new(Vec::new()));
        let write_steps = Arc::clone(&steps);
        let notify_steps = Arc::clone(&steps);

        let outcome = client
            .mutation(
                MutationKind::NonIdempotent,
                (),
                |()| async { Ok(2_i64) },
                move |_, _| {
                    write_steps.lock().unwrap().push("write_through");
                    Ok(())
                },
                std::slice::from_ref(&key),
                move |_, _| notify_steps.lock().unwrap().push("notify"),
            )
            .await
            .unwrap();

        assert_eq!(outcome.data, 2);
        assert!(outcome.write_error.is_none());
        assert_eq!(*steps.lock().unwrap(), vec!["write_through", "notify"]);

        // The seeded entry is stale now.
        let refetched = client
            .query(key.clone(), || async { Ok(3_i64) }, |_| {})
            .await
            .unwrap();
        assert_eq!(*refetched, 3);
    }

    #[tokio::test]
    async fn test_mutation_carries_write_error() {
        let client = QueryClient::new(fast_options());

        let outcome = client
            .mutation(
                MutationKind::NonIdempotent,
                (),
                |()| async { Ok(5_i64) },
                |_, _| Err(StoreError::Conflict { id: 5 }),
                &[],
                |_, _| {},
            )
            .await
            .unwrap();

        assert_eq!(outcome.data, 5);
        assert!(matches!(outcome.write_error, Some(StoreError::Conflict { id: 5 })));
    }
}
