//! Query client - deduplicating, stale-while-revalidate cache over async fetches.

use crate::config::QueryConfig;
use crate::error::{Error, Result};
use crate::key::QueryKey;
use crate::observability::{NoOpMetrics, QueryMetrics};
use crate::store::{Applied, QueryStatus, QueryStore, SharedFetch, Snapshot, StoreStats};
use crate::strategy::FetchStrategy;
use futures::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Type-erased fetch function stored by observers and spawned fetch tasks.
pub(crate) type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// Per-read options.
///
/// # Example
///
/// ```ignore
/// // Only fetch lineage once the detail panel is expanded.
/// let options = QueryOptions::default().enabled(expanded);
/// ```
#[derive(Clone, Debug)]
pub struct QueryOptions {
    /// When false no fetch is performed and data is withheld.
    pub enabled: bool,
    pub strategy: FetchStrategy,
    /// Overrides the configured freshness window.
    pub stale_time: Option<Duration>,
    /// Overrides the configured retry count.
    pub retry: Option<u32>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        QueryOptions {
            enabled: true,
            strategy: FetchStrategy::Refresh,
            stale_time: None,
            retry: None,
        }
    }
}

impl QueryOptions {
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_strategy(mut self, strategy: FetchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = Some(stale_time);
        self
    }

    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = Some(retry);
        self
    }
}

/// What a subscriber sees for one key.
#[derive(Clone, Debug)]
pub struct QueryState<T> {
    pub data: Option<T>,
    pub status: QueryStatus,
    pub error: Option<Error>,
    /// A fetch for this key is in flight.
    pub is_fetching: bool,
    /// Data is older than the freshness window or was invalidated.
    pub is_stale: bool,
    pub updated_at: Option<Instant>,
}

impl<T> QueryState<T> {
    pub fn is_pending(&self) -> bool {
        self.status == QueryStatus::Pending
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    /// Withheld state returned for disabled queries.
    fn disabled() -> Self {
        QueryState {
            data: None,
            status: QueryStatus::Pending,
            error: None,
            is_fetching: false,
            is_stale: false,
            updated_at: None,
        }
    }
}

/// What a read decided to do while holding the entry.
enum Decision {
    Hit,
    StaleHit,
    Wait(SharedFetch),
    CacheOnly,
}

struct Inner {
    store: QueryStore,
    config: QueryConfig,
    metrics: Arc<dyn QueryMetrics>,
}

/// Shared cache of keyed asynchronous reads.
///
/// Cheap to clone; all clones share one [`QueryStore`]. Construct one per
/// application (or per test) and pass it explicitly.
///
/// # Example
///
/// ```ignore
/// use barcode_client::{query_key, QueryClient, QueryConfig, QueryOptions};
///
/// let client = QueryClient::new(QueryConfig::default());
/// let state = client
///     .query(query_key!["enums"], || api.get_json::<EnumsResponse>("dbtc/enums"), QueryOptions::default())
///     .await?;
/// ```
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<Inner>,
}

impl QueryClient {
    /// Create a client with a fresh, empty store.
    pub fn new(config: QueryConfig) -> Self {
        QueryClient {
            inner: Arc::new(Inner {
                store: QueryStore::new(),
                config,
                metrics: Arc::new(NoOpMetrics),
            }),
        }
    }

    /// Set custom metrics handler.
    pub fn with_metrics(self, metrics: Box<dyn QueryMetrics>) -> Self {
        QueryClient {
            inner: Arc::new(Inner {
                store: self.inner.store.clone(),
                config: self.inner.config.clone(),
                metrics: Arc::from(metrics),
            }),
        }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &QueryStore {
        &self.inner.store
    }

    /// Subscribe to `key` and return an observer that reads through `fetch`.
    ///
    /// The subscription lasts as long as the observer.
    pub fn observe<T, F, Fut>(&self, key: QueryKey, fetch: F, options: QueryOptions) -> QueryObserver<T>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let subscription = Subscription::new(self.inner.store.clone(), key.clone());
        QueryObserver {
            client: self.clone(),
            key,
            fetcher: erase(fetch),
            options,
            _subscription: subscription,
            _marker: PhantomData,
        }
    }

    /// One-shot read: subscribe, read with `options`, unsubscribe.
    ///
    /// # Errors
    /// Only terminal errors are returned directly: the redirect statuses (401/403)
    /// and a cached value that does not deserialize into `T`. Fetch failures are
    /// reported in [`QueryState::error`].
    pub async fn query<T, F, Fut>(&self, key: QueryKey, fetch: F, options: QueryOptions) -> Result<QueryState<T>>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.observe(key, fetch, options).result().await
    }

    /// Return cached data if fresh, otherwise fetch and wait. Never returns stale data.
    ///
    /// # Errors
    /// Returns the fetch error when no fresh value could be obtained.
    pub async fn fetch_query<T, F, Fut>(&self, key: QueryKey, fetch: F, options: QueryOptions) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let fetcher = erase(fetch);
        let stale_time = self.stale_time(&key, &options);
        let retry = self.retry(&options);

        let fresh = self.inner.store.with_entry(&key, |e| {
            match e.data.clone() {
                Some(value) if !e.is_stale(stale_time) => Ok(value),
                _ => Err(self.join_or_start(&key, e, &fetcher, retry)),
            }
        });

        let value = match fresh {
            Ok(value) => {
                self.inner.metrics.record_hit(&key.to_string());
                value
            }
            Err(pending) => pending.await?,
        };
        Ok(serde_json::from_value(value)?)
    }

    /// Read cached data for `key` without any network activity.
    ///
    /// # Errors
    /// Returns `Error::Deserialization` if the cached value is not a `T`.
    pub fn get_query_data<T: DeserializeOwned>(&self, key: &QueryKey) -> Result<Option<T>> {
        match self.inner.store.snapshot(key).and_then(|s| s.data) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Atomically replace the value for `key`.
    ///
    /// Fetches already in flight for the key are superseded and their results discarded.
    ///
    /// # Errors
    /// Returns `Error::Deserialization` if `value` does not serialize.
    pub fn set_query_data<T: Serialize>(&self, key: &QueryKey, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.inner.store.set_data(key, value);
        debug!("✓ Query data set for {}", key);
        Ok(())
    }

    /// Mark every entry whose key starts with `prefix` stale.
    ///
    /// Stale values stay visible; the next read revalidates. Returns the
    /// number of matched entries. Calling it twice is the same as once.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let count = self.inner.store.invalidate(prefix);
        self.inner.metrics.record_invalidate(&prefix.to_string(), count);
        debug!("✓ Invalidated {} entries under {}", count, prefix);
        count
    }

    /// Drop every entry under `prefix`.
    pub fn remove_queries(&self, prefix: &QueryKey) -> usize {
        self.inner.store.remove(prefix)
    }

    /// Evict idle entries past the configured `gc_time`.
    pub fn collect_garbage(&self) -> usize {
        self.inner.store.collect_garbage(self.inner.config.gc_time)
    }

    pub fn stats(&self) -> StoreStats {
        self.inner.store.stats()
    }

    /// Teardown: drop every entry.
    pub fn clear(&self) {
        self.inner.store.clear();
    }

    /// Wait for the fetch currently in flight for `key`, if any.
    pub async fn settled(&self, key: &QueryKey) {
        if let Some(pending) = self.inner.store.in_flight(key) {
            let _ = pending.await;
        }
    }

    fn stale_time(&self, key: &QueryKey, options: &QueryOptions) -> Duration {
        options.stale_time.unwrap_or_else(|| {
            self.inner
                .config
                .stale_policy
                .stale_time(key.resource(), self.inner.config.stale_time)
        })
    }

    fn retry(&self, options: &QueryOptions) -> u32 {
        options.retry.unwrap_or(self.inner.config.retry)
    }

    /// Core read path shared by observers.
    async fn read<T: DeserializeOwned>(
        &self,
        key: &QueryKey,
        fetcher: &Fetcher,
        options: &QueryOptions,
        strategy: FetchStrategy,
    ) -> Result<QueryState<T>> {
        if !options.enabled {
            debug!("Query {} disabled, withholding data", key);
            return Ok(QueryState::disabled());
        }

        let stale_time = self.stale_time(key, options);
        let retry = self.retry(options);
        let key_str = key.to_string();

        debug!("» Query read for key: {} (strategy: {})", key, strategy);

        let decision = self.inner.store.with_entry(key, |e| match strategy {
            FetchStrategy::Fresh => Decision::CacheOnly,
            FetchStrategy::Refresh => {
                if e.data.is_some() && !e.is_stale(stale_time) {
                    Decision::Hit
                } else if e.data.is_some() {
                    // Revalidate in the background; the task runs without awaiters.
                    let _ = self.join_or_start(key, e, fetcher, retry);
                    Decision::StaleHit
                } else {
                    Decision::Wait(self.join_or_start(key, e, fetcher, retry))
                }
            }
            FetchStrategy::Invalidate => {
                e.invalidated = true;
                e.invalidated_at = e.generation;
                Decision::Wait(self.join_or_start(key, e, fetcher, retry))
            }
            FetchStrategy::Bypass => Decision::Wait(self.start(key, e, fetcher, retry)),
        });

        match decision {
            Decision::Hit => {
                debug!("✓ Query hit {}", key);
                self.inner.metrics.record_hit(&key_str);
            }
            Decision::StaleHit => {
                debug!("✓ Query stale hit {}, revalidating", key);
                self.inner.metrics.record_stale_hit(&key_str);
            }
            Decision::CacheOnly => {
                debug!("Query {} read from cache only", key);
            }
            Decision::Wait(pending) => {
                if let Err(e) = pending.await {
                    if e.is_redirect() {
                        return Err(e);
                    }
                }
            }
        }

        let snapshot = self.inner.store.snapshot(key).unwrap_or_else(Snapshot::empty);
        to_state(snapshot, stale_time)
    }

    /// Share the in-flight fetch for `key`, or start one.
    fn join_or_start(
        &self,
        key: &QueryKey,
        entry: &mut crate::store::Entry,
        fetcher: &Fetcher,
        retry: u32,
    ) -> SharedFetch {
        match &entry.in_flight {
            Some(in_flight) => {
                debug!("Joining in-flight fetch for {} (generation {})", key, in_flight.generation);
                in_flight.future.clone()
            }
            None => self.start(key, entry, fetcher, retry),
        }
    }

    /// Issue a new fetch generation for `key` on a detached task.
    ///
    /// The task runs to completion even if every awaiter goes away, so the
    /// result still lands in the cache for later subscribers.
    fn start(
        &self,
        key: &QueryKey,
        entry: &mut crate::store::Entry,
        fetcher: &Fetcher,
        retry: u32,
    ) -> SharedFetch {
        let generation = self.inner.store.next_generation();
        entry.generation = generation;
        debug!("Starting fetch for {} (generation {})", key, generation);

        let task = run_fetch(
            self.inner.clone(),
            key.clone(),
            generation,
            fetcher.clone(),
            retry,
        );
        let handle = tokio::spawn(task);
        let future: SharedFetch = async move {
            match handle.await {
                Ok(result) => result,
                Err(join) => Err(Error::Other(format!("fetch task failed: {}", join))),
            }
        }
        .boxed()
        .shared();

        entry.in_flight = Some(crate::store::InFlight {
            generation,
            future: future.clone(),
        });
        future
    }
}

async fn run_fetch(
    inner: Arc<Inner>,
    key: QueryKey,
    generation: u64,
    fetcher: Fetcher,
    retry: u32,
) -> Result<Value> {
    let timer = Instant::now();
    let key_str = key.to_string();
    let mut attempts = 0;
    let max_attempts = retry + 1; // +1 for initial attempt

    let result = loop {
        attempts += 1;

        match fetcher().await {
            Ok(value) => break Ok(value),
            Err(e) => {
                if attempts >= max_attempts || !e.is_retryable() {
                    break Err(e);
                }

                debug!(
                    "Fetch for {} failed (attempt {}/{}), retrying: {}",
                    key, attempts, max_attempts, e
                );
                tokio::time::sleep(inner.config.backoff(attempts)).await;
            }
        }
    };

    match &result {
        Ok(_) => {
            inner.metrics.record_fetch(&key_str, timer.elapsed());
            info!("✓ Fetch for {} succeeded in {:?}", key, timer.elapsed());
        }
        Err(e) if e.is_redirect() => {
            debug!("Fetch for {} ended in redirect", key);
        }
        Err(e) => {
            inner.metrics.record_error(&key_str, &e.to_string());
            warn!("Fetch for {} failed after {} attempts: {}", key, attempts, e);
        }
    }

    match inner.store.complete(&key, generation, &result) {
        Applied::Stored => {}
        Applied::Superseded => {
            debug!("Discarded superseded result for {} (generation {})", key, generation);
        }
        Applied::Removed => {
            debug!("Entry {} removed before fetch completed", key);
        }
    }

    result
}

fn erase<T, F, Fut>(fetch: F) -> Fetcher
where
    T: Serialize + Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    Arc::new(move || {
        let fut = fetch();
        async move {
            let value = fut.await?;
            Ok(serde_json::to_value(value)?)
        }
        .boxed()
    })
}

fn to_state<T: DeserializeOwned>(snapshot: Snapshot, stale_time: Duration) -> Result<QueryState<T>> {
    let is_stale = snapshot.is_invalidated
        || snapshot.status != QueryStatus::Success
        || snapshot.updated_at.map_or(true, |at| at.elapsed() >= stale_time);
    let data = match snapshot.data {
        Some(value) => Some(serde_json::from_value(value)?),
        None => None,
    };
    Ok(QueryState {
        data,
        status: snapshot.status,
        error: snapshot.error,
        is_fetching: snapshot.is_fetching,
        is_stale,
        updated_at: snapshot.updated_at,
    })
}

/// Counts one subscriber of a key for as long as it lives.
///
/// Dropping it never cancels a shared in-flight fetch.
pub struct Subscription {
    store: QueryStore,
    key: QueryKey,
}

impl Subscription {
    fn new(store: QueryStore, key: QueryKey) -> Self {
        store.subscribe(&key);
        Subscription { store, key }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.store.unsubscribe(&self.key);
    }
}

/// A mounted view's handle on one key.
///
/// Holds a subscription, the fetch function and the read options. Re-created
/// cheaply per view; deterministic for the same arguments.
pub struct QueryObserver<T> {
    client: QueryClient,
    key: QueryKey,
    fetcher: Fetcher,
    options: QueryOptions,
    _subscription: Subscription,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> QueryObserver<T> {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    pub fn is_enabled(&self) -> bool {
        self.options.enabled
    }

    /// Toggle gated fetching (e.g. when a detail panel is expanded).
    pub fn set_enabled(&mut self, enabled: bool) {
        self.options.enabled = enabled;
    }

    /// Read using the observer's strategy (stale-while-revalidate by default).
    ///
    /// # Errors
    /// See [`QueryClient::query`].
    pub async fn result(&self) -> Result<QueryState<T>> {
        self.client
            .read(&self.key, &self.fetcher, &self.options, self.options.strategy)
            .await
    }

    /// Force a new fetch generation and wait for it.
    ///
    /// # Errors
    /// Returns `Error::Disabled` while the observer is gated off, otherwise as
    /// [`QueryClient::query`].
    pub async fn refetch(&self) -> Result<QueryState<T>> {
        if !self.options.enabled {
            return Err(Error::Disabled);
        }
        self.client
            .read(&self.key, &self.fetcher, &self.options, FetchStrategy::Bypass)
            .await
    }

    /// Current cached state, no network activity.
    ///
    /// # Errors
    /// Returns `Error::Deserialization` if the cached value is not a `T`.
    pub fn current(&self) -> Result<QueryState<T>> {
        if !self.options.enabled {
            return Ok(QueryState::disabled());
        }
        let stale_time = self.client.stale_time(&self.key, &self.options);
        let snapshot = self
            .client
            .inner
            .store
            .snapshot(&self.key)
            .unwrap_or_else(Snapshot::empty);
        to_state(snapshot, stale_time)
    }
}
