//! Process-wide query store.
//!
//! Uses DashMap for concurrent access with per-key sharding. Entry guards are
//! never held across an `.await`, so every read-modify-write on one key is
//! atomic with respect to other tasks.

use crate::error::{Error, Result};
use crate::key::QueryKey;
use dashmap::DashMap;
use futures::future::{BoxFuture, Shared};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Future shared by every subscriber waiting on one fetch generation.
pub(crate) type SharedFetch = Shared<BoxFuture<'static, Result<Value>>>;

/// Lifecycle status of a query entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryStatus {
    /// No successful or failed fetch has landed yet.
    Pending,
    /// The last completed fetch succeeded.
    Success,
    /// The last completed fetch failed; earlier data may still be present.
    Error,
}

pub(crate) struct InFlight {
    pub generation: u64,
    pub future: SharedFetch,
}

/// One cached resource.
pub(crate) struct Entry {
    pub data: Option<Value>,
    pub status: QueryStatus,
    pub error: Option<Error>,
    pub updated_at: Option<Instant>,
    /// Explicitly invalidated.
    pub invalidated: bool,
    /// Highest generation issued when the entry was last invalidated.
    /// Results from generations at or below it leave the entry stale.
    pub invalidated_at: u64,
    pub subscribers: usize,
    pub idle_since: Option<Instant>,
    /// Last generation issued for this entry. Starts at a fresh store-wide
    /// value, so fetches issued before the entry existed always compare lower.
    pub generation: u64,
    pub in_flight: Option<InFlight>,
}

impl Entry {
    fn new(generation: u64) -> Self {
        Entry {
            data: None,
            status: QueryStatus::Pending,
            error: None,
            updated_at: None,
            invalidated: false,
            invalidated_at: 0,
            subscribers: 0,
            idle_since: Some(Instant::now()),
            generation,
            in_flight: None,
        }
    }

    pub fn is_stale(&self, stale_time: Duration) -> bool {
        if self.invalidated || self.status != QueryStatus::Success {
            return true;
        }
        match self.updated_at {
            Some(at) => at.elapsed() >= stale_time,
            None => true,
        }
    }

    fn is_collectable(&self, gc_time: Duration) -> bool {
        self.subscribers == 0
            && self.in_flight.is_none()
            && self.idle_since.is_some_and(|at| at.elapsed() >= gc_time)
    }
}

/// Point-in-time view of an entry, detached from the store.
#[derive(Clone, Debug)]
pub(crate) struct Snapshot {
    pub data: Option<Value>,
    pub status: QueryStatus,
    pub error: Option<Error>,
    pub updated_at: Option<Instant>,
    pub is_fetching: bool,
    pub is_invalidated: bool,
}

impl Snapshot {
    pub fn empty() -> Self {
        Snapshot {
            data: None,
            status: QueryStatus::Pending,
            error: None,
            updated_at: None,
            is_fetching: false,
            is_invalidated: false,
        }
    }
}

/// How a finished fetch generation was applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Applied {
    Stored,
    Superseded,
    Removed,
}

/// Shared key/value store of in-flight and completed queries.
///
/// Generations come from one counter per store that is never reset, so
/// `clear` and `remove` cannot let an older fetch pass for a newer one.
#[derive(Clone, Default)]
pub struct QueryStore {
    entries: Arc<DashMap<QueryKey, Entry>>,
    generations: Arc<AtomicU64>,
}

impl QueryStore {
    pub fn new() -> Self {
        QueryStore {
            entries: Arc::new(DashMap::new()),
            generations: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Run `f` with exclusive access to the entry for `key`, creating it if absent.
    pub(crate) fn with_entry<R>(&self, key: &QueryKey, f: impl FnOnce(&mut Entry) -> R) -> R {
        let mut entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| Entry::new(self.next_generation()));
        f(entry.value_mut())
    }

    /// Issue a generation number unique within this store.
    pub(crate) fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Shared future of the fetch in flight for `key`. Never creates an entry.
    pub(crate) fn in_flight(&self, key: &QueryKey) -> Option<SharedFetch> {
        self.entries
            .get(key)
            .and_then(|e| e.in_flight.as_ref().map(|f| f.future.clone()))
    }

    pub(crate) fn snapshot(&self, key: &QueryKey) -> Option<Snapshot> {
        self.entries.get(key).map(|e| Snapshot {
            data: e.data.clone(),
            status: e.status,
            error: e.error.clone(),
            updated_at: e.updated_at,
            is_fetching: e.in_flight.is_some(),
            is_invalidated: e.invalidated,
        })
    }

    pub(crate) fn subscribe(&self, key: &QueryKey) -> usize {
        self.with_entry(key, |e| {
            e.subscribers += 1;
            e.idle_since = None;
            e.subscribers
        })
    }

    pub(crate) fn unsubscribe(&self, key: &QueryKey) {
        if let Some(mut e) = self.entries.get_mut(key) {
            e.subscribers = e.subscribers.saturating_sub(1);
            if e.subscribers == 0 {
                e.idle_since = Some(Instant::now());
            }
        }
    }

    /// Subscriber count for `key` (0 when absent).
    pub fn subscribers(&self, key: &QueryKey) -> usize {
        self.entries.get(key).map(|e| e.subscribers).unwrap_or(0)
    }

    /// Apply the outcome of fetch `generation`.
    ///
    /// A generation older than the last one issued is discarded so that a
    /// slow completion never overwrites a newer value.
    pub(crate) fn complete(&self, key: &QueryKey, generation: u64, result: &Result<Value>) -> Applied {
        let Some(mut e) = self.entries.get_mut(key) else {
            return Applied::Removed;
        };

        if e.in_flight.as_ref().is_some_and(|f| f.generation == generation) {
            e.in_flight = None;
        }

        if generation < e.generation {
            return Applied::Superseded;
        }

        match result {
            Ok(value) => {
                e.data = Some(value.clone());
                e.status = QueryStatus::Success;
                e.error = None;
                e.updated_at = Some(Instant::now());
                if generation > e.invalidated_at {
                    e.invalidated = false;
                }
            }
            // Redirect errors are handled globally and never become entry state.
            Err(err) if err.is_redirect() => {}
            Err(err) => {
                e.status = QueryStatus::Error;
                e.error = Some(err.clone());
            }
        }
        Applied::Stored
    }

    /// Atomically replace the value for `key`, superseding in-flight fetches.
    pub(crate) fn set_data(&self, key: &QueryKey, value: Value) {
        let generation = self.next_generation();
        self.with_entry(key, |e| {
            e.generation = generation;
            e.data = Some(value);
            e.status = QueryStatus::Success;
            e.error = None;
            e.updated_at = Some(Instant::now());
            e.invalidated = false;
        });
    }

    /// Mark every entry under `prefix` stale. Returns the number of entries matched.
    ///
    /// Idempotent: marking an already-stale entry again changes nothing.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut count = 0;
        for mut e in self.entries.iter_mut() {
            if e.key().starts_with(prefix) {
                let entry = e.value_mut();
                entry.invalidated = true;
                entry.invalidated_at = entry.generation;
                count += 1;
            }
        }
        count
    }

    /// Keys currently held under `prefix`.
    pub fn keys(&self, prefix: &QueryKey) -> Vec<QueryKey> {
        self.entries
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .map(|e| e.key().clone())
            .collect()
    }

    /// Drop every entry under `prefix`, in-flight fetches included.
    pub fn remove(&self, prefix: &QueryKey) -> usize {
        let before = self.entries.len();
        self.entries.retain(|k, _| !k.starts_with(prefix));
        before - self.entries.len()
    }

    /// Evict entries with no subscribers, no in-flight fetch, idle past `gc_time`.
    pub fn collect_garbage(&self, gc_time: Duration) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_collectable(gc_time));
        let evicted = before - self.entries.len();
        if evicted > 0 {
            debug!("✓ Query GC evicted {} entries", evicted);
        }
        evicted
    }

    /// Drop everything. Intended for teardown and test isolation.
    pub fn clear(&self) {
        self.entries.clear();
        warn!("⚠ Query store CLEAR executed - all entries dropped!");
    }

    pub fn stats(&self) -> StoreStats {
        let mut stats = StoreStats {
            total_entries: self.entries.len(),
            ..StoreStats::default()
        };
        for e in self.entries.iter() {
            if e.in_flight.is_some() {
                stats.in_flight += 1;
            }
            if e.subscribers > 0 {
                stats.active += 1;
            }
            if e.invalidated {
                stats.invalidated += 1;
            }
            if e.status == QueryStatus::Error {
                stats.errored += 1;
            }
        }
        stats
    }

    /// Print store statistics to debug log.
    pub fn log_stats(&self) {
        let stats = self.stats();
        debug!(
            "Query Stats: {} entries ({} active, {} in flight, {} invalidated, {} errored)",
            stats.total_entries, stats.active, stats.in_flight, stats.invalidated, stats.errored
        );
    }
}

/// Store statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub total_entries: usize,
    pub active: usize,
    pub in_flight: usize,
    pub invalidated: usize,
    pub errored: usize,
}
