//! Observability hooks and staleness policies for the query cache.
//!
//! Two concerns live here:
//!
//! - **Metrics (`QueryMetrics`)**: hits, stale hits, fetches, invalidations, errors
//! - **Stale policies (`StalePolicy`)**: how long a successful fetch stays fresh
//!
//! # Metrics
//!
//! ```ignore
//! use barcode_client::observability::QueryMetrics;
//! use std::time::Duration;
//!
//! struct PrometheusMetrics;
//!
//! impl QueryMetrics for PrometheusMetrics {
//!     fn record_fetch(&self, _key: &str, _duration: Duration) {
//!         // histogram!("query_fetch_latency").record(duration);
//!     }
//! }
//!
//! // let client = QueryClient::new(QueryConfig::default())
//! //     .with_metrics(Box::new(PrometheusMetrics));
//! ```
//!
//! # Stale policies
//!
//! ```
//! use barcode_client::observability::StalePolicy;
//! use std::time::Duration;
//!
//! let _policy = StalePolicy::Fixed(Duration::from_secs(60));
//!
//! // Enums rarely change; fan lists change all the time.
//! let _policy = StalePolicy::PerResource(|resource| match resource {
//!     "enums" => Duration::from_secs(3600),
//!     "frag" => Duration::from_secs(5),
//!     _ => Duration::from_secs(60),
//! });
//! ```
//!
//! | Policy | Behaviour |
//! |--------|-----------|
//! | `Default` | Use `QueryConfig::stale_time` |
//! | `Fixed` | Same window for every key |
//! | `Always` | Every read revalidates in the background |
//! | `PerResource` | Window chosen by the key's root segment |

use std::time::Duration;

/// Trait for query cache metrics collection.
pub trait QueryMetrics: Send + Sync {
    /// A fresh entry was served with no network call.
    fn record_hit(&self, key: &str) {
        debug!("Query HIT: {}", key);
    }

    /// A stale entry was served while revalidating.
    fn record_stale_hit(&self, key: &str) {
        debug!("Query STALE HIT: {}", key);
    }

    /// A fetch completed successfully.
    fn record_fetch(&self, key: &str, duration: Duration) {
        debug!("Query FETCH: {} took {:?}", key, duration);
    }

    /// An invalidation marked `count` entries stale.
    fn record_invalidate(&self, prefix: &str, count: usize) {
        debug!("Query INVALIDATE: {} ({} entries)", prefix, count);
    }

    /// A fetch or mutation failed.
    fn record_error(&self, key: &str, error: &str) {
        warn!("Query ERROR for {}: {}", key, error);
    }
}

/// Default metrics implementation (no-op).
#[derive(Clone, Default)]
pub struct NoOpMetrics;

impl QueryMetrics for NoOpMetrics {
    fn record_hit(&self, _key: &str) {}
    fn record_stale_hit(&self, _key: &str) {}
    fn record_fetch(&self, _key: &str, _duration: Duration) {}
    fn record_invalidate(&self, _prefix: &str, _count: usize) {}
    fn record_error(&self, _key: &str, _error: &str) {}
}

/// How long a successfully fetched entry counts as fresh.
#[derive(Clone, Debug, Default)]
pub enum StalePolicy {
    /// Use the client's configured default window.
    #[default]
    Default,

    /// Fixed window for all entries.
    Fixed(Duration),

    /// Zero window: every read triggers a background revalidation.
    Always,

    /// Window chosen from the key's root segment.
    PerResource(fn(&str) -> Duration),
}

impl StalePolicy {
    /// Resolve the freshness window for a resource, falling back to `default`.
    pub fn stale_time(&self, resource: Option<&str>, default: Duration) -> Duration {
        match self {
            StalePolicy::Default => default,
            StalePolicy::Fixed(d) => *d,
            StalePolicy::Always => Duration::ZERO,
            StalePolicy::PerResource(f) => resource.map(f).unwrap_or(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_metrics() {
        let metrics = NoOpMetrics;
        metrics.record_hit("key");
        metrics.record_fetch("key", Duration::from_secs(2));
        metrics.record_invalidate("key", 3);
    }

    #[test]
    fn test_stale_policy_default() {
        let policy = StalePolicy::Default;
        assert_eq!(
            policy.stale_time(Some("any"), Duration::from_secs(60)),
            Duration::from_secs(60)
        );
    }

    #[test]
    fn test_stale_policy_always() {
        assert_eq!(
            StalePolicy::Always.stale_time(Some("collection"), Duration::from_secs(60)),
            Duration::ZERO
        );
    }

    #[test]
    fn test_stale_policy_per_resource() {
        let policy = StalePolicy::PerResource(|resource| match resource {
            "enums" => Duration::from_secs(3600),
            _ => Duration::from_secs(30),
        });

        let default = Duration::from_secs(60);
        assert_eq!(policy.stale_time(Some("enums"), default), Duration::from_secs(3600));
        assert_eq!(policy.stale_time(Some("frag"), default), Duration::from_secs(30));
        assert_eq!(policy.stale_time(None, default), default);
    }
}
