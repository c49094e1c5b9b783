//! Fetch strategies for query reads.
//!
//! Every read goes through one of four strategies:
//!
//! ```
//! use barcode_client::strategy::FetchStrategy;
//!
//! // 1. Fresh - cached value only, never the network
//! let _s = FetchStrategy::Fresh;
//!
//! // 2. Refresh - stale-while-revalidate (default)
//! let _s = FetchStrategy::Refresh;
//!
//! // 3. Invalidate - mark stale, then wait for a new value
//! let _s = FetchStrategy::Invalidate;
//!
//! // 4. Bypass - start a new fetch generation unconditionally
//! let _s = FetchStrategy::Bypass;
//! ```
//!
//! | Strategy | Fresh entry | Stale entry | Empty entry |
//! |----------|-------------|-------------|-------------|
//! | **Fresh** | Return | Return | Return empty |
//! | **Refresh** | Return | Return, refetch in background | Fetch and wait |
//! | **Invalidate** | Fetch and wait | Fetch and wait | Fetch and wait |
//! | **Bypass** | New generation | New generation | New generation |
//!
//! `Invalidate` joins a fetch already in flight; `Bypass` supersedes it, and
//! the superseded result is discarded when it lands.

use std::fmt;

/// Strategy controlling how a query read uses the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FetchStrategy {
    /// Cache only; never start a fetch.
    Fresh,

    /// Serve cached data, revalidating in the background once stale.
    #[default]
    Refresh,

    /// Mark the entry stale and wait for a fresh value.
    Invalidate,

    /// Always start a new fetch generation and wait for it.
    Bypass,
}

impl FetchStrategy {
    /// True when the strategy never starts network work.
    pub fn is_cache_only(&self) -> bool {
        matches!(self, FetchStrategy::Fresh)
    }
}

impl fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStrategy::Fresh => write!(f, "Fresh"),
            FetchStrategy::Refresh => write!(f, "Refresh"),
            FetchStrategy::Invalidate => write!(f, "Invalidate"),
            FetchStrategy::Bypass => write!(f, "Bypass"),
        }
    }
}
