//! # barcode-client
//!
//! Typed API client and keyed query cache for the BARcode coral-tracking
//! platform.
//!
//! ## Features
//!
//! - **Keyed cache:** every read is stored under a structured [`QueryKey`]
//! - **Deduplication:** concurrent reads of one key share one request
//! - **Stale-while-revalidate:** cached data stays visible while a refetch runs
//! - **Prefix invalidation:** writes mark whole key families stale
//! - **Global redirects:** 401 goes to login, 403 to the membership page, once
//! - **Built-in logging and metrics hooks**
//!
//! ## Quick Start
//!
//! ```ignore
//! use barcode_client::{BarcodeClient, ClientConfig, QueryConfig};
//! use barcode_client::models::SettingUpdate;
//!
//! let client = BarcodeClient::new(ClientConfig::from_env()?, QueryConfig::default())?;
//!
//! // Read: cached, deduplicated, revalidated when stale.
//! let fans = client.frag_fans(42, true);
//! let state = fans.result().await?;
//!
//! // Write: on success the fan list and the collection are invalidated.
//! client.become_fan().mutate_async(42).await?;
//! let state = fans.result().await?;
//! ```
//!
//! ## Lower level
//!
//! [`QueryClient`] is usable on its own with any async fetch function:
//!
//! ```ignore
//! use barcode_client::{query_key, QueryClient, QueryConfig, QueryOptions};
//!
//! let queries = QueryClient::new(QueryConfig::default());
//! let state = queries
//!     .query(query_key!["stats"], move || load_stats(), QueryOptions::default())
//!     .await?;
//! queries.invalidate(&query_key!["stats"]);
//! ```

#[macro_use]
extern crate log;

pub mod config;
pub mod error;
pub mod hooks;
pub mod http;
pub mod key;
pub mod models;
pub mod mutation;
pub mod navigation;
pub mod observability;
pub mod query;
pub mod resource;
pub mod service;
pub mod store;
pub mod strategy;

// Re-exports for convenience
pub use config::{ClientConfig, QueryConfig};
pub use error::{Error, Result};
pub use http::{ApiClient, RequestBody};
pub use key::{KeyPart, QueryKey};
pub use mutation::{Mutation, MutationStatus};
pub use navigation::{AuthHandler, Navigator, RecordingNavigator, Route};
pub use observability::{NoOpMetrics, QueryMetrics, StalePolicy};
pub use query::{QueryClient, QueryObserver, QueryOptions, QueryState, Subscription};
pub use resource::Resource;
pub use service::BarcodeClient;
pub use store::{QueryStatus, QueryStore, StoreStats};
pub use strategy::FetchStrategy;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
