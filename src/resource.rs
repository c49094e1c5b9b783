//! Read-resource descriptors.
//!
//! A [`Resource`] binds a cache key to the API path that fills it and to the
//! type the response decodes into. Descriptors are stateless and
//! deterministic: the same arguments always give the same key and path.

use crate::key::QueryKey;
use std::fmt;
use std::marker::PhantomData;

/// One readable backend resource.
///
/// # Example
///
/// ```
/// use barcode_client::models::FanResponse;
/// use barcode_client::{query_key, Resource};
///
/// let fans: Resource<FanResponse> = Resource::new(query_key!["frag", "fans", 42], "dbtc/fan/42");
/// assert_eq!(fans.path(), "dbtc/fan/42");
/// ```
pub struct Resource<T> {
    key: QueryKey,
    path: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Resource<T> {
    pub fn new(key: QueryKey, path: impl Into<String>) -> Self {
        Resource {
            key,
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Path relative to the API base URL.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl<T> Clone for Resource<T> {
    fn clone(&self) -> Self {
        Resource::new(self.key.clone(), self.path.clone())
    }
}

impl<T> fmt::Debug for Resource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("key", &self.key)
            .field("path", &self.path)
            .finish()
    }
}
