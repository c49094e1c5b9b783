//! High-level client for views.
//!
//! Bundles the HTTP wrapper, the query cache and the navigator behind one
//! cheaply clonable handle. Resource hooks are methods on [`BarcodeClient`],
//! defined in the `hooks` modules.

use crate::config::{ClientConfig, QueryConfig};
use crate::error::Result;
use crate::http::ApiClient;
use crate::key::QueryKey;
use crate::navigation::{AuthHandler, LogNavigator, Navigator};
use crate::query::{QueryClient, QueryObserver, QueryOptions};
use crate::resource::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Entry point for views.
///
/// # Example
///
/// ```ignore
/// use barcode_client::{BarcodeClient, ClientConfig, QueryConfig};
///
/// let client = BarcodeClient::new(ClientConfig::from_env()?, QueryConfig::default())?;
///
/// let collection = client.collection();
/// let state = collection.result().await?;
///
/// client.become_fan().mutate_async(42).await?;
/// ```
#[derive(Clone)]
pub struct BarcodeClient {
    api: ApiClient,
    queries: QueryClient,
    navigator: Arc<dyn Navigator>,
}

impl BarcodeClient {
    /// Create a client with its own query store.
    ///
    /// # Errors
    /// Returns `Error::Config` if the HTTP client cannot be built.
    pub fn new(config: ClientConfig, query_config: QueryConfig) -> Result<Self> {
        Ok(BarcodeClient {
            api: ApiClient::new(&config)?,
            queries: QueryClient::new(query_config),
            navigator: Arc::new(LogNavigator),
        })
    }

    /// Assemble from existing parts, e.g. to share one store between clients.
    pub fn from_parts(api: ApiClient, queries: QueryClient, navigator: Arc<dyn Navigator>) -> Self {
        BarcodeClient {
            api,
            queries,
            navigator,
        }
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    pub fn with_auth_handler(mut self, auth: Arc<dyn AuthHandler>) -> Self {
        self.api = self.api.with_auth_handler(auth);
        self
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn queries(&self) -> &QueryClient {
        &self.queries
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    /// Subscribe to a GET resource.
    pub fn observe<T>(&self, resource: Resource<T>, options: QueryOptions) -> QueryObserver<T>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
    {
        let api = self.api.clone();
        let path = resource.path().to_string();
        self.queries.observe(
            resource.key().clone(),
            move || {
                let api = api.clone();
                let path = path.clone();
                async move { api.get_json::<T>(&path).await }
            },
            options,
        )
    }

    /// Fresh value of a GET resource, fetching if needed.
    ///
    /// # Errors
    /// Returns the fetch error when no fresh value could be obtained.
    pub async fn fetch<T>(&self, resource: Resource<T>) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
    {
        let api = self.api.clone();
        let path = resource.path().to_string();
        self.queries
            .fetch_query(
                resource.key().clone(),
                move || {
                    let api = api.clone();
                    let path = path.clone();
                    async move { api.get_json::<T>(&path).await }
                },
                QueryOptions::default(),
            )
            .await
    }

    /// Mark every entry under `prefix` stale.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        self.queries.invalidate(prefix)
    }
}
