//! Tracked asynchronous writes.
//!
//! A [`Mutation`] wraps one write function. Its result is never cached; on
//! success the registered callbacks run, which is where invalidation is
//! declared. Mutations never retry.

use crate::error::{Error, Result};
use crate::key::QueryKey;
use crate::query::QueryClient;
use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

type MutateFn<V, R> = Arc<dyn Fn(V) -> BoxFuture<'static, Result<R>> + Send + Sync>;
type SuccessFn<V, R> = Arc<dyn Fn(&QueryClient, &R, &V) + Send + Sync>;

/// Lifecycle of a mutation handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MutationStatus {
    #[default]
    Idle,
    Pending,
    Success,
    Error,
}

#[derive(Default)]
struct MutationState {
    status: MutationStatus,
    error: Option<Error>,
    in_flight: usize,
}

/// Handle on one kind of write.
///
/// # Example
///
/// ```ignore
/// let become_fan = Mutation::new(&queries, "become-fan", move |mother_id: u64| {
///     let api = api.clone();
///     async move { api.put_json::<FanResponse>(&format!("dbtc/fan/{}", mother_id)).await }
/// })
/// .invalidates(|mother_id| vec![query_key!["frag", "fans", *mother_id], query_key!["collection"]]);
///
/// let fans = become_fan.mutate_async(42).await?;
/// ```
pub struct Mutation<V, R> {
    client: QueryClient,
    name: &'static str,
    mutate: MutateFn<V, R>,
    on_success: Vec<SuccessFn<V, R>>,
    state: Arc<Mutex<MutationState>>,
}

impl<V, R> Clone for Mutation<V, R> {
    fn clone(&self) -> Self {
        Mutation {
            client: self.client.clone(),
            name: self.name,
            mutate: self.mutate.clone(),
            on_success: self.on_success.clone(),
            state: self.state.clone(),
        }
    }
}

impl<V, R> Mutation<V, R>
where
    V: Clone + Send + 'static,
    R: Send + 'static,
{
    pub fn new<F, Fut>(client: &QueryClient, name: &'static str, mutate: F) -> Self
    where
        F: Fn(V) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        Mutation {
            client: client.clone(),
            name,
            mutate: Arc::new(move |vars| mutate(vars).boxed()),
            on_success: Vec::new(),
            state: Arc::new(Mutex::new(MutationState::default())),
        }
    }

    /// Run `callback` after every successful write, in registration order.
    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: Fn(&QueryClient, &R, &V) + Send + Sync + 'static,
    {
        self.on_success.push(Arc::new(callback));
        self
    }

    /// Invalidate the returned key prefixes after every successful write.
    pub fn invalidates<F>(self, keys: F) -> Self
    where
        F: Fn(&V) -> Vec<QueryKey> + Send + Sync + 'static,
    {
        self.on_success(move |client, _, vars| {
            for key in keys(vars) {
                client.invalidate(&key);
            }
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Perform the write and wait for it.
    ///
    /// # Errors
    /// Returns the write's error unchanged. Redirect statuses (401/403) are
    /// returned too but leave the handle idle, since they were handled globally.
    pub async fn mutate_async(&self, vars: V) -> Result<R> {
        {
            let mut state = self.lock();
            state.in_flight += 1;
            state.status = MutationStatus::Pending;
            state.error = None;
        }

        let timer = Instant::now();
        debug!("» Mutation {} started", self.name);
        let result = (self.mutate)(vars.clone()).await;

        let mut state = self.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        match &result {
            Ok(value) => {
                if state.in_flight == 0 {
                    state.status = MutationStatus::Success;
                }
                drop(state);
                info!("✓ Mutation {} succeeded in {:?}", self.name, timer.elapsed());
                for callback in &self.on_success {
                    callback(&self.client, value, &vars);
                }
            }
            Err(e) if e.is_redirect() => {
                if state.in_flight == 0 {
                    state.status = MutationStatus::Idle;
                }
                debug!("Mutation {} ended in redirect", self.name);
            }
            Err(e) => {
                if state.in_flight == 0 {
                    state.status = MutationStatus::Error;
                }
                state.error = Some(e.clone());
                warn!("Mutation {} failed: {}", self.name, e);
            }
        }

        result
    }

    pub fn status(&self) -> MutationStatus {
        self.lock().status
    }

    /// True while a write is running; forms disable their submit control.
    pub fn is_pending(&self) -> bool {
        self.status() == MutationStatus::Pending
    }

    pub fn is_success(&self) -> bool {
        self.status() == MutationStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status() == MutationStatus::Error
    }

    /// Error of the last failed write.
    pub fn error(&self) -> Option<Error> {
        self.lock().error.clone()
    }

    /// Back to idle, clearing any error.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.status = MutationStatus::Idle;
        state.error = None;
    }

    fn lock(&self) -> MutexGuard<'_, MutationState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
