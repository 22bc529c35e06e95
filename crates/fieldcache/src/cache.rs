// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The cache handle and the background fetch task.

use std::{
    fmt::Debug,
    panic::AssertUnwindSafe,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use fieldcache_store::Store;
use futures::{FutureExt, future::BoxFuture};
use tick::Clock;
use tokio::sync::broadcast;

use crate::{
    BoxError, CacheBuilder, CacheEvent, CacheOptions, CacheSession, FetchError,
    in_flight::{Claim, InFlight, SharedFetch},
    runtime::Runtime,
    telemetry::{CacheActivity, CacheOperation, CacheTelemetry, timing::timed},
};

/// Static name identifying a cache in logs and metrics.
pub type CacheName = &'static str;

/// Type-erased fetcher shared by a session and the tasks it starts.
pub(crate) type Fetcher<V> = Arc<dyn Fn() -> BoxFuture<'static, Result<V, BoxError>> + Send + Sync>;

/// A client-side cache shared by any number of [`CacheSession`]s.
///
/// `Cache` is a cheap handle. Clones refer to the same store, the same set of
/// in-flight fetches and the same event channel.
///
/// # Examples
///
/// ```
/// use fieldcache::{Cache, CacheOptions};
/// use tick::Clock;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), fieldcache::FetchError> {
/// let cache = Cache::builder::<Vec<String>>(Clock::new_frozen()).name("teams").max_size(50).build();
///
/// let teams = cache.session(
///     "teams:north",
///     || async { Ok::<_, std::io::Error>(vec!["alpha".to_string(), "bravo".to_string()]) },
///     CacheOptions::default(),
/// );
///
/// let snapshot = teams.get().await?;
/// assert_eq!(snapshot.value.map(|teams| teams.len()), Some(2));
/// # Ok(())
/// # }
/// ```
pub struct Cache<V> {
    pub(crate) inner: Arc<CacheInner<V>>,
}

pub(crate) struct CacheInner<V> {
    pub(crate) name: CacheName,
    pub(crate) store: Store<V>,
    pub(crate) in_flight: InFlight<V>,
    pub(crate) runtime: Runtime,
    pub(crate) telemetry: CacheTelemetry,
    pub(crate) events: broadcast::Sender<CacheEvent>,
    pub(crate) default_options: CacheOptions,
    closed: AtomicBool,
}

impl<V> Clone for Cache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> Debug for Cache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("name", &self.inner.name)
            .field("store", &self.inner.store)
            .field("in_flight", &self.inner.in_flight)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Cache<()> {
    /// Starts building a cache whose entries are timed by `clock`.
    #[must_use]
    pub fn builder<V>(clock: Clock) -> CacheBuilder<V> {
        CacheBuilder::new(clock)
    }
}

impl<V> Cache<V> {
    /// Returns the name used in logs and metrics.
    #[must_use]
    pub fn name(&self) -> CacheName {
        self.inner.name
    }

    /// Returns the underlying store, for diagnostics such as [`Store::stats`].
    #[must_use]
    pub fn store(&self) -> &Store<V> {
        &self.inner.store
    }

    /// Returns the options used by [`session_with_defaults`](Self::session_with_defaults).
    #[must_use]
    pub fn default_options(&self) -> CacheOptions {
        self.inner.default_options
    }

    /// Subscribes to [`CacheEvent`]s published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.inner.events.subscribe()
    }

    /// Returns the number of fetches currently in flight.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.inner.in_flight.len()
    }

    /// Closes the cache.
    ///
    /// Fetches that are still running resolve for the callers awaiting them,
    /// but their results are no longer written to the store. Values already
    /// cached stay readable.
    pub fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::AcqRel) {
            let detached = self.inner.in_flight.detach_all();
            tracing::debug!(cache.name = self.inner.name, detached, "cache closed");
        }
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

impl<V> Cache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates a session binding `key` to `fetcher` on this cache.
    ///
    /// The fetcher may be called any number of times and must not touch the
    /// cache itself. Sessions for the same key share entries and in-flight
    /// fetches, whichever fetcher started them.
    pub fn session<F, Fut, E>(&self, key: impl Into<String>, fetcher: F, options: CacheOptions) -> CacheSession<V>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        let fetcher: Fetcher<V> = Arc::new(move || fetcher().map(|result| result.map_err(Into::into)).boxed());
        CacheSession::new(self.clone(), key.into(), fetcher, options)
    }

    /// Creates a session using the cache's [default options](Self::default_options).
    pub fn session_with_defaults<F, Fut, E>(&self, key: impl Into<String>, fetcher: F) -> CacheSession<V>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        self.session(key, fetcher, self.default_options())
    }
}

/// Creates a session on `cache`. Equivalent to [`Cache::session`].
pub fn cache_session<V, F, Fut, E>(cache: &Cache<V>, key: impl Into<String>, fetcher: F, options: CacheOptions) -> CacheSession<V>
where
    V: Clone + Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<V, E>> + Send + 'static,
    E: Into<BoxError>,
{
    cache.session(key, fetcher, options)
}

impl<V> CacheInner<V> {
    pub(crate) fn new(
        name: CacheName,
        store: Store<V>,
        runtime: Runtime,
        telemetry: CacheTelemetry,
        event_capacity: usize,
        default_options: CacheOptions,
    ) -> Self {
        Self {
            name,
            store,
            in_flight: InFlight::default(),
            runtime,
            telemetry,
            events: broadcast::channel(event_capacity.max(1)).0,
            default_options,
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn record(&self, key: &str, operation: CacheOperation, activity: CacheActivity, duration: Option<Duration>) {
        self.telemetry.record(self.name, key, operation, activity, duration);
    }

    pub(crate) fn record_size(&self) {
        self.telemetry.record_size(self.name, self.store.len());
    }

    pub(crate) fn publish(&self, event: CacheEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }
}

impl<V> CacheInner<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Joins the fetch in flight for `key`, or starts one on the runtime.
    ///
    /// The task is spawned while the registry lock is held, so it cannot
    /// complete before its registration exists. Fails when there is no
    /// runtime to spawn on.
    pub(crate) fn claim_fetch(
        self: &Arc<Self>,
        key: &str,
        fetcher: &Fetcher<V>,
        ttl: Duration,
        operation: CacheOperation,
    ) -> Result<Claim<V>, FetchError> {
        let claim = self.in_flight.claim(key, |id| -> Result<SharedFetch<V>, FetchError> {
            let inner = Arc::clone(self);
            let fetcher = Arc::clone(fetcher);
            let task_key = key.to_owned();
            let task = self
                .runtime
                .spawn(async move { inner.run_fetch(task_key, id, fetcher, ttl).await })
                .map_err(|no_runtime| FetchError::caused_by(key, no_runtime))?;

            let registry = Arc::downgrade(self);
            let key = key.to_owned();
            Ok(async move {
                match task.await {
                    Ok(result) => result,
                    Err(join_error) => {
                        // The task was cancelled before it could complete its registration.
                        if let Some(inner) = registry.upgrade() {
                            inner.in_flight.release(&key, id);
                        }
                        Err(FetchError::caused_by(key, join_error))
                    }
                }
            }
            .boxed()
            .shared())
        });

        match &claim {
            Ok(claim) if claim.is_joined() => self.record(key, operation, CacheActivity::Joined, None),
            Ok(_) => {}
            Err(error) => {
                tracing::debug!(cache.key = key, %error, "could not start fetch");
                self.record(key, operation, CacheActivity::Error, None);
            }
        }
        claim
    }

    async fn run_fetch(&self, key: String, id: u64, fetcher: Fetcher<V>, ttl: Duration) -> Result<V, FetchError> {
        let operation = CacheOperation::Fetch;
        let outcome = timed(self.store.clock(), AssertUnwindSafe(async { fetcher().await }).catch_unwind()).await;

        let result = match outcome.result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(cause)) => Err(FetchError::caused_by(key.as_str(), cause)),
            Err(_panic) => Err(FetchError::caused_by(key.as_str(), "fetcher panicked")),
        };

        // Some(replaced) when the value was written.
        let written = self
            .in_flight
            .complete(&key, id, || match &result {
                Ok(value) if !self.is_closed() => {
                    let replaced = self.store.contains(&key);
                    self.store.set(key.as_str(), value.clone(), ttl);
                    Some(replaced)
                }
                _ => None,
            })
            .flatten();

        let duration = Some(outcome.duration);
        match (&result, written) {
            (Ok(_), Some(replaced)) => {
                let (activity, event) = if replaced {
                    (CacheActivity::Revalidated, CacheEvent::Revalidated { key: key.clone() })
                } else {
                    (CacheActivity::Fetched, CacheEvent::Fetched { key: key.clone() })
                };
                self.record(&key, operation, activity, duration);
                self.record_size();
                self.publish(event);
            }
            (Ok(_), None) => {
                self.record(&key, operation, CacheActivity::Discarded, duration);
            }
            (Err(error), _) => {
                self.record(&key, operation, CacheActivity::Error, duration);
                if self.store.contains(&key) {
                    self.publish(CacheEvent::StaleServedWithError {
                        key: key.clone(),
                        error: error.clone(),
                    });
                }
            }
        }

        result
    }
}
