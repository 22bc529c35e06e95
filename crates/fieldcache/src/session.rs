// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;

use fieldcache_store::{CacheEntry, Lookup};

use crate::{
    Cache, CacheEvent, CacheOptions, FetchError, Mutation, Snapshot,
    cache::Fetcher,
    in_flight::Claim,
    telemetry::{CacheActivity, CacheOperation, timing::timed},
};

/// Binds one key and one fetcher to a [`Cache`].
///
/// Reads go through the cache's store. Fetches are shared with every other
/// session for the same key, so concurrent readers cause a single fetcher
/// call. Sessions are cheap to clone; clones share the fetcher.
///
/// Operations that may start a fetch (`get`, `prefetch`, `refresh`) spawn it
/// on the caller's tokio runtime, or on the handle the cache was built with.
/// Without either, the fetch fails with a [`FetchError`].
pub struct CacheSession<V> {
    cache: Cache<V>,
    key: String,
    fetcher: Fetcher<V>,
    options: CacheOptions,
}

impl<V> Clone for CacheSession<V> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            key: self.key.clone(),
            fetcher: std::sync::Arc::clone(&self.fetcher),
            options: self.options,
        }
    }
}

impl<V> Debug for CacheSession<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheSession")
            .field("cache", &self.cache.name())
            .field("key", &self.key)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<V> CacheSession<V> {
    pub(crate) fn new(cache: Cache<V>, key: String, fetcher: Fetcher<V>, options: CacheOptions) -> Self {
        Self {
            cache,
            key,
            fetcher,
            options,
        }
    }

    /// Returns the key this session reads and writes.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the session's options.
    #[must_use]
    pub fn options(&self) -> CacheOptions {
        self.options
    }

    /// Returns the cache this session belongs to.
    #[must_use]
    pub fn cache(&self) -> &Cache<V> {
        &self.cache
    }

    /// Returns `true` while a fetch for the key is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.cache.inner.in_flight.is_in_flight(&self.key)
    }

    /// Removes the cached value and detaches any fetch in flight.
    ///
    /// A detached fetch still resolves for callers already awaiting it, but
    /// its result is not written. The next read starts from an empty entry.
    pub fn invalidate(&self) {
        let inner = &self.cache.inner;
        let detached = inner.in_flight.detach(&self.key);
        let removed = inner.store.delete(&self.key);

        tracing::debug!(cache.key = %self.key, detached, removed, "invalidated");
        inner.record(&self.key, CacheOperation::Invalidate, CacheActivity::Invalidated, None);
        inner.record_size();
        inner.publish(CacheEvent::Invalidated { key: self.key.clone() });
    }
}

impl<V> CacheSession<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Reads the key, fetching when needed.
    ///
    /// - A fresh value is returned without fetching.
    /// - A stale value with stale-while-revalidate enabled is returned at
    ///   once with `is_stale` and `is_loading` set, and a background fetch is
    ///   started unless one is already running.
    /// - A stale value without stale-while-revalidate waits for the fetch.
    ///   If the fetch fails, the stale value is returned instead.
    /// - A missing value waits for the fetch.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when no value was cached and the fetch failed.
    pub async fn get(&self) -> Result<Snapshot<V>, FetchError> {
        let inner = &self.cache.inner;

        match inner.store.lookup(&self.key) {
            Some(Lookup { value, is_stale: false }) => {
                self.record(CacheOperation::Get, CacheActivity::Hit);
                Ok(Snapshot {
                    value: Some(value),
                    is_stale: false,
                    is_loading: self.is_loading(),
                })
            }
            Some(Lookup { value, is_stale: true }) if self.options.stale_while_revalidate => {
                self.record(CacheOperation::Get, CacheActivity::StaleHit);
                // The background fetch outlives the dropped handle.
                let is_loading = self.claim(CacheOperation::Get).is_ok();
                Ok(Snapshot {
                    value: Some(value),
                    is_stale: true,
                    is_loading,
                })
            }
            Some(Lookup { value: stale, .. }) => {
                self.record(CacheOperation::Get, CacheActivity::StaleHit);
                let fetched = match self.claim(CacheOperation::Get) {
                    Ok(claim) => claim.into_future().await,
                    Err(error) => Err(error),
                };
                match fetched {
                    Ok(value) => Ok(Self::fetched(value)),
                    Err(error) => {
                        tracing::debug!(cache.key = %self.key, %error, "serving stale value after failed fetch");
                        Ok(Snapshot {
                            value: Some(stale),
                            is_stale: true,
                            is_loading: false,
                        })
                    }
                }
            }
            None => {
                self.record(CacheOperation::Get, CacheActivity::Miss);
                let value = self.claim(CacheOperation::Get)?.into_future().await?;
                Ok(Self::fetched(value))
            }
        }
    }

    /// Reads the key without waiting and without fetching.
    ///
    /// While the first fetch for a key is running the snapshot has no value
    /// and `is_loading` set.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot<V> {
        let is_loading = self.is_loading();
        match self.cache.inner.store.lookup(&self.key) {
            Some(Lookup { value, is_stale }) => Snapshot {
                value: Some(value),
                is_stale,
                is_loading,
            },
            None => Snapshot::empty(is_loading),
        }
    }

    /// Starts a background fetch unless the value is fresh or a fetch is already running.
    ///
    /// Returns immediately.
    pub fn prefetch(&self) {
        if !self.cache.inner.store.has_fresh(&self.key) {
            // Failures to start are recorded by the cache.
            let _ = self.claim(CacheOperation::Get);
        }
    }

    /// Fetches the key regardless of freshness and returns the new value.
    ///
    /// Joins the fetch already in flight, if any.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the fetch fails. The cached value, if any, is kept.
    pub async fn refresh(&self) -> Result<V, FetchError> {
        self.claim(CacheOperation::Refresh)?.into_future().await
    }

    /// Writes a value without fetching and returns it.
    ///
    /// The value is stored with the session's TTL, so it reads as fresh.
    /// Updaters receive the current value, fresh or stale, or `None`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when an asynchronous mutation fails. The store
    /// is left untouched.
    pub async fn mutate(&self, mutation: impl Into<Mutation<V>>) -> Result<V, FetchError> {
        let inner = &self.cache.inner;
        let current = inner.store.peek(&self.key).map(CacheEntry::into_value);

        let resolved = timed(inner.store.clock(), mutation.into().resolve(current)).await;
        let duration = Some(resolved.duration);

        let value = match resolved.result {
            Ok(value) => value,
            Err(cause) => {
                inner.record(&self.key, CacheOperation::Mutate, CacheActivity::Error, duration);
                return Err(FetchError::caused_by(self.key.as_str(), cause));
            }
        };

        if inner.is_closed() {
            inner.record(&self.key, CacheOperation::Mutate, CacheActivity::Discarded, duration);
            return Ok(value);
        }

        inner.store.set(self.key.as_str(), value.clone(), self.options.ttl);
        inner.record(&self.key, CacheOperation::Mutate, CacheActivity::Mutated, duration);
        inner.record_size();
        inner.publish(CacheEvent::Mutated { key: self.key.clone() });
        Ok(value)
    }

    fn claim(&self, operation: CacheOperation) -> Result<Claim<V>, FetchError> {
        self.cache
            .inner
            .claim_fetch(&self.key, &self.fetcher, self.options.ttl, operation)
    }

    fn fetched(value: V) -> Snapshot<V> {
        Snapshot {
            value: Some(value),
            is_stale: false,
            is_loading: false,
        }
    }
}

impl<V> CacheSession<V> {
    fn record(&self, operation: CacheOperation, activity: CacheActivity) {
        self.cache.inner.record(&self.key, operation, activity, None);
    }
}
