// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{fmt::Debug, marker::PhantomData, sync::Arc};

use fieldcache_store::Store;
#[cfg(any(feature = "metrics", test))]
use opentelemetry::metrics::MeterProvider;
use tick::Clock;
use tokio::runtime::Handle;

use crate::{
    Cache, CacheOptions,
    cache::{CacheInner, CacheName},
    runtime::Runtime,
    telemetry::config::TelemetryConfig,
};

/// Name given to caches built without [`CacheBuilder::name`].
pub const DEFAULT_NAME: CacheName = "fieldcache";

/// Capacity used when [`CacheBuilder::max_size`] is not called.
pub const DEFAULT_MAX_SIZE: usize = 1000;

/// Capacity of the event channel when [`CacheBuilder::event_capacity`] is not called.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Builder for [`Cache`]. Created by [`Cache::builder`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use fieldcache::{Cache, CacheOptions};
/// use tick::Clock;
///
/// let cache = Cache::builder::<String>(Clock::new_frozen())
///     .name("work_orders")
///     .max_size(250)
///     .default_options(CacheOptions::default().with_ttl(Duration::from_secs(30)))
///     .logs()
///     .build();
///
/// assert_eq!(cache.name(), "work_orders");
/// assert_eq!(cache.store().max_size(), 250);
/// ```
pub struct CacheBuilder<V> {
    clock: Clock,
    name: CacheName,
    max_size: usize,
    default_options: CacheOptions,
    runtime: Runtime,
    telemetry: TelemetryConfig,
    event_capacity: usize,
    _value: PhantomData<fn() -> V>,
}

impl<V> Debug for CacheBuilder<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheBuilder")
            .field("name", &self.name)
            .field("max_size", &self.max_size)
            .field("default_options", &self.default_options)
            .field("event_capacity", &self.event_capacity)
            .finish_non_exhaustive()
    }
}

impl<V> CacheBuilder<V> {
    pub(crate) fn new(clock: Clock) -> Self {
        Self {
            clock,
            name: DEFAULT_NAME,
            max_size: DEFAULT_MAX_SIZE,
            default_options: CacheOptions::default(),
            runtime: Runtime::default(),
            telemetry: TelemetryConfig::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
            _value: PhantomData,
        }
    }

    /// Sets the name reported in logs and metrics.
    #[must_use]
    pub fn name(mut self, name: CacheName) -> Self {
        self.name = name;
        self
    }

    /// Sets how many entries the store may hold.
    #[must_use]
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Sets the options used by [`Cache::session_with_defaults`].
    #[must_use]
    pub fn default_options(mut self, options: CacheOptions) -> Self {
        self.default_options = options;
        self
    }

    /// Runs fetch tasks on `handle` instead of the caller's runtime.
    #[must_use]
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Runtime::with_handle(handle);
        self
    }

    /// Emits a `tracing` event for every cache activity.
    #[must_use]
    pub fn logs(mut self) -> Self {
        self.telemetry = self.telemetry.with_logs();
        self
    }

    /// Records OpenTelemetry metrics through `provider`.
    #[cfg(any(feature = "metrics", test))]
    #[cfg_attr(docsrs, doc(cfg(feature = "metrics")))]
    #[must_use]
    pub fn metrics(mut self, provider: &dyn MeterProvider) -> Self {
        self.telemetry = self.telemetry.with_metrics(provider);
        self
    }

    /// Sets how many events a slow subscriber may lag behind before missing some.
    ///
    /// Values below one are raised to one.
    #[must_use]
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Builds the cache.
    #[must_use]
    pub fn build(self) -> Cache<V> {
        Cache {
            inner: Arc::new(CacheInner::new(
                self.name,
                Store::with_clock(self.max_size, self.clock),
                self.runtime,
                self.telemetry.build(),
                self.event_capacity,
                self.default_options,
            )),
        }
    }
}
