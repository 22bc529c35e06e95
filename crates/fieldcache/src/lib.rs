// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Client-side caching of asynchronously fetched values.
//!
//! A [`Cache`] owns a bounded [`Store`] and the set of fetches currently in
//! flight. A [`CacheSession`] binds a key and a fetcher to a cache and offers
//! the reading and writing operations:
//!
//! - [`get`](CacheSession::get) returns fresh values directly, serves stale
//!   values while revalidating in the background (stale-while-revalidate), and
//!   fetches missing values.
//! - [`snapshot`](CacheSession::snapshot) and [`prefetch`](CacheSession::prefetch)
//!   never wait, for rendering loops and eager loading.
//! - [`mutate`](CacheSession::mutate) writes an optimistic value without fetching.
//! - [`invalidate`](CacheSession::invalidate) and [`refresh`](CacheSession::refresh)
//!   discard or force-reload a key.
//!
//! Concurrent requests for the same key share one fetch. A failed fetch never
//! overwrites a cached value; it is reported to the caller that waited for it
//! and, when a previous value is still being served, published as
//! [`CacheEvent::StaleServedWithError`] to [subscribers](Cache::subscribe).
//!
//! Fetches run as tokio tasks, so a caller that stops waiting does not cancel
//! the fetch for everyone else.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use fieldcache::{Cache, CacheOptions, Status};
//! use tick::ClockControl;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), fieldcache::FetchError> {
//! let control = ClockControl::new();
//! let cache = Cache::builder::<u32>(control.to_clock()).name("inventory").build();
//!
//! let stock = cache.session(
//!     "stock:bolts",
//!     || async { Ok::<_, std::io::Error>(120) },
//!     CacheOptions::default().with_ttl(Duration::from_secs(60)),
//! );
//!
//! assert_eq!(stock.get().await?.status(), Status::Fresh);
//!
//! // Record a local change without a round trip.
//! stock.mutate(119).await?;
//! assert_eq!(stock.snapshot().value, Some(119));
//!
//! // Once its TTL has elapsed the value is served stale while a refetch runs.
//! control.advance(Duration::from_secs(61));
//! let snapshot = stock.get().await?;
//! assert_eq!(snapshot.status(), Status::Stale);
//! assert!(snapshot.is_loading);
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `metrics`: records OpenTelemetry metrics, see [`CacheBuilder::metrics`].
//! - `serde`: (de)serialization of [`CacheOptions`].
//! - `test-util`: enables `tick`'s controllable clock for tests.

mod builder;
mod cache;
mod error;
mod event;
mod in_flight;
mod mutation;
mod options;
mod runtime;
mod session;
mod snapshot;
mod telemetry;

#[doc(inline)]
pub use builder::{CacheBuilder, DEFAULT_EVENT_CAPACITY, DEFAULT_MAX_SIZE, DEFAULT_NAME};
#[doc(inline)]
pub use cache::{Cache, CacheName, cache_session};
#[doc(inline)]
pub use error::{BoxError, FetchError};
#[doc(inline)]
pub use event::CacheEvent;
#[doc(no_inline)]
pub use fieldcache_store::{Stats, Store};
#[doc(inline)]
pub use mutation::Mutation;
#[doc(inline)]
pub use options::{CacheOptions, DEFAULT_TTL};
#[doc(inline)]
pub use session::CacheSession;
#[doc(inline)]
pub use snapshot::{Snapshot, Status};
