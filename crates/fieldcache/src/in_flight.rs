// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Registry of fetches currently running, one per key.
//!
//! The first caller for a key starts the fetch and registers its shared
//! future. Every later caller joins that future until the fetch completes. A
//! registration is tagged with a unique id so that a fetch which has been
//! detached (by invalidation) cannot write its result or remove a newer
//! registration for the same key.

use std::{
    collections::HashMap,
    fmt::Debug,
    sync::atomic::{AtomicU64, Ordering},
};

use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex as SyncMutex;

use crate::FetchError;

/// Future shared by every caller waiting on the same fetch.
pub(crate) type SharedFetch<V> = Shared<BoxFuture<'static, Result<V, FetchError>>>;

struct Flight<V> {
    id: u64,
    future: SharedFetch<V>,
}

/// Outcome of [`InFlight::claim`].
pub(crate) enum Claim<V> {
    /// This caller started a new fetch.
    Started(SharedFetch<V>),
    /// A fetch was already running; this caller joined it.
    Joined(SharedFetch<V>),
}

impl<V> Claim<V> {
    pub(crate) fn is_joined(&self) -> bool {
        matches!(self, Self::Joined(_))
    }

    pub(crate) fn into_future(self) -> SharedFetch<V> {
        match self {
            Self::Started(future) | Self::Joined(future) => future,
        }
    }
}

pub(crate) struct InFlight<V> {
    next_id: AtomicU64,
    flights: SyncMutex<HashMap<String, Flight<V>>>,
}

impl<V> Debug for InFlight<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InFlight").field("len", &self.len()).finish_non_exhaustive()
    }
}

impl<V> Default for InFlight<V> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            flights: SyncMutex::new(HashMap::new()),
        }
    }
}

impl<V> InFlight<V> {
    /// Joins the fetch running for `key`, or registers a new one built by `start`.
    ///
    /// The lookup and the registration happen under one lock, so concurrent
    /// callers for the same key always agree on a single fetch. `start`
    /// receives the id that [`complete`](Self::complete) must be called with.
    /// If `start` fails nothing is registered.
    ///
    /// A registration whose future has already resolved never went through
    /// `complete` (its task was cancelled), so it is replaced instead of joined.
    pub(crate) fn claim<E>(&self, key: &str, start: impl FnOnce(u64) -> Result<SharedFetch<V>, E>) -> Result<Claim<V>, E> {
        let mut flights = self.flights.lock();
        if let Some(flight) = flights.get(key).filter(|flight| flight.future.peek().is_none()) {
            return Ok(Claim::Joined(flight.future.clone()));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let future = start(id)?;
        flights.insert(key.to_owned(), Flight { id, future: future.clone() });
        Ok(Claim::Started(future))
    }

    /// Finishes the fetch registered as `id` for `key`.
    ///
    /// If the registration is still current, `apply` runs while the registry
    /// lock is held, the registration is removed, and the result of `apply` is
    /// returned. A detached or superseded fetch gets `None` and `apply` is not
    /// called.
    pub(crate) fn complete<R>(&self, key: &str, id: u64, apply: impl FnOnce() -> R) -> Option<R> {
        let mut flights = self.flights.lock();
        if flights.get(key).is_none_or(|flight| flight.id != id) {
            return None;
        }

        let applied = apply();
        flights.remove(key);
        Some(applied)
    }

    /// Removes the registration `id` for `key` without applying anything.
    pub(crate) fn release(&self, key: &str, id: u64) -> bool {
        self.complete(key, id, || ()).is_some()
    }

    /// Forgets the fetch running for `key`. Returns whether one was registered.
    ///
    /// The fetch keeps running for callers already waiting on it, but its
    /// result will not be applied.
    pub(crate) fn detach(&self, key: &str) -> bool {
        self.flights.lock().remove(key).is_some()
    }

    /// Forgets every running fetch.
    pub(crate) fn detach_all(&self) -> usize {
        let mut flights = self.flights.lock();
        let count = flights.len();
        flights.clear();
        count
    }

    pub(crate) fn is_in_flight(&self, key: &str) -> bool {
        self.flights.lock().contains_key(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.flights.lock().len()
    }
}
