// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::{Duration, Instant};

/// A stored value together with its timing and access metadata.
///
/// Entries are created and mutated only by [`Store`](crate::Store). Callers
/// receive clones through [`Store::peek`](crate::Store::peek), which makes
/// them read-only snapshots: changing a snapshot never affects the store.
///
/// Freshness is never stored on the entry. Use [`is_stale_at`](Self::is_stale_at)
/// with the current time of the store's clock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    ttl: Duration,
    hit_count: u64,
    last_accessed: Instant,
    access_seq: u64,
}

impl<V> CacheEntry<V> {
    pub(crate) fn new(value: V, ttl: Duration, now: Instant, access_seq: u64) -> Self {
        Self {
            value,
            created_at: now,
            ttl,
            hit_count: 0,
            last_accessed: now,
            access_seq,
        }
    }

    /// Returns a reference to the stored value.
    #[must_use]
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Consumes the entry and returns the stored value.
    #[must_use]
    pub fn into_value(self) -> V {
        self.value
    }

    /// Returns the instant at which the entry was written.
    #[must_use]
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Returns the validity window of this entry.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns how many successful reads the entry has served since it was written.
    #[must_use]
    pub fn hit_count(&self) -> u64 {
        self.hit_count
    }

    /// Returns the instant of the most recent read, or the write instant if never read.
    #[must_use]
    pub fn last_accessed(&self) -> Instant {
        self.last_accessed
    }

    /// Returns how long ago, relative to `now`, the entry was written.
    #[must_use]
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }

    /// Returns `true` once the entry's TTL has fully elapsed at `now`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use fieldcache_store::Store;
    /// use tick::ClockControl;
    ///
    /// let control = ClockControl::new();
    /// let store = Store::with_clock(8, control.to_clock());
    /// store.set("key", 1, Duration::from_secs(10));
    ///
    /// let entry = store.peek("key").expect("entry was just written");
    /// let written = entry.created_at();
    /// assert!(!entry.is_stale_at(written + Duration::from_secs(9)));
    /// assert!(entry.is_stale_at(written + Duration::from_secs(10)));
    /// ```
    #[must_use]
    pub fn is_stale_at(&self, now: Instant) -> bool {
        self.age(now) >= self.ttl
    }

    /// Returns `true` if the entry is stale and has also been idle for longer than its TTL.
    ///
    /// Idleness counts from the later of the last read and the instant the entry
    /// went stale, so a value nobody read stays servable for one more TTL after
    /// it turned stale. Expired entries are removed lazily by the store.
    #[must_use]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        if !self.is_stale_at(now) {
            return false;
        }
        let stale_since = self.created_at.checked_add(self.ttl).unwrap_or(now);
        let idle_since = self.last_accessed.max(stale_since);
        now.saturating_duration_since(idle_since) > self.ttl
    }

    pub(crate) fn touch(&mut self, now: Instant, access_seq: u64) {
        self.hit_count = self.hit_count.saturating_add(1);
        // Clocks handed to the store are monotonic, but keep the invariant even if one is not.
        self.last_accessed = self.last_accessed.max(now);
        self.access_seq = access_seq;
    }

    /// Ordering key for LRU selection: older access first, sequence breaks ties.
    pub(crate) fn recency(&self) -> (Instant, u64) {
        (self.last_accessed, self.access_seq)
    }
}
