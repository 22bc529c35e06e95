// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The bounded TTL/LRU store.

use std::{
    collections::HashMap,
    fmt::Debug,
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use tick::{Clock, runtime::InactiveClock};

use crate::{CacheEntry, Stats};

/// Result of [`Store::lookup`]: the value together with its staleness at lookup time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup<V> {
    /// The stored value, fresh or stale.
    pub value: V,
    /// Whether the entry's TTL had elapsed when it was read.
    pub is_stale: bool,
}

impl<V> Lookup<V> {
    /// Consumes the lookup and returns the value.
    #[must_use]
    pub fn into_value(self) -> V {
        self.value
    }
}

/// A bounded map from string keys to [`CacheEntry`] values.
///
/// The store never fails. Once it holds `max_size` entries, inserting a new
/// key drops the least recently accessed entry. Expiry is lazy. There is no
/// background sweeper. An entry that has been stale for longer than its TTL
/// without being read is removed the next time a read observes it, or by the
/// cleanup pass that precedes every [`set`](Self::set). Idleness counts from
/// the later of the last read and the moment the entry went stale.
///
/// All operations take `&self` and are safe to call concurrently.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use fieldcache_store::Store;
/// use tick::Clock;
///
/// let store = Store::with_clock(2, Clock::new_frozen());
/// let ttl = Duration::from_millis(100);
///
/// store.set("a", 1, ttl);
/// store.set("b", 2, ttl);
/// assert_eq!(store.get("a"), Some(1));
///
/// // "b" is now the least recently accessed entry.
/// store.set("c", 3, ttl);
/// assert!(!store.contains("b"));
/// assert!(store.contains("a"));
/// assert!(store.contains("c"));
/// ```
pub struct Store<V> {
    max_size: usize,
    clock: Clock,
    state: Mutex<State<V>>,
}

struct State<V> {
    entries: HashMap<String, CacheEntry<V>>,
    next_seq: u64,
    misses: u64,
}

impl<V> State<V> {
    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        seq
    }

    fn sweep_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        before - self.entries.len()
    }

    fn remove_if_expired(&mut self, key: &str, now: Instant) -> bool {
        if self.entries.get(key).is_some_and(|entry| entry.is_expired_at(now)) {
            self.entries.remove(key);
            true
        } else {
            false
        }
    }

    fn evict_lru(&mut self) -> Option<String> {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.recency())
            .map(|(key, _)| key.clone())?;
        self.entries.remove(&victim);
        Some(victim)
    }
}

impl<V> Debug for Store<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("max_size", &self.max_size)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl<V> Store<V> {
    /// Creates a store holding at most `max_size` entries, timed by the system clock.
    ///
    /// A `max_size` of zero creates a store that retains nothing.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        let (clock, _driver) = InactiveClock::default().activate();
        Self::with_clock(max_size, clock)
    }

    /// Creates a store holding at most `max_size` entries, timed by `clock`.
    ///
    /// Tests pass a clock obtained from `tick::ClockControl` to move time deterministically.
    #[must_use]
    pub fn with_clock(max_size: usize, clock: Clock) -> Self {
        Self {
            max_size,
            clock,
            state: Mutex::new(State {
                entries: HashMap::new(),
                next_seq: 0,
                misses: 0,
            }),
        }
    }

    /// Returns the capacity fixed at construction.
    #[must_use]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Returns the clock used to timestamp entries.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Returns the number of live entries, including stale ones not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Returns `true` if the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if an entry for `key` is present, without counting as an access.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.state.lock().entries.contains_key(key)
    }

    /// Inserts or overwrites the entry for `key`.
    ///
    /// Expired entries are swept first. If `key` is new and the store is
    /// still full, the least recently accessed entry is evicted. The written
    /// entry starts with zero hits and both timestamps set to now.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        let now = self.clock.instant();
        let mut state = self.state.lock();

        let swept = state.sweep_expired(now);
        if swept > 0 {
            tracing::debug!(swept, "swept expired cache entries");
        }

        if self.max_size == 0 {
            tracing::debug!(key = %key, "store has no capacity, dropping entry");
            return;
        }

        if !state.entries.contains_key(&key) {
            while state.entries.len() >= self.max_size {
                let Some(evicted) = state.evict_lru() else {
                    break;
                };
                tracing::debug!(key = %evicted, max_size = self.max_size, "evicted least recently used entry");
            }
        }

        let seq = state.next_seq();
        state.entries.insert(key, CacheEntry::new(value, ttl, now, seq));
    }

    /// Returns `true` if `key` is absent or its TTL has elapsed.
    ///
    /// Computed against the current clock on every call. An expired entry
    /// observed here is removed.
    #[must_use]
    pub fn is_stale(&self, key: &str) -> bool {
        let now = self.clock.instant();
        let mut state = self.state.lock();
        state.remove_if_expired(key, now);
        state.entries.get(key).is_none_or(|entry| entry.is_stale_at(now))
    }

    /// Returns `true` if `key` is present and not stale.
    #[must_use]
    pub fn has_fresh(&self, key: &str) -> bool {
        !self.is_stale(key)
    }

    /// Removes the entry for `key`. Returns whether an entry was present.
    pub fn delete(&self, key: &str) -> bool {
        self.state.lock().entries.remove(key).is_some()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.state.lock().entries.clear();
    }

    /// Computes a diagnostic snapshot.
    #[must_use]
    #[expect(clippy::cast_precision_loss, reason = "diagnostic ratio, precision loss is acceptable")]
    pub fn stats(&self) -> Stats {
        let now = self.clock.instant();
        let state = self.state.lock();

        let size = state.entries.len();
        let total_hits = state.entries.values().map(CacheEntry::hit_count).sum::<u64>();
        let expired_count = state.entries.values().filter(|entry| entry.is_stale_at(now)).count();
        let hit_rate = if size == 0 { 0.0 } else { total_hits as f64 / size as f64 };

        Stats {
            size,
            total_hits,
            expired_count,
            hit_rate,
            misses: state.misses,
        }
    }
}

impl<V: Clone> Store<V> {
    /// Returns the value for `key`, fresh or stale.
    ///
    /// A successful read bumps the entry's hit count and access time. Returns
    /// `None` if the key is absent or was expired and has just been swept.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<V> {
        self.lookup(key).map(Lookup::into_value)
    }

    /// Reads the value for `key` together with its staleness, under a single lock.
    ///
    /// Behaves like [`get`](Self::get) with respect to access bookkeeping and sweeping.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<Lookup<V>> {
        let now = self.clock.instant();
        let mut state = self.state.lock();

        if state.remove_if_expired(key, now) {
            tracing::debug!(key, "swept expired entry on read");
        }

        let seq = state.next_seq();
        let found = state.entries.get_mut(key).map(|entry| {
            entry.touch(now, seq);
            Lookup {
                value: entry.value().clone(),
                is_stale: entry.is_stale_at(now),
            }
        });

        if found.is_none() {
            state.misses = state.misses.saturating_add(1);
        }
        found
    }

    /// Returns a copy of the entry for `key` without counting as an access.
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<CacheEntry<V>> {
        self.state.lock().entries.get(key).cloned()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use tick::ClockControl;

    const TTL: Duration = Duration::from_millis(100);

    fn controlled(max_size: usize) -> (ClockControl, Store<i32>) {
        let control = ClockControl::new();
        let store = Store::with_clock(max_size, control.to_clock());
        (control, store)
    }

    #[test]
    fn set_then_get_returns_value() {
        let (_control, store) = controlled(4);
        store.set("a", 1, TTL);

        assert_eq!(store.get("a"), Some(1));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn overwrite_resets_metadata() {
        let (control, store) = controlled(4);
        store.set("a", 1, TTL);
        let _ = store.get("a");
        control.advance(Duration::from_millis(30));

        store.set("a", 2, Duration::from_secs(1));

        let entry = store.peek("a").expect("entry present");
        assert_eq!(*entry.value(), 2);
        assert_eq!(entry.hit_count(), 0);
        assert_eq!(entry.ttl(), Duration::from_secs(1));
        assert_eq!(entry.created_at(), entry.last_accessed());
    }

    #[test]
    fn overwrite_of_existing_key_never_evicts() {
        let (_control, store) = controlled(2);
        store.set("a", 1, TTL);
        store.set("b", 2, TTL);
        store.set("a", 3, TTL);

        assert!(store.contains("a"));
        assert!(store.contains("b"));
    }

    #[test]
    fn zero_capacity_retains_nothing() {
        let (_control, store) = controlled(0);
        store.set("a", 1, TTL);

        assert!(store.is_empty());
        assert_eq!(store.get("a"), None);
    }

    #[test]
    fn lru_prefers_older_access_over_insertion_order() {
        let (control, store) = controlled(2);
        store.set("a", 1, TTL);
        control.advance(Duration::from_millis(1));
        store.set("b", 2, TTL);
        control.advance(Duration::from_millis(1));
        let _ = store.get("a");
        control.advance(Duration::from_millis(1));
        store.set("c", 3, TTL);

        assert!(store.contains("a"));
        assert!(!store.contains("b"));
        assert!(store.contains("c"));
    }

    #[test]
    fn lru_ties_break_by_access_order() {
        // Frozen clock: every instant is identical.
        let store = Store::with_clock(2, Clock::new_frozen());
        store.set("a", 1, TTL);
        store.set("b", 2, TTL);
        let _ = store.get("a");
        store.set("c", 3, TTL);

        assert!(!store.contains("b"));
    }

    #[test]
    fn set_sweeps_expired_before_evicting() {
        let (control, store) = controlled(2);
        store.set("old", 1, TTL);
        store.set("live", 2, Duration::from_secs(60));

        control.advance(Duration::from_millis(201));
        store.set("new", 3, TTL);

        // "old" was expired and swept, so nothing live had to be evicted.
        assert!(!store.contains("old"));
        assert!(store.contains("live"));
        assert!(store.contains("new"));
    }

    #[test]
    fn stale_entry_is_still_served() {
        let (control, store) = controlled(4);
        store.set("a", 1, TTL);
        control.advance(TTL);

        assert!(store.is_stale("a"));
        assert_eq!(
            store.lookup("a"),
            Some(Lookup {
                value: 1,
                is_stale: true
            })
        );
    }

    #[test]
    fn unread_entry_is_served_stale_for_one_more_ttl() {
        let (control, store) = controlled(4);
        store.set("a", 1, TTL);
        control.advance(TTL + Duration::from_millis(1));

        assert_eq!(store.lookup("a"), Some(Lookup { value: 1, is_stale: true }));

        // Freshly read, so it survives another full TTL of idleness.
        control.advance(TTL);
        assert_eq!(store.lookup("a"), Some(Lookup { value: 1, is_stale: true }));
    }

    #[test]
    fn unread_stale_entry_survives_set_cleanup() {
        let (control, store) = controlled(4);
        store.set("a", 1, TTL);
        control.advance(TTL * 2);

        store.set("b", 2, TTL);

        assert!(store.contains("a"));
        assert!(store.is_stale("a"));
    }

    #[test]
    fn idle_expired_entry_is_swept_on_read() {
        let (control, store) = controlled(4);
        store.set("a", 1, TTL);
        control.advance(TTL * 2 + Duration::from_millis(1));

        assert_eq!(store.get("a"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn recently_read_stale_entry_survives_set_cleanup() {
        let (control, store) = controlled(4);
        store.set("a", 1, TTL);
        control.advance(Duration::from_millis(80));
        assert_eq!(store.get("a"), Some(1));
        control.advance(Duration::from_millis(70));

        // Stale for 50ms, but read only 70ms ago.
        store.set("b", 2, TTL);

        assert!(store.is_stale("a"));
        assert!(store.contains("a"));
    }

    #[test]
    fn is_stale_for_absent_key() {
        let (_control, store) = controlled(4);
        assert!(store.is_stale("missing"));
        assert!(!store.has_fresh("missing"));
    }

    #[test]
    fn delete_is_idempotent() {
        let (_control, store) = controlled(4);
        store.set("a", 1, TTL);

        assert!(store.delete("a"));
        assert!(!store.delete("a"));
        assert_eq!(store.get("a"), None);
    }

    #[test]
    fn clear_drops_everything() {
        let (_control, store) = controlled(4);
        store.set("a", 1, TTL);
        store.set("b", 2, TTL);

        store.clear();

        assert!(store.is_empty());
    }

    #[test]
    fn stats_on_empty_store_has_zero_rate() {
        let (_control, store) = controlled(4);
        let stats = store.stats();

        assert_eq!(stats.size, 0);
        assert_eq!(stats.total_hits, 0);
        assert!(stats.hit_rate.abs() < f64::EPSILON);
    }

    #[test]
    fn stats_reports_hits_and_stale_entries() {
        let (control, store) = controlled(4);
        store.set("a", 1, TTL);
        store.set("b", 2, Duration::from_secs(60));
        let _ = store.get("a");
        let _ = store.get("a");
        let _ = store.get("b");
        let _ = store.get("missing");

        control.advance(TTL);
        let stats = store.stats();

        assert_eq!(stats.size, 2);
        assert_eq!(stats.total_hits, 3);
        assert_eq!(stats.expired_count, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn peek_does_not_touch() {
        let (_control, store) = controlled(4);
        store.set("a", 1, TTL);

        let _ = store.peek("a");

        assert_eq!(store.peek("a").map(|entry| entry.hit_count()), Some(0));
    }

    #[test]
    fn debug_reports_capacity() {
        let (_control, store) = controlled(3);
        let debug = format!("{store:?}");

        assert!(debug.contains("Store"));
        assert!(debug.contains("max_size"));
    }

    #[test]
    fn new_uses_system_clock() {
        let store = Store::<i32>::new(1);
        store.set("a", 1, Duration::from_secs(60));

        assert!(store.has_fresh("a"));
    }
}
