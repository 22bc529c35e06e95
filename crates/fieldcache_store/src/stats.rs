// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// Point-in-time diagnostics for a [`Store`](crate::Store).
///
/// Produced by [`Store::stats`](crate::Store::stats). The snapshot is not
/// updated afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats {
    /// Number of live entries.
    pub size: usize,
    /// Sum of the hit counts of all live entries.
    pub total_hits: u64,
    /// Number of live entries that are currently stale.
    pub expired_count: usize,
    /// `total_hits / size`, or `0.0` for an empty store.
    ///
    /// This is hits per live entry, not a lookup success ratio. See
    /// [`hit_ratio`](Self::hit_ratio) for the latter.
    pub hit_rate: f64,
    /// Number of lookups that found no entry since the store was created.
    pub misses: u64,
}

impl Stats {
    /// Returns `total_hits / (total_hits + misses)`, or `0.0` when nothing was looked up.
    ///
    /// Hits of entries that were since evicted or deleted no longer count,
    /// so this is an approximation over the live working set.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use fieldcache_store::Store;
    /// use tick::Clock;
    ///
    /// let store = Store::with_clock(4, Clock::new_frozen());
    /// store.set("a", 1, Duration::from_secs(60));
    ///
    /// assert_eq!(store.get("a"), Some(1));
    /// assert_eq!(store.get("missing"), None);
    ///
    /// let stats = store.stats();
    /// assert!((stats.hit_ratio() - 0.5).abs() < f64::EPSILON);
    /// ```
    #[must_use]
    #[expect(clippy::cast_precision_loss, reason = "diagnostic ratio, precision loss above 2^52 lookups is acceptable")]
    pub fn hit_ratio(&self) -> f64 {
        let lookups = self.total_hits.saturating_add(self.misses);
        if lookups == 0 {
            0.0
        } else {
            self.total_hits as f64 / lookups as f64
        }
    }
}
