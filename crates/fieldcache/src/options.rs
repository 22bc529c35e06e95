// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

/// Default time-to-live for values written by a session.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Per-session caching options.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use fieldcache::CacheOptions;
///
/// let options = CacheOptions::default()
///     .with_ttl(Duration::from_secs(30))
///     .with_stale_while_revalidate(false);
///
/// assert_eq!(options.ttl, Duration::from_secs(30));
/// assert!(!options.stale_while_revalidate);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct CacheOptions {
    /// How long a written value stays fresh.
    pub ttl: Duration,
    /// Serve stale values immediately and revalidate in the background.
    ///
    /// When disabled, reading a stale value waits for the fetch to finish.
    pub stale_while_revalidate: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            stale_while_revalidate: true,
        }
    }
}

impl CacheOptions {
    /// Sets the time-to-live for written values.
    #[must_use]
    pub fn with_ttl(self, ttl: Duration) -> Self {
        Self { ttl, ..self }
    }

    /// Enables or disables stale-while-revalidate.
    #[must_use]
    pub fn with_stale_while_revalidate(self, enabled: bool) -> Self {
        Self {
            stale_while_revalidate: enabled,
            ..self
        }
    }
}
