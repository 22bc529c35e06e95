// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::FetchError;

/// Notification published by a [`Cache`](crate::Cache) when its contents change
/// or a background fetch fails.
///
/// Subscribe with [`Cache::subscribe`](crate::Cache::subscribe). Delivery is
/// best effort: a slow subscriber may miss events once the channel's capacity
/// is exceeded.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum CacheEvent {
    /// A fetch stored a value for a key that had none.
    Fetched {
        /// The key that was written.
        key: String,
    },
    /// A fetch replaced an existing value.
    Revalidated {
        /// The key that was written.
        key: String,
    },
    /// A fetch failed while a previous value was still cached.
    ///
    /// The previous value is kept and continues to be served as stale.
    StaleServedWithError {
        /// The key whose fetch failed.
        key: String,
        /// The failure.
        error: FetchError,
    },
    /// A mutation wrote a value.
    Mutated {
        /// The key that was written.
        key: String,
    },
    /// A key was invalidated.
    Invalidated {
        /// The key that was removed.
        key: String,
    },
}

impl CacheEvent {
    /// Returns the key the event is about.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Fetched { key }
            | Self::Revalidated { key }
            | Self::StaleServedWithError { key, .. }
            | Self::Mutated { key }
            | Self::Invalidated { key } => key,
        }
    }
}
