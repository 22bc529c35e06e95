// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Structured logs and OpenTelemetry metrics for cache activity.
//!
//! Every activity is recorded as one `tracing` event, when logging is
//! enabled, and as one increment of the event counter, when a meter provider
//! was configured (`metrics` feature).

use tracing::Level;

pub(crate) mod attributes;
pub(crate) mod config;
#[cfg(any(feature = "metrics", test))]
pub(crate) mod metrics;
mod recorder;
#[cfg(test)]
pub(crate) mod testing;
pub(crate) mod timing;

pub(crate) use recorder::CacheTelemetry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheOperation {
    Get,
    Fetch,
    Mutate,
    Invalidate,
    Refresh,
}

impl CacheOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "cache.get",
            Self::Fetch => "cache.fetch",
            Self::Mutate => "cache.mutate",
            Self::Invalidate => "cache.invalidate",
            Self::Refresh => "cache.refresh",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheActivity {
    Hit,
    StaleHit,
    Miss,
    Joined,
    Fetched,
    Revalidated,
    Discarded,
    Mutated,
    Invalidated,
    Error,
}

impl CacheActivity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "cache.hit",
            Self::StaleHit => "cache.stale_hit",
            Self::Miss => "cache.miss",
            Self::Joined => "cache.joined",
            Self::Fetched => "cache.fetched",
            Self::Revalidated => "cache.revalidated",
            Self::Discarded => "cache.discarded",
            Self::Mutated => "cache.mutated",
            Self::Invalidated => "cache.invalidated",
            Self::Error => "cache.error",
        }
    }

    pub fn severity(self) -> Level {
        match self {
            Self::Hit | Self::StaleHit | Self::Miss | Self::Joined => Level::DEBUG,
            Self::Fetched | Self::Revalidated | Self::Discarded | Self::Mutated | Self::Invalidated => Level::INFO,
            Self::Error => Level::ERROR,
        }
    }
}
