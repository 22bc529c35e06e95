// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Bounded in-memory storage for the `fieldcache` caching library.
//!
//! [`Store`] maps string keys to [`CacheEntry`] values with a per-entry TTL.
//! It is a plain synchronous data structure:
//!
//! - Capacity is fixed at construction. Inserting a new key into a full store
//!   evicts the least recently *accessed* entry.
//! - Freshness is computed on every query against the store's [`tick::Clock`],
//!   never cached.
//! - Expired entries (stale and unread for longer than their TTL) are removed
//!   lazily on access and before each insertion. There is no background sweeper.
//! - [`Store::stats`] exposes a read-only diagnostic snapshot.
//!
//! Asynchronous fetching, de-duplication and stale-while-revalidate live in
//! the `fieldcache` crate, which builds on this store.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use fieldcache_store::Store;
//! use tick::ClockControl;
//!
//! let control = ClockControl::new();
//! let store = Store::with_clock(100, control.to_clock());
//!
//! store.set("work-orders", vec![101, 102], Duration::from_secs(60));
//! assert!(store.has_fresh("work-orders"));
//!
//! control.advance(Duration::from_secs(60));
//! assert!(store.is_stale("work-orders"));
//!
//! // Stale values are still served; the caller decides what to do with them.
//! assert_eq!(store.get("work-orders"), Some(vec![101, 102]));
//! ```

mod entry;
mod stats;
mod store;

#[doc(inline)]
pub use entry::CacheEntry;
#[doc(inline)]
pub use stats::Stats;
#[doc(inline)]
pub use store::{Lookup, Store};
