// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for cache operations.

/// Boxed error produced by fetchers and asynchronous mutations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A fetch, or an asynchronous mutation, failed for a key.
///
/// The underlying cause is kept in the error chain and shown after the
/// message when the error is displayed. The error is `Clone` because a single
/// failed fetch is reported to every caller that was waiting on it.
///
/// A failed fetch is never written to the store. Whatever the store held
/// before the failure stays in place.
#[ohno::error]
#[derive(Clone)]
#[display("fetch failed for cache key '{key}'")]
pub struct FetchError {
    key: String,
}

impl FetchError {
    /// Returns the cache key whose fetch failed.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}
