// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// What a session observed for its key.
///
/// Returned by [`CacheSession::get`](crate::CacheSession::get) and
/// [`CacheSession::snapshot`](crate::CacheSession::snapshot).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot<V> {
    /// The cached value, fresh or stale.
    pub value: Option<V>,
    /// `true` when the value is absent or its TTL has elapsed.
    pub is_stale: bool,
    /// `true` while a fetch for the key is in flight.
    pub is_loading: bool,
}

/// Coarse classification of a [`Snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// A value is present and within its TTL.
    Fresh,
    /// A value is present but past its TTL.
    Stale,
    /// No value is present and a fetch is in flight.
    Loading,
    /// No value is present and nothing is loading.
    Empty,
}

impl<V> Snapshot<V> {
    /// Classifies the snapshot.
    #[must_use]
    pub fn status(&self) -> Status {
        match (&self.value, self.is_stale, self.is_loading) {
            (Some(_), false, _) => Status::Fresh,
            (Some(_), true, _) => Status::Stale,
            (None, _, true) => Status::Loading,
            (None, _, false) => Status::Empty,
        }
    }

    /// Returns `true` if a value is present and within its TTL.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.status() == Status::Fresh
    }

    /// Consumes the snapshot and returns its value.
    #[must_use]
    pub fn into_value(self) -> Option<V> {
        self.value
    }

    pub(crate) fn empty(is_loading: bool) -> Self {
        Self {
            value: None,
            is_stale: true,
            is_loading,
        }
    }
}
