// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;

use futures::{FutureExt, future::BoxFuture};

use crate::BoxError;

type UpdateFn<V> = Box<dyn FnOnce(Option<V>) -> V + Send>;
type AsyncUpdateFn<V> = Box<dyn FnOnce(Option<V>) -> BoxFuture<'static, Result<V, BoxError>> + Send>;

/// The new value passed to [`CacheSession::mutate`](crate::CacheSession::mutate).
///
/// A mutation is either a value, a future producing a value, or a function of
/// the current cached value (which may be absent).
///
/// # Examples
///
/// ```
/// use fieldcache::Mutation;
///
/// let replace: Mutation<Vec<u32>> = vec![1, 2, 3].into();
/// let append = Mutation::update(|current: Option<Vec<u32>>| {
///     let mut items = current.unwrap_or_default();
///     items.push(4);
///     items
/// });
/// # let _ = (replace, append);
/// ```
pub enum Mutation<V> {
    /// Replace the cached value.
    Value(V),
    /// Replace the cached value with the output of a future.
    AsyncValue(BoxFuture<'static, Result<V, BoxError>>),
    /// Compute the new value from the current one.
    Updater(UpdateFn<V>),
    /// Compute the new value asynchronously from the current one.
    AsyncUpdater(AsyncUpdateFn<V>),
}

impl<V> Mutation<V> {
    /// Creates a mutation that replaces the cached value.
    pub fn value(value: V) -> Self {
        Self::Value(value)
    }

    /// Creates a mutation from a future.
    pub fn future<F, E>(future: F) -> Self
    where
        F: Future<Output = Result<V, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Self::AsyncValue(future.map(|result| result.map_err(Into::into)).boxed())
    }

    /// Creates a mutation computed from the current value.
    pub fn update(f: impl FnOnce(Option<V>) -> V + Send + 'static) -> Self {
        Self::Updater(Box::new(f))
    }

    /// Creates a mutation computed asynchronously from the current value.
    pub fn update_async<F, Fut, E>(f: F) -> Self
    where
        F: FnOnce(Option<V>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Self::AsyncUpdater(Box::new(move |current| f(current).map(|result| result.map_err(Into::into)).boxed()))
    }

    pub(crate) async fn resolve(self, current: Option<V>) -> Result<V, BoxError> {
        match self {
            Self::Value(value) => Ok(value),
            Self::AsyncValue(future) => future.await,
            Self::Updater(f) => Ok(f(current)),
            Self::AsyncUpdater(f) => f(current).await,
        }
    }
}

impl<V> From<V> for Mutation<V> {
    fn from(value: V) -> Self {
        Self::Value(value)
    }
}

impl<V: Debug> Debug for Mutation<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::AsyncValue(_) => f.write_str("AsyncValue(..)"),
            Self::Updater(_) => f.write_str("Updater(..)"),
            Self::AsyncUpdater(_) => f.write_str("AsyncUpdater(..)"),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use futures::executor::block_on;

    use super::*;

    #[test]
    fn value_ignores_current() {
        let resolved = block_on(Mutation::value(7).resolve(Some(1))).unwrap();
        assert_eq!(resolved, 7);
    }

    #[test]
    fn update_receives_current() {
        let increment = |current: Option<i32>| current.unwrap_or(9) + 1;

        assert_eq!(block_on(Mutation::update(increment).resolve(None)).unwrap(), 10);
        assert_eq!(block_on(Mutation::update(increment).resolve(Some(41))).unwrap(), 42);
    }

    #[test]
    fn future_errors_propagate() {
        let mutation: Mutation<i32> = Mutation::future(async { Err::<i32, _>("rejected") });
        let error = block_on(mutation.resolve(None)).unwrap_err();

        assert_eq!(error.to_string(), "rejected");
    }

    #[test]
    fn update_async_receives_current() {
        let mutation = Mutation::update_async(|current: Option<String>| async move {
            Ok::<_, BoxError>(format!("{}!", current.unwrap_or_default()))
        });

        assert_eq!(block_on(mutation.resolve(Some("hi".to_string()))).unwrap(), "hi!");
    }

    #[test]
    fn debug_hides_closures() {
        assert_eq!(format!("{:?}", Mutation::value(3)), "Value(3)");
        assert_eq!(format!("{:?}", Mutation::update(|_: Option<i32>| 1)), "Updater(..)");
    }
}
