// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Spawning of background fetch tasks.

use tokio::{
    runtime::{Handle, TryCurrentError},
    task::JoinHandle,
};

/// Where fetch tasks run.
///
/// Without an explicit handle, tasks are spawned onto the ambient tokio
/// runtime of the caller.
#[derive(Debug, Clone, Default)]
pub(crate) struct Runtime {
    handle: Option<Handle>,
}

impl Runtime {
    pub(crate) fn with_handle(handle: Handle) -> Self {
        Self { handle: Some(handle) }
    }

    /// Spawns `work` as a detached task.
    ///
    /// Fails if no handle was configured and the caller is not running inside a tokio runtime.
    pub(crate) fn spawn<T>(&self, work: T) -> Result<JoinHandle<T::Output>, TryCurrentError>
    where
        T: Future + Send + 'static,
        T::Output: Send + 'static,
    {
        match &self.handle {
            Some(handle) => Ok(handle.spawn(work)),
            None => Ok(Handle::try_current()?.spawn(work)),
        }
    }
}
