// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use tick::Clock;

/// Output of a timed future together with how long it took.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Timed<R> {
    pub result: R,
    pub duration: Duration,
}

/// Awaits `f` and measures the elapsed time on `clock`.
pub(crate) async fn timed<F: Future>(clock: &Clock, f: F) -> Timed<F::Output> {
    let start = clock.instant();
    let result = f.await;
    Timed {
        result,
        duration: clock.instant().saturating_duration_since(start),
    }
}
