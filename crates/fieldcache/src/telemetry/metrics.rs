// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! OpenTelemetry instruments recorded by a cache.
//!
//! Durations are reported in seconds, matching the `cache.duration_s` log field.

use std::time::Duration;

use opentelemetry::{
    InstrumentationScope, KeyValue,
    metrics::{Counter, Gauge, Histogram, Meter, MeterProvider},
};

pub(crate) const EVENT_COUNT: &str = "fieldcache.event.count";
pub(crate) const OPERATION_DURATION: &str = "fieldcache.operation.duration";
pub(crate) const STORE_SIZE: &str = "fieldcache.store.size";

/// Creates the meter all instruments of this crate are registered on.
pub(crate) fn fieldcache_meter(provider: &dyn MeterProvider) -> Meter {
    let scope = InstrumentationScope::builder(env!("CARGO_PKG_NAME"))
        .with_version(env!("CARGO_PKG_VERSION"))
        .build();
    provider.meter_with_scope(scope)
}

/// The counter, histogram and gauge a cache reports through.
#[derive(Clone, Debug)]
pub(crate) struct Instruments {
    events: Counter<u64>,
    durations: Histogram<f64>,
    store_size: Gauge<u64>,
}

impl Instruments {
    pub(crate) fn new(meter: &Meter) -> Self {
        Self {
            events: meter
                .u64_counter(EVENT_COUNT)
                .with_description("Cache activities, by operation and activity")
                .with_unit("{event}")
                .build(),
            durations: meter
                .f64_histogram(OPERATION_DURATION)
                .with_description("Time spent fetching or resolving mutations")
                .with_unit("s")
                .build(),
            store_size: meter
                .u64_gauge(STORE_SIZE)
                .with_description("Entries held by the store after a write")
                .with_unit("{entry}")
                .build(),
        }
    }

    pub(crate) fn activity(&self, attributes: &[KeyValue], duration: Option<Duration>) {
        self.events.add(1, attributes);
        if let Some(duration) = duration {
            self.durations.record(duration.as_secs_f64(), attributes);
        }
    }

    pub(crate) fn store_size(&self, size: usize, attributes: &[KeyValue]) {
        self.store_size.record(u64::try_from(size).unwrap_or(u64::MAX), attributes);
    }
}
