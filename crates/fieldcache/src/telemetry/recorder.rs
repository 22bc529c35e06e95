// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{sync::Arc, time::Duration};

#[cfg(any(feature = "metrics", test))]
use opentelemetry::{KeyValue, metrics::Meter};
use tracing::Level;

#[cfg(any(feature = "metrics", test))]
use crate::telemetry::{attributes, metrics::Instruments};
use crate::{
    cache::CacheName,
    telemetry::{CacheActivity, CacheOperation},
};

/// Records cache activity as logs and, when configured, metrics.
#[derive(Clone, Debug)]
pub(crate) struct CacheTelemetry {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    logging_enabled: bool,
    #[cfg(any(feature = "metrics", test))]
    instruments: Option<Instruments>,
}

impl CacheTelemetry {
    #[cfg(any(feature = "metrics", test))]
    pub(crate) fn new(logging_enabled: bool, meter: Option<&Meter>) -> Self {
        Self {
            inner: Arc::new(Inner {
                logging_enabled,
                instruments: meter.map(Instruments::new),
            }),
        }
    }

    #[cfg(not(any(feature = "metrics", test)))]
    pub(crate) fn new(logging_enabled: bool) -> Self {
        Self {
            inner: Arc::new(Inner { logging_enabled }),
        }
    }

    /// Records one activity of `operation` on `key`.
    #[inline]
    pub(crate) fn record(
        &self,
        cache_name: CacheName,
        key: &str,
        operation: CacheOperation,
        activity: CacheActivity,
        duration: Option<Duration>,
    ) {
        #[cfg(any(feature = "metrics", test))]
        if let Some(instruments) = &self.inner.instruments {
            instruments.activity(
                &[
                    KeyValue::new(attributes::CACHE_NAME, cache_name),
                    KeyValue::new(attributes::CACHE_OPERATION_NAME, operation.as_str()),
                    KeyValue::new(attributes::CACHE_ACTIVITY_NAME, activity.as_str()),
                ],
                duration,
            );
        }

        if self.inner.logging_enabled {
            Self::emit(cache_name, key, operation, activity, duration);
        }
    }

    /// Records the number of entries currently in the store.
    #[inline]
    #[cfg_attr(
        not(any(feature = "metrics", test)),
        expect(unused_variables, reason = "size is only reported as a metric")
    )]
    pub(crate) fn record_size(&self, cache_name: CacheName, size: usize) {
        #[cfg(any(feature = "metrics", test))]
        if let Some(instruments) = &self.inner.instruments {
            instruments.store_size(size, &[KeyValue::new(attributes::CACHE_NAME, cache_name)]);
        }
    }

    fn emit(cache_name: CacheName, key: &str, operation: CacheOperation, activity: CacheActivity, duration: Option<Duration>) {
        let op = operation.as_str();
        let act = activity.as_str();
        let duration_s = duration.map(|d| d.as_secs_f64());

        // The level of a tracing event must be a constant.
        macro_rules! emit_event {
            ($level:ident) => {
                tracing::$level!(
                    cache.name = cache_name,
                    cache.key = key,
                    cache.operation = op,
                    cache.activity = act,
                    cache.duration_s = ?duration_s,
                    "cache.event"
                )
            };
        }

        let level = activity.severity();
        if level == Level::ERROR {
            emit_event!(error);
        } else if level == Level::INFO {
            emit_event!(info);
        } else {
            emit_event!(debug);
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use opentelemetry::metrics::MeterProvider;

    use super::*;
    use crate::telemetry::{
        metrics,
        testing::{LogCapture, MetricTester},
    };

    #[test]
    fn metrics_carry_operation_and_activity() {
        let tester = MetricTester::new();
        let meter = tester.meter_provider().meter("cache");
        let telemetry = CacheTelemetry::new(false, Some(&meter));

        telemetry.record(
            "orders",
            "order-1",
            CacheOperation::Fetch,
            CacheActivity::Fetched,
            Some(Duration::from_millis(5)),
        );

        tester.assert_attributes_contain(&[
            KeyValue::new(attributes::CACHE_NAME, "orders"),
            KeyValue::new(attributes::CACHE_OPERATION_NAME, CacheOperation::Fetch.as_str()),
            KeyValue::new(attributes::CACHE_ACTIVITY_NAME, CacheActivity::Fetched.as_str()),
        ]);
    }

    #[test]
    fn durations_are_recorded_in_seconds() {
        let tester = MetricTester::new();
        let meter = tester.meter_provider().meter("cache");
        let telemetry = CacheTelemetry::new(false, Some(&meter));

        telemetry.record(
            "orders",
            "order-1",
            CacheOperation::Fetch,
            CacheActivity::Fetched,
            Some(Duration::from_millis(1250)),
        );
        telemetry.record_size("orders", 1);

        let units = tester.units();
        assert!(units.contains(&(metrics::OPERATION_DURATION.to_owned(), "s".to_owned())), "{units:?}");
        assert!(units.contains(&(metrics::EVENT_COUNT.to_owned(), "{event}".to_owned())), "{units:?}");
        assert!(units.contains(&(metrics::STORE_SIZE.to_owned(), "{entry}".to_owned())), "{units:?}");
        let sums = tester.histogram_sums(metrics::OPERATION_DURATION);
        assert_eq!(sums.len(), 1);
        assert!((sums[0] - 1.25).abs() < f64::EPSILON);
    }

    #[test]
    fn size_gauge_carries_cache_name() {
        let tester = MetricTester::new();
        let meter = tester.meter_provider().meter("cache");
        let telemetry = CacheTelemetry::new(false, Some(&meter));

        telemetry.record_size("size_cache", 7);

        tester.assert_attributes_contain(&[KeyValue::new(attributes::CACHE_NAME, "size_cache")]);
    }

    #[test]
    fn log_contains_all_fields() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        CacheTelemetry::emit(
            "crew_cache",
            "crew-7",
            CacheOperation::Refresh,
            CacheActivity::Error,
            Some(Duration::from_millis(1250)),
        );

        capture.assert_contains(attributes::CACHE_NAME);
        capture.assert_contains(attributes::CACHE_KEY_NAME);
        capture.assert_contains(attributes::CACHE_OPERATION_NAME);
        capture.assert_contains(attributes::CACHE_ACTIVITY_NAME);
        capture.assert_contains(attributes::CACHE_DURATION_NAME);
        capture.assert_contains(attributes::CACHE_EVENT_NAME);

        capture.assert_contains("crew_cache");
        capture.assert_contains("crew-7");
        capture.assert_contains("1.25");
        capture.assert_contains(CacheOperation::Refresh.as_str());
        capture.assert_contains(CacheActivity::Error.as_str());
    }

    #[test]
    fn log_levels_follow_activity() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());
        CacheTelemetry::emit("cache", "k", CacheOperation::Get, CacheActivity::Error, None);
        capture.assert_contains("ERROR");

        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());
        CacheTelemetry::emit("cache", "k", CacheOperation::Invalidate, CacheActivity::Invalidated, None);
        capture.assert_contains("INFO");

        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());
        CacheTelemetry::emit("cache", "k", CacheOperation::Get, CacheActivity::Hit, None);
        capture.assert_contains("DEBUG");
    }

    #[test]
    fn disabled_telemetry_emits_nothing() {
        let telemetry = CacheTelemetry::new(false, None);

        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        telemetry.record("cache", "k", CacheOperation::Get, CacheActivity::Hit, Some(Duration::from_secs(1)));
        telemetry.record_size("cache", 3);

        assert!(capture.output().is_empty());
    }
}
