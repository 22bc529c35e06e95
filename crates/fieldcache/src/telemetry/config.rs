// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#[cfg(any(feature = "metrics", test))]
use opentelemetry::metrics::{Meter, MeterProvider};

use crate::telemetry::CacheTelemetry;

/// What the cache should emit. Filled in by the cache builder.
#[derive(Clone, Debug, Default)]
pub(crate) struct TelemetryConfig {
    logs_enabled: bool,
    #[cfg(any(feature = "metrics", test))]
    meter: Option<Meter>,
}

impl TelemetryConfig {
    #[must_use]
    pub(crate) fn with_logs(self) -> Self {
        Self {
            logs_enabled: true,
            ..self
        }
    }

    #[cfg(any(feature = "metrics", test))]
    #[must_use]
    pub(crate) fn with_metrics(mut self, provider: &dyn MeterProvider) -> Self {
        self.meter = Some(crate::telemetry::metrics::fieldcache_meter(provider));
        self
    }

    pub(crate) fn build(self) -> CacheTelemetry {
        #[cfg(not(any(feature = "metrics", test)))]
        {
            return CacheTelemetry::new(self.logs_enabled);
        }

        #[cfg(any(feature = "metrics", test))]
        {
            CacheTelemetry::new(self.logs_enabled, self.meter.as_ref())
        }
    }
}
