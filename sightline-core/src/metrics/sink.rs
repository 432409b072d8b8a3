use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::metrics::MetricsAggregator;
use crate::model::{MetricSample, MetricsSummary};
use crate::utils::now_ms;

/// Destination for per-frame observations.
///
/// Recording never reports failure: observability must not affect the caller.
pub trait MetricsSink: Send + Sync {
    fn record(&self, sample: MetricSample);
}

/// Aggregator shared between request handlers or pipeline tasks.
#[derive(Clone, Default)]
pub struct SharedAggregator {
    inner: Arc<Mutex<MetricsAggregator>>,
}

impl SharedAggregator {
    pub fn new(aggregator: MetricsAggregator) -> Self {
        Self {
            inner: Arc::new(Mutex::new(aggregator)),
        }
    }

    pub fn summary(&self, window: Duration) -> MetricsSummary {
        self.lock().summary(window, now_ms())
    }

    pub fn summary_at(&self, window: Duration, now_ms: i64) -> MetricsSummary {
        self.lock().summary(window, now_ms)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, MetricsAggregator> {
        // a panic while holding the lock leaves the sample list intact
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MetricsSink for SharedAggregator {
    fn record(&self, sample: MetricSample) {
        self.lock().ingest(sample);
    }
}
