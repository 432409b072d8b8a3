use std::collections::VecDeque;
use std::time::Duration;

use crate::model::{MetricSample, MetricsSummary};

pub const DEFAULT_CAPACITY: usize = 10_000;

/// In-memory store of recent samples with windowed summaries.
///
/// Bounded by count only: the store never holds more than `capacity` samples and the oldest
/// go first. Any window a caller asks for is answered from whatever is still held.
#[derive(Debug)]
pub struct MetricsAggregator {
    samples: VecDeque<MetricSample>,
    capacity: usize,
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl MetricsAggregator {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn ingest(&mut self, sample: MetricSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Summarizes samples with `ts` inside the trailing `window` ending at `now_ms`.
    pub fn summary(&self, window: Duration, now_ms: i64) -> MetricsSummary {
        let window_ms = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);
        let since = now_ms.saturating_sub(window_ms);
        let in_window: Vec<&MetricSample> = self.samples.iter().filter(|s| s.ts >= since).collect();
        if in_window.is_empty() {
            return MetricsSummary::empty();
        }

        let mut latencies: Vec<f64> = in_window.iter().map(|s| s.e2e_latency_ms).collect();
        latencies.sort_by(f64::total_cmp);

        let first = in_window.iter().map(|s| s.ts).min().unwrap_or(now_ms);
        let last = in_window.iter().map(|s| s.ts).max().unwrap_or(now_ms);
        let span_secs = ((last - first) as f64 / 1000.0).max(1.0);

        let uplink: u64 = in_window.iter().map(|s| s.bytes_uplink).sum();
        let downlink: u64 = in_window.iter().map(|s| s.bytes_downlink).sum();
        let bps_uplink = uplink as f64 * 8.0 / span_secs;
        let bps_downlink = downlink as f64 * 8.0 / span_secs;

        MetricsSummary {
            count: in_window.len(),
            median_latency_ms: percentile(&latencies, 0.5),
            p95_latency_ms: percentile(&latencies, 0.95),
            fps: in_window.len() as f64 / span_secs,
            kbps_uplink: bps_uplink / 1000.0,
            kbps_downlink: bps_downlink / 1000.0,
            bps_uplink,
            bps_downlink,
        }
    }

}

/// Nearest-rank percentile over ascending `sorted`: index `round(p * (n - 1))`, ties to even.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let last = sorted.len() - 1;
    let idx = (p.clamp(0.0, 1.0) * last as f64).round_ties_even() as usize;
    Some(sorted[idx.min(last)])
}
