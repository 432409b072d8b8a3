use serde::{Deserialize, Serialize};

/// One latency/bandwidth observation, as posted to the metrics ingest endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    #[serde(default)]
    pub ts: i64,
    #[serde(default)]
    pub e2e_latency_ms: f64,
    #[serde(default)]
    pub bytes_uplink: u64,
    #[serde(default)]
    pub bytes_downlink: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub count: usize,
    pub median_latency_ms: Option<f64>,
    pub p95_latency_ms: Option<f64>,
    pub fps: f64,
    pub kbps_uplink: f64,
    pub kbps_downlink: f64,
    pub bps_uplink: f64,
    pub bps_downlink: f64,
}

impl MetricsSummary {
    pub fn empty() -> Self {
        Self {
            count: 0,
            median_latency_ms: None,
            p95_latency_ms: None,
            fps: 0.0,
            kbps_uplink: 0.0,
            kbps_downlink: 0.0,
            bps_uplink: 0.0,
            bps_downlink: 0.0,
        }
    }
}
