use reqwest::Url;
use sightline_core::MetricSample;
use sightline_core::metrics::MetricsSink;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::DetectorError;

const QUEUE_DEPTH: usize = 256;

/// Posts samples to a metrics ingest endpoint from a background task.
///
/// `record` never blocks and never fails: a full queue or an unreachable server only costs the
/// sample.
#[derive(Debug, Clone)]
pub struct HttpMetricsReporter {
    tx: mpsc::Sender<MetricSample>,
}

impl HttpMetricsReporter {
    /// Starts the delivery task. Must be called inside a Tokio runtime.
    pub fn spawn(base_url: &str) -> Result<Self, DetectorError> {
        Self::spawn_with_client(reqwest::Client::new(), base_url)
    }

    pub fn spawn_with_client(
        client: reqwest::Client,
        base_url: &str,
    ) -> Result<Self, DetectorError> {
        let endpoint = Url::parse(base_url)
            .and_then(|base| base.join("/metrics/ingest"))
            .map_err(|e| DetectorError::InvalidUrl {
                url: base_url.to_owned(),
                reason: e.to_string(),
            })?;
        let (tx, mut rx) = mpsc::channel::<MetricSample>(QUEUE_DEPTH);

        tokio::spawn(async move {
            while let Some(sample) = rx.recv().await {
                let delivered = client
                    .post(endpoint.clone())
                    .json(&sample)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status());
                if let Err(e) = delivered {
                    debug!("Dropping metric sample: {}", e);
                }
            }
        });

        Ok(Self { tx })
    }
}

impl MetricsSink for HttpMetricsReporter {
    fn record(&self, sample: MetricSample) {
        if let Err(e) = self.tx.try_send(sample) {
            debug!("Metrics queue unavailable: {}", e);
        }
    }
}
