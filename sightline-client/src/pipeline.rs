use image::DynamicImage;
use sightline_core::metrics::MetricsSink;
use sightline_core::pipeline::{FrameGate, GateStats, Reconciled, TickDecision};
use sightline_core::utils::now_ms;
use sightline_core::{FrameMeta, InferenceResult, MetricSample};
use std::future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::PipelineConfig;
use crate::detector::{Detector, Inference};
use crate::error::DetectorError;

pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

type InFlight = JoinHandle<Result<Inference, DetectorError>>;

/// The viewer's detection loop: on every tick, submit the newest frame unless a request is
/// already outstanding, then record latency and publish detections for the overlay.
pub struct FramePipeline {
    config: PipelineConfig,
    detector: Arc<dyn Detector>,
    metrics: Arc<dyn MetricsSink>,
    frames: watch::Receiver<Option<Arc<DynamicImage>>>,
    meta: watch::Receiver<Option<FrameMeta>>,
    overlay: watch::Sender<Option<InferenceResult>>,
    clock: Clock,
}

impl FramePipeline {
    /// `frames` holds the most recently decoded video frame; `meta` the most recent frame
    /// metadata from the sender.
    pub fn new(
        detector: Arc<dyn Detector>,
        metrics: Arc<dyn MetricsSink>,
        frames: watch::Receiver<Option<Arc<DynamicImage>>>,
        meta: watch::Receiver<Option<FrameMeta>>,
    ) -> Self {
        let (overlay, _) = watch::channel(None);
        Self {
            config: PipelineConfig::default(),
            detector,
            metrics,
            frames,
            meta,
            overlay,
            clock: Arc::new(now_ms),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the wall clock used for submission stamps and latency.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Detections to draw, newest accepted result first.
    pub fn overlay(&self) -> watch::Receiver<Option<InferenceResult>> {
        self.overlay.subscribe()
    }

    pub fn spawn(self) -> PipelineHandle {
        let cancel = CancellationToken::new();
        let overlay = self.overlay.subscribe();
        let task = tokio::spawn(self.run(cancel.clone()));

        PipelineHandle {
            overlay,
            cancel,
            task: Some(task),
        }
    }

    async fn run(self, cancel: CancellationToken) -> GateStats {
        let mut gate = FrameGate::new();
        let mut ticker = interval(self.config.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut in_flight: Option<InFlight> = None;

        info!(detector = self.detector.name(), "Frame pipeline started");

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    if let Some(task) = in_flight.take() {
                        task.abort();
                    }
                    gate.abandon();
                    break;
                }

                joined = async {
                    match in_flight.as_mut() {
                        Some(task) => task.await,
                        None => future::pending().await,
                    }
                }, if in_flight.is_some() => {
                    in_flight = None;
                    self.complete(&mut gate, joined);
                }

                _ = ticker.tick() => {
                    if let Some(task) = self.tick(&mut gate) {
                        in_flight = Some(task);
                    }
                }
            }
        }

        let stats = gate.stats();
        info!(?stats, "Frame pipeline stopped");
        stats
    }

    fn tick(&self, gate: &mut FrameGate) -> Option<InFlight> {
        let frame = self.frames.borrow().clone()?;
        let latest_capture_ts = self.meta.borrow().as_ref().map(|m| m.capture_ts);

        match gate.on_tick(latest_capture_ts, (self.clock)()) {
            TickDecision::Submit(meta) => {
                debug!(frame = %meta.frame_id, "Submitting frame");
                let detector = Arc::clone(&self.detector);
                Some(tokio::spawn(async move { detector.infer(frame, meta).await }))
            }
            TickDecision::Skip { outstanding } => {
                debug!(outstanding = %outstanding, "Detector busy, dropping frame");
                None
            }
        }
    }

    fn complete(
        &self,
        gate: &mut FrameGate,
        joined: Result<Result<Inference, DetectorError>, tokio::task::JoinError>,
    ) {
        let now = (self.clock)();

        match joined {
            Ok(Ok(inference)) => match gate.on_result(&inference.result, now) {
                Reconciled::Accepted { latency_ms, .. } => {
                    self.metrics.record(MetricSample {
                        ts: now,
                        e2e_latency_ms: latency_ms,
                        bytes_uplink: inference.bytes_uplink,
                        bytes_downlink: inference.bytes_downlink,
                    });
                    self.overlay.send_replace(Some(inference.result));
                }
                Reconciled::Ignored => {
                    // the request is finished either way; free the slot
                    warn!(frame = %inference.result.frame_id, "Result does not match the submitted frame");
                    gate.abandon();
                }
            },
            Ok(Err(e)) => {
                warn!("Inference failed, resuming on next tick: {}", e);
                gate.abandon();
            }
            Err(e) => {
                error!("Inference task lost: {}", e);
                gate.abandon();
            }
        }
    }
}

/// A running [`FramePipeline`]. Dropping it stops the loop.
pub struct PipelineHandle {
    overlay: watch::Receiver<Option<InferenceResult>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<GateStats>>,
}

impl PipelineHandle {
    pub fn overlay(&self) -> watch::Receiver<Option<InferenceResult>> {
        self.overlay.clone()
    }

    /// Stops the loop, discarding any request still in flight. Returns the final counters the
    /// first time; later calls return `None`.
    pub async fn stop(&mut self) -> Option<GateStats> {
        self.cancel.cancel();
        let task = self.task.take()?;
        match task.await {
            Ok(stats) => Some(stats),
            Err(e) => {
                error!("Frame pipeline task failed: {}", e);
                None
            }
        }
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
