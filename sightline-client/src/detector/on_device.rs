use async_trait::async_trait;
use image::DynamicImage;
use sightline_core::utils::now_ms;
use sightline_core::vision::ModelBackend;
use sightline_core::{FrameMeta, InferenceResult};
use std::sync::Arc;

use crate::detector::{Detector, Inference};
use crate::error::DetectorError;

/// Runs the model in-process on the caller's task. Nothing crosses the network.
#[derive(Debug, Clone, Default)]
pub struct OnDeviceDetector {
    backend: ModelBackend,
}

impl OnDeviceDetector {
    pub fn new(backend: ModelBackend) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Detector for OnDeviceDetector {
    fn name(&self) -> &str {
        self.backend.name()
    }

    async fn infer(
        &self,
        frame: Arc<DynamicImage>,
        meta: FrameMeta,
    ) -> Result<Inference, DetectorError> {
        let recv_ts = now_ms();
        let detections = self.backend.detect(&frame);

        Ok(Inference {
            result: InferenceResult {
                frame_id: meta.frame_id,
                capture_ts: meta.capture_ts,
                recv_ts,
                inference_ts: now_ms(),
                detections,
            },
            bytes_uplink: 0,
            bytes_downlink: 0,
        })
    }
}
