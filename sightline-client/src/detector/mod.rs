mod on_device;
mod remote;

pub use on_device::*;
pub use remote::*;

use async_trait::async_trait;
use image::DynamicImage;
use sightline_core::{FrameMeta, InferenceResult};
use std::sync::Arc;

use crate::error::DetectorError;

/// A detection result plus what it cost on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Inference {
    pub result: InferenceResult,
    pub bytes_uplink: u64,
    pub bytes_downlink: u64,
}

/// Turns one frame into an [`InferenceResult`] for `meta.frame_id`.
#[async_trait]
pub trait Detector: Send + Sync {
    fn name(&self) -> &str;

    async fn infer(
        &self,
        frame: Arc<DynamicImage>,
        meta: FrameMeta,
    ) -> Result<Inference, DetectorError>;
}
