use async_trait::async_trait;
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use reqwest::Url;
use reqwest::multipart::{Form, Part};
use sightline_core::{FrameMeta, InferenceResult};
use std::sync::Arc;
use tracing::debug;

use crate::detector::{Detector, Inference};
use crate::error::DetectorError;

/// Uploads each frame as JPEG to an `/infer` endpoint and parses the JSON answer.
#[derive(Debug, Clone)]
pub struct RemoteDetector {
    client: reqwest::Client,
    endpoint: Url,
    jpeg_quality: u8,
}

impl RemoteDetector {
    /// `base_url` is the server root; requests go to `<base_url>/infer`.
    pub fn new(base_url: &str, jpeg_quality: u8) -> Result<Self, DetectorError> {
        Self::with_client(reqwest::Client::new(), base_url, jpeg_quality)
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: &str,
        jpeg_quality: u8,
    ) -> Result<Self, DetectorError> {
        let invalid = |reason: String| DetectorError::InvalidUrl {
            url: base_url.to_owned(),
            reason,
        };
        let base = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        let endpoint = base.join("/infer").map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            jpeg_quality: jpeg_quality.clamp(1, 100),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

fn encode_jpeg(frame: &DynamicImage, quality: u8) -> Result<Vec<u8>, DetectorError> {
    let rgb = frame.to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality).encode_image(&rgb)?;
    Ok(out)
}

#[async_trait]
impl Detector for RemoteDetector {
    fn name(&self) -> &str {
        "remote"
    }

    async fn infer(
        &self,
        frame: Arc<DynamicImage>,
        meta: FrameMeta,
    ) -> Result<Inference, DetectorError> {
        let quality = self.jpeg_quality;
        let jpeg = tokio::task::spawn_blocking(move || encode_jpeg(&frame, quality))
            .await
            .map_err(|e| DetectorError::Task(e.to_string()))??;
        let bytes_uplink = jpeg.len() as u64;

        let image = Part::bytes(jpeg)
            .file_name("frame.jpg")
            .mime_str("image/jpeg")?;
        let form = Form::new()
            .part("image", image)
            .text("frame_id", meta.frame_id.to_string())
            .text("capture_ts", meta.capture_ts.to_string());

        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DetectorError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await?;
        let result: InferenceResult = serde_json::from_slice(&body)?;
        debug!(
            frame = %result.frame_id,
            detections = result.detections.len(),
            "Remote inference done"
        );

        Ok(Inference {
            result: result.normalized(),
            bytes_uplink,
            bytes_downlink: body.len() as u64,
        })
    }
}
