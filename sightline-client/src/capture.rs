use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use webrtc::api::media_engine::MIME_TYPE_VP8;
use webrtc::media::Sample;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

use crate::error::CaptureError;

/// Source of the sender's live video. Acquisition may be slow (permission prompts, device
/// warm-up) and may be refused.
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    async fn acquire(&self) -> Result<CaptureStream, CaptureError>;
}

/// An acquired capture: the outgoing track plus a way to feed encoded frames into it.
#[derive(Clone)]
pub struct CaptureStream {
    track: Arc<TrackLocalStaticSample>,
}

impl CaptureStream {
    pub fn new(track: Arc<TrackLocalStaticSample>) -> Self {
        Self { track }
    }

    /// A VP8 video track, the codec browsers accept without negotiation surprises.
    pub fn vp8(stream_id: &str) -> Self {
        let track = TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                ..Default::default()
            },
            "video".to_owned(),
            stream_id.to_owned(),
        );
        Self::new(Arc::new(track))
    }

    pub fn track(&self) -> Arc<TrackLocalStaticSample> {
        Arc::clone(&self.track)
    }

    /// Writes one already encoded frame lasting `duration`.
    pub async fn write_frame(&self, data: Bytes, duration: Duration) -> Result<(), CaptureError> {
        self.track
            .write_sample(&Sample {
                data,
                duration,
                ..Default::default()
            })
            .await?;
        Ok(())
    }
}

/// Hands out a fresh VP8 track on every acquisition. Frames are whatever the caller writes.
#[derive(Debug, Clone)]
pub struct SyntheticCapture {
    pub stream_id: String,
}

impl Default for SyntheticCapture {
    fn default() -> Self {
        Self {
            stream_id: "sightline".to_owned(),
        }
    }
}

#[async_trait]
impl CaptureDevice for SyntheticCapture {
    async fn acquire(&self) -> Result<CaptureStream, CaptureError> {
        Ok(CaptureStream::vp8(&self.stream_id))
    }
}
