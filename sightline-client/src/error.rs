use sightline_core::session::FailureReason;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("peer connection setup failed: {0}")]
    Setup(String),

    #[error("session failed: {0}")]
    Failed(FailureReason),

    #[error("session closed")]
    Closed,

    #[error("control channel is not open")]
    ControlChannelUnavailable,

    #[error("could not encode frame metadata: {0}")]
    Codec(#[from] serde_json::Error),

    #[error(transparent)]
    WebRtc(#[from] webrtc::Error),
}

#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("invalid relay url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("relay connection failed: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture permission denied: {0}")]
    Denied(String),

    #[error("capture device unavailable: {0}")]
    Unavailable(String),

    #[error("failed to write frame: {0}")]
    Write(#[from] webrtc::Error),
}

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("invalid detector endpoint '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("inference request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("inference endpoint answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed inference response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("could not encode frame: {0}")]
    Encode(#[from] image::ImageError),

    #[error("detector task failed: {0}")]
    Task(String),
}
