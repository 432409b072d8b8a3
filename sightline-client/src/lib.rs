pub mod capture;
pub mod config;
pub mod detector;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod session;
pub mod signaling;
pub mod transport;

pub use capture::{CaptureDevice, CaptureStream, SyntheticCapture};
pub use config::{PipelineConfig, SessionConfig};
pub use detector::{Detector, Inference, OnDeviceDetector, RemoteDetector};
pub use error::{CaptureError, DetectorError, SessionError, SignalingError};
pub use metrics::HttpMetricsReporter;
pub use pipeline::{FramePipeline, PipelineHandle};
pub use session::{PeerSession, SessionHandle};
pub use signaling::SignalLink;
