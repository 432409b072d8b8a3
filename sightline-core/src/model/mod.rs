mod detection;
mod frame;
mod metrics;
mod peer;
mod room;
mod signaling;

pub use detection::{Detection, InferenceResult};
pub use frame::{FrameId, FrameMeta};
pub use metrics::{MetricSample, MetricsSummary};
pub use peer::PeerId;
pub use room::RoomId;
pub use signaling::{CodecError, IceCandidate, IceServerConfig, SignalKind, SignalMessage};
