pub use sightline_core::model::{FrameId, FrameMeta, InferenceResult, PeerId, RoomId};

pub mod model {
    pub use sightline_core::model::*;
}

pub mod core {
    pub use sightline_core::{metrics, pipeline, session, utils, vision};
}

#[cfg(feature = "server")]
pub mod server {
    pub use sightline_server::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use sightline_client::*;
}
