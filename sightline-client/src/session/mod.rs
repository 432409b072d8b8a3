mod driver;
mod handle;
mod peer_session;

pub use handle::*;
pub use peer_session::*;
pub use sightline_core::session::{FailureReason, PeerState, Role};
