use sightline_core::session::{NegotiationMachine, PeerState, Role, SessionEvent};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::capture::CaptureDevice;
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::session::driver::{ControlSlot, Driver, Internal};
use crate::session::handle::SessionHandle;
use crate::signaling::SignalLink;
use crate::transport::build_peer_connection;

/// One participant's side of a sender/viewer pair, before it starts.
pub struct PeerSession {
    role: Role,
    config: SessionConfig,
    capture: Option<Arc<dyn CaptureDevice>>,
}

impl PeerSession {
    /// The publishing side: acquires `capture`, offers it and opens the control channel.
    pub fn sender(config: SessionConfig, capture: Arc<dyn CaptureDevice>) -> Self {
        Self {
            role: Role::Sender,
            config,
            capture: Some(capture),
        }
    }

    /// The receiving side: waits for an offer and answers it.
    pub fn viewer(config: SessionConfig) -> Self {
        Self {
            role: Role::Viewer,
            config,
            capture: None,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Creates the peer connection and starts negotiating over `link`.
    ///
    /// Both participants must already be in the room: the relay keeps no history.
    pub async fn start(self, link: SignalLink) -> Result<SessionHandle, SessionError> {
        let pc = build_peer_connection(&self.config)
            .await
            .map_err(|e| SessionError::Setup(format!("{:#}", e)))?;

        let (state_tx, state_rx) = watch::channel(PeerState::Idle);
        let (meta_tx, meta_rx) = watch::channel(None);
        let (track_tx, track_rx) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let control = ControlSlot::default();
        let cancel = CancellationToken::new();

        let driver = Driver {
            machine: NegotiationMachine::new(self.role),
            pc,
            config: self.config,
            capture: self.capture,
            stream: None,
            control: control.clone(),
            outbound: link.outbound,
            meta_tx: Arc::new(meta_tx),
            state_tx,
            internal_tx: internal_tx.clone(),
        };
        driver.install_callbacks(track_tx);

        info!(role = ?self.role, "Starting peer session");
        let _ = internal_tx.send(Internal::Event(SessionEvent::Start));
        let task = tokio::spawn(driver.run(link.inbound, internal_rx, cancel.clone()));

        Ok(SessionHandle::new(
            self.role, state_rx, meta_rx, track_rx, control, cancel, task,
        ))
    }
}
