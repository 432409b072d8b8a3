use sightline_core::FrameMeta;
use sightline_core::session::{PeerState, Role};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;
use webrtc::track::track_remote::TrackRemote;

use crate::error::SessionError;
use crate::session::driver::ControlSlot;

/// A running [`PeerSession`](crate::PeerSession). Dropping the handle closes the session.
pub struct SessionHandle {
    role: Role,
    state: watch::Receiver<PeerState>,
    meta: watch::Receiver<Option<FrameMeta>>,
    tracks: mpsc::UnboundedReceiver<Arc<TrackRemote>>,
    control: ControlSlot,
    cancel: CancellationToken,
    driver: Option<JoinHandle<()>>,
}

impl SessionHandle {
    pub(crate) fn new(
        role: Role,
        state: watch::Receiver<PeerState>,
        meta: watch::Receiver<Option<FrameMeta>>,
        tracks: mpsc::UnboundedReceiver<Arc<TrackRemote>>,
        control: ControlSlot,
        cancel: CancellationToken,
        driver: JoinHandle<()>,
    ) -> Self {
        Self {
            role,
            state,
            meta,
            tracks,
            control,
            cancel,
            driver: Some(driver),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> PeerState {
        self.state.borrow().clone()
    }

    /// A receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<PeerState> {
        self.state.clone()
    }

    /// Waits until `pred` holds or the session ends, and returns the state at that point.
    pub async fn wait_until(&self, pred: impl Fn(&PeerState) -> bool) -> PeerState {
        let mut rx = self.state.clone();
        let result = rx
            .wait_for(|s| pred(s) || s.is_terminal())
            .await
            .map(|state| state.clone());
        match result {
            Ok(state) => state,
            Err(_) => rx.borrow().clone(),
        }
    }

    /// Resolves once the session is connected, or with the reason it never will be.
    pub async fn connected(&self) -> Result<(), SessionError> {
        match self.wait_until(|s| *s == PeerState::Connected).await {
            PeerState::Connected => Ok(()),
            PeerState::Failed(reason) => Err(SessionError::Failed(reason)),
            _ => Err(SessionError::Closed),
        }
    }

    /// Latest frame metadata received over the control channel.
    pub fn frame_meta(&self) -> watch::Receiver<Option<FrameMeta>> {
        self.meta.clone()
    }

    /// Sends frame metadata to the peer over the control channel.
    pub async fn send_frame_meta(&self, meta: &FrameMeta) -> Result<(), SessionError> {
        let channel = self
            .control
            .get()
            .await
            .ok_or(SessionError::ControlChannelUnavailable)?;
        if channel.ready_state() != RTCDataChannelState::Open {
            return Err(SessionError::ControlChannelUnavailable);
        }

        channel.send_text(meta.encode()?).await?;
        Ok(())
    }

    /// Next media track the peer sends. `None` once the session is gone.
    pub async fn next_remote_track(&mut self) -> Option<Arc<TrackRemote>> {
        self.tracks.recv().await
    }

    /// Tears the session down and waits for it to stop. Safe to call repeatedly.
    pub async fn close(&mut self) {
        self.cancel.cancel();
        if let Some(driver) = self.driver.take() {
            if let Err(e) = driver.await {
                debug!("Session driver ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
