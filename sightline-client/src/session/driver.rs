use anyhow::{Context, Result};
use sightline_core::session::{NegotiationMachine, PeerState, Rejected, SessionEffect, SessionEvent};
use sightline_core::{FrameMeta, SignalMessage};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::ice_transport::ice_candidate::RTCIceCandidate;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

use crate::capture::{CaptureDevice, CaptureStream};
use crate::config::SessionConfig;
use crate::error::CaptureError;
use crate::transport::{from_candidate_init, to_candidate_init};

/// The open control channel, once there is one.
#[derive(Clone, Default)]
pub(crate) struct ControlSlot(Arc<Mutex<Option<Arc<RTCDataChannel>>>>);

impl ControlSlot {
    pub(crate) async fn get(&self) -> Option<Arc<RTCDataChannel>> {
        self.0.lock().await.clone()
    }

    async fn set(&self, channel: Option<Arc<RTCDataChannel>>) {
        *self.0.lock().await = channel;
    }
}

/// Completions reported back to the driver from callbacks and spawned work.
pub(crate) enum Internal {
    Event(SessionEvent),
    Captured(Result<CaptureStream, CaptureError>),
}

/// Runs a [`NegotiationMachine`] against a real peer connection. Events are handled one at a
/// time; effects run in order before the next event is taken.
pub(crate) struct Driver {
    pub(crate) machine: NegotiationMachine,
    pub(crate) pc: Arc<RTCPeerConnection>,
    pub(crate) config: SessionConfig,
    pub(crate) capture: Option<Arc<dyn CaptureDevice>>,
    pub(crate) stream: Option<CaptureStream>,
    pub(crate) control: ControlSlot,
    pub(crate) outbound: mpsc::UnboundedSender<String>,
    pub(crate) meta_tx: Arc<watch::Sender<Option<FrameMeta>>>,
    pub(crate) state_tx: watch::Sender<PeerState>,
    pub(crate) internal_tx: mpsc::UnboundedSender<Internal>,
}

impl Driver {
    pub(crate) fn install_callbacks(&self, track_tx: mpsc::UnboundedSender<Arc<TrackRemote>>) {
        let ice_tx = self.internal_tx.clone();
        self.pc
            .on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
                let tx = ice_tx.clone();
                Box::pin(async move {
                    let Some(candidate) = c else { return };
                    match candidate.to_json() {
                        Ok(init) => {
                            let event = SessionEvent::LocalCandidate(from_candidate_init(init));
                            let _ = tx.send(Internal::Event(event));
                        }
                        Err(e) => warn!("Failed to serialize local candidate: {}", e),
                    }
                })
            }));

        let state_tx = self.internal_tx.clone();
        self.pc
            .on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                Box::pin(async move {
                    debug!("Peer connection state changed: {}", s);
                    if s == RTCPeerConnectionState::Failed {
                        let event = SessionEvent::TransportLost("peer connection failed".to_owned());
                        let _ = tx.send(Internal::Event(event));
                    }
                })
            }));

        let label = self.config.control_label.clone();
        let control = self.control.clone();
        let dc_meta_tx = Arc::clone(&self.meta_tx);
        self.pc
            .on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
                let label = label.clone();
                let control = control.clone();
                let meta_tx = Arc::clone(&dc_meta_tx);
                Box::pin(async move {
                    if dc.label() != label {
                        debug!("Ignoring data channel '{}'", dc.label());
                        return;
                    }
                    watch_control_channel(&dc, control, meta_tx);
                })
            }));

        self.pc.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let tx = track_tx.clone();
                Box::pin(async move {
                    info!("Remote {} track received", track.kind());
                    let _ = tx.send(track);
                })
            },
        ));
    }

    pub(crate) async fn run(
        mut self,
        mut inbound: mpsc::UnboundedReceiver<String>,
        mut internal_rx: mpsc::UnboundedReceiver<Internal>,
        cancel: CancellationToken,
    ) {
        let limit = self.config.negotiation_timeout;
        let deadline = tokio::time::sleep(limit.unwrap_or(Duration::MAX));
        tokio::pin!(deadline);
        let mut relay_open = true;
        let mut timer_armed = limit.is_some();

        loop {
            let event = tokio::select! {
                biased;

                _ = cancel.cancelled() => SessionEvent::Close,

                Some(internal) = internal_rx.recv() => match internal {
                    Internal::Event(event) => event,
                    Internal::Captured(Ok(stream)) => {
                        self.stream = Some(stream);
                        SessionEvent::CaptureReady
                    }
                    Internal::Captured(Err(e)) => SessionEvent::CaptureFailed(e.to_string()),
                },

                msg = inbound.recv(), if relay_open => match msg {
                    Some(text) => match SignalMessage::decode(&text) {
                        Ok(signal) => SessionEvent::Signal(signal),
                        Err(e) => {
                            warn!("Ignoring malformed signal: {}", e);
                            continue;
                        }
                    },
                    None => {
                        relay_open = false;
                        SessionEvent::TransportLost("relay connection closed".to_owned())
                    }
                },

                _ = &mut deadline, if timer_armed && self.machine.state().is_negotiating() => {
                    timer_armed = false;
                    SessionEvent::NegotiationTimeout(limit.unwrap_or_default())
                }
            };

            self.dispatch(event).await;
            if self.machine.state().is_terminal() {
                break;
            }
        }

        info!(role = ?self.machine.role(), "Peer session finished: {}", self.machine.state());
    }

    async fn dispatch(&mut self, first: SessionEvent) {
        let mut queue = VecDeque::from([first]);

        while let Some(event) = queue.pop_front() {
            let name = event.name();
            let effects = match self.machine.handle(event) {
                Ok(effects) => effects,
                Err(rejected @ Rejected::UnexpectedSignal { .. }) => {
                    warn!("Ignoring signal: {}", rejected);
                    continue;
                }
                Err(rejected) => {
                    debug!("Discarding {}: {}", name, rejected);
                    continue;
                }
            };

            self.state_tx.send_if_modified(|current| {
                let next = self.machine.state();
                if current != next {
                    *current = next.clone();
                    true
                } else {
                    false
                }
            });

            for effect in effects {
                if let Some(next) = self.apply(effect).await {
                    queue.push_back(next);
                }
            }
        }
    }

    async fn apply(&mut self, effect: SessionEffect) -> Option<SessionEvent> {
        match effect {
            SessionEffect::AcquireCapture => {
                let Some(device) = self.capture.clone() else {
                    return Some(SessionEvent::CaptureFailed(
                        "no capture device configured".to_owned(),
                    ));
                };
                let tx = self.internal_tx.clone();
                tokio::spawn(async move {
                    let _ = tx.send(Internal::Captured(device.acquire().await));
                });
                None
            }

            SessionEffect::PublishOffer => Some(match self.publish_offer().await {
                Ok(sdp) => self.send_or_lose(SignalMessage::Offer { sdp }, SessionEvent::OfferPublished),
                Err(e) => SessionEvent::MediaFailed(format!("{:#}", e)),
            }),

            SessionEffect::PublishAnswer => Some(match self.publish_answer().await {
                Ok(sdp) => {
                    self.send_or_lose(SignalMessage::Answer { sdp }, SessionEvent::AnswerPublished)
                }
                Err(e) => SessionEvent::MediaFailed(format!("{:#}", e)),
            }),

            SessionEffect::ApplyRemoteOffer(sdp) => {
                Some(self.apply_remote(RTCSessionDescription::offer(sdp)).await)
            }

            SessionEffect::ApplyRemoteAnswer(sdp) => {
                Some(self.apply_remote(RTCSessionDescription::answer(sdp)).await)
            }

            SessionEffect::ApplyCandidate(candidate) => {
                if let Err(e) = self.pc.add_ice_candidate(to_candidate_init(candidate)).await {
                    warn!("Failed to add remote candidate: {}", e);
                }
                None
            }

            SessionEffect::Send(msg) => {
                let kind = msg.kind();
                let lost = self.send_signal(&msg).is_err();
                lost.then(|| SessionEvent::TransportLost(format!("could not send {}", kind)))
            }

            SessionEffect::Teardown => {
                self.teardown().await;
                None
            }
        }
    }

    async fn publish_offer(&mut self) -> Result<String> {
        let stream = self.stream.as_ref().context("No capture stream to attach")?;
        let track = stream.track();
        info!("Attaching {} track '{}'", track.kind(), track.id());

        let rtp_sender = self
            .pc
            .add_track(track as Arc<dyn TrackLocal + Send + Sync>)
            .await
            .context("Failed to attach capture track")?;
        // RTCP must be drained for the interceptors to work
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1500];
            while rtp_sender.read(&mut buf).await.is_ok() {}
        });

        let dc = self
            .pc
            .create_data_channel(&self.config.control_label, None)
            .await
            .context("Failed to create control channel")?;
        watch_control_channel(&dc, self.control.clone(), Arc::clone(&self.meta_tx));

        let offer = self
            .pc
            .create_offer(None)
            .await
            .context("Failed to create offer")?;
        self.pc
            .set_local_description(offer.clone())
            .await
            .context("Failed to set local description")?;
        Ok(offer.sdp)
    }

    async fn publish_answer(&mut self) -> Result<String> {
        let answer = self
            .pc
            .create_answer(None)
            .await
            .context("Failed to create answer")?;
        self.pc
            .set_local_description(answer.clone())
            .await
            .context("Failed to set local description")?;
        Ok(answer.sdp)
    }

    async fn apply_remote(
        &self,
        desc: Result<RTCSessionDescription, webrtc::Error>,
    ) -> SessionEvent {
        let applied = match desc {
            Ok(desc) => self.pc.set_remote_description(desc).await,
            Err(e) => Err(e),
        };
        match applied {
            Ok(()) => SessionEvent::RemoteDescriptionApplied,
            Err(e) => {
                warn!("Remote description rejected: {}", e);
                SessionEvent::RemoteDescriptionRejected(e.to_string())
            }
        }
    }

    fn send_signal(&self, msg: &SignalMessage) -> Result<()> {
        let text = msg.encode()?;
        debug!("Sending {}", msg.kind());
        self.outbound
            .send(text)
            .ok()
            .context("Relay connection closed")
    }

    fn send_or_lose(&self, msg: SignalMessage, sent: SessionEvent) -> SessionEvent {
        match self.send_signal(&msg) {
            Ok(()) => sent,
            Err(e) => SessionEvent::TransportLost(format!("{:#}", e)),
        }
    }

    async fn teardown(&mut self) {
        self.control.set(None).await;
        self.stream = None;
        if let Err(e) = self.pc.close().await {
            error!("Failed to close peer connection: {}", e);
        }
    }
}

/// Publishes the channel once open and forwards any frame metadata it carries.
fn watch_control_channel(
    dc: &Arc<RTCDataChannel>,
    control: ControlSlot,
    meta_tx: Arc<watch::Sender<Option<FrameMeta>>>,
) {
    let opened = Arc::clone(dc);
    dc.on_open(Box::new(move || {
        let control = control.clone();
        let channel = Arc::clone(&opened);
        Box::pin(async move {
            info!("Control channel '{}' open", channel.label());
            control.set(Some(channel)).await;
        })
    }));

    dc.on_message(Box::new(move |msg: DataChannelMessage| {
        let meta_tx = Arc::clone(&meta_tx);
        Box::pin(async move {
            match FrameMeta::decode(&msg.data) {
                Ok(meta) => {
                    meta_tx.send_replace(Some(meta));
                }
                Err(e) => debug!("Ignoring control message: {}", e),
            }
        })
    }));
}
