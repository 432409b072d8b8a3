use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::model::{IceCandidate, SignalKind, SignalMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Sender,
    Viewer,
}

/// Where a negotiating session currently waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationStep {
    AcquiringCapture,
    PublishingOffer,
    AwaitingAnswer,
    ApplyingAnswer,
    AwaitingOffer,
    ApplyingOffer,
    PublishingAnswer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerState {
    Idle,
    Negotiating(NegotiationStep),
    Connected,
    Closed,
    Failed(FailureReason),
}

impl PeerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PeerState::Closed | PeerState::Failed(_))
    }

    pub fn is_negotiating(&self) -> bool {
        matches!(self, PeerState::Negotiating(_))
    }
}

impl fmt::Display for PeerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerState::Idle => f.write_str("idle"),
            PeerState::Negotiating(step) => write!(f, "negotiating ({:?})", step),
            PeerState::Connected => f.write_str("connected"),
            PeerState::Closed => f.write_str("closed"),
            PeerState::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    #[error("capture device unavailable: {0}")]
    Capability(String),
    #[error("media setup failed: {0}")]
    Media(String),
    #[error("negotiation did not complete within {0:?}")]
    Timeout(Duration),
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Everything the session reacts to: relay traffic, local discoveries, and completions of
/// effects it asked for earlier.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Start,
    CaptureReady,
    CaptureFailed(String),
    OfferPublished,
    AnswerPublished,
    RemoteDescriptionApplied,
    RemoteDescriptionRejected(String),
    MediaFailed(String),
    Signal(SignalMessage),
    LocalCandidate(IceCandidate),
    TransportLost(String),
    NegotiationTimeout(Duration),
    Close,
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Start => "start",
            SessionEvent::CaptureReady => "capture-ready",
            SessionEvent::CaptureFailed(_) => "capture-failed",
            SessionEvent::OfferPublished => "offer-published",
            SessionEvent::AnswerPublished => "answer-published",
            SessionEvent::RemoteDescriptionApplied => "remote-description-applied",
            SessionEvent::RemoteDescriptionRejected(_) => "remote-description-rejected",
            SessionEvent::MediaFailed(_) => "media-failed",
            SessionEvent::Signal(_) => "signal",
            SessionEvent::LocalCandidate(_) => "local-candidate",
            SessionEvent::TransportLost(_) => "transport-lost",
            SessionEvent::NegotiationTimeout(_) => "negotiation-timeout",
            SessionEvent::Close => "close",
        }
    }
}

/// Work the driver performs on behalf of the machine, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEffect {
    AcquireCapture,
    /// Attach capture, open the control channel, build and transmit the local offer.
    PublishOffer,
    ApplyRemoteOffer(String),
    ApplyRemoteAnswer(String),
    /// Build and transmit the local answer.
    PublishAnswer,
    ApplyCandidate(IceCandidate),
    Send(SignalMessage),
    Teardown,
}

/// An event that does not fit the current state. Never fatal; the event is dropped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejected {
    #[error("unexpected {kind} while {state}")]
    UnexpectedSignal { kind: SignalKind, state: PeerState },
    #[error("{event} is stale while {state}")]
    Stale { event: &'static str, state: PeerState },
}

/// Connection-establishment state for one participant.
///
/// `handle` is the single transition function: it consumes one event, moves to the next
/// state and returns the effects to run. Remote candidates are held back until the remote
/// description they belong to has been applied.
#[derive(Debug)]
pub struct NegotiationMachine {
    role: Role,
    state: PeerState,
    remote_applied: bool,
    pending: Vec<IceCandidate>,
}

impl NegotiationMachine {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            state: PeerState::Idle,
            remote_applied: false,
            pending: Vec::new(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> &PeerState {
        &self.state
    }

    pub fn buffered_candidates(&self) -> usize {
        self.pending.len()
    }

    pub fn handle(&mut self, event: SessionEvent) -> Result<Vec<SessionEffect>, Rejected> {
        use NegotiationStep::*;
        use SessionEvent as Ev;

        if let Ev::Close = event {
            if self.state.is_terminal() {
                return Ok(Vec::new());
            }
            self.state = PeerState::Closed;
            self.pending.clear();
            return Ok(vec![SessionEffect::Teardown]);
        }

        let active = matches!(self.state, PeerState::Negotiating(_) | PeerState::Connected);

        match (self.state.clone(), event) {
            (PeerState::Idle, Ev::Start) => Ok(match self.role {
                Role::Sender => {
                    self.state = PeerState::Negotiating(AcquiringCapture);
                    vec![SessionEffect::AcquireCapture]
                }
                Role::Viewer => {
                    self.state = PeerState::Negotiating(AwaitingOffer);
                    Vec::new()
                }
            }),

            (PeerState::Negotiating(AcquiringCapture), Ev::CaptureReady) => {
                self.state = PeerState::Negotiating(PublishingOffer);
                Ok(vec![SessionEffect::PublishOffer])
            }
            (PeerState::Negotiating(AcquiringCapture), Ev::CaptureFailed(reason)) => {
                Ok(self.fail(FailureReason::Capability(reason)))
            }
            (PeerState::Negotiating(PublishingOffer), Ev::OfferPublished) => {
                self.state = PeerState::Negotiating(AwaitingAnswer);
                Ok(Vec::new())
            }
            (PeerState::Negotiating(AwaitingAnswer), Ev::Signal(SignalMessage::Answer { sdp })) => {
                self.state = PeerState::Negotiating(ApplyingAnswer);
                Ok(vec![SessionEffect::ApplyRemoteAnswer(sdp)])
            }
            (PeerState::Negotiating(ApplyingAnswer), Ev::RemoteDescriptionApplied) => {
                self.remote_applied = true;
                self.state = PeerState::Connected;
                Ok(self.flush_candidates())
            }
            (PeerState::Negotiating(ApplyingAnswer), Ev::RemoteDescriptionRejected(_)) => {
                self.state = PeerState::Negotiating(AwaitingAnswer);
                Ok(Vec::new())
            }

            (PeerState::Negotiating(AwaitingOffer), Ev::Signal(SignalMessage::Offer { sdp })) => {
                self.state = PeerState::Negotiating(ApplyingOffer);
                Ok(vec![SessionEffect::ApplyRemoteOffer(sdp)])
            }
            (PeerState::Negotiating(ApplyingOffer), Ev::RemoteDescriptionApplied) => {
                self.remote_applied = true;
                self.state = PeerState::Negotiating(PublishingAnswer);
                let mut effects = self.flush_candidates();
                effects.push(SessionEffect::PublishAnswer);
                Ok(effects)
            }
            (PeerState::Negotiating(ApplyingOffer), Ev::RemoteDescriptionRejected(_)) => {
                self.state = PeerState::Negotiating(AwaitingOffer);
                Ok(Vec::new())
            }
            (PeerState::Negotiating(PublishingAnswer), Ev::AnswerPublished) => {
                self.state = PeerState::Connected;
                Ok(Vec::new())
            }

            (PeerState::Idle, Ev::Signal(SignalMessage::Candidate { candidate })) => {
                self.pending.push(candidate);
                Ok(Vec::new())
            }
            (_, Ev::Signal(SignalMessage::Candidate { candidate })) if active => {
                if self.remote_applied {
                    Ok(vec![SessionEffect::ApplyCandidate(candidate)])
                } else {
                    self.pending.push(candidate);
                    Ok(Vec::new())
                }
            }
            (_, Ev::LocalCandidate(candidate)) if active => {
                Ok(vec![SessionEffect::Send(SignalMessage::Candidate { candidate })])
            }
            (_, Ev::MediaFailed(reason)) if active => Ok(self.fail(FailureReason::Media(reason))),
            (_, Ev::TransportLost(reason)) if active => {
                Ok(self.fail(FailureReason::Transport(reason)))
            }
            (PeerState::Negotiating(_), Ev::NegotiationTimeout(after)) => {
                Ok(self.fail(FailureReason::Timeout(after)))
            }

            (state, Ev::Signal(msg)) if !state.is_terminal() => Err(Rejected::UnexpectedSignal {
                kind: msg.kind(),
                state,
            }),
            (state, event) => Err(Rejected::Stale {
                event: event.name(),
                state,
            }),
        }
    }

    fn fail(&mut self, reason: FailureReason) -> Vec<SessionEffect> {
        self.state = PeerState::Failed(reason);
        self.pending.clear();
        vec![SessionEffect::Teardown]
    }

    fn flush_candidates(&mut self) -> Vec<SessionEffect> {
        self.pending
            .drain(..)
            .map(SessionEffect::ApplyCandidate)
            .collect()
    }
}
