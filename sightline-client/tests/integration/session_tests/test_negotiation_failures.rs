use crate::utils::{DeniedCapture, SlowCapture, init_tracing};
use anyhow::Result;
use sightline_client::session::{FailureReason, PeerState};
use sightline_client::{PeerSession, SessionConfig, SessionError, SignalLink, SyntheticCapture};
use sightline_core::SignalMessage;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_denied_capture_fails_sender() -> Result<()> {
    init_tracing();
    let (link, _peer) = SignalLink::pair();

    let sender = PeerSession::sender(SessionConfig::local(), Arc::new(DeniedCapture))
        .start(link)
        .await?;

    let err = timeout(WAIT, sender.connected()).await?.unwrap_err();
    match err {
        SessionError::Failed(FailureReason::Capability(reason)) => {
            assert!(reason.contains("dismissed"), "{}", reason);
        }
        other => panic!("unexpected error: {}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_lonely_viewer_times_out() -> Result<()> {
    init_tracing();
    let (link, _peer) = SignalLink::pair();
    let config = SessionConfig {
        negotiation_timeout: Some(Duration::from_millis(200)),
        ..SessionConfig::local()
    };

    let viewer = PeerSession::viewer(config).start(link).await?;
    let state = timeout(WAIT, viewer.wait_until(|s| s.is_terminal())).await?;
    assert_eq!(
        state,
        PeerState::Failed(FailureReason::Timeout(Duration::from_millis(200)))
    );
    Ok(())
}

#[tokio::test]
async fn test_viewer_without_timeout_keeps_waiting() -> Result<()> {
    init_tracing();
    let (link, _peer) = SignalLink::pair();
    let config = SessionConfig {
        negotiation_timeout: None,
        ..SessionConfig::local()
    };

    let mut viewer = PeerSession::viewer(config).start(link).await?;
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(viewer.state().is_negotiating());

    viewer.close().await;
    assert_eq!(viewer.state(), PeerState::Closed);
    Ok(())
}

#[tokio::test]
async fn test_relay_loss_fails_session() -> Result<()> {
    init_tracing();
    let (link, peer) = SignalLink::pair();

    let viewer = PeerSession::viewer(SessionConfig::local()).start(link).await?;
    drop(peer);

    let state = timeout(WAIT, viewer.wait_until(|s| s.is_terminal())).await?;
    assert!(matches!(state, PeerState::Failed(FailureReason::Transport(_))));
    Ok(())
}

#[tokio::test]
async fn test_unexpected_and_malformed_signals_are_ignored() -> Result<()> {
    init_tracing();
    let (link, peer) = SignalLink::pair();

    let viewer = PeerSession::viewer(SessionConfig::local()).start(link).await?;
    let answer = SignalMessage::Answer {
        sdp: "v=0".to_owned(),
    };
    peer.outbound.send(answer.encode()?)?;
    peer.outbound.send("{\"type\":\"bye\"}".to_owned())?;
    peer.outbound.send("garbage".to_owned())?;

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(viewer.state().is_negotiating());
    Ok(())
}

#[tokio::test]
async fn test_capture_granted_after_close_is_discarded() -> Result<()> {
    init_tracing();
    let (link, mut peer) = SignalLink::pair();

    let mut sender = PeerSession::sender(
        SessionConfig::local(),
        Arc::new(SlowCapture {
            delay: Duration::from_millis(200),
        }),
    )
    .start(link)
    .await?;

    sender.close().await;
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(sender.state(), PeerState::Closed);
    // no offer was ever published
    assert!(peer.inbound.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn test_sender_publishes_offer_first() -> Result<()> {
    init_tracing();
    let (link, mut peer) = SignalLink::pair();

    let _sender = PeerSession::sender(SessionConfig::local(), Arc::new(SyntheticCapture::default()))
        .start(link)
        .await?;

    let first = timeout(WAIT, peer.inbound.recv()).await?.expect("relay message");
    match SignalMessage::decode(&first)? {
        SignalMessage::Offer { sdp } => assert!(sdp.contains("m=video")),
        other => panic!("expected an offer, got {:?}", other),
    }
    Ok(())
}
