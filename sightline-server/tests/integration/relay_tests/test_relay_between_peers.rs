use crate::utils::{TestServer, WsPeer, init_tracing};
use anyhow::Result;

#[tokio::test]
async fn test_offer_is_relayed_verbatim_to_the_other_peer() -> Result<()> {
    init_tracing();
    let server = TestServer::start().await?;

    let mut a = WsPeer::connect(&server.ws_url(Some("abc123"))).await?;
    let mut b = WsPeer::connect(&server.ws_url(Some("abc123"))).await?;
    // let both joins reach the room before relaying
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let offer = r#"{"type":"offer","sdp":"v=0\r\no=- 1 1 IN IP4 0.0.0.0\r\n"}"#;
    a.send_text(offer).await?;

    assert_eq!(b.recv_text().await?, offer);
    assert!(a.is_quiet().await, "sender must not receive its own message");
    Ok(())
}

#[tokio::test]
async fn test_messages_arrive_in_send_order() -> Result<()> {
    init_tracing();
    let server = TestServer::start().await?;

    let mut a = WsPeer::connect(&server.ws_url(Some("fifo"))).await?;
    let mut b = WsPeer::connect(&server.ws_url(Some("fifo"))).await?;
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    for i in 0..20 {
        a.send_text(&format!(r#"{{"type":"candidate","candidate":"c{}"}}"#, i))
            .await?;
    }
    for i in 0..20 {
        assert_eq!(
            b.recv_text().await?,
            format!(r#"{{"type":"candidate","candidate":"c{}"}}"#, i)
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_relay_does_not_inspect_payloads() -> Result<()> {
    init_tracing();
    let server = TestServer::start().await?;

    let mut a = WsPeer::connect(&server.ws_url(Some("opaque"))).await?;
    let mut b = WsPeer::connect(&server.ws_url(Some("opaque"))).await?;
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    a.send_text("not json at all").await?;
    assert_eq!(b.recv_text().await?, "not json at all");

    // binary frames are not part of the protocol and are dropped
    a.send_binary(vec![1, 2, 3]).await?;
    assert!(b.is_quiet().await);
    Ok(())
}

#[tokio::test]
async fn test_third_peer_sees_both_others() -> Result<()> {
    init_tracing();
    let server = TestServer::start().await?;

    let mut a = WsPeer::connect(&server.ws_url(Some("trio"))).await?;
    let mut b = WsPeer::connect(&server.ws_url(Some("trio"))).await?;
    let mut c = WsPeer::connect(&server.ws_url(Some("trio"))).await?;
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    a.send_text("from-a").await?;
    assert_eq!(b.recv_text().await?, "from-a");
    assert_eq!(c.recv_text().await?, "from-a");

    c.send_text("from-c").await?;
    assert_eq!(a.recv_text().await?, "from-c");
    assert_eq!(b.recv_text().await?, "from-c");
    Ok(())
}
