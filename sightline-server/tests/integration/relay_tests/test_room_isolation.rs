use crate::utils::{TestServer, WsPeer, init_tracing};
use anyhow::Result;
use std::time::Duration;

#[tokio::test]
async fn test_rooms_do_not_leak() -> Result<()> {
    init_tracing();
    let server = TestServer::start().await?;

    let mut r1_a = WsPeer::connect(&server.ws_url(Some("r1"))).await?;
    let mut r1_b = WsPeer::connect(&server.ws_url(Some("r1"))).await?;
    let mut r2 = WsPeer::connect(&server.ws_url(Some("r2"))).await?;
    tokio::time::sleep(Duration::from_millis(50)).await;

    r1_a.send_text("for r1").await?;

    assert_eq!(r1_b.recv_text().await?, "for r1");
    assert!(r2.is_quiet().await);
    assert_eq!(server.state.rooms.room_count(), 2);
    Ok(())
}
