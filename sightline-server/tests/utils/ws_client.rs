use anyhow::{Context, Result, bail};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);
pub const QUIET_PERIOD: Duration = Duration::from_millis(200);

/// Raw WebSocket participant of a relay room.
pub struct WsPeer {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsPeer {
    pub async fn connect(url: &str) -> Result<Self> {
        let (stream, _) = connect_async(url)
            .await
            .with_context(|| format!("Failed to connect to {}", url))?;
        Ok(Self { stream })
    }

    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.stream
            .send(Message::text(text))
            .await
            .context("Failed to send text frame")
    }

    pub async fn send_binary(&mut self, data: Vec<u8>) -> Result<()> {
        self.stream
            .send(Message::binary(data))
            .await
            .context("Failed to send binary frame")
    }

    pub async fn recv_text(&mut self) -> Result<String> {
        loop {
            let next = timeout(RECV_TIMEOUT, self.stream.next())
                .await
                .context("Timed out waiting for a relayed message")?;
            match next {
                Some(Ok(Message::Text(text))) => return Ok(text.as_str().to_owned()),
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Ok(other)) => bail!("Unexpected frame: {:?}", other),
                Some(Err(e)) => bail!("WebSocket error: {}", e),
                None => bail!("WebSocket closed"),
            }
        }
    }

    /// True when nothing arrives for [`QUIET_PERIOD`].
    pub async fn is_quiet(&mut self) -> bool {
        timeout(QUIET_PERIOD, self.stream.next()).await.is_err()
    }

    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await.context("Failed to close")
    }
}
