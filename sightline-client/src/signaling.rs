use futures::{SinkExt, StreamExt};
use reqwest::Url;
use sightline_core::RoomId;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::error::SignalingError;

/// A participant's link to the relay: text in, text out, nothing interpreted.
///
/// The inbound side ends when the relay connection drops.
#[derive(Debug)]
pub struct SignalLink {
    pub outbound: mpsc::UnboundedSender<String>,
    pub inbound: mpsc::UnboundedReceiver<String>,
}

impl SignalLink {
    /// Two links wired to each other, standing in for a two-member room.
    pub fn pair() -> (SignalLink, SignalLink) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        (
            SignalLink {
                outbound: a_tx,
                inbound: b_rx,
            },
            SignalLink {
                outbound: b_tx,
                inbound: a_rx,
            },
        )
    }

    /// Joins `room` on the relay served at `base_url` (`http`, `https`, `ws` or `wss`).
    pub async fn connect(base_url: &str, room: &RoomId) -> Result<SignalLink, SignalingError> {
        let url = relay_url(base_url, room)?;
        let (stream, _) = connect_async(url.as_str()).await?;
        info!(room = %room, "Connected to relay at {}", url);

        let (mut sink, mut source) = stream.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound) = mpsc::unbounded_channel::<String>();

        tokio::spawn(async move {
            while let Some(text) = outbound_rx.recv().await {
                if let Err(e) = sink.send(Message::text(text)).await {
                    warn!("Relay write failed: {}", e);
                    break;
                }
            }
            let _ = sink.close().await;
        });

        tokio::spawn(async move {
            while let Some(Ok(msg)) = source.next().await {
                match msg {
                    Message::Text(text) => {
                        if inbound_tx.send(text.as_str().to_owned()).is_err() {
                            break;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            debug!("Relay read loop finished");
        });

        Ok(SignalLink { outbound, inbound })
    }
}

/// `<base>/ws?room=<room>` with the scheme switched to its WebSocket form.
pub fn relay_url(base_url: &str, room: &RoomId) -> Result<Url, SignalingError> {
    let invalid = |reason: String| SignalingError::InvalidUrl {
        url: base_url.to_owned(),
        reason,
    };

    let mut url = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(invalid(format!("unsupported scheme '{}'", other))),
    };
    url.set_scheme(scheme)
        .map_err(|_| invalid("cannot switch scheme".to_owned()))?;
    url.set_path("/ws");
    url.query_pairs_mut()
        .clear()
        .append_pair("room", room.as_str());
    Ok(url)
}
