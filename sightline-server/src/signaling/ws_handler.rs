use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use sightline_core::{PeerId, RoomId};
use tracing::{debug, info};

use crate::AppState;
use crate::room::RoomManager;

#[derive(Debug, Default, Deserialize)]
pub struct RoomQuery {
    pub room: Option<String>,
}

impl RoomQuery {
    /// Missing or blank names fall back to the shared default room.
    pub fn room_id(self) -> RoomId {
        self.room
            .filter(|r| !r.trim().is_empty())
            .map(RoomId::from)
            .unwrap_or_default()
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<RoomQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let room_id = query.room_id();

    ws.on_upgrade(move |socket| handle_socket(socket, room_id, state.rooms))
}

async fn handle_socket(socket: WebSocket, room_id: RoomId, rooms: RoomManager) {
    let peer_id = PeerId::new();
    info!(room = %room_id, peer = %peer_id, "New WebSocket connection");

    let (mut sender, mut receiver) = socket.split();
    let (handle, mut outbox) = rooms.join(room_id.clone(), peer_id.clone());

    let mut send_task = tokio::spawn(async move {
        while let Some(text) = outbox.recv().await {
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // owns the membership, so aborting this task is what leaves the room
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    if !handle.send(text.as_str().to_owned()) {
                        break;
                    }
                }
                Message::Binary(data) => {
                    debug!(peer = %handle.peer_id(), len = data.len(), "Ignoring binary frame");
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    info!(room = %room_id, peer = %peer_id, "WebSocket disconnected");
}
