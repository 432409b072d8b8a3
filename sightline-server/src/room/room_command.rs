use sightline_core::PeerId;
use tokio::sync::mpsc;

/// Commands a room actor consumes, in arrival order.
#[derive(Debug)]
pub enum RoomCommand {
    /// A connection entered the room; `outbox` carries text back to its socket.
    Join {
        peer_id: PeerId,
        outbox: mpsc::UnboundedSender<String>,
    },

    /// Raw text from `from`, forwarded untouched to every other member.
    Signal { from: PeerId, text: String },

    /// The connection is gone, by choice or not.
    Leave { peer_id: PeerId },
}
