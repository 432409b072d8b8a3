use dashmap::DashMap;
use sightline_core::{PeerId, RoomId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::room::RoomCommand;

/// Registry slot for a live room. `epoch` tells a retiring room apart from a successor that
/// reused its id.
#[derive(Debug, Clone)]
pub struct RoomEntry {
    pub(crate) tx: mpsc::UnboundedSender<RoomCommand>,
    pub(crate) epoch: u64,
}

pub type RoomRegistry = Arc<DashMap<RoomId, RoomEntry>>;

/// One relay room: a single task owning its member list, so relays and membership changes
/// are applied strictly in inbox order.
pub struct Room {
    id: RoomId,
    epoch: u64,
    members: HashMap<PeerId, mpsc::UnboundedSender<String>>,
    inbox: mpsc::UnboundedReceiver<RoomCommand>,
    registry: RoomRegistry,
}

impl Room {
    pub fn new(
        id: RoomId,
        epoch: u64,
        inbox: mpsc::UnboundedReceiver<RoomCommand>,
        registry: RoomRegistry,
    ) -> Self {
        Self {
            id,
            epoch,
            members: HashMap::new(),
            inbox,
            registry,
        }
    }

    pub async fn run(mut self) {
        info!(room = %self.id, "Room event loop started");

        while let Some(cmd) = self.inbox.recv().await {
            self.handle_command(cmd);

            if self.members.is_empty() && self.retire() {
                break;
            }
        }

        info!(room = %self.id, "Room event loop finished");
    }

    fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join { peer_id, outbox } => {
                info!(room = %self.id, peer = %peer_id, "Peer joined");
                self.members.insert(peer_id, outbox);
            }

            RoomCommand::Signal { from, text } => {
                if !self.members.contains_key(&from) {
                    warn!(room = %self.id, peer = %from, "Dropping message from non-member");
                    return;
                }
                self.relay(&from, text);
            }

            RoomCommand::Leave { peer_id } => {
                if self.members.remove(&peer_id).is_some() {
                    info!(room = %self.id, peer = %peer_id, "Peer left");
                }
            }
        }
    }

    fn relay(&mut self, from: &PeerId, text: String) {
        let mut dead = Vec::new();

        for (peer_id, outbox) in self.members.iter() {
            if peer_id == from {
                continue;
            }
            if outbox.send(text.clone()).is_err() {
                dead.push(peer_id.clone());
            }
        }
        debug!(
            room = %self.id,
            from = %from,
            recipients = self.members.len() - 1 - dead.len(),
            "Relayed message"
        );

        for peer_id in dead {
            warn!(room = %self.id, peer = %peer_id, "Delivery failed, removing member");
            self.members.remove(&peer_id);
        }
    }

    /// Removes this room from the registry if nothing is queued for it. Joiners hold the same
    /// shard lock while enqueueing, so a join either lands before this check or finds no room.
    fn retire(&self) -> bool {
        let removed = self
            .registry
            .remove_if(&self.id, |_, entry| {
                entry.epoch == self.epoch && self.inbox.is_empty()
            })
            .is_some();

        if removed {
            info!(room = %self.id, "Room is empty, removed");
        }
        removed
    }
}
