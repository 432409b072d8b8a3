use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use sightline_core::{PeerId, RoomId};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::room::{Room, RoomCommand, RoomEntry, RoomRegistry};

/// Owns the set of live rooms. Rooms are created on first join and disappear once their last
/// member leaves.
#[derive(Clone, Default)]
pub struct RoomManager {
    rooms: RoomRegistry,
    epochs: Arc<AtomicU64>,
}

impl RoomManager {
    pub fn new() -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
            epochs: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Adds `peer_id` to `room_id`, creating the room if needed. Text relayed to the peer
    /// arrives on the returned receiver; dropping the handle leaves the room.
    pub fn join(
        &self,
        room_id: RoomId,
        peer_id: PeerId,
    ) -> (RoomHandle, mpsc::UnboundedReceiver<String>) {
        let (outbox, inbox) = mpsc::unbounded_channel();
        let join = RoomCommand::Join {
            peer_id: peer_id.clone(),
            outbox,
        };

        let tx = match self.rooms.entry(room_id.clone()) {
            Entry::Occupied(mut occupied) => match occupied.get().tx.send(join) {
                Ok(()) => occupied.get().tx.clone(),
                Err(mpsc::error::SendError(join)) => {
                    warn!(room = %room_id, "Room task is gone, replacing it");
                    let entry = self.spawn_room(&room_id);
                    let _ = entry.tx.send(join);
                    let tx = entry.tx.clone();
                    occupied.insert(entry);
                    tx
                }
            },
            Entry::Vacant(vacant) => {
                let entry = self.spawn_room(&room_id);
                let _ = entry.tx.send(join);
                vacant.insert(entry).tx.clone()
            }
        };

        let handle = RoomHandle {
            room_id,
            peer_id,
            tx,
        };
        (handle, inbox)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn contains(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    fn spawn_room(&self, room_id: &RoomId) -> RoomEntry {
        let epoch = self.epochs.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        info!(room = %room_id, "Creating new room");
        let room = Room::new(room_id.clone(), epoch, rx, self.rooms.clone());
        tokio::spawn(room.run());

        RoomEntry { tx, epoch }
    }
}

/// Membership of one connection in one room.
#[derive(Debug)]
pub struct RoomHandle {
    room_id: RoomId,
    peer_id: PeerId,
    tx: mpsc::UnboundedSender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    /// Queues `text` for every other member. Returns `false` once the room is gone.
    pub fn send(&self, text: String) -> bool {
        self.tx
            .send(RoomCommand::Signal {
                from: self.peer_id.clone(),
                text,
            })
            .is_ok()
    }
}

impl Drop for RoomHandle {
    fn drop(&mut self) {
        let _ = self.tx.send(RoomCommand::Leave {
            peer_id: self.peer_id.clone(),
        });
    }
}
