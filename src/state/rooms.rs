//! Per-lobby broadcast rooms.
//!
//! One Tokio broadcast channel per lobby carries the outbound server
//! messages; WebSocket forwarders and spectator SSE streams subscribe to the
//! same channel. Delivery errors are ignored, a room with no listeners just
//! drops its messages.

use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::dto::ws::ServerMessage;

/// Registry of broadcast channels keyed by lobby id.
pub struct RoomHub {
    rooms: DashMap<String, broadcast::Sender<ServerMessage>>,
    capacity: usize,
}

impl RoomHub {
    /// Build a hub whose per-room channels buffer `capacity` messages for
    /// slow subscribers before they start lagging.
    pub fn new(capacity: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            capacity,
        }
    }

    /// Subscribe to a lobby's room, creating the channel on first use.
    pub fn subscribe(&self, lobby_id: &str) -> broadcast::Receiver<ServerMessage> {
        self.rooms
            .entry(lobby_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Send `message` to every subscriber of the lobby's room. A missing
    /// room or an empty audience is a no-op.
    pub fn broadcast(&self, lobby_id: &str, message: ServerMessage) {
        if let Some(sender) = self.rooms.get(lobby_id) {
            let _ = sender.send(message);
        }
    }

    /// Drop a lobby's channel once the lobby is destroyed.
    pub fn remove(&self, lobby_id: &str) {
        self.rooms.remove(lobby_id);
    }

    /// Number of live rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Whether no rooms exist.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
