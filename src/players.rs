//! Bidirectional mapping between live WebSocket connections and durable
//! player identities.
//!
//! A durable identity is keyed by the client-supplied `player_id` token and
//! survives reconnects; it may hold several live connections at once (one per
//! browser tab). The directory knows nothing about rounds or scores; the
//! lobby layer reacts to the `fully_disconnected` signal it reports.

use std::collections::HashMap;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Identifier of a single live socket.
pub type ConnectionId = Uuid;

/// Handle used to push messages to one connected socket.
#[derive(Clone)]
pub struct PlayerConnection {
    /// Socket identifier.
    pub id: ConnectionId,
    /// Writer-task channel for this socket.
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Profile supplied when a connection identifies itself.
#[derive(Debug, Clone)]
pub struct PlayerProfile {
    /// Durable client-supplied identity token.
    pub player_id: String,
    /// Display name.
    pub name: String,
    /// Lobby the player is joining.
    pub lobby_id: String,
}

/// Durable player record, alive while at least one connection claims it.
struct DurablePlayer {
    name: String,
    lobby_id: String,
    connections: HashMap<ConnectionId, PlayerConnection>,
}

/// Reported when a socket goes away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectOutcome {
    /// Identity the socket belonged to.
    pub player_id: String,
    /// Lobby the identity was last seen in.
    pub lobby_id: String,
    /// True once the identity has no live connections left. Only then does
    /// the lobby layer start host-release and score-banking logic.
    pub fully_disconnected: bool,
}

/// Registry of live connections and the durable identities behind them.
#[derive(Default)]
pub struct PlayerDirectory {
    connections: DashMap<ConnectionId, String>,
    players: DashMap<String, DurablePlayer>,
}

impl PlayerDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `connection` to the identity in `profile`, creating the durable
    /// record on first sight of the `player_id` and merging (name and lobby
    /// refresh) otherwise.
    pub fn connect_player(&self, connection: PlayerConnection, profile: PlayerProfile) {
        self.connections
            .insert(connection.id, profile.player_id.clone());

        let mut entry = self
            .players
            .entry(profile.player_id)
            .or_insert_with(|| DurablePlayer {
                name: profile.name.clone(),
                lobby_id: profile.lobby_id.clone(),
                connections: HashMap::new(),
            });
        entry.name = profile.name;
        entry.lobby_id = profile.lobby_id;
        entry.connections.insert(connection.id, connection);
    }

    /// Drop `connection_id` from its identity, reporting whether the identity
    /// is now fully disconnected. The durable record is deleted only once its
    /// connection set drains; a reconnect before that is a merge, not a new
    /// identity.
    pub fn disconnect_socket(&self, connection_id: ConnectionId) -> Option<DisconnectOutcome> {
        let (_, player_id) = self.connections.remove(&connection_id)?;

        let mut fully_disconnected = false;
        let mut lobby_id = String::new();
        if let Some(mut entry) = self.players.get_mut(&player_id) {
            entry.connections.remove(&connection_id);
            fully_disconnected = entry.connections.is_empty();
            lobby_id = entry.lobby_id.clone();
        }
        if fully_disconnected {
            self.players.remove(&player_id);
        }

        Some(DisconnectOutcome {
            player_id,
            lobby_id,
            fully_disconnected,
        })
    }

    /// Current display name of a durable identity.
    pub fn player_name(&self, player_id: &str) -> Option<String> {
        self.players.get(player_id).map(|entry| entry.name.clone())
    }

    /// Writer channels for every live connection of `player_id`, for private
    /// (non-broadcast) messages that must reach all of the player's tabs.
    pub fn connection_senders(&self, player_id: &str) -> Vec<mpsc::UnboundedSender<Message>> {
        self.players
            .get(player_id)
            .map(|entry| {
                entry
                    .connections
                    .values()
                    .map(|connection| connection.tx.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of live connections across all identities.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection() -> PlayerConnection {
        let (tx, _rx) = mpsc::unbounded_channel();
        PlayerConnection {
            id: Uuid::new_v4(),
            tx,
        }
    }

    fn profile(player_id: &str, name: &str) -> PlayerProfile {
        PlayerProfile {
            player_id: player_id.into(),
            name: name.into(),
            lobby_id: "lobby-1".into(),
        }
    }

    #[test]
    fn second_tab_keeps_identity_alive() {
        let directory = PlayerDirectory::new();
        let first = connection();
        let second = connection();

        directory.connect_player(first.clone(), profile("tok-1", "Ada"));
        directory.connect_player(second.clone(), profile("tok-1", "Ada"));

        let outcome = directory
            .disconnect_socket(first.id)
            .expect("known connection");
        assert!(!outcome.fully_disconnected);
        assert_eq!(directory.player_name("tok-1").as_deref(), Some("Ada"));

        let outcome = directory
            .disconnect_socket(second.id)
            .expect("known connection");
        assert!(outcome.fully_disconnected);
        assert_eq!(outcome.lobby_id, "lobby-1");
        assert!(directory.player_name("tok-1").is_none());
    }

    #[test]
    fn reconnect_refreshes_name_and_lobby() {
        let directory = PlayerDirectory::new();
        let first = connection();
        directory.connect_player(first.clone(), profile("tok-2", "Ada"));

        let second = connection();
        let mut updated = profile("tok-2", "Countess");
        updated.lobby_id = "lobby-9".into();
        directory.connect_player(second.clone(), updated);

        assert_eq!(directory.player_name("tok-2").as_deref(), Some("Countess"));
        assert_eq!(directory.connection_senders("tok-2").len(), 2);

        directory.disconnect_socket(first.id);
        let outcome = directory.disconnect_socket(second.id).unwrap();
        assert!(outcome.fully_disconnected);
        assert_eq!(outcome.lobby_id, "lobby-9");
    }

    #[test]
    fn unknown_connection_is_a_no_op() {
        let directory = PlayerDirectory::new();
        assert!(directory.disconnect_socket(Uuid::new_v4()).is_none());
    }
}
