//! Shared application state: the lobby registry, player directory, broadcast
//! rooms, and the immutable corpus/config, each owned exclusively by its
//! component and only reachable through its documented operations.

pub mod rooms;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::lobby::LobbyRegistry;
use crate::players::PlayerDirectory;
use crate::questions::QuestionBank;

pub use self::rooms::RoomHub;

/// Cheaply clonable handle to the application state.
pub type SharedState = Arc<AppState>;

/// Broadcast buffer per lobby room; slow subscribers past this lag and skip.
const ROOM_CHANNEL_CAPACITY: usize = 64;

/// Central application state.
pub struct AppState {
    config: AppConfig,
    questions: QuestionBank,
    lobbies: LobbyRegistry,
    players: PlayerDirectory,
    rooms: RoomHub,
}

impl AppState {
    /// Construct the shared state from loaded configuration and corpus.
    pub fn new(config: AppConfig, questions: QuestionBank) -> SharedState {
        let lobbies = LobbyRegistry::new(
            config.default_settings(),
            config.host_release_grace(),
            config.lobby_destroy_grace(),
        );
        Arc::new(Self {
            config,
            questions,
            lobbies,
            players: PlayerDirectory::new(),
            rooms: RoomHub::new(ROOM_CHANNEL_CAPACITY),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The question corpus.
    pub fn questions(&self) -> &QuestionBank {
        &self.questions
    }

    /// The lobby registry.
    pub fn lobbies(&self) -> &LobbyRegistry {
        &self.lobbies
    }

    /// The connection/identity directory.
    pub fn players(&self) -> &PlayerDirectory {
        &self.players
    }

    /// Per-lobby broadcast rooms.
    pub fn rooms(&self) -> &RoomHub {
        &self.rooms
    }
}
