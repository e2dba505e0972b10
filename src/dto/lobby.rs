//! Lobby-facing DTOs shared by the REST surface and the WebSocket channel.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::dto::{format_system_time, validation::validate_lobby_id};
use crate::lobby::{GuessStatus, Lobby, LobbyPlayer, LobbySettings, RoundResult};

/// Partial settings update. Unknown fields in the incoming JSON are ignored
/// and out-of-range values are clamped on application, so a malformed patch
/// can never corrupt a lobby's settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct SettingsPatch {
    /// New round duration, milliseconds. Clamped to 1 000 - 120 000 and
    /// rounded to whole seconds.
    #[serde(default)]
    pub round_duration_ms: Option<i64>,
    /// New points target. Clamped to 5 - 500.
    #[serde(default)]
    pub points_to_win: Option<i64>,
    /// New question category filter; blank clears the filter.
    #[serde(default)]
    pub question_filter: Option<String>,
}

/// Body of `POST /api/lobbies`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLobbyRequest {
    /// Lobby id to create (idempotent: an existing lobby is returned as-is).
    pub id: String,
    /// Optional initial settings, applied only when the lobby is created.
    #[serde(default)]
    pub settings: Option<SettingsPatch>,
}

impl Validate for CreateLobbyRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_lobby_id(&self.id) {
            errors.add("id", e);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// One seated player as shown to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RosterEntry {
    /// Durable identity token.
    pub player_id: String,
    /// Display name.
    pub name: String,
    /// Score within the current game.
    pub score: u32,
    /// Standing within the current round.
    pub guess_status: GuessStatus,
}

impl From<&LobbyPlayer> for RosterEntry {
    fn from(player: &LobbyPlayer) -> Self {
        Self {
            player_id: player.player_id.clone(),
            name: player.name.clone(),
            score: player.score,
            guess_status: player.guess_status,
        }
    }
}

/// One line of a settled round's ranking.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoundResultEntry {
    /// Durable identity token.
    pub player_id: String,
    /// Display name at settle time.
    pub name: String,
    /// Final standing for the round.
    pub status: GuessStatus,
    /// Raw text of the player's final guess.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_guess: Option<String>,
    /// Time from round start to the correct answer, when there was one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_elapsed_ms: Option<u64>,
    /// Points earned this round.
    pub points_awarded: u32,
    /// Total score after the round.
    pub score: u32,
}

impl From<&RoundResult> for RoundResultEntry {
    fn from(result: &RoundResult) -> Self {
        Self {
            player_id: result.player_id.clone(),
            name: result.name.clone(),
            status: result.status,
            last_guess: result.last_guess.clone(),
            correct_elapsed_ms: result.correct_elapsed_ms,
            points_awarded: result.points_awarded,
            score: result.score,
        }
    }
}

/// Read-only lobby overview returned by the REST surface.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LobbySummary {
    /// Lobby identifier.
    pub id: String,
    /// Current phase name (`seating`, `round`, `summary`, `win`).
    pub phase: String,
    /// Seated players in join order.
    pub players: Vec<RosterEntry>,
    /// Current host, if the seat is filled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_player_id: Option<String>,
    /// Current settings.
    pub settings: LobbySettings,
    /// Rounds dealt in the current game.
    pub round_counter: u32,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

impl From<&Lobby> for LobbySummary {
    fn from(lobby: &Lobby) -> Self {
        Self {
            id: lobby.id.clone(),
            phase: lobby.phase.name().to_string(),
            players: lobby.roster.values().map(RosterEntry::from).collect(),
            host_player_id: lobby.host_player_id.clone(),
            settings: lobby.settings.clone(),
            round_counter: lobby.round_counter,
            created_at: format_system_time(lobby.created_at),
        }
    }
}
