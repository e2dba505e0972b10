//! Messages crossing the WebSocket channel, both directions.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use validator::ValidationError;

use crate::dto::lobby::{LobbySummary, RosterEntry, RoundResultEntry, SettingsPatch};
use crate::dto::question::{ClientQuestion, RevealQuestion};
use crate::dto::validation::{validate_lobby_id, validate_player_id, validate_player_name};
use crate::lobby::{GuessStatus, LobbySettings};

/// Error raised when an inbound frame cannot be turned into a usable message.
#[derive(Debug, Error)]
pub enum MessageParseError {
    /// The frame was not valid JSON for any known message shape.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The frame parsed but carried unusable field values.
    #[error("invalid message: {0}")]
    Invalid(String),
}

/// Messages accepted from game clients.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Identify this connection and seat the player. Must be the first
    /// message of every connection.
    Join {
        /// Display name.
        name: String,
        /// Lobby to join or create.
        lobby_id: String,
        /// Durable client-generated identity token.
        player_id: String,
    },
    /// Host only: deal the next question.
    StartRound,
    /// Submit an answer for the live round.
    SubmitAnswer {
        /// The answer payload, shaped by the question type.
        answer: AnswerSubmission,
    },
    /// Host only: patch the lobby settings.
    UpdateSettings {
        /// Fields to change; anything else is left alone.
        settings: SettingsPatch,
    },
    /// Host only: reset the game back to seating.
    ResetGame,
    /// Leave the lobby explicitly (closing the socket works too).
    Leave,
    /// Forward-compatibility net for unrecognized message types.
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Parse and validate an inbound text frame.
    pub fn from_json_str(text: &str) -> Result<Self, MessageParseError> {
        let message: Self = serde_json::from_str(text)?;

        if let Self::Join {
            name,
            lobby_id,
            player_id,
        } = &message
        {
            validate_lobby_id(lobby_id).map_err(invalid)?;
            validate_player_id(player_id).map_err(invalid)?;
            validate_player_name(name).map_err(invalid)?;
        }

        Ok(message)
    }
}

fn invalid(err: ValidationError) -> MessageParseError {
    let message = err
        .message
        .map(|m| m.to_string())
        .unwrap_or_else(|| err.code.to_string());
    MessageParseError::Invalid(message)
}

/// One answer, shaped by the question type it responds to.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerSubmission {
    /// Free-text, multi-entry, or numeric input.
    Text {
        /// The typed guess.
        text: String,
    },
    /// Multiple-choice pick.
    Choice {
        /// Selected choice id.
        choice_id: String,
    },
    /// True/false pick.
    Boolean {
        /// Selected value.
        value: bool,
    },
    /// Ordered-list arrangement.
    Order {
        /// Item ids in the submitted sequence.
        order: Vec<String>,
    },
}

/// Messages pushed to game clients, over the lobby broadcast room or
/// directly to one connection.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Direct reply confirming a join.
    Joined {
        /// Snapshot of the joined lobby.
        lobby: LobbySummary,
        /// The caller's durable identity.
        player_id: String,
        /// Whether the caller holds host.
        is_host: bool,
    },
    /// Broadcast whenever the roster or host changes.
    Roster {
        /// Seated players in join order.
        players: Vec<RosterEntry>,
        /// Current host, if the seat is filled.
        host_player_id: Option<String>,
    },
    /// Broadcast after a settings update.
    Settings {
        /// The settings now in force.
        settings: LobbySettings,
    },
    /// Broadcast when a question is dealt.
    RoundStarted {
        /// 1-based round number.
        round: u32,
        /// Client-safe question projection.
        question: ClientQuestion,
        /// How long the round stays open, milliseconds.
        round_duration_ms: u64,
    },
    /// Broadcast when a player's standing changes.
    GuessStatus {
        /// Player whose standing changed.
        player_id: String,
        /// New standing.
        status: GuessStatus,
    },
    /// Direct reply to a submission.
    GuessResult {
        /// The submitter's standing after this guess.
        status: GuessStatus,
        /// Canonical answer the guess matched, if any.
        #[serde(skip_serializing_if = "Option::is_none")]
        matched_answer: Option<String>,
        /// Multi-entry answers found so far this round.
        #[serde(skip_serializing_if = "Vec::is_empty")]
        found_entries: Vec<String>,
        /// Guesses spent this round.
        guesses_used: u32,
    },
    /// Broadcast when the round settles.
    RoundSummary {
        /// 1-based round number.
        round: u32,
        /// Reveal projection with the correct answer.
        reveal: RevealQuestion,
        /// Per-player outcomes, ranked.
        results: Vec<RoundResultEntry>,
    },
    /// Broadcast when a score reaches the points target.
    GameWon {
        /// Players who reached the target this round.
        winner_ids: Vec<String>,
        /// Final standings.
        scoreboard: Vec<RosterEntry>,
    },
    /// Broadcast after a game reset.
    GameReset,
    /// Direct error surfaced only to the offending connection.
    Error {
        /// Human-readable description.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_message_parses_and_validates() {
        let message = ClientMessage::from_json_str(
            r#"{"type":"join","name":"Ada","lobby_id":"friday-night","player_id":"tok-1"}"#,
        )
        .expect("valid join");
        assert!(matches!(message, ClientMessage::Join { .. }));
    }

    #[test]
    fn join_with_bad_lobby_id_is_rejected() {
        let err = ClientMessage::from_json_str(
            r#"{"type":"join","name":"Ada","lobby_id":"Friday Night","player_id":"tok-1"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, MessageParseError::Invalid(_)));
    }

    #[test]
    fn unrecognized_type_becomes_unknown() {
        let message = ClientMessage::from_json_str(r#"{"type":"dance"}"#).expect("tolerated");
        assert!(matches!(message, ClientMessage::Unknown));
    }

    #[test]
    fn submissions_parse_by_kind() {
        let text = ClientMessage::from_json_str(
            r#"{"type":"submit_answer","answer":{"kind":"text","text":"runaway"}}"#,
        )
        .unwrap();
        assert!(matches!(
            text,
            ClientMessage::SubmitAnswer {
                answer: AnswerSubmission::Text { .. }
            }
        ));

        let order = ClientMessage::from_json_str(
            r#"{"type":"submit_answer","answer":{"kind":"order","order":["a","b"]}}"#,
        )
        .unwrap();
        assert!(matches!(
            order,
            ClientMessage::SubmitAnswer {
                answer: AnswerSubmission::Order { .. }
            }
        ));
    }
}
