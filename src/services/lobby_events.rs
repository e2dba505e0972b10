//! Typed broadcast helpers: one function per outbound event, all fanning out
//! through the lobby's broadcast room. Private messages go straight to a
//! player's connection channels instead.

use axum::extract::ws::Message;
use tokio::sync::mpsc;
use tracing::warn;

use crate::{
    dto::{
        lobby::{RosterEntry, RoundResultEntry},
        question::{ClientQuestion, RevealQuestion},
        ws::ServerMessage,
    },
    lobby::{GuessStatus, LobbySettings, RoundSummary},
    state::SharedState,
};

/// Broadcast the current roster and host seat to a lobby.
pub fn broadcast_roster(state: &SharedState, lobby_id: &str) {
    let Some((players, host_player_id)) = state.lobbies().with_lobby(lobby_id, |lobby| {
        (
            lobby.roster.values().map(RosterEntry::from).collect(),
            lobby.host_player_id.clone(),
        )
    }) else {
        return;
    };

    state.rooms().broadcast(
        lobby_id,
        ServerMessage::Roster {
            players,
            host_player_id,
        },
    );
}

/// Broadcast the settings now in force.
pub fn broadcast_settings(state: &SharedState, lobby_id: &str, settings: LobbySettings) {
    state
        .rooms()
        .broadcast(lobby_id, ServerMessage::Settings { settings });
}

/// Broadcast a freshly dealt question (client-safe projection only).
pub fn broadcast_round_started(
    state: &SharedState,
    lobby_id: &str,
    round: u32,
    question: ClientQuestion,
    round_duration_ms: u64,
) {
    state.rooms().broadcast(
        lobby_id,
        ServerMessage::RoundStarted {
            round,
            question,
            round_duration_ms,
        },
    );
}

/// Broadcast one player's changed standing.
pub fn broadcast_guess_status(
    state: &SharedState,
    lobby_id: &str,
    player_id: &str,
    status: GuessStatus,
) {
    state.rooms().broadcast(
        lobby_id,
        ServerMessage::GuessStatus {
            player_id: player_id.to_string(),
            status,
        },
    );
}

/// Broadcast the reveal and ranking of a settled round.
pub fn broadcast_round_summary(
    state: &SharedState,
    lobby_id: &str,
    summary: &RoundSummary,
    reveal: RevealQuestion,
) {
    state.rooms().broadcast(
        lobby_id,
        ServerMessage::RoundSummary {
            round: summary.round,
            reveal,
            results: summary.results.iter().map(RoundResultEntry::from).collect(),
        },
    );
}

/// Broadcast that the game has been won.
pub fn broadcast_game_won(
    state: &SharedState,
    lobby_id: &str,
    winner_ids: Vec<String>,
    scoreboard: Vec<RosterEntry>,
) {
    state.rooms().broadcast(
        lobby_id,
        ServerMessage::GameWon {
            winner_ids,
            scoreboard,
        },
    );
}

/// Broadcast that the game has been reset back to seating.
pub fn broadcast_game_reset(state: &SharedState, lobby_id: &str) {
    state.rooms().broadcast(lobby_id, ServerMessage::GameReset);
}

/// Send a message to every live connection of one player (all tabs).
pub fn send_to_player(state: &SharedState, player_id: &str, message: &ServerMessage) {
    for tx in state.players().connection_senders(player_id) {
        send_to_connection(&tx, message);
    }
}

/// Serialize a payload and push it onto a single connection's writer channel.
/// A closed writer is ignored here; the socket loop notices on its own.
pub fn send_to_connection(tx: &mpsc::UnboundedSender<Message>, message: &ServerMessage) {
    match serde_json::to_string(message) {
        Ok(payload) => {
            let _ = tx.send(Message::Text(payload.into()));
        }
        Err(err) => {
            warn!(error = %err, "failed to serialize outbound message");
        }
    }
}
