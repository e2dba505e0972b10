//! WebSocket connection lifecycle for game clients.
//!
//! Every connection must open with a `join` message; after that the socket
//! receives the lobby's broadcast room through a forwarder task while a
//! dedicated writer task drains the outbound channel. Teardown reports the
//! disconnect to the player directory, and only when the identity's last
//! connection drops does the lobby react (score banking, host release).

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::{
        lobby::LobbySummary,
        ws::{ClientMessage, ServerMessage},
    },
    error::ServiceError,
    players::{PlayerConnection, PlayerProfile},
    services::{lobby_events, round_service},
    state::SharedState,
};

/// How long a fresh connection gets to send its `join` message.
const JOIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle the full lifecycle of one game client connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we
    // await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let first_frame = match tokio::time::timeout(JOIN_TIMEOUT, receiver.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => text,
        Ok(Some(Ok(Message::Close(_)))) => {
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Ok(_))) => {
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Err(err))) => {
            warn!(error = %err, "websocket receive error");
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(None) | Err(_) => {
            warn!("websocket join timed out");
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let (name, lobby_id, player_id) = match ClientMessage::from_json_str(&first_frame) {
        Ok(ClientMessage::Join {
            name,
            lobby_id,
            player_id,
        }) => (name, lobby_id, player_id),
        Ok(_) => {
            warn!("first message was not a join");
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Err(err) => {
            warn!(error = %err, "failed to parse join message");
            lobby_events::send_to_connection(
                &outbound_tx,
                &ServerMessage::Error {
                    message: err.to_string(),
                },
            );
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let connection_id = Uuid::new_v4();
    state.players().connect_player(
        PlayerConnection {
            id: connection_id,
            tx: outbound_tx.clone(),
        },
        PlayerProfile {
            player_id: player_id.clone(),
            name: name.clone(),
            lobby_id: lobby_id.clone(),
        },
    );

    let outcome = state.lobbies().join(&lobby_id, &player_id, &name);
    info!(
        lobby = %lobby_id,
        player = %player_id,
        is_host = outcome.is_host,
        "player connected"
    );

    // Subscribe before announcing the join so this connection sees its own
    // roster update.
    let forwarder_task = spawn_room_forwarder(&state, &lobby_id, outbound_tx.clone());

    if let Some(summary) = state
        .lobbies()
        .with_lobby(&lobby_id, |lobby| LobbySummary::from(lobby))
    {
        lobby_events::send_to_connection(
            &outbound_tx,
            &ServerMessage::Joined {
                lobby: summary,
                player_id: player_id.clone(),
                is_host: outcome.is_host,
            },
        );
    }
    lobby_events::broadcast_roster(&state, &lobby_id);

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                match ClientMessage::from_json_str(&text) {
                    Ok(message) => {
                        if handle_message(&state, &lobby_id, &player_id, &outbound_tx, message) {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!(player = %player_id, error = %err, "rejected client message");
                        lobby_events::send_to_connection(
                            &outbound_tx,
                            &ServerMessage::Error {
                                message: err.to_string(),
                            },
                        );
                    }
                }
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(player = %player_id, error = %err, "websocket error");
                break;
            }
        }
    }

    forwarder_task.abort();

    if let Some(disconnect) = state.players().disconnect_socket(connection_id) {
        info!(
            player = %disconnect.player_id,
            fully_disconnected = disconnect.fully_disconnected,
            "player connection closed"
        );
        if disconnect.fully_disconnected {
            round_service::handle_full_disconnect(
                &state,
                &disconnect.lobby_id,
                &disconnect.player_id,
            );
        }
    }

    finalize(writer_task, outbound_tx).await;
}

/// Dispatch one parsed inbound message. Returns `true` when the connection
/// should close.
fn handle_message(
    state: &SharedState,
    lobby_id: &str,
    player_id: &str,
    outbound_tx: &mpsc::UnboundedSender<Message>,
    message: ClientMessage,
) -> bool {
    // Any action counts as lobby activity; an expired host-release window is
    // resolved here.
    if state.lobbies().mark_active(lobby_id) {
        lobby_events::broadcast_roster(state, lobby_id);
    }

    let result: Result<(), ServiceError> = match message {
        ClientMessage::Join { .. } => {
            warn!(player = %player_id, "ignoring duplicate join message");
            Ok(())
        }
        ClientMessage::StartRound => round_service::start_round(state, lobby_id, player_id),
        ClientMessage::SubmitAnswer { answer } => {
            round_service::submit_answer(state, lobby_id, player_id, &answer).map(|result| {
                lobby_events::send_to_player(state, player_id, &result);
            })
        }
        ClientMessage::UpdateSettings { settings } => {
            round_service::update_settings(state, lobby_id, player_id, &settings)
        }
        ClientMessage::ResetGame => round_service::reset_game(state, lobby_id, player_id),
        ClientMessage::Leave => {
            // Explicit leave unseats the player right away; the socket
            // teardown below is then a no-op on the roster.
            round_service::handle_full_disconnect(state, lobby_id, player_id);
            return true;
        }
        ClientMessage::Unknown => {
            warn!(player = %player_id, "ignoring unknown message type");
            Ok(())
        }
    };

    if let Err(err) = result {
        // Rejections touch only the offending connection.
        lobby_events::send_to_connection(
            outbound_tx,
            &ServerMessage::Error {
                message: err.to_string(),
            },
        );
    }

    false
}

/// Forward the lobby's broadcast room onto this connection's writer channel.
fn spawn_room_forwarder(
    state: &SharedState,
    lobby_id: &str,
    outbound_tx: mpsc::UnboundedSender<Message>,
) -> JoinHandle<()> {
    let mut room_rx = state.rooms().subscribe(lobby_id);
    tokio::spawn(async move {
        loop {
            match room_rx.recv().await {
                Ok(message) => match serde_json::to_string(&message) {
                    Ok(payload) => {
                        if outbound_tx.send(Message::Text(payload.into())).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "failed to serialize broadcast message");
                    }
                },
                Err(RecvError::Closed) => break,
                Err(RecvError::Lagged(skipped)) => {
                    // Skip lagged messages but keep the stream alive.
                    warn!(skipped, "broadcast receiver lagged");
                    continue;
                }
            }
        }
    })
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
