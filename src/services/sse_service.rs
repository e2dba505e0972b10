//! Spectator streams: the same per-lobby broadcast the WebSocket clients
//! receive, exposed as Server-Sent Events for projector screens and other
//! read-only viewers.

use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::{dto::ws::ServerMessage, error::ServiceError, state::SharedState};

/// Subscribe to a lobby's broadcast room for spectating.
pub fn subscribe_lobby(
    state: &SharedState,
    lobby_id: &str,
) -> Result<broadcast::Receiver<ServerMessage>, ServiceError> {
    state
        .lobbies()
        .with_lobby(lobby_id, |_| ())
        .ok_or_else(|| ServiceError::NotFound(format!("lobby `{lobby_id}` not found")))?;
    Ok(state.rooms().subscribe(lobby_id))
}

/// Convert a broadcast receiver into an SSE response, forwarding events and
/// cleaning up once the client disconnects.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerMessage>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    // forwarder task: reads from broadcast and pushes into mpsc
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(message) => {
                            let Ok(data) = serde_json::to_string(&message) else {
                                continue;
                            };
                            let event = Event::default().event(event_name(&message)).data(data);
                            if tx.send(Ok(event)).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(_)) => {
                            // Skip lagged messages but keep the stream alive.
                            continue;
                        }
                    }
                }
            }
        }

        tracing::info!("spectator SSE stream disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// SSE event name for a broadcast message.
fn event_name(message: &ServerMessage) -> &'static str {
    match message {
        ServerMessage::Joined { .. } => "joined",
        ServerMessage::Roster { .. } => "roster",
        ServerMessage::Settings { .. } => "settings",
        ServerMessage::RoundStarted { .. } => "round_started",
        ServerMessage::GuessStatus { .. } => "guess_status",
        ServerMessage::GuessResult { .. } => "guess_result",
        ServerMessage::RoundSummary { .. } => "round_summary",
        ServerMessage::GameWon { .. } => "game_won",
        ServerMessage::GameReset => "game_reset",
        ServerMessage::Error { .. } => "error",
    }
}
