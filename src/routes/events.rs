use axum::{
    Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};

use crate::{error::AppError, services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/api/lobbies/{id}/events",
    tag = "events",
    params(("id" = String, Path, description = "Lobby identifier")),
    responses(
        (status = 200, description = "SSE stream mirroring the lobby broadcast"),
        (status = 404, description = "Unknown lobby")
    )
)]
/// Stream a lobby's broadcast room as Server-Sent Events (spectator view).
pub async fn lobby_events(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let receiver = sse_service::subscribe_lobby(&state, &id)?;
    Ok(sse_service::to_sse_stream(receiver))
}

/// Configure the spectator event-stream endpoint.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/api/lobbies/{id}/events", get(lobby_events))
}
