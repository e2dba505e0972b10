use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use axum_valid::Valid;

use crate::{
    dto::lobby::{CreateLobbyRequest, LobbySummary},
    error::AppError,
    services::lobby_service,
    state::SharedState,
};

/// Read-mostly REST surface for lobby discovery and creation.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/lobbies", get(list_lobbies).post(create_lobby))
        .route("/api/lobbies/{id}", get(get_lobby))
}

#[utoipa::path(
    get,
    path = "/api/lobbies",
    tag = "lobbies",
    responses((status = 200, description = "Every live lobby", body = [LobbySummary]))
)]
/// List every live lobby.
pub async fn list_lobbies(State(state): State<SharedState>) -> Json<Vec<LobbySummary>> {
    Json(lobby_service::list_lobbies(&state))
}

#[utoipa::path(
    get,
    path = "/api/lobbies/{id}",
    tag = "lobbies",
    params(("id" = String, Path, description = "Lobby identifier")),
    responses(
        (status = 200, description = "Lobby snapshot", body = LobbySummary),
        (status = 404, description = "Unknown lobby")
    )
)]
/// Return a snapshot of one lobby.
pub async fn get_lobby(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<LobbySummary>, AppError> {
    let summary = lobby_service::get_lobby(&state, &id)?;
    Ok(Json(summary))
}

#[utoipa::path(
    post,
    path = "/api/lobbies",
    tag = "lobbies",
    request_body = CreateLobbyRequest,
    responses((status = 200, description = "The lobby (created or pre-existing)", body = LobbySummary))
)]
/// Create a lobby if missing; idempotent.
pub async fn create_lobby(
    State(state): State<SharedState>,
    Valid(Json(request)): Valid<Json<CreateLobbyRequest>>,
) -> Result<Json<LobbySummary>, AppError> {
    let summary = lobby_service::create_lobby(&state, &request)?;
    Ok(Json(summary))
}
