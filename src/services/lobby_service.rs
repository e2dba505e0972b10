//! Read-mostly service backing the REST lobby endpoints.

use crate::{
    dto::lobby::{CreateLobbyRequest, LobbySummary},
    error::ServiceError,
    state::SharedState,
};

/// Snapshot every live lobby.
pub fn list_lobbies(state: &SharedState) -> Vec<LobbySummary> {
    state
        .lobbies()
        .lobby_ids()
        .into_iter()
        .filter_map(|id| state.lobbies().with_lobby(&id, |lobby| LobbySummary::from(lobby)))
        .collect()
}

/// Snapshot one lobby.
pub fn get_lobby(state: &SharedState, id: &str) -> Result<LobbySummary, ServiceError> {
    state
        .lobbies()
        .with_lobby(id, |lobby| LobbySummary::from(lobby))
        .ok_or_else(|| ServiceError::NotFound(format!("lobby `{id}` not found")))
}

/// Create a lobby if it does not exist yet and return its snapshot. The
/// optional settings apply only on creation; an existing lobby is returned
/// untouched.
pub fn create_lobby(
    state: &SharedState,
    request: &CreateLobbyRequest,
) -> Result<LobbySummary, ServiceError> {
    state
        .lobbies()
        .create_if_missing(&request.id, request.settings.as_ref());
    get_lobby(state, &request.id)
}
