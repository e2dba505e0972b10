use crate::{dto::health::HealthResponse, state::SharedState};

/// Respond with a health payload carrying the live lobby/connection counts.
pub fn health_status(state: &SharedState) -> HealthResponse {
    HealthResponse::ok(state.lobbies().len(), state.players().connection_count())
}
