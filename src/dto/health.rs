use serde::Serialize;
use utoipa::ToSchema;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status, always "ok" while the process is serving.
    pub status: String,
    /// Number of live lobbies.
    pub lobbies: usize,
    /// Number of live WebSocket connections.
    pub connections: usize,
}

impl HealthResponse {
    /// Create a health response with the given live counts.
    pub fn ok(lobbies: usize, connections: usize) -> Self {
        Self {
            status: "ok".to_string(),
            lobbies,
            connections,
        }
    }
}
