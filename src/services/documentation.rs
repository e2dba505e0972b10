use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the trivia party backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::lobbies::list_lobbies,
        crate::routes::lobbies::get_lobby,
        crate::routes::lobbies::create_lobby,
        crate::routes::events::lobby_events,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::lobby::CreateLobbyRequest,
            crate::dto::lobby::LobbySummary,
            crate::dto::lobby::RosterEntry,
            crate::dto::lobby::RoundResultEntry,
            crate::dto::lobby::SettingsPatch,
            crate::dto::question::ClientQuestion,
            crate::dto::question::RevealQuestion,
            crate::dto::ws::ClientMessage,
            crate::dto::ws::ServerMessage,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "lobbies", description = "Lobby discovery and creation"),
        (name = "events", description = "Spectator event streams"),
        (name = "game", description = "WebSocket operations for game clients"),
    )
)]
pub struct ApiDoc;
