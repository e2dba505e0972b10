/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Typed broadcast helpers for lobby rooms.
pub mod lobby_events;
/// REST-facing lobby discovery and creation.
pub mod lobby_service;
/// Background sweep destroying idle lobbies.
pub mod reaper;
/// Round orchestration: dealing, judging, settling, timers.
pub mod round_service;
/// Spectator Server-Sent Events streaming.
pub mod sse_service;
/// WebSocket connection and message handling service.
pub mod websocket_service;
