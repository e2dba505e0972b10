//! Lobby registry and the per-lobby round state machine.

pub mod model;
pub mod phase;
pub mod registry;

pub use model::{GuessStatus, Lobby, LobbyPlayer, LobbySettings, RoundResult, RoundSummary};
pub use phase::{ActiveRound, InvalidTransition, LobbyEvent, LobbyPhase, WinSummary};
pub use registry::{JoinOutcome, LobbyRegistry, RemoveOutcome};
