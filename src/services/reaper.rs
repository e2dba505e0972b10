//! Background sweep destroying lobbies that have sat empty past the grace
//! period.

use std::time::Duration;

use tracing::debug;

use crate::state::SharedState;

/// How often the sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(10);

/// Periodically destroy idle lobbies and tear down their broadcast rooms.
/// Spawned once at startup; runs for the life of the process.
pub async fn run_lobby_reaper(state: SharedState) {
    let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        ticker.tick().await;
        let destroyed = state.lobbies().reap_idle();
        if destroyed.is_empty() {
            continue;
        }
        debug!(count = destroyed.len(), "reaped idle lobbies");
        for lobby_id in destroyed {
            state.rooms().remove(&lobby_id);
        }
    }
}
