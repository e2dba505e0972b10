//! Registry owning every live lobby.
//!
//! The map is the single shared mutable resource for lobby state; callers
//! never touch a `Lobby` outside the accessors here, and no accessor awaits
//! while holding an entry lock, so all mutation of one lobby's fields is
//! serialized.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, info};

use crate::dto::lobby::SettingsPatch;
use crate::lobby::model::{HostRelease, Lobby, LobbyPlayer, LobbySettings};

/// Result of seating a player.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    /// Snapshot of the seated player (score already restored from the bank).
    pub player: LobbyPlayer,
    /// Whether this player holds host after the join.
    pub is_host: bool,
    /// Whether the join created the lobby.
    pub created_lobby: bool,
}

/// Result of removing a player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveOutcome {
    /// Whether the removed player was host (a release window has started).
    pub was_host: bool,
    /// Whether the roster is now empty (destruction countdown has started).
    pub lobby_now_empty: bool,
}

/// Owner of the lobby map and the grace-window policy around it.
pub struct LobbyRegistry {
    lobbies: DashMap<String, Lobby>,
    defaults: LobbySettings,
    host_release_grace: Duration,
    destroy_grace: Duration,
}

impl LobbyRegistry {
    /// Build a registry with the given default settings and grace windows.
    pub fn new(
        defaults: LobbySettings,
        host_release_grace: Duration,
        destroy_grace: Duration,
    ) -> Self {
        Self {
            lobbies: DashMap::new(),
            defaults,
            host_release_grace,
            destroy_grace,
        }
    }

    /// Ensure a lobby exists, initializing it with default settings (plus an
    /// optional creation-time patch) when absent. Idempotent: an existing
    /// lobby is returned untouched and the patch is ignored.
    ///
    /// Returns whether the call created the lobby.
    pub fn create_if_missing(&self, id: &str, settings: Option<&SettingsPatch>) -> bool {
        let mut created = false;
        self.lobbies.entry(id.to_string()).or_insert_with(|| {
            created = true;
            info!(lobby = id, "creating lobby");
            let mut lobby = Lobby::new(id.to_string(), self.defaults.clone());
            if let Some(patch) = settings {
                lobby.settings.apply_patch(patch);
            }
            lobby
        });
        created
    }

    /// Seat `player_id` in `lobby_id`, creating the lobby when absent,
    /// restoring any banked score, cancelling a pending destruction, and
    /// assigning host if the seat is vacant and no unexpired release window
    /// blocks reassignment.
    pub fn join(&self, lobby_id: &str, player_id: &str, name: &str) -> JoinOutcome {
        let mut created_lobby = false;
        let mut entry = self.lobbies.entry(lobby_id.to_string()).or_insert_with(|| {
            created_lobby = true;
            info!(lobby = lobby_id, "creating lobby");
            Lobby::new(lobby_id.to_string(), self.defaults.clone())
        });
        let lobby = entry.value_mut();
        let now = Instant::now();

        lobby.pending_destroy_at = None;
        lobby.last_active_at = now;

        let banked = lobby.banked_scores.remove(player_id);
        let player = lobby
            .roster
            .entry(player_id.to_string())
            .and_modify(|player| player.name = name.to_string())
            .or_insert_with(|| {
                LobbyPlayer::new(player_id.to_string(), name.to_string(), banked.unwrap_or(0))
            })
            .clone();

        Self::assign_host_if_vacant(lobby, Some(player_id), now);
        let is_host = lobby.host_player_id.as_deref() == Some(player_id);

        debug!(lobby = lobby_id, player = player_id, is_host, "player joined");
        JoinOutcome {
            player,
            is_host,
            created_lobby,
        }
    }

    /// Unseat `player_id`, banking their score. A departing host starts a
    /// release window instead of an immediate promotion, so a brief
    /// disconnect does not strip host privileges. Unknown lobby or player is
    /// a no-op.
    pub fn remove_player(&self, lobby_id: &str, player_id: &str) -> Option<RemoveOutcome> {
        let mut entry = self.lobbies.get_mut(lobby_id)?;
        let lobby = entry.value_mut();
        let removed = lobby.roster.shift_remove(player_id)?;
        let now = Instant::now();

        lobby.banked_scores.insert(player_id.to_string(), removed.score);
        lobby.last_active_at = now;

        let was_host = lobby.host_player_id.as_deref() == Some(player_id);
        if was_host {
            lobby.host_player_id = None;
            lobby.host_release = Some(HostRelease {
                player_id: player_id.to_string(),
                expires_at: now + self.host_release_grace,
            });
        }

        let lobby_now_empty = lobby.roster.is_empty();
        if lobby_now_empty {
            lobby.pending_destroy_at = Some(now);
            lobby.cancel_deadline_timer();
        }

        debug!(lobby = lobby_id, player = player_id, was_host, "player removed");
        Some(RemoveOutcome {
            was_host,
            lobby_now_empty,
        })
    }

    /// Touch a lobby's activity clock and run the lazy host promotion (an
    /// expired release window is resolved here and in `join`). Returns
    /// whether the host seat changed so callers can broadcast the roster.
    pub fn mark_active(&self, lobby_id: &str) -> bool {
        let Some(mut entry) = self.lobbies.get_mut(lobby_id) else {
            return false;
        };
        let lobby = entry.value_mut();
        let now = Instant::now();
        lobby.last_active_at = now;

        let before = lobby.host_player_id.clone();
        Self::assign_host_if_vacant(lobby, None, now);
        lobby.host_player_id != before
    }

    /// Apply a settings patch. Host authorization happens at the call
    /// boundary; here unknown lobbies are simply `None`.
    pub fn update_settings(
        &self,
        lobby_id: &str,
        patch: &SettingsPatch,
    ) -> Option<LobbySettings> {
        let mut entry = self.lobbies.get_mut(lobby_id)?;
        let lobby = entry.value_mut();
        lobby.settings.apply_patch(patch);
        lobby.last_active_at = Instant::now();
        Some(lobby.settings.clone())
    }

    /// Clear everyone's per-round guess state. Idempotent; unknown lobby is
    /// a no-op.
    pub fn reset_round_guesses(&self, lobby_id: &str) -> bool {
        self.with_lobby_mut(lobby_id, |lobby| lobby.reset_round_guesses())
            .is_some()
    }

    /// Full game reset back to `SEATING`. Idempotent; unknown lobby is a
    /// no-op.
    pub fn reset_game_state(&self, lobby_id: &str) -> bool {
        self.with_lobby_mut(lobby_id, |lobby| lobby.reset_game_state())
            .is_some()
    }

    /// Run `f` against a lobby, read-only.
    pub fn with_lobby<T>(&self, lobby_id: &str, f: impl FnOnce(&Lobby) -> T) -> Option<T> {
        self.lobbies.get(lobby_id).map(|entry| f(entry.value()))
    }

    /// Run `f` against a lobby with mutable access. The closure must not
    /// await or call back into the registry; broadcasts happen after it
    /// returns.
    pub fn with_lobby_mut<T>(&self, lobby_id: &str, f: impl FnOnce(&mut Lobby) -> T) -> Option<T> {
        self.lobbies
            .get_mut(lobby_id)
            .map(|mut entry| f(entry.value_mut()))
    }

    /// Ids of every live lobby.
    pub fn lobby_ids(&self) -> Vec<String> {
        self.lobbies.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of live lobbies.
    pub fn len(&self) -> usize {
        self.lobbies.len()
    }

    /// Whether no lobbies exist.
    pub fn is_empty(&self) -> bool {
        self.lobbies.is_empty()
    }

    /// Destroy lobbies whose roster has been empty longer than the grace
    /// period, returning the destroyed ids so callers can tear down their
    /// broadcast rooms.
    pub fn reap_idle(&self) -> Vec<String> {
        let now = Instant::now();
        let doomed: Vec<String> = self
            .lobbies
            .iter()
            .filter(|entry| {
                let lobby = entry.value();
                lobby.roster.is_empty()
                    && lobby
                        .pending_destroy_at
                        .is_some_and(|since| now.duration_since(since) >= self.destroy_grace)
            })
            .map(|entry| entry.key().clone())
            .collect();

        for id in &doomed {
            if let Some((_, mut lobby)) = self.lobbies.remove(id) {
                lobby.cancel_deadline_timer();
                info!(lobby = %id, "destroying idle lobby");
            }
        }
        doomed
    }

    /// Fill a vacant host seat. A live (unexpired) release window reserves
    /// the seat for the departed host; an expired one is cleared and the
    /// first seated player is promoted.
    fn assign_host_if_vacant(lobby: &mut Lobby, joining: Option<&str>, now: Instant) {
        if lobby.host_player_id.is_some() || lobby.roster.is_empty() {
            return;
        }

        if let Some(release) = &lobby.host_release {
            if now < release.expires_at {
                if joining == Some(release.player_id.as_str()) {
                    lobby.host_player_id = Some(release.player_id.clone());
                    lobby.host_release = None;
                }
                // Anyone else waits out the window.
                return;
            }
            lobby.host_release = None;
        }

        lobby.host_player_id = lobby.roster.keys().next().cloned();
    }
}
