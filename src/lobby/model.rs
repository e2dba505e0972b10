//! In-memory lobby state: roster, host, settings, scores, and the bits of
//! bookkeeping (grace windows, timer handles) that hang off a lobby record.

use std::collections::{HashMap, HashSet};
use std::time::{Instant, SystemTime};

use indexmap::IndexMap;
use serde::Serialize;
use tokio::task::AbortHandle;

use crate::dto::lobby::SettingsPatch;
use crate::lobby::phase::{InvalidTransition, LobbyEvent, LobbyPhase, advance};

/// Bounds for the per-round timer, milliseconds.
pub const MIN_ROUND_DURATION_MS: u64 = 1_000;
/// Upper bound for the per-round timer, milliseconds.
pub const MAX_ROUND_DURATION_MS: u64 = 120_000;
/// Lower bound for the points-to-win target.
pub const MIN_POINTS_TO_WIN: u32 = 5;
/// Upper bound for the points-to-win target.
pub const MAX_POINTS_TO_WIN: u32 = 500;

/// Where a player stands within the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GuessStatus {
    /// No guess yet this round.
    Idle,
    /// Made at least one guess, not yet settled (multi-entry in progress).
    Submitted,
    /// Settled wrong: a wrong final answer or an exhausted guess budget.
    Incorrect,
    /// Settled right.
    Correct,
}

impl GuessStatus {
    /// Whether the player is done for this round.
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Incorrect | Self::Correct)
    }
}

/// A player currently seated in a lobby.
#[derive(Debug, Clone)]
pub struct LobbyPlayer {
    /// Durable identity token, survives reconnects.
    pub player_id: String,
    /// Display name.
    pub name: String,
    /// Score within the current game. Reset only by a game reset.
    pub score: u32,
    /// Standing within the current round.
    pub guess_status: GuessStatus,
    /// Raw text of the most recent guess, for the summary view.
    pub last_guess: Option<String>,
    /// Time from round start to the correct answer, feeding the speed bonus.
    pub correct_elapsed_ms: Option<u64>,
    /// Points awarded this round, shown in the summary ranking.
    pub round_points: u32,
    /// Canonical multi-entry answers found so far this round.
    pub found_entries: Vec<String>,
    /// Guesses spent this round (multi-entry cap enforcement).
    pub guesses_used: u32,
}

impl LobbyPlayer {
    /// Seat a player with a starting score (restored from the bank on rejoin).
    pub fn new(player_id: String, name: String, score: u32) -> Self {
        Self {
            player_id,
            name,
            score,
            guess_status: GuessStatus::Idle,
            last_guess: None,
            correct_elapsed_ms: None,
            round_points: 0,
            found_entries: Vec::new(),
            guesses_used: 0,
        }
    }

    /// Clear per-round guess state, keeping the score.
    pub fn reset_round_state(&mut self) {
        self.guess_status = GuessStatus::Idle;
        self.last_guess = None;
        self.correct_elapsed_ms = None;
        self.round_points = 0;
        self.found_entries.clear();
        self.guesses_used = 0;
    }
}

/// Tunable per-lobby settings.
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct LobbySettings {
    /// How long a round stays open, milliseconds.
    pub round_duration_ms: u64,
    /// Score at which the game is won.
    pub points_to_win: u32,
    /// Optional category filter applied when drawing questions.
    pub question_filter: Option<String>,
}

impl Default for LobbySettings {
    fn default() -> Self {
        Self {
            round_duration_ms: 30_000,
            points_to_win: 30,
            question_filter: None,
        }
    }
}

impl LobbySettings {
    /// Apply a client patch, clamping out-of-range values and dropping
    /// anything unusable. One bad field never rejects the rest of the patch.
    pub fn apply_patch(&mut self, patch: &SettingsPatch) {
        if let Some(duration) = patch.round_duration_ms {
            let clamped = duration
                .clamp(MIN_ROUND_DURATION_MS as i64, MAX_ROUND_DURATION_MS as i64)
                as u64;
            // Round to the nearest whole second so countdown displays stay clean.
            self.round_duration_ms = (clamped + 500) / 1_000 * 1_000;
        }
        if let Some(points) = patch.points_to_win {
            self.points_to_win =
                points.clamp(MIN_POINTS_TO_WIN as i64, MAX_POINTS_TO_WIN as i64) as u32;
        }
        if let Some(filter) = &patch.question_filter {
            let trimmed = filter.trim();
            self.question_filter = if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            };
        }
    }
}

/// Departed host plus the deadline for reclaiming the seat.
#[derive(Debug, Clone)]
pub struct HostRelease {
    /// Identity that held host when it disconnected.
    pub player_id: String,
    /// When the reclaim window closes and promotion becomes allowed.
    pub expires_at: Instant,
}

/// One player's line in a round summary, ranked for display.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundResult {
    /// Identity token.
    pub player_id: String,
    /// Display name at settle time.
    pub name: String,
    /// Final standing for the round.
    pub status: GuessStatus,
    /// Raw text of the player's final guess.
    pub last_guess: Option<String>,
    /// Time to the correct answer, when there was one.
    pub correct_elapsed_ms: Option<u64>,
    /// Points earned this round.
    pub points_awarded: u32,
    /// Total score after the round.
    pub score: u32,
}

/// Settled-round record carried by the `SUMMARY` phase and kept on the lobby
/// as `last_round_summary`.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundSummary {
    /// The question that was asked.
    pub question_id: String,
    /// 1-based round number.
    pub round: u32,
    /// Per-player outcomes, correct answers first, fastest first.
    pub results: Vec<RoundResult>,
}

/// A single game room and everything scoped to it.
pub struct Lobby {
    /// Lobby identifier, also the broadcast room name.
    pub id: String,
    /// Seated players in join order, keyed by durable identity.
    pub roster: IndexMap<String, LobbyPlayer>,
    /// Current host, owner of privileged actions.
    pub host_player_id: Option<String>,
    /// Round-lifecycle phase.
    pub phase: LobbyPhase,
    /// Most recently settled round.
    pub last_round_summary: Option<RoundSummary>,
    /// Tunable settings.
    pub settings: LobbySettings,
    /// Questions already dealt in the current game.
    pub used_question_ids: HashSet<String>,
    /// Scores of players who left, keyed by identity, restored on rejoin.
    pub banked_scores: HashMap<String, u32>,
    /// Wall-clock creation time, for the REST summary.
    pub created_at: SystemTime,
    /// Last time any event touched this lobby.
    pub last_active_at: Instant,
    /// Set when the roster empties; the reaper destroys the lobby once the
    /// grace period after this instant has passed.
    pub pending_destroy_at: Option<Instant>,
    /// Grace window during which a departed host can reclaim the seat.
    pub host_release: Option<HostRelease>,
    /// Rounds dealt in the current game.
    pub round_counter: u32,
    /// Bumped on every phase transition; a deadline timer that wakes up with
    /// a stale generation is a no-op.
    pub timer_generation: u64,
    /// Handle of the scheduled round-deadline task, if one is live.
    pub deadline_timer: Option<AbortHandle>,
}

impl Lobby {
    /// Initialize an empty lobby in `SEATING`.
    pub fn new(id: String, settings: LobbySettings) -> Self {
        Self {
            id,
            roster: IndexMap::new(),
            host_player_id: None,
            phase: LobbyPhase::Seating,
            last_round_summary: None,
            settings,
            used_question_ids: HashSet::new(),
            banked_scores: HashMap::new(),
            created_at: SystemTime::now(),
            last_active_at: Instant::now(),
            pending_destroy_at: None,
            host_release: None,
            round_counter: 0,
            timer_generation: 0,
            deadline_timer: None,
        }
    }

    /// Apply a phase event. Every successful transition invalidates the
    /// scheduled deadline callback: the generation is bumped and the timer
    /// task aborted, so a stale timer can never fire against a newer round.
    pub fn apply_event(&mut self, event: LobbyEvent) -> Result<&LobbyPhase, InvalidTransition> {
        let next = advance(&self.phase, event)?;
        self.phase = next;
        self.timer_generation += 1;
        self.cancel_deadline_timer();
        Ok(&self.phase)
    }

    /// Abort the scheduled deadline task, if any. Idempotent.
    pub fn cancel_deadline_timer(&mut self) {
        if let Some(handle) = self.deadline_timer.take() {
            handle.abort();
        }
    }

    /// Clear per-round guess state for everyone. Idempotent.
    pub fn reset_round_guesses(&mut self) {
        for player in self.roster.values_mut() {
            player.reset_round_state();
        }
    }

    /// Full game reset: scores, banked scores, used questions, phase back to
    /// `SEATING`. Idempotent.
    pub fn reset_game_state(&mut self) {
        self.reset_round_guesses();
        for player in self.roster.values_mut() {
            player.score = 0;
        }
        self.banked_scores.clear();
        self.used_question_ids.clear();
        self.last_round_summary = None;
        self.round_counter = 0;
        // ResetGame is valid from every phase, so this cannot fail.
        let _ = self.apply_event(LobbyEvent::ResetGame);
    }

    /// Players whose score has reached the points target.
    pub fn winners(&self) -> Vec<String> {
        self.roster
            .values()
            .filter(|player| player.score >= self.settings.points_to_win)
            .map(|player| player.player_id.clone())
            .collect()
    }

    /// Whether everyone currently seated has settled this round.
    pub fn all_settled(&self) -> bool {
        !self.roster.is_empty()
            && self
                .roster
                .values()
                .all(|player| player.guess_status.is_settled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_duration_clamps_and_rounds_to_seconds() {
        let mut settings = LobbySettings::default();

        settings.apply_patch(&SettingsPatch {
            round_duration_ms: Some(999_999),
            ..SettingsPatch::default()
        });
        assert_eq!(settings.round_duration_ms, 120_000);

        settings.apply_patch(&SettingsPatch {
            round_duration_ms: Some(-20),
            ..SettingsPatch::default()
        });
        assert_eq!(settings.round_duration_ms, 1_000);

        settings.apply_patch(&SettingsPatch {
            round_duration_ms: Some(12_400),
            ..SettingsPatch::default()
        });
        assert_eq!(settings.round_duration_ms, 12_000);

        settings.apply_patch(&SettingsPatch {
            round_duration_ms: Some(12_500),
            ..SettingsPatch::default()
        });
        assert_eq!(settings.round_duration_ms, 13_000);
    }

    #[test]
    fn points_to_win_clamps_both_ends() {
        let mut settings = LobbySettings::default();

        settings.apply_patch(&SettingsPatch {
            points_to_win: Some(-5),
            ..SettingsPatch::default()
        });
        assert_eq!(settings.points_to_win, 5);

        settings.apply_patch(&SettingsPatch {
            points_to_win: Some(10_000),
            ..SettingsPatch::default()
        });
        assert_eq!(settings.points_to_win, 500);
    }

    #[test]
    fn blank_filter_clears_and_absent_field_is_untouched() {
        let mut settings = LobbySettings::default();

        settings.apply_patch(&SettingsPatch {
            question_filter: Some("music".into()),
            ..SettingsPatch::default()
        });
        assert_eq!(settings.question_filter.as_deref(), Some("music"));

        settings.apply_patch(&SettingsPatch {
            question_filter: Some("  ".into()),
            ..SettingsPatch::default()
        });
        assert_eq!(settings.question_filter, None);

        // Absent field leaves the value untouched.
        settings.apply_patch(&SettingsPatch {
            question_filter: Some("movies".into()),
            ..SettingsPatch::default()
        });
        settings.apply_patch(&SettingsPatch::default());
        assert_eq!(settings.question_filter.as_deref(), Some("movies"));
    }

    #[test]
    fn game_reset_clears_everything_and_returns_to_seating() {
        let mut lobby = Lobby::new("l".into(), LobbySettings::default());
        lobby
            .roster
            .insert("a".into(), LobbyPlayer::new("a".into(), "Ada".into(), 17));
        lobby.banked_scores.insert("gone".into(), 9);
        lobby.used_question_ids.insert("q-1".into());
        lobby.round_counter = 3;

        lobby.reset_game_state();

        assert_eq!(lobby.phase, LobbyPhase::Seating);
        assert_eq!(lobby.roster["a"].score, 0);
        assert!(lobby.banked_scores.is_empty());
        assert!(lobby.used_question_ids.is_empty());
        assert_eq!(lobby.round_counter, 0);
    }
}
