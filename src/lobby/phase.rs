//! Round-lifecycle state machine for a single lobby.
//!
//! `SEATING → ROUND → SUMMARY → (ROUND | WIN)`, with `WIN` terminal until an
//! explicit game reset. Transitions are computed by one exhaustive match so
//! an unhandled `(phase, event)` pair is a compile-visible gap, not a silent
//! acceptance.

use std::time::Instant;

use thiserror::Error;

use crate::lobby::model::RoundSummary;

/// Phase a lobby is currently in.
#[derive(Debug, Clone, PartialEq)]
pub enum LobbyPhase {
    /// Waiting for players; also the post-reset state.
    Seating,
    /// A question is live and accepting answers.
    Round(ActiveRound),
    /// The round is settled; the reveal and ranking are on display.
    Summary(RoundSummary),
    /// A player reached the points target; only a game reset leaves this.
    Win(WinSummary),
}

impl LobbyPhase {
    /// Short lowercase name used in logs and wire snapshots.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Seating => "seating",
            Self::Round(_) => "round",
            Self::Summary(_) => "summary",
            Self::Win(_) => "win",
        }
    }

    /// The live round payload, when a question is active.
    pub fn active_round(&self) -> Option<&ActiveRound> {
        match self {
            Self::Round(round) => Some(round),
            _ => None,
        }
    }
}

/// Payload carried while a question is live.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveRound {
    /// Question being asked.
    pub question_id: String,
    /// 1-based round number within the current game.
    pub round: u32,
    /// When the round started; elapsed time feeds the speed bonus.
    pub started_at: Instant,
    /// When the round times out and settles on its own.
    pub deadline: Instant,
}

/// Payload carried once a game has been won.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinSummary {
    /// Players whose score reached the target this round (usually one).
    pub winner_ids: Vec<String>,
}

/// Events that drive the lobby phase machine.
#[derive(Debug, Clone, PartialEq)]
pub enum LobbyEvent {
    /// Deal a question: from seating (first round) or from a summary.
    StartRound(ActiveRound),
    /// Everyone settled or the timer elapsed; show reveal and ranking.
    FinishRound(RoundSummary),
    /// A score reached the target while the summary was up.
    DeclareWin(WinSummary),
    /// Explicit game reset back to seating.
    ResetGame,
}

/// Error returned when an event cannot be applied in the current phase.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from}")]
pub struct InvalidTransition {
    /// Name of the phase the lobby was in.
    pub from: &'static str,
    /// The rejected event.
    pub event: LobbyEvent,
}

/// Compute the phase that follows `event`, or reject it.
pub fn advance(phase: &LobbyPhase, event: LobbyEvent) -> Result<LobbyPhase, InvalidTransition> {
    let next = match (phase, event) {
        (LobbyPhase::Seating, LobbyEvent::StartRound(round)) => LobbyPhase::Round(round),
        (LobbyPhase::Summary(_), LobbyEvent::StartRound(round)) => LobbyPhase::Round(round),
        (LobbyPhase::Round(_), LobbyEvent::FinishRound(summary)) => LobbyPhase::Summary(summary),
        (LobbyPhase::Summary(_), LobbyEvent::DeclareWin(win)) => LobbyPhase::Win(win),
        (_, LobbyEvent::ResetGame) => LobbyPhase::Seating,
        (from, event) => {
            return Err(InvalidTransition {
                from: from.name(),
                event,
            });
        }
    };

    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn round(n: u32) -> ActiveRound {
        let now = Instant::now();
        ActiveRound {
            question_id: format!("q-{n}"),
            round: n,
            started_at: now,
            deadline: now + Duration::from_secs(30),
        }
    }

    fn summary(n: u32) -> RoundSummary {
        RoundSummary {
            question_id: format!("q-{n}"),
            round: n,
            results: vec![],
        }
    }

    #[test]
    fn full_happy_path_through_a_game() {
        let mut phase = LobbyPhase::Seating;

        phase = advance(&phase, LobbyEvent::StartRound(round(1))).unwrap();
        assert!(matches!(phase, LobbyPhase::Round(_)));

        phase = advance(&phase, LobbyEvent::FinishRound(summary(1))).unwrap();
        assert!(matches!(phase, LobbyPhase::Summary(_)));

        phase = advance(&phase, LobbyEvent::StartRound(round(2))).unwrap();
        phase = advance(&phase, LobbyEvent::FinishRound(summary(2))).unwrap();

        phase = advance(
            &phase,
            LobbyEvent::DeclareWin(WinSummary {
                winner_ids: vec!["tok-1".into()],
            }),
        )
        .unwrap();
        assert!(matches!(phase, LobbyPhase::Win(_)));

        phase = advance(&phase, LobbyEvent::ResetGame).unwrap();
        assert_eq!(phase, LobbyPhase::Seating);
    }

    #[test]
    fn round_cannot_start_while_one_is_live() {
        let phase = advance(&LobbyPhase::Seating, LobbyEvent::StartRound(round(1))).unwrap();
        let err = advance(&phase, LobbyEvent::StartRound(round(2))).unwrap_err();
        assert_eq!(err.from, "round");
        assert!(matches!(err.event, LobbyEvent::StartRound(_)));
    }

    #[test]
    fn win_is_terminal_until_reset() {
        let phase = LobbyPhase::Win(WinSummary {
            winner_ids: vec!["tok-1".into()],
        });

        assert!(advance(&phase, LobbyEvent::StartRound(round(1))).is_err());
        assert!(advance(&phase, LobbyEvent::FinishRound(summary(1))).is_err());
        assert_eq!(
            advance(&phase, LobbyEvent::ResetGame).unwrap(),
            LobbyPhase::Seating
        );
    }

    #[test]
    fn reset_is_valid_from_every_phase() {
        let phases = [
            LobbyPhase::Seating,
            LobbyPhase::Round(round(1)),
            LobbyPhase::Summary(summary(1)),
            LobbyPhase::Win(WinSummary { winner_ids: vec![] }),
        ];
        for phase in phases {
            assert_eq!(
                advance(&phase, LobbyEvent::ResetGame).unwrap(),
                LobbyPhase::Seating
            );
        }
    }

    #[test]
    fn finish_requires_a_live_round() {
        let err = advance(&LobbyPhase::Seating, LobbyEvent::FinishRound(summary(1))).unwrap_err();
        assert_eq!(err.from, "seating");
    }
}
