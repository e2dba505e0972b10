//! Round orchestration: dealing questions, judging submissions, settling
//! rounds, and the deadline timers that force a settle.
//!
//! All lobby mutation happens inside `with_lobby_mut` closures with no await
//! points; broadcasts go out after the entry lock is released.

use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{debug, info};

use crate::{
    dto::{
        lobby::{RosterEntry, SettingsPatch},
        question::{ClientQuestion, RevealQuestion},
        ws::{AnswerSubmission, ServerMessage},
    },
    error::ServiceError,
    lobby::{
        ActiveRound, GuessStatus, LobbyEvent, LobbyPhase, LobbyPlayer, RoundResult, RoundSummary,
        WinSummary,
    },
    questions::{QuestionKind, SubmittedAnswer, evaluate},
    services::lobby_events,
    state::SharedState,
};

/// Points for a correct answer before the speed bonus.
const BASE_POINTS: u32 = 10;
/// Extra points for an instant answer, shrinking linearly to zero at the
/// deadline.
const MAX_SPEED_BONUS: u32 = 5;

/// Why a round is being settled.
#[derive(Debug, Clone, Copy)]
pub enum FinishCause {
    /// Every seated player reached a settled status.
    AllSettled,
    /// The deadline timer fired. Carries the timer generation it was armed
    /// with; a mismatch means the round already ended and the firing is a
    /// silent no-op.
    Deadline {
        /// Generation captured when the timer was scheduled.
        generation: u64,
    },
}

/// Host-only: deal the next question and open a round.
pub fn start_round(state: &SharedState, lobby_id: &str, requester: &str) -> Result<(), ServiceError> {
    ensure_host(state, lobby_id, requester)?;

    let (question, round, round_duration_ms, generation) = state
        .lobbies()
        .with_lobby_mut(lobby_id, |lobby| -> Result<_, ServiceError> {
            if !matches!(lobby.phase, LobbyPhase::Seating | LobbyPhase::Summary(_)) {
                return Err(ServiceError::InvalidState(format!(
                    "cannot start a round from `{}`",
                    lobby.phase.name()
                )));
            }
            if !lobby.winners().is_empty() {
                return Err(ServiceError::InvalidState(
                    "a player has already won; reset the game first".into(),
                ));
            }

            let question = state
                .questions()
                .pick_unused(
                    &lobby.used_question_ids,
                    lobby.settings.question_filter.as_deref(),
                )
                .ok_or_else(|| {
                    ServiceError::NotFound("no unused question matches the current filter".into())
                })?;

            lobby.reset_round_guesses();
            lobby.round_counter += 1;

            let round_duration_ms = lobby.settings.round_duration_ms;
            let now = Instant::now();
            lobby.apply_event(LobbyEvent::StartRound(ActiveRound {
                question_id: question.id.clone(),
                round: lobby.round_counter,
                started_at: now,
                deadline: now + Duration::from_millis(round_duration_ms),
            }))?;
            lobby.used_question_ids.insert(question.id.clone());

            Ok((
                ClientQuestion::from(question),
                lobby.round_counter,
                round_duration_ms,
                lobby.timer_generation,
            ))
        })
        .ok_or_else(|| ServiceError::NotFound(format!("lobby `{lobby_id}` not found")))??;

    info!(lobby = lobby_id, round, "round started");
    lobby_events::broadcast_roster(state, lobby_id);
    lobby_events::broadcast_round_started(state, lobby_id, round, question, round_duration_ms);
    schedule_deadline(state, lobby_id, generation, Duration::from_millis(round_duration_ms));

    Ok(())
}

/// Judge a submission for the live round, returning the private result
/// message for the submitter. Broadcasts the status change and settles the
/// round early once everyone is done.
pub fn submit_answer(
    state: &SharedState,
    lobby_id: &str,
    player_id: &str,
    submission: &AnswerSubmission,
) -> Result<ServerMessage, ServiceError> {
    struct SubmitOutcome {
        status: GuessStatus,
        matched_answer: Option<String>,
        found_entries: Vec<String>,
        guesses_used: u32,
        all_settled: bool,
    }

    let outcome = state
        .lobbies()
        .with_lobby_mut(lobby_id, |lobby| -> Result<SubmitOutcome, ServiceError> {
            let LobbyPhase::Round(active) = &lobby.phase else {
                return Err(ServiceError::InvalidState(
                    "answers are only accepted while a round is live".into(),
                ));
            };
            let question_id = active.question_id.clone();
            let started_at = active.started_at;
            let round_duration_ms = lobby.settings.round_duration_ms;

            let question = state.questions().get(&question_id).ok_or_else(|| {
                ServiceError::NotFound(format!("question `{question_id}` not found"))
            })?;
            let multi_entry_shape = match &question.kind {
                QuestionKind::MultiEntry {
                    answers,
                    max_guesses,
                    ..
                } => Some((answers.len(), *max_guesses)),
                _ => None,
            };

            let Some(player) = lobby.roster.get_mut(player_id) else {
                return Err(ServiceError::NotFound(format!(
                    "player `{player_id}` is not seated in `{lobby_id}`"
                )));
            };
            if player.guess_status.is_settled() {
                return Err(ServiceError::InvalidState(
                    "already settled this round".into(),
                ));
            }

            let submitted = to_submitted(submission);
            let evaluation = evaluate::evaluate(question, &submitted, &player.found_entries);

            player.guesses_used += 1;
            player.last_guess = Some(describe_submission(submission));

            match (multi_entry_shape, evaluation.is_correct) {
                (Some((total_answers, _)), true) => {
                    if let Some(found) = &evaluation.matched_answer {
                        player.found_entries.push(found.clone());
                    }
                    if player.found_entries.len() == total_answers {
                        settle_correct(player, started_at, round_duration_ms);
                    } else {
                        player.guess_status = GuessStatus::Submitted;
                    }
                }
                (Some((_, max_guesses)), false) => {
                    player.guess_status = if player.guesses_used >= max_guesses {
                        GuessStatus::Incorrect
                    } else {
                        GuessStatus::Submitted
                    };
                }
                (None, true) => settle_correct(player, started_at, round_duration_ms),
                (None, false) => player.guess_status = GuessStatus::Incorrect,
            }

            let status = player.guess_status;
            let found_entries = player.found_entries.clone();
            let guesses_used = player.guesses_used;

            Ok(SubmitOutcome {
                status,
                matched_answer: evaluation.matched_answer,
                found_entries,
                guesses_used,
                all_settled: lobby.all_settled(),
            })
        })
        .ok_or_else(|| ServiceError::NotFound(format!("lobby `{lobby_id}` not found")))??;

    lobby_events::broadcast_guess_status(state, lobby_id, player_id, outcome.status);
    if outcome.all_settled {
        finish_round(state, lobby_id, FinishCause::AllSettled);
    }

    Ok(ServerMessage::GuessResult {
        status: outcome.status,
        matched_answer: outcome.matched_answer,
        found_entries: outcome.found_entries,
        guesses_used: outcome.guesses_used,
    })
}

/// Settle the live round: mark stragglers incorrect, rank the results,
/// broadcast the reveal, and advance to `SUMMARY` (and `WIN` when a score
/// reached the target). Safe to call when no round is live.
pub fn finish_round(state: &SharedState, lobby_id: &str, cause: FinishCause) {
    let Some((summary, winners, scoreboard)) = state
        .lobbies()
        .with_lobby_mut(lobby_id, |lobby| {
            let LobbyPhase::Round(active) = &lobby.phase else {
                return None;
            };
            if let FinishCause::Deadline { generation } = cause {
                if generation != lobby.timer_generation {
                    debug!(lobby = lobby_id, "stale round deadline; ignoring");
                    return None;
                }
            }

            let question_id = active.question_id.clone();
            let round = active.round;

            for player in lobby.roster.values_mut() {
                if !player.guess_status.is_settled() {
                    player.guess_status = GuessStatus::Incorrect;
                }
            }

            let mut results: Vec<RoundResult> = lobby
                .roster
                .values()
                .map(|player| RoundResult {
                    player_id: player.player_id.clone(),
                    name: player.name.clone(),
                    status: player.guess_status,
                    last_guess: player.last_guess.clone(),
                    correct_elapsed_ms: player.correct_elapsed_ms,
                    points_awarded: player.round_points,
                    score: player.score,
                })
                .collect();
            results.sort_by_key(|result| {
                (
                    result.status != GuessStatus::Correct,
                    result.correct_elapsed_ms.unwrap_or(u64::MAX),
                )
            });

            let summary = RoundSummary {
                question_id,
                round,
                results,
            };
            lobby.last_round_summary = Some(summary.clone());
            lobby
                .apply_event(LobbyEvent::FinishRound(summary.clone()))
                .ok()?;

            let winners = lobby.winners();
            if !winners.is_empty() {
                let _ = lobby.apply_event(LobbyEvent::DeclareWin(WinSummary {
                    winner_ids: winners.clone(),
                }));
            }

            let scoreboard: Vec<RosterEntry> =
                lobby.roster.values().map(RosterEntry::from).collect();
            Some((summary, winners, scoreboard))
        })
        .flatten()
    else {
        return;
    };

    info!(lobby = lobby_id, round = summary.round, "round settled");
    if let Some(reveal) = state
        .questions()
        .get(&summary.question_id)
        .map(RevealQuestion::from)
    {
        lobby_events::broadcast_round_summary(state, lobby_id, &summary, reveal);
    }

    if !winners.is_empty() {
        info!(lobby = lobby_id, winners = ?winners, "game won");
        lobby_events::broadcast_game_won(state, lobby_id, winners, scoreboard);
    }
}

/// Host-only: patch the lobby settings and broadcast the result.
pub fn update_settings(
    state: &SharedState,
    lobby_id: &str,
    requester: &str,
    patch: &SettingsPatch,
) -> Result<(), ServiceError> {
    ensure_host(state, lobby_id, requester)?;
    let settings = state
        .lobbies()
        .update_settings(lobby_id, patch)
        .ok_or_else(|| ServiceError::NotFound(format!("lobby `{lobby_id}` not found")))?;
    lobby_events::broadcast_settings(state, lobby_id, settings);
    Ok(())
}

/// Host-only: reset the game back to seating and broadcast the clean slate.
pub fn reset_game(state: &SharedState, lobby_id: &str, requester: &str) -> Result<(), ServiceError> {
    ensure_host(state, lobby_id, requester)?;
    state.lobbies().reset_game_state(lobby_id);
    info!(lobby = lobby_id, "game reset");
    lobby_events::broadcast_game_reset(state, lobby_id);
    lobby_events::broadcast_roster(state, lobby_id);
    Ok(())
}

/// React to a player's last connection going away: unseat them (banking the
/// score), update the roster, and settle the round if they were the last
/// holdout.
pub fn handle_full_disconnect(state: &SharedState, lobby_id: &str, player_id: &str) {
    let Some(removed) = state.lobbies().remove_player(lobby_id, player_id) else {
        return;
    };
    info!(
        lobby = lobby_id,
        player = player_id,
        was_host = removed.was_host,
        "player left"
    );

    if removed.lobby_now_empty {
        // The idle reaper owns destruction from here.
        return;
    }

    lobby_events::broadcast_roster(state, lobby_id);

    let ready_to_settle = state
        .lobbies()
        .with_lobby(lobby_id, |lobby| {
            matches!(lobby.phase, LobbyPhase::Round(_)) && lobby.all_settled()
        })
        .unwrap_or(false);
    if ready_to_settle {
        finish_round(state, lobby_id, FinishCause::AllSettled);
    }
}

/// Verify `player_id` currently holds host in `lobby_id`.
fn ensure_host(state: &SharedState, lobby_id: &str, player_id: &str) -> Result<(), ServiceError> {
    let host = state
        .lobbies()
        .with_lobby(lobby_id, |lobby| lobby.host_player_id.clone())
        .ok_or_else(|| ServiceError::NotFound(format!("lobby `{lobby_id}` not found")))?;

    if host.as_deref() == Some(player_id) {
        Ok(())
    } else {
        Err(ServiceError::Unauthorized(
            "only the host can do that".into(),
        ))
    }
}

/// Arm the deadline timer for the round opened under `generation`.
fn schedule_deadline(state: &SharedState, lobby_id: &str, generation: u64, duration: Duration) {
    let task_state = state.clone();
    let task_lobby = lobby_id.to_string();
    let handle = tokio::spawn(async move {
        sleep(duration).await;
        finish_round(&task_state, &task_lobby, FinishCause::Deadline { generation });
    });

    state.lobbies().with_lobby_mut(lobby_id, |lobby| {
        lobby.cancel_deadline_timer();
        lobby.deadline_timer = Some(handle.abort_handle());
    });
}

/// Mark a player correct, computing elapsed time and awarding points.
fn settle_correct(player: &mut LobbyPlayer, started_at: Instant, round_duration_ms: u64) {
    let elapsed_ms = started_at
        .elapsed()
        .as_millis()
        .min(u128::from(round_duration_ms)) as u64;
    let points = BASE_POINTS + speed_bonus(elapsed_ms, round_duration_ms);

    player.guess_status = GuessStatus::Correct;
    player.correct_elapsed_ms = Some(elapsed_ms);
    player.round_points = points;
    player.score += points;
}

/// Bonus points scaling linearly with the time remaining when the correct
/// answer landed.
fn speed_bonus(elapsed_ms: u64, round_duration_ms: u64) -> u32 {
    if round_duration_ms == 0 {
        return 0;
    }
    let remaining = round_duration_ms.saturating_sub(elapsed_ms);
    ((u64::from(MAX_SPEED_BONUS) * remaining) / round_duration_ms) as u32
}

/// Lift a wire submission into the evaluator's input type.
fn to_submitted(submission: &AnswerSubmission) -> SubmittedAnswer<'_> {
    match submission {
        AnswerSubmission::Text { text } => SubmittedAnswer::Text(text),
        AnswerSubmission::Choice { choice_id } => SubmittedAnswer::Choice(choice_id),
        AnswerSubmission::Boolean { value } => SubmittedAnswer::Boolean(*value),
        AnswerSubmission::Order { order } => SubmittedAnswer::Order(order),
    }
}

/// Human-readable rendering of a submission for the summary view.
fn describe_submission(submission: &AnswerSubmission) -> String {
    match submission {
        AnswerSubmission::Text { text } => text.clone(),
        AnswerSubmission::Choice { choice_id } => choice_id.clone(),
        AnswerSubmission::Boolean { value } => value.to_string(),
        AnswerSubmission::Order { order } => order.join(", "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::questions::QuestionBank;
    use crate::state::AppState;

    fn test_state() -> SharedState {
        let questions = vec![
            serde_json::json!({
                "id": "q-tf", "title": "1973?",
                "type": "true_false", "answer": true
            }),
            serde_json::json!({
                "id": "q-me", "title": "Name the trio",
                "type": "multi_entry",
                "answers": [
                    {"canonical": "Emerson"},
                    {"canonical": "Lake"},
                    {"canonical": "Palmer"}
                ],
                "max_guesses": 5
            }),
        ];
        let parsed = questions
            .into_iter()
            .map(|value| serde_json::from_value(value).unwrap())
            .collect();
        AppState::new(AppConfig::default(), QuestionBank::from_questions(parsed))
    }

    fn seat_two(state: &SharedState, lobby: &str) {
        state.lobbies().join(lobby, "tok-a", "Ada");
        state.lobbies().join(lobby, "tok-b", "Bob");
    }

    fn force_round(state: &SharedState, lobby: &str, question_id: &str) {
        state
            .lobbies()
            .with_lobby_mut(lobby, |lobby| {
                lobby.reset_round_guesses();
                lobby.round_counter += 1;
                let now = Instant::now();
                lobby
                    .apply_event(LobbyEvent::StartRound(ActiveRound {
                        question_id: question_id.to_string(),
                        round: lobby.round_counter,
                        started_at: now,
                        deadline: now + Duration::from_secs(30),
                    }))
                    .unwrap();
                lobby.used_question_ids.insert(question_id.to_string());
            })
            .unwrap();
    }

    #[tokio::test]
    async fn start_round_is_host_only() {
        let state = test_state();
        seat_two(&state, "l1");

        let err = start_round(&state, "l1", "tok-b").unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
        assert!(start_round(&state, "l1", "tok-a").is_ok());

        // A second start while the round is live is a state conflict.
        let err = start_round(&state, "l1", "tok-a").unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn correct_answers_settle_and_close_the_round() {
        let state = test_state();
        seat_two(&state, "l1");
        force_round(&state, "l1", "q-tf");

        let result = submit_answer(
            &state,
            "l1",
            "tok-a",
            &AnswerSubmission::Boolean { value: true },
        )
        .unwrap();
        assert!(matches!(
            result,
            ServerMessage::GuessResult {
                status: GuessStatus::Correct,
                ..
            }
        ));

        // Second submission from the same player is rejected.
        let err = submit_answer(
            &state,
            "l1",
            "tok-a",
            &AnswerSubmission::Boolean { value: true },
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        // Bob settles wrong; everyone settled closes the round.
        submit_answer(
            &state,
            "l1",
            "tok-b",
            &AnswerSubmission::Boolean { value: false },
        )
        .unwrap();

        state
            .lobbies()
            .with_lobby("l1", |lobby| {
                assert!(matches!(lobby.phase, LobbyPhase::Summary(_)));
                let summary = lobby.last_round_summary.as_ref().unwrap();
                assert_eq!(summary.results[0].player_id, "tok-a");
                assert_eq!(summary.results[0].status, GuessStatus::Correct);
                assert!(summary.results[0].points_awarded >= BASE_POINTS);
                assert_eq!(summary.results[1].status, GuessStatus::Incorrect);
            })
            .unwrap();
    }

    #[tokio::test]
    async fn multi_entry_completes_within_the_guess_budget() {
        let state = test_state();
        state.lobbies().join("l1", "tok-a", "Ada");
        force_round(&state, "l1", "q-me");

        for (guess, expected) in [
            ("lake", GuessStatus::Submitted),
            ("EMERSON", GuessStatus::Submitted),
            ("palmer", GuessStatus::Correct),
        ] {
            let result = submit_answer(
                &state,
                "l1",
                "tok-a",
                &AnswerSubmission::Text { text: guess.into() },
            )
            .unwrap();
            let ServerMessage::GuessResult { status, .. } = result else {
                panic!("expected a guess result");
            };
            assert_eq!(status, expected, "guess `{guess}`");
        }
    }

    #[tokio::test]
    async fn multi_entry_fails_once_the_guess_budget_is_spent() {
        let state = test_state();
        state.lobbies().join("l1", "tok-a", "Ada");
        force_round(&state, "l1", "q-me");

        for wrong in ["ringo", "bowie", "mercury", "plant"] {
            let result = submit_answer(
                &state,
                "l1",
                "tok-a",
                &AnswerSubmission::Text { text: wrong.into() },
            )
            .unwrap();
            let ServerMessage::GuessResult { status, .. } = result else {
                panic!("expected a guess result");
            };
            assert_eq!(status, GuessStatus::Submitted);
        }

        let result = submit_answer(
            &state,
            "l1",
            "tok-a",
            &AnswerSubmission::Text {
                text: "jagger".into(),
            },
        )
        .unwrap();
        let ServerMessage::GuessResult {
            status,
            guesses_used,
            ..
        } = result
        else {
            panic!("expected a guess result");
        };
        assert_eq!(status, GuessStatus::Incorrect);
        assert_eq!(guesses_used, 5);
    }

    #[tokio::test]
    async fn stale_deadline_is_a_silent_no_op() {
        let state = test_state();
        seat_two(&state, "l1");
        force_round(&state, "l1", "q-tf");

        let stale_generation = state
            .lobbies()
            .with_lobby("l1", |lobby| lobby.timer_generation)
            .unwrap()
            .wrapping_sub(1);
        finish_round(
            &state,
            "l1",
            FinishCause::Deadline {
                generation: stale_generation,
            },
        );

        state
            .lobbies()
            .with_lobby("l1", |lobby| {
                assert!(matches!(lobby.phase, LobbyPhase::Round(_)));
            })
            .unwrap();
    }

    #[tokio::test]
    async fn submissions_outside_a_round_are_state_conflicts() {
        let state = test_state();
        seat_two(&state, "l1");

        let err = submit_answer(
            &state,
            "l1",
            "tok-a",
            &AnswerSubmission::Boolean { value: true },
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn win_is_declared_when_the_target_is_reached() {
        let state = test_state();
        seat_two(&state, "l1");
        state
            .lobbies()
            .with_lobby_mut("l1", |lobby| {
                lobby.settings.points_to_win = 10;
            })
            .unwrap();
        force_round(&state, "l1", "q-tf");

        submit_answer(
            &state,
            "l1",
            "tok-a",
            &AnswerSubmission::Boolean { value: true },
        )
        .unwrap();
        submit_answer(
            &state,
            "l1",
            "tok-b",
            &AnswerSubmission::Boolean { value: false },
        )
        .unwrap();

        state
            .lobbies()
            .with_lobby("l1", |lobby| {
                assert!(matches!(lobby.phase, LobbyPhase::Win(_)));
            })
            .unwrap();

        // Terminal until an explicit reset.
        let err = start_round(&state, "l1", "tok-a").unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        reset_game(&state, "l1", "tok-a").unwrap();
        state
            .lobbies()
            .with_lobby("l1", |lobby| {
                assert!(matches!(lobby.phase, LobbyPhase::Seating));
                assert!(lobby.roster.values().all(|p| p.score == 0));
                assert!(lobby.used_question_ids.is_empty());
            })
            .unwrap();
    }

    #[test]
    fn speed_bonus_scales_with_remaining_time() {
        assert_eq!(speed_bonus(0, 30_000), MAX_SPEED_BONUS);
        assert_eq!(speed_bonus(30_000, 30_000), 0);
        assert_eq!(speed_bonus(15_000, 30_000), MAX_SPEED_BONUS / 2);
        assert_eq!(speed_bonus(0, 0), 0);
    }
}
