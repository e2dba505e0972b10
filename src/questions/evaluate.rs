//! Pure answer evaluation, one path per question type.
//!
//! Evaluators never mutate the question or any session state; the round
//! orchestration owns guess counters and settling decisions.

use crate::matching::{build_alias_map, normalize_for_comparison};
use crate::questions::model::{AcceptedAnswer, Question, QuestionKind};

/// Outcome of judging one submitted answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Whether the submission counts as correct.
    pub is_correct: bool,
    /// Canonical answer (or choice text) the submission matched, if any.
    pub matched_answer: Option<String>,
}

impl Evaluation {
    fn incorrect() -> Self {
        Self {
            is_correct: false,
            matched_answer: None,
        }
    }

    fn correct(matched: impl Into<Option<String>>) -> Self {
        Self {
            is_correct: true,
            matched_answer: matched.into(),
        }
    }
}

/// An inbound answer lifted out of its wire framing.
#[derive(Debug, Clone)]
pub enum SubmittedAnswer<'a> {
    /// Free-text or numeric input.
    Text(&'a str),
    /// Selected choice id.
    Choice(&'a str),
    /// True/false pick.
    Boolean(bool),
    /// Ordering of item ids.
    Order(&'a [String]),
}

/// Judge `answer` against `question`, dispatching on the question type.
///
/// `already_found` is only consulted for multi-entry questions, where each
/// guess is checked against the answers not yet found. A submission whose
/// shape does not fit the question type is simply incorrect; clients that
/// send a choice id for a free-text question get no special treatment.
pub fn evaluate(
    question: &Question,
    answer: &SubmittedAnswer<'_>,
    already_found: &[String],
) -> Evaluation {
    match (&question.kind, answer) {
        (QuestionKind::FreeText { .. }, SubmittedAnswer::Text(text)) => {
            evaluate_free_text(question, text)
        }
        (QuestionKind::MultipleChoice { .. }, SubmittedAnswer::Choice(choice_id)) => {
            evaluate_choice(question, choice_id)
        }
        (QuestionKind::TrueFalse { .. }, SubmittedAnswer::Boolean(value)) => {
            evaluate_true_false(question, *value)
        }
        (QuestionKind::MultiEntry { .. }, SubmittedAnswer::Text(text)) => {
            evaluate_multi_entry(question, text, already_found)
        }
        (QuestionKind::Numeric { .. }, SubmittedAnswer::Text(text)) => {
            evaluate_numeric(question, text)
        }
        (QuestionKind::OrderedList { .. }, SubmittedAnswer::Order(order)) => {
            evaluate_ordered(question, order)
        }
        _ => Evaluation::incorrect(),
    }
}

/// Free-text evaluation through the normalizer and the alias map.
pub fn evaluate_free_text(question: &Question, raw: &str) -> Evaluation {
    let QuestionKind::FreeText { answers, .. } = &question.kind else {
        return Evaluation::incorrect();
    };

    match lookup_canonical(question, answers, raw) {
        Some(canonical) => Evaluation::correct(Some(canonical)),
        None => Evaluation::incorrect(),
    }
}

/// Exact id comparison for multiple-choice questions. The matched answer is
/// the display text of the correct choice.
pub fn evaluate_choice(question: &Question, choice_id: &str) -> Evaluation {
    let QuestionKind::MultipleChoice {
        choices,
        correct_choice_id,
    } = &question.kind
    else {
        return Evaluation::incorrect();
    };

    if choice_id != correct_choice_id {
        return Evaluation::incorrect();
    }

    let text = choices
        .iter()
        .find(|choice| &choice.id == correct_choice_id)
        .map(|choice| choice.text.clone());
    Evaluation::correct(text)
}

/// Exact boolean comparison for true/false questions.
pub fn evaluate_true_false(question: &Question, value: bool) -> Evaluation {
    let QuestionKind::TrueFalse { answer } = &question.kind else {
        return Evaluation::incorrect();
    };

    if value == *answer {
        Evaluation::correct(None)
    } else {
        Evaluation::incorrect()
    }
}

/// Inclusive tolerance check for numeric questions; a zero tolerance demands
/// an exact value. Unparseable input is incorrect, never an error.
pub fn evaluate_numeric(question: &Question, raw: &str) -> Evaluation {
    let QuestionKind::Numeric {
        answer, tolerance, ..
    } = &question.kind
    else {
        return Evaluation::incorrect();
    };

    let Ok(value) = raw.trim().replace(',', ".").parse::<f64>() else {
        return Evaluation::incorrect();
    };

    if (value - answer).abs() <= *tolerance {
        Evaluation::correct(None)
    } else {
        Evaluation::incorrect()
    }
}

/// Exact sequence comparison for ordered-list questions.
pub fn evaluate_ordered(question: &Question, order: &[String]) -> Evaluation {
    let QuestionKind::OrderedList { correct_order, .. } = &question.kind else {
        return Evaluation::incorrect();
    };

    if order == correct_order.as_slice() {
        Evaluation::correct(None)
    } else {
        Evaluation::incorrect()
    }
}

/// Incremental multi-entry evaluation: the guess is correct when it names an
/// answer not yet in `already_found`. Re-naming a found answer reports the
/// match but does not count as correct.
pub fn evaluate_multi_entry(question: &Question, raw: &str, already_found: &[String]) -> Evaluation {
    let QuestionKind::MultiEntry { answers, .. } = &question.kind else {
        return Evaluation::incorrect();
    };

    let Some(canonical) = lookup_canonical(question, answers, raw) else {
        return Evaluation::incorrect();
    };

    if already_found.contains(&canonical) {
        Evaluation {
            is_correct: false,
            matched_answer: Some(canonical),
        }
    } else {
        Evaluation::correct(Some(canonical))
    }
}

/// Resolve a raw guess to the canonical accepted answer it names, if any.
fn lookup_canonical(
    question: &Question,
    answers: &[AcceptedAnswer],
    raw: &str,
) -> Option<String> {
    let mode = question.free_text_mode();
    let alias_map = build_alias_map(
        answers.iter().map(|answer| {
            (
                answer.canonical.as_str(),
                answer.aliases.iter().map(String::as_str),
            )
        }),
        mode,
    );
    alias_map.get(&normalize_for_comparison(raw, mode)).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::MatchMode;
    use crate::questions::model::Choice;

    fn question(kind: QuestionKind) -> Question {
        Question {
            id: "q".into(),
            title: "t".into(),
            content: None,
            category: None,
            kind,
        }
    }

    fn accepted(canonical: &str, aliases: &[&str]) -> AcceptedAnswer {
        AcceptedAnswer {
            canonical: canonical.into(),
            aliases: aliases.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn free_text_matches_aliases_through_normalizer() {
        let q = question(QuestionKind::FreeText {
            answers: vec![accepted("Mr. Brightside", &["Brightside"])],
            match_mode: Some(MatchMode::Normal),
        });

        let hit = evaluate_free_text(&q, "mr brightside");
        assert!(hit.is_correct);
        assert_eq!(hit.matched_answer.as_deref(), Some("Mr. Brightside"));

        let alias_hit = evaluate_free_text(&q, "BRIGHTSIDE!");
        assert!(alias_hit.is_correct);
        assert_eq!(alias_hit.matched_answer.as_deref(), Some("Mr. Brightside"));

        assert!(!evaluate_free_text(&q, "human").is_correct);
    }

    #[test]
    fn choice_requires_exact_id() {
        let q = question(QuestionKind::MultipleChoice {
            choices: vec![
                Choice { id: "a".into(), text: "1971".into() },
                Choice { id: "b".into(), text: "1973".into() },
            ],
            correct_choice_id: "b".into(),
        });

        let hit = evaluate_choice(&q, "b");
        assert!(hit.is_correct);
        assert_eq!(hit.matched_answer.as_deref(), Some("1973"));
        assert!(!evaluate_choice(&q, "a").is_correct);
        assert!(!evaluate_choice(&q, "B").is_correct);
    }

    #[test]
    fn true_false_compares_booleans() {
        let q = question(QuestionKind::TrueFalse { answer: false });
        assert!(evaluate_true_false(&q, false).is_correct);
        assert!(!evaluate_true_false(&q, true).is_correct);
    }

    #[test]
    fn numeric_accepts_values_inside_tolerance() {
        let q = question(QuestionKind::Numeric {
            min: 1900.0,
            max: 2000.0,
            answer: 1969.0,
            tolerance: 1.0,
        });

        assert!(evaluate_numeric(&q, "1969").is_correct);
        assert!(evaluate_numeric(&q, " 1970 ").is_correct);
        assert!(evaluate_numeric(&q, "1968,0").is_correct);
        assert!(!evaluate_numeric(&q, "1971").is_correct);
        assert!(!evaluate_numeric(&q, "about 1969").is_correct);
    }

    #[test]
    fn numeric_zero_tolerance_is_exact() {
        let q = question(QuestionKind::Numeric {
            min: 0.0,
            max: 100.0,
            answer: 42.0,
            tolerance: 0.0,
        });
        assert!(evaluate_numeric(&q, "42").is_correct);
        assert!(!evaluate_numeric(&q, "41.9").is_correct);
    }

    #[test]
    fn ordered_list_requires_exact_sequence() {
        let q = question(QuestionKind::OrderedList {
            items: vec![
                Choice { id: "x".into(), text: "Debut".into() },
                Choice { id: "y".into(), text: "Sophomore".into() },
                Choice { id: "z".into(), text: "Third".into() },
            ],
            correct_order: vec!["x".into(), "y".into(), "z".into()],
        });

        let right: Vec<String> = vec!["x".into(), "y".into(), "z".into()];
        let wrong: Vec<String> = vec!["y".into(), "x".into(), "z".into()];
        let short: Vec<String> = vec!["x".into(), "y".into()];

        assert!(evaluate_ordered(&q, &right).is_correct);
        assert!(!evaluate_ordered(&q, &wrong).is_correct);
        assert!(!evaluate_ordered(&q, &short).is_correct);
    }

    #[test]
    fn multi_entry_tracks_remaining_answers() {
        let q = question(QuestionKind::MultiEntry {
            answers: vec![
                accepted("John", &[]),
                accepted("Paul", &[]),
                accepted("George", &[]),
            ],
            max_guesses: 5,
            match_mode: None,
        });

        let first = evaluate_multi_entry(&q, "paul", &[]);
        assert!(first.is_correct);
        assert_eq!(first.matched_answer.as_deref(), Some("Paul"));

        // Naming an already-found answer reports the match without progress.
        let repeat = evaluate_multi_entry(&q, "Paul", &["Paul".into()]);
        assert!(!repeat.is_correct);
        assert_eq!(repeat.matched_answer.as_deref(), Some("Paul"));

        assert!(!evaluate_multi_entry(&q, "Ringo", &[]).is_correct);
    }

    #[test]
    fn mismatched_submission_shape_is_incorrect() {
        let q = question(QuestionKind::TrueFalse { answer: true });
        let order: Vec<String> = vec!["a".into()];
        assert!(!evaluate(&q, &SubmittedAnswer::Text("true"), &[]).is_correct);
        assert!(!evaluate(&q, &SubmittedAnswer::Order(&order), &[]).is_correct);
        assert!(evaluate(&q, &SubmittedAnswer::Boolean(true), &[]).is_correct);
    }
}
