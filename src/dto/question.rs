//! Client-safe and reveal projections of a question.
//!
//! The domain [`Question`] never crosses the wire. While a round is live
//! clients only ever see [`ClientQuestion`]; once the round settles the
//! summary carries a [`RevealQuestion`]. Both conversions match exhaustively
//! over [`QuestionKind`], so adding a variant forces a decision about what
//! each side of the curtain gets to see.

use serde::Serialize;
use utoipa::ToSchema;

use crate::questions::{Choice, Question, QuestionContent, QuestionKind};

/// Projection sent to players while the round is live. Carries no secret
/// fields whatsoever.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClientQuestion {
    /// Question identifier.
    pub id: String,
    /// Prompt shown to players.
    pub title: String,
    /// Optional body content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<QuestionContent>,
    /// Type-specific public fields.
    #[serde(flatten)]
    pub kind: ClientQuestionKind,
}

/// Public per-type payload.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientQuestionKind {
    /// Free-text entry; nothing about the answer is disclosed.
    FreeText,
    /// The choice list without the correct id.
    MultipleChoice {
        /// Choices to pick from.
        choices: Vec<Choice>,
    },
    /// True/false pick; the statement is the title.
    TrueFalse,
    /// How many entries exist and how many guesses are allowed, but never
    /// the entries themselves.
    MultiEntry {
        /// Size of the answer set.
        total_answers: usize,
        /// Total guesses a player may spend.
        max_guesses: u32,
    },
    /// Display bounds without the correct value.
    Numeric {
        /// Lower display bound.
        min: f64,
        /// Upper display bound.
        max: f64,
    },
    /// The items to arrange, in authored order, without the correct sequence.
    OrderedList {
        /// Items to arrange.
        items: Vec<Choice>,
    },
}

impl From<&Question> for ClientQuestion {
    fn from(question: &Question) -> Self {
        let kind = match &question.kind {
            QuestionKind::FreeText { .. } => ClientQuestionKind::FreeText,
            QuestionKind::MultipleChoice { choices, .. } => ClientQuestionKind::MultipleChoice {
                choices: choices.clone(),
            },
            QuestionKind::TrueFalse { .. } => ClientQuestionKind::TrueFalse,
            QuestionKind::MultiEntry {
                answers,
                max_guesses,
                ..
            } => ClientQuestionKind::MultiEntry {
                total_answers: answers.len(),
                max_guesses: *max_guesses,
            },
            QuestionKind::Numeric { min, max, .. } => ClientQuestionKind::Numeric {
                min: *min,
                max: *max,
            },
            QuestionKind::OrderedList { items, .. } => ClientQuestionKind::OrderedList {
                items: items.clone(),
            },
        };

        Self {
            id: question.id.clone(),
            title: question.title.clone(),
            content: question.content.clone(),
            kind,
        }
    }
}

/// Projection sent with the round summary, including everything needed to
/// display the correct result.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RevealQuestion {
    /// Question identifier.
    pub id: String,
    /// Prompt that was asked.
    pub title: String,
    /// Optional body content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<QuestionContent>,
    /// Type-specific answer payload.
    #[serde(flatten)]
    pub kind: RevealQuestionKind,
}

/// Per-type answer payload for the reveal.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RevealQuestionKind {
    /// Canonical accepted answers.
    FreeText {
        /// Canonical spellings that counted as correct.
        accepted_answers: Vec<String>,
    },
    /// Choice list plus the correct id.
    MultipleChoice {
        /// Choices that were shown.
        choices: Vec<Choice>,
        /// Id of the correct choice.
        correct_choice_id: String,
    },
    /// The correct boolean.
    TrueFalse {
        /// The correct answer.
        answer: bool,
    },
    /// The full answer set.
    MultiEntry {
        /// Every required answer, canonical spelling.
        answers: Vec<String>,
        /// Guess budget that applied.
        max_guesses: u32,
    },
    /// The correct value and accepted deviation.
    Numeric {
        /// The correct value.
        answer: f64,
        /// Accepted deviation around the value.
        tolerance: f64,
    },
    /// Items plus the correct sequence.
    OrderedList {
        /// Items that were shown.
        items: Vec<Choice>,
        /// Item ids in the correct order.
        correct_order: Vec<String>,
    },
}

impl From<&Question> for RevealQuestion {
    fn from(question: &Question) -> Self {
        let kind = match &question.kind {
            QuestionKind::FreeText { answers, .. } => RevealQuestionKind::FreeText {
                accepted_answers: answers.iter().map(|a| a.canonical.clone()).collect(),
            },
            QuestionKind::MultipleChoice {
                choices,
                correct_choice_id,
            } => RevealQuestionKind::MultipleChoice {
                choices: choices.clone(),
                correct_choice_id: correct_choice_id.clone(),
            },
            QuestionKind::TrueFalse { answer } => RevealQuestionKind::TrueFalse { answer: *answer },
            QuestionKind::MultiEntry {
                answers,
                max_guesses,
                ..
            } => RevealQuestionKind::MultiEntry {
                answers: answers.iter().map(|a| a.canonical.clone()).collect(),
                max_guesses: *max_guesses,
            },
            QuestionKind::Numeric {
                answer, tolerance, ..
            } => RevealQuestionKind::Numeric {
                answer: *answer,
                tolerance: *tolerance,
            },
            QuestionKind::OrderedList {
                items,
                correct_order,
            } => RevealQuestionKind::OrderedList {
                items: items.clone(),
                correct_order: correct_order.clone(),
            },
        };

        Self {
            id: question.id.clone(),
            title: question.title.clone(),
            content: question.content.clone(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn multiple_choice() -> Question {
        serde_json::from_value(serde_json::json!({
            "id": "q-mc",
            "title": "Which year?",
            "type": "multiple_choice",
            "choices": [
                {"id": "a", "text": "1971"},
                {"id": "b", "text": "1973"}
            ],
            "correct_choice_id": "b"
        }))
        .expect("valid question")
    }

    #[test]
    fn client_projection_never_contains_the_correct_choice_id() {
        let question = multiple_choice();
        let json = serde_json::to_value(ClientQuestion::from(&question)).unwrap();

        assert!(json.get("correct_choice_id").is_none());
        assert_eq!(json["type"], "multiple_choice");
        assert_eq!(json["choices"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn reveal_projection_always_contains_the_correct_choice_id() {
        let question = multiple_choice();
        let json = serde_json::to_value(RevealQuestion::from(&question)).unwrap();

        assert_eq!(json["correct_choice_id"], "b");
    }

    #[test]
    fn client_projection_of_multi_entry_hides_the_answer_set() {
        let question: Question = serde_json::from_value(serde_json::json!({
            "id": "q-me",
            "title": "Name the founding members",
            "type": "multi_entry",
            "answers": [
                {"canonical": "John"},
                {"canonical": "Paul"},
                {"canonical": "George"}
            ],
            "max_guesses": 5
        }))
        .unwrap();

        let json = serde_json::to_value(ClientQuestion::from(&question)).unwrap();
        assert_eq!(json["total_answers"], 3);
        assert_eq!(json["max_guesses"], 5);
        assert!(json.get("answers").is_none());

        let reveal = serde_json::to_value(RevealQuestion::from(&question)).unwrap();
        assert_eq!(reveal["answers"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn client_projection_of_numeric_hides_the_answer() {
        let question: Question = serde_json::from_value(serde_json::json!({
            "id": "q-num",
            "title": "What year was it released?",
            "type": "numeric",
            "min": 1960.0,
            "max": 2000.0,
            "answer": 1973.0,
            "tolerance": 1.0
        }))
        .unwrap();

        let json = serde_json::to_value(ClientQuestion::from(&question)).unwrap();
        assert!(json.get("answer").is_none());
        assert_eq!(json["min"], 1960.0);

        let reveal = serde_json::to_value(RevealQuestion::from(&question)).unwrap();
        assert_eq!(reveal["answer"], 1973.0);
    }
}
