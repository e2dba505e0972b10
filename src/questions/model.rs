//! Domain model for the question corpus.
//!
//! Questions are read-only reference data loaded once at startup. The secret
//! fields (accepted answers, correct ids, numeric values, orderings) live
//! only here; anything that crosses the wire goes through the projection
//! DTOs, which match exhaustively over [`QuestionKind`] so a new variant
//! cannot silently leak its secrets.

use serde::{Deserialize, Serialize};

use crate::matching::{MatchMode, recommended_match_mode};

/// A single trivia question with its type-specific secret payload.
#[derive(Debug, Clone, Deserialize)]
pub struct Question {
    /// Stable corpus-wide identifier.
    pub id: String,
    /// Prompt shown to players.
    pub title: String,
    /// Optional body content accompanying the prompt.
    #[serde(default)]
    pub content: Option<QuestionContent>,
    /// Generator category the question came from (e.g. `lyric_fill_in`).
    #[serde(default)]
    pub category: Option<String>,
    /// Type-specific fields, tagged by `type` in the corpus JSON.
    #[serde(flatten)]
    pub kind: QuestionKind,
}

impl Question {
    /// Mode used to compare free-text guesses for this question: the authored
    /// override when present, otherwise the recommendation for the question's
    /// generator category.
    pub fn free_text_mode(&self) -> MatchMode {
        let authored = match &self.kind {
            QuestionKind::FreeText { match_mode, .. } => *match_mode,
            QuestionKind::MultiEntry { match_mode, .. } => *match_mode,
            _ => None,
        };
        authored.unwrap_or_else(|| {
            self.category
                .as_deref()
                .map(recommended_match_mode)
                .unwrap_or_default()
        })
    }
}

/// Non-secret body content of a question.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(untagged)]
pub enum QuestionContent {
    /// Plain text shown below the title.
    Text(String),
    /// Reference to a media asset (image or audio clip) served elsewhere.
    Media {
        /// URL of the media resource.
        url: String,
    },
}

/// One accepted answer with the alias spellings that count as the same thing.
#[derive(Debug, Clone, Deserialize)]
pub struct AcceptedAnswer {
    /// Canonical spelling, displayed at reveal time.
    pub canonical: String,
    /// Alternate spellings that resolve to the canonical answer.
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// A selectable choice for multiple-choice and ordered-list questions.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Choice {
    /// Identifier submitted by clients.
    pub id: String,
    /// Display text.
    pub text: String,
}

/// Closed set of question types, each carrying its secret fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    /// Players type the answer; compared through the normalizer.
    FreeText {
        /// Accepted answers with aliases.
        answers: Vec<AcceptedAnswer>,
        /// Authored comparison mode override.
        #[serde(default)]
        match_mode: Option<MatchMode>,
    },
    /// Players pick one choice by id.
    MultipleChoice {
        /// Choices shown to everyone.
        choices: Vec<Choice>,
        /// Id of the correct choice. Secret until reveal.
        correct_choice_id: String,
    },
    /// Players answer true or false.
    TrueFalse {
        /// The correct boolean. Secret until reveal.
        answer: bool,
    },
    /// Players name every entry of a set within a guess budget.
    MultiEntry {
        /// Required answers, each with aliases.
        answers: Vec<AcceptedAnswer>,
        /// Total guesses (right or wrong) a player may spend.
        max_guesses: u32,
        /// Authored comparison mode override.
        #[serde(default)]
        match_mode: Option<MatchMode>,
    },
    /// Players submit a number inside the displayed bounds.
    Numeric {
        /// Lower display bound, shown to clients.
        min: f64,
        /// Upper display bound, shown to clients.
        max: f64,
        /// Correct value. Secret until reveal.
        answer: f64,
        /// Accepted deviation; zero means exact match.
        #[serde(default)]
        tolerance: f64,
    },
    /// Players arrange the given items into the correct sequence.
    OrderedList {
        /// Items shown to everyone, in authored (display) order.
        items: Vec<Choice>,
        /// Item ids in the correct sequence. Secret until reveal.
        correct_order: Vec<String>,
    },
}
