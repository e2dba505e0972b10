//! Question engine: the immutable corpus, its client/reveal projections, and
//! the per-type answer evaluators.

pub mod bank;
pub mod evaluate;
pub mod model;

pub use bank::QuestionBank;
pub use evaluate::{Evaluation, SubmittedAnswer};
pub use model::{AcceptedAnswer, Choice, Question, QuestionContent, QuestionKind};
