//! Corpus loading and access.

use std::collections::HashSet;
use std::{fs, io::ErrorKind, path::Path};

use indexmap::IndexMap;
use rand::seq::IndexedRandom;
use tracing::{info, warn};

use crate::questions::model::Question;

/// Read-only store of every question known to the process.
///
/// Loaded once at startup; "used" tracking belongs to each lobby, never to
/// the bank itself.
#[derive(Debug, Default)]
pub struct QuestionBank {
    questions: IndexMap<String, Question>,
}

impl QuestionBank {
    /// Load the corpus from a JSON file holding an array of questions.
    ///
    /// Loading never fails the process: a missing or unreadable file yields
    /// an empty bank, and individual malformed entries are skipped, both with
    /// a log line pointing at the culprit.
    pub fn load(path: &Path) -> Self {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!(path = %path.display(), "question corpus not found; starting with an empty bank");
                return Self::default();
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to read question corpus");
                return Self::default();
            }
        };

        let entries: Vec<serde_json::Value> = match serde_json::from_str(&contents) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "question corpus is not a JSON array");
                return Self::default();
            }
        };

        let bank = Self::from_entries(entries);
        info!(path = %path.display(), count = bank.len(), "loaded question corpus");
        bank
    }

    /// Build a bank from raw JSON entries, skipping anything malformed.
    fn from_entries(entries: Vec<serde_json::Value>) -> Self {
        let mut questions = IndexMap::new();
        for (index, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<Question>(entry) {
                Ok(question) => {
                    if questions.contains_key(&question.id) {
                        warn!(id = %question.id, "duplicate question id; keeping the first occurrence");
                        continue;
                    }
                    questions.insert(question.id.clone(), question);
                }
                Err(err) => {
                    warn!(index, error = %err, "skipping malformed question entry");
                }
            }
        }
        Self { questions }
    }

    /// Build a bank directly from parsed questions. Test seam.
    pub fn from_questions(items: Vec<Question>) -> Self {
        let mut questions = IndexMap::new();
        for question in items {
            questions.entry(question.id.clone()).or_insert(question);
        }
        Self { questions }
    }

    /// Look up a question by id.
    pub fn get(&self, id: &str) -> Option<&Question> {
        self.questions.get(id)
    }

    /// Iterate over every question id in corpus order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.questions.keys().map(String::as_str)
    }

    /// Number of questions in the corpus.
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Whether the corpus is empty.
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Pick a random question that is not in `used` and matches the category
    /// filter when one is set. Returns `None` when the pool is exhausted.
    pub fn pick_unused(&self, used: &HashSet<String>, filter: Option<&str>) -> Option<&Question> {
        let eligible: Vec<&Question> = self
            .questions
            .values()
            .filter(|question| !used.contains(&question.id))
            .filter(|question| match filter {
                Some(category) => question.category.as_deref() == Some(category),
                None => true,
            })
            .collect();

        eligible.choose(&mut rand::rng()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> QuestionBank {
        let entries = vec![
            serde_json::json!({
                "id": "a", "title": "A", "category": "music",
                "type": "true_false", "answer": true
            }),
            serde_json::json!({
                "id": "b", "title": "B", "category": "movies",
                "type": "true_false", "answer": false
            }),
            serde_json::json!({
                "id": "c", "title": "C", "category": "music",
                "type": "free_text",
                "answers": [{"canonical": "Blue"}]
            }),
        ];
        QuestionBank::from_entries(entries)
    }

    #[test]
    fn malformed_entries_are_skipped_not_fatal() {
        let entries = vec![
            serde_json::json!({"id": "ok", "title": "T", "type": "true_false", "answer": true}),
            serde_json::json!({"id": "broken", "title": "T", "type": "mystery"}),
            serde_json::json!("not even an object"),
        ];
        let bank = QuestionBank::from_entries(entries);
        assert_eq!(bank.len(), 1);
        assert!(bank.get("ok").is_some());
    }

    #[test]
    fn duplicate_ids_keep_first_occurrence() {
        let entries = vec![
            serde_json::json!({"id": "dup", "title": "first", "type": "true_false", "answer": true}),
            serde_json::json!({"id": "dup", "title": "second", "type": "true_false", "answer": false}),
        ];
        let bank = QuestionBank::from_entries(entries);
        assert_eq!(bank.len(), 1);
        assert_eq!(bank.get("dup").map(|q| q.title.as_str()), Some("first"));
    }

    #[test]
    fn pick_unused_skips_used_ids() {
        let bank = corpus();
        let mut used = HashSet::new();
        used.insert("a".to_string());
        used.insert("c".to_string());

        let picked = bank.pick_unused(&used, None).expect("one question left");
        assert_eq!(picked.id, "b");
    }

    #[test]
    fn pick_unused_honors_category_filter() {
        let bank = corpus();
        let used = HashSet::new();
        for _ in 0..10 {
            let picked = bank.pick_unused(&used, Some("music")).expect("music questions exist");
            assert_eq!(picked.category.as_deref(), Some("music"));
        }
        assert!(bank.pick_unused(&used, Some("sports")).is_none());
    }

    #[test]
    fn exhausted_pool_returns_none() {
        let bank = corpus();
        let used: HashSet<String> = bank.ids().map(str::to_string).collect();
        assert!(bank.pick_unused(&used, None).is_none());
    }

    #[test]
    fn missing_file_yields_empty_bank() {
        let bank = QuestionBank::load(Path::new("/nonexistent/corpus.json"));
        assert!(bank.is_empty());
    }
}
