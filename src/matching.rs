//! Text canonicalization used to compare free-text guesses against accepted
//! answers without ever requiring an exact transcription from players.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

/// Punctuation stripped by [`MatchMode::Normal`]: quote marks and the common
/// sentence punctuation players tend to drop when typing fast.
const MINOR_MARKS: [char; 12] = [
    '\'', '\u{2019}', '\u{2018}', '"', '\u{201c}', '\u{201d}', '.', ',', '!', '?', ';', ':',
];

/// Strictness applied when normalizing answers for comparison.
///
/// Ordered from most to least forgiving. `Normal` is the default used for
/// almost every question; lyric fill-ins use `Loose` because transcriptions
/// of sung lines disagree wildly on punctuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Case-folded, every non-alphanumeric character stripped, whitespace collapsed.
    Loose,
    /// Case-folded, minor punctuation stripped, whitespace collapsed.
    #[default]
    Normal,
    /// Case-folded, punctuation kept, whitespace trimmed only.
    Strict,
    /// Character-for-character after trimming.
    Exact,
}

impl MatchMode {
    /// Resolve a mode from its wire name, falling back to [`MatchMode::Normal`]
    /// on anything unrecognized. Bad data in a question must never make an
    /// answer unjudgeable.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "loose" => Self::Loose,
            "normal" => Self::Normal,
            "strict" => Self::Strict,
            "exact" => Self::Exact,
            other => {
                warn!(mode = other, "unrecognized match mode; using `normal`");
                Self::Normal
            }
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Loose => "loose",
            Self::Normal => "normal",
            Self::Strict => "strict",
            Self::Exact => "exact",
        };
        f.write_str(name)
    }
}

impl<'de> Deserialize<'de> for MatchMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_name(&name))
    }
}

/// Map a question-generator category to the mode its answers should be
/// compared with. Lyric completion answers are transcribed from audio, so
/// they get the forgiving treatment; everything else defaults to `Normal`.
pub fn recommended_match_mode(generator_type: &str) -> MatchMode {
    match generator_type {
        "lyric_fill_in" | "next_line" => MatchMode::Loose,
        _ => MatchMode::Normal,
    }
}

/// Canonicalize `text` for comparison under `mode`.
///
/// Total over all inputs: empty or whitespace-only text yields the empty
/// string, nothing panics.
pub fn normalize_for_comparison(text: &str, mode: MatchMode) -> String {
    match mode {
        MatchMode::Loose => {
            let kept: String = text
                .to_lowercase()
                .chars()
                .map(|c| if c.is_alphanumeric() { c } else { ' ' })
                .collect();
            collapse_whitespace(&kept)
        }
        MatchMode::Normal => {
            let kept: String = text
                .to_lowercase()
                .chars()
                .filter(|c| !MINOR_MARKS.contains(c))
                .collect();
            collapse_whitespace(&kept)
        }
        MatchMode::Strict => text.to_lowercase().trim().to_string(),
        MatchMode::Exact => text.trim().to_string(),
    }
}

/// Whether two free-text answers are considered equal under `mode`.
pub fn answers_match(left: &str, right: &str, mode: MatchMode) -> bool {
    normalize_for_comparison(left, mode) == normalize_for_comparison(right, mode)
}

/// Return the first candidate that matches `guess` under `mode`, preserving
/// the caller's candidate order.
pub fn find_matching_answer<'a, I>(guess: &str, candidates: I, mode: MatchMode) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let normalized_guess = normalize_for_comparison(guess, mode);
    candidates
        .into_iter()
        .find(|candidate| normalize_for_comparison(candidate, mode) == normalized_guess)
}

/// Build a lookup from normalized answer variants (canonical spelling plus
/// aliases) to the canonical answer text.
///
/// First writer wins on collisions so the canonical entry authored earliest
/// keeps ownership of an ambiguous alias.
pub fn build_alias_map<'a, I, V>(answers: I, mode: MatchMode) -> HashMap<String, String>
where
    I: IntoIterator<Item = (&'a str, V)>,
    V: IntoIterator<Item = &'a str>,
{
    let mut map = HashMap::new();
    for (canonical, aliases) in answers {
        for variant in std::iter::once(canonical).chain(aliases) {
            let key = normalize_for_comparison(variant, mode);
            if key.is_empty() {
                continue;
            }
            map.entry(key).or_insert_with(|| canonical.to_string());
        }
    }
    map
}

/// Collapse runs of whitespace into single spaces and trim the ends.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_ignores_case_and_minor_punctuation() {
        assert_eq!(
            normalize_for_comparison("Runaway!", MatchMode::Normal),
            normalize_for_comparison("runaway", MatchMode::Normal)
        );
        assert_eq!(
            normalize_for_comparison("Don't Stop Me Now.", MatchMode::Normal),
            "dont stop me now"
        );
    }

    #[test]
    fn exact_preserves_case_and_punctuation() {
        assert_ne!(
            normalize_for_comparison("Runaway!", MatchMode::Exact),
            normalize_for_comparison("runaway", MatchMode::Exact)
        );
        assert_eq!(normalize_for_comparison("  Runaway!  ", MatchMode::Exact), "Runaway!");
    }

    #[test]
    fn loose_strips_everything_but_alphanumerics() {
        assert_eq!(
            normalize_for_comparison("(I Can't Get No) Satisfaction!!", MatchMode::Loose),
            "i can t get no satisfaction"
        );
        assert!(answers_match("semi-charmed life", "Semi Charmed Life", MatchMode::Loose));
    }

    #[test]
    fn strict_keeps_punctuation_but_folds_case() {
        assert!(answers_match("Hey, Jude", "hey, jude", MatchMode::Strict));
        assert!(!answers_match("Hey, Jude", "Hey Jude", MatchMode::Strict));
    }

    #[test]
    fn whitespace_collapses_in_forgiving_modes() {
        assert_eq!(
            normalize_for_comparison("  bohemian   rhapsody ", MatchMode::Normal),
            "bohemian rhapsody"
        );
    }

    #[test]
    fn empty_input_yields_empty_string() {
        for mode in [MatchMode::Loose, MatchMode::Normal, MatchMode::Strict, MatchMode::Exact] {
            assert_eq!(normalize_for_comparison("", mode), "");
            assert_eq!(normalize_for_comparison("   ", mode), "");
        }
    }

    #[test]
    fn unrecognized_mode_falls_back_to_normal() {
        assert_eq!(MatchMode::from_name("fuzzy"), MatchMode::Normal);
        assert_eq!(MatchMode::from_name("LOOSE"), MatchMode::Loose);
        assert_eq!(MatchMode::from_name(" exact "), MatchMode::Exact);
    }

    #[test]
    fn find_matching_answer_returns_first_hit() {
        let candidates = ["Mr. Brightside", "Somebody Told Me"];
        assert_eq!(
            find_matching_answer("mr brightside", candidates, MatchMode::Normal),
            Some("Mr. Brightside")
        );
        assert_eq!(find_matching_answer("human", candidates, MatchMode::Normal), None);
    }

    #[test]
    fn alias_map_first_writer_wins() {
        let answers = [
            ("The Beatles", vec!["Beatles"]),
            ("The Beatles Tribute Band", vec!["Beatles"]),
        ];
        let map = build_alias_map(
            answers
                .iter()
                .map(|(canonical, aliases)| (*canonical, aliases.iter().copied())),
            MatchMode::Normal,
        );
        assert_eq!(map.get("beatles").map(String::as_str), Some("The Beatles"));
        assert_eq!(map.get("the beatles").map(String::as_str), Some("The Beatles"));
    }

    fn collapse(text: &str) -> String {
        normalize_for_comparison(text, MatchMode::Loose)
    }

    #[test]
    fn loose_handles_unicode_quotes() {
        assert_eq!(collapse("don\u{2019}t"), "don t");
    }
}
