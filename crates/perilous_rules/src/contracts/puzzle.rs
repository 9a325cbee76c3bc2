//! Puzzle contract: the hidden phrase and its category hint.

use super::{Contract, Violation, text, verdict_of};
use crate::{ContentRules, Difficulty};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const PHRASE: &str = "PHRASE";
const CATEGORY: &str = "CATEGORY";

/// A validated phrase and category pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedPuzzle {
    /// Uppercase letters and single spaces.
    pub phrase: String,
    /// Two to four word hint.
    pub category: String,
}

impl GeneratedPuzzle {
    /// Creates a puzzle from already-normalized parts.
    pub fn new(phrase: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            phrase: phrase.into(),
            category: category.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPuzzle {
    phrase: Option<String>,
    category: Option<String>,
}

/// Rules for a phrase of a given difficulty.
#[derive(Debug, Clone, Copy)]
pub struct PuzzleContract<'a> {
    rules: &'a ContentRules,
    difficulty: Difficulty,
    recent: &'a [String],
}

impl<'a> PuzzleContract<'a> {
    /// Creates a contract for `difficulty` that rejects any `recent` phrase.
    pub fn new(rules: &'a ContentRules, difficulty: Difficulty, recent: &'a [String]) -> Self {
        Self {
            rules,
            difficulty,
            recent,
        }
    }

    /// Difficulty this contract checks against.
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Reads the raw phrase and category fields from a response.
    ///
    /// Accepts labelled lines in any layout or a JSON object.
    pub fn fields(&self, raw: &str) -> (Option<String>, Option<String>) {
        if let Some(json) = text::json_object(raw)
            && let Ok(parsed) = serde_json::from_str::<RawPuzzle>(json)
        {
            return (parsed.phrase, parsed.category);
        }
        let mut fields = text::extract_fields(raw, &[PHRASE, CATEGORY]);
        (fields.remove(PHRASE), fields.remove(CATEGORY))
    }

    /// Normalizes and validates a raw phrase field.
    ///
    /// # Errors
    ///
    /// Returns every rule the phrase breaks.
    #[instrument(skip(self))]
    pub fn accept_phrase(&self, raw_phrase: &str) -> Result<String, Vec<Violation>> {
        let cleaned = text::strip_decorations(raw_phrase)
            .trim_end_matches(['.', '!', '?'])
            .to_string();
        let cleaned = text::collapse_whitespace(&cleaned);
        if cleaned.is_empty() {
            return Err(vec![Violation::new("format", "the PHRASE field was empty")]);
        }

        let mut violations = Vec::new();
        if let Some(noun) = proper_noun(&cleaned) {
            violations.push(Violation::new(
                "proper-noun",
                format!("do not use proper nouns such as \"{noun}\""),
            ));
        }

        let phrase = cleaned.to_uppercase();
        violations.extend(self.phrase_violations(&phrase));
        verdict_of(violations)?;
        Ok(phrase)
    }

    fn phrase_violations(&self, phrase: &str) -> Vec<Violation> {
        let mut violations = Vec::new();

        if !phrase.chars().all(|c| c.is_ascii_uppercase() || c == ' ')
            || phrase.contains("  ")
            || phrase.trim() != phrase
        {
            violations.push(Violation::new(
                "charset",
                "the phrase may contain only letters A-Z separated by single spaces",
            ));
        }

        let words = text::word_count(phrase);
        let range = self.rules.phrase_words(self.difficulty);
        if !range.contains(words) {
            violations.push(Violation::new(
                "word-count",
                format!(
                    "a {} phrase must have {range} words, not {words}",
                    self.difficulty
                ),
            ));
        }

        if self
            .recent
            .iter()
            .any(|seen| text::normalize(seen) == text::normalize(phrase))
        {
            violations.push(Violation::new("repeat", "this phrase was used recently"));
        }
        violations
    }

    /// Normalizes and validates a raw category field against its phrase.
    ///
    /// # Errors
    ///
    /// Returns every rule the category breaks.
    #[instrument(skip(self))]
    pub fn accept_category(&self, raw_category: &str, phrase: &str) -> Result<String, Vec<Violation>> {
        let category = text::collapse_whitespace(
            text::strip_decorations(raw_category).trim_end_matches(['.', '!']),
        );
        if category.is_empty() {
            return Err(vec![Violation::new("format", "the CATEGORY field was empty")]);
        }
        verdict_of(self.category_violations(&category, phrase))?;
        Ok(category)
    }

    fn category_violations(&self, category: &str, phrase: &str) -> Vec<Violation> {
        let mut violations = Vec::new();

        if !category
            .chars()
            .all(|c| c.is_alphabetic() || matches!(c, ' ' | '-' | '\'' | '&'))
        {
            violations.push(Violation::new(
                "category-charset",
                "the category may contain only words, no digits or symbols",
            ));
        }

        let words = text::word_count(category);
        let range = self.rules.category_words();
        if !range.contains(words) {
            violations.push(Violation::new(
                "category-length",
                format!("the category must have {range} words, not {words}"),
            ));
        }

        if self.rules.is_banned_category(category) {
            violations.push(Violation::new(
                "generic-category",
                format!("\"{category}\" is too generic; name a specific theme"),
            ));
        }

        let phrase_words = text::content_words(phrase);
        if let Some(shared) = text::content_words(category)
            .into_iter()
            .find(|word| phrase_words.contains(word))
        {
            violations.push(Violation::new(
                "paraphrase",
                format!("the category must not reuse the phrase's word \"{shared}\""),
            ));
        }
        violations
    }
}

/// Returns the first mid-phrase capitalized word when the phrase is mixed case.
fn proper_noun(phrase: &str) -> Option<&str> {
    let has_lower = phrase.chars().any(|c| c.is_lowercase());
    let has_upper = phrase.chars().any(|c| c.is_uppercase());
    if !(has_lower && has_upper) {
        return None;
    }
    phrase
        .split_whitespace()
        .skip(1)
        .find(|word| word.chars().next().is_some_and(char::is_uppercase))
}

impl Contract for PuzzleContract<'_> {
    type Value = GeneratedPuzzle;

    fn name(&self) -> &'static str {
        "puzzle"
    }

    #[instrument(skip(self, raw), fields(difficulty = %self.difficulty))]
    fn parse(&self, raw: &str) -> Result<GeneratedPuzzle, Vec<Violation>> {
        let (phrase, category) = self.fields(raw);
        let mut violations = Vec::new();
        if phrase.is_none() {
            violations.push(Violation::new("format", "missing the PHRASE: line"));
        }
        if category.is_none() {
            violations.push(Violation::new("format", "missing the CATEGORY: line"));
        }
        let (Some(phrase), Some(category)) = (phrase, category) else {
            return Err(violations);
        };

        let phrase = self.accept_phrase(&phrase)?;
        let category = text::collapse_whitespace(
            text::strip_decorations(&category).trim_end_matches(['.', '!']),
        );
        debug!(phrase = %phrase, category = %category, "Parsed puzzle");
        Ok(GeneratedPuzzle { phrase, category })
    }

    fn validate(&self, value: &GeneratedPuzzle) -> Result<(), Vec<Violation>> {
        let mut violations = self.phrase_violations(&value.phrase);
        violations.extend(self.category_violations(&value.category, &value.phrase));
        verdict_of(violations)
    }
}
