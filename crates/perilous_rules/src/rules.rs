//! Content rules: the configuration data every contract validates against.
//!
//! Word ranges, denylists and bounds live here rather than next to the
//! validators so a deployment can tune them from its config file.

use crate::Difficulty;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Inclusive word-count range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordRange {
    /// Minimum number of words.
    pub min: usize,
    /// Maximum number of words.
    pub max: usize,
}

impl WordRange {
    /// Creates a new range.
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    /// Returns true if `count` lies inside the range.
    pub fn contains(&self, count: usize) -> bool {
        (self.min..=self.max).contains(&count)
    }
}

impl std::fmt::Display for WordRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.min == self.max {
            write!(f, "exactly {}", self.min)
        } else {
            write!(f, "{} to {}", self.min, self.max)
        }
    }
}

/// Phrase word-count range per difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WordRanges {
    /// Range for [`Difficulty::Easy`].
    pub easy: WordRange,
    /// Range for [`Difficulty::Medium`].
    pub medium: WordRange,
    /// Range for [`Difficulty::Hard`].
    pub hard: WordRange,
    /// Range for [`Difficulty::VeryHard`].
    pub very_hard: WordRange,
}

impl WordRanges {
    /// Returns the range for a difficulty.
    pub fn for_difficulty(&self, difficulty: Difficulty) -> WordRange {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Medium => self.medium,
            Difficulty::Hard => self.hard,
            Difficulty::VeryHard => self.very_hard,
        }
    }
}

impl Default for WordRanges {
    fn default() -> Self {
        Self {
            easy: WordRange::new(2, 3),
            medium: WordRange::new(3, 4),
            hard: WordRange::new(4, 5),
            very_hard: WordRange::new(5, 7),
        }
    }
}

/// Success probabilities used when a verdict is decided locally.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerdictWeights {
    /// Cautious or creative actions.
    pub favorable: f64,
    /// Reckless or ignorant actions.
    pub unfavorable: f64,
    /// Actions with no clear leaning.
    pub ambiguous: f64,
}

impl Default for VerdictWeights {
    fn default() -> Self {
        Self {
            favorable: 0.85,
            unfavorable: 0.15,
            ambiguous: 0.5,
        }
    }
}

/// Centralized content configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
#[serde(default)]
pub struct ContentRules {
    /// Phrase word counts per difficulty.
    word_ranges: WordRanges,
    /// Generic category labels that are never acceptable.
    banned_categories: Vec<String>,
    /// Overused hazards scenarios must avoid.
    banned_tropes: Vec<String>,
    /// Scenario word bounds.
    scenario_words: WordRange,
    /// Number of sentences a scenario must have.
    scenario_sentences: usize,
    /// Literal question a scenario must end with.
    scenario_ending: String,
    /// Category word bounds.
    category_words: WordRange,
    /// Bot action word bounds.
    bot_action_words: WordRange,
    /// Maximum sentences in a verdict outcome.
    outcome_max_sentences: usize,
    /// Maximum words in a verdict outcome.
    outcome_max_words: usize,
    /// Local verdict probabilities.
    verdict_weights: VerdictWeights,
}

impl Default for ContentRules {
    fn default() -> Self {
        Self {
            word_ranges: WordRanges::default(),
            banned_categories: [
                "things",
                "stuff",
                "phrase",
                "phrases",
                "common phrase",
                "common phrases",
                "word",
                "words",
                "general",
                "misc",
                "miscellaneous",
                "random",
                "other",
                "everyday things",
                "various things",
                "answer",
                "saying",
                "sayings",
                "common sayings",
                "general knowledge",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            banned_tropes: [
                "collapsing floor",
                "floor collapses",
                "floor gives way",
                "floor crumbles",
                "collapsing bridge",
                "bridge collapses",
                "rope bridge",
                "crumbling bridge",
                "pit",
                "pits",
                "bottomless pit",
                "spike pit",
                "trapdoor",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            scenario_words: WordRange::new(30, 55),
            scenario_sentences: 2,
            scenario_ending: "What do you do?".to_string(),
            category_words: WordRange::new(2, 4),
            bot_action_words: WordRange::new(12, 22),
            outcome_max_sentences: 3,
            outcome_max_words: 80,
            verdict_weights: VerdictWeights::default(),
        }
    }
}

impl ContentRules {
    /// Phrase word range for a difficulty.
    pub fn phrase_words(&self, difficulty: Difficulty) -> WordRange {
        self.word_ranges.for_difficulty(difficulty)
    }

    /// Returns true if `category` matches a banned generic label.
    pub fn is_banned_category(&self, category: &str) -> bool {
        let normalized = crate::text::normalize(category);
        self.banned_categories
            .iter()
            .any(|banned| crate::text::normalize(banned) == normalized)
    }

    /// Returns the first banned trope mentioned in `text`, if any.
    pub fn find_trope(&self, text: &str) -> Option<&str> {
        let tokens = crate::text::tokens(text);
        self.banned_tropes
            .iter()
            .find(|trope| crate::text::contains_phrase(&tokens, trope))
            .map(String::as_str)
    }
}
