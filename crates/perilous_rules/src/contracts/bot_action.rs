//! Bot action contract: a first-person sentence a bot plays as its turn.

use super::{Contract, Violation, text, verdict_of};
use crate::ContentRules;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, instrument};

const ACTION: &str = "ACTION";

const AUXILIARIES: &[&str] = &[
    "will", "would", "was", "had", "did", "might", "could", "should", "shall",
];

const CONTRACTED_AUXILIARIES: &[&str] = &["i'll", "i'd", "i've"];

static EITHER_OR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\beither\s+([^.?!;]+?)\s*,?\s+or\s+([^.?!;]+)").expect("static regex")
});

static COULD_OR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:could|can|might)\s+([^.?!;]+?)\s*,?\s+or\s+([^.?!;]+)")
        .expect("static regex")
});

/// A validated bot action sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BotAction(String);

impl BotAction {
    /// Wraps action text.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Returns the action text.
    pub fn text(&self) -> &str {
        &self.0
    }

    /// Consumes the action, returning its text.
    pub fn into_text(self) -> String {
        self.0
    }
}

impl std::fmt::Display for BotAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extracts the choices a scenario offers, e.g. "either hide or run".
///
/// Returns an empty list when the scenario names no explicit alternatives.
pub fn implied_options(scenario: &str) -> Vec<String> {
    let captures = EITHER_OR
        .captures(scenario)
        .or_else(|| COULD_OR.captures(scenario));
    let Some(caps) = captures else {
        return Vec::new();
    };
    [caps.get(1), caps.get(2)]
        .into_iter()
        .flatten()
        .map(|m| {
            let option = m.as_str().trim().trim_end_matches(',');
            text::collapse_whitespace(option.strip_prefix("either ").unwrap_or(option))
        })
        .filter(|option| !option.is_empty())
        .collect()
}

/// Rules for a bot's action, given the options its scenario offers.
#[derive(Debug, Clone, Copy)]
pub struct BotActionContract<'a> {
    rules: &'a ContentRules,
    options: &'a [String],
}

impl<'a> BotActionContract<'a> {
    /// Creates a contract; an empty `options` slice disables the commitment rule.
    pub fn new(rules: &'a ContentRules, options: &'a [String]) -> Self {
        Self { rules, options }
    }

    /// Options the action must commit to.
    pub fn options(&self) -> &[String] {
        self.options
    }

    /// Returns true if `action` shares a content word with one of the options.
    pub fn commits_to_option(&self, action: &str) -> bool {
        let candidates: Vec<Vec<String>> = self
            .options
            .iter()
            .map(|option| text::content_words(option))
            .filter(|words| !words.is_empty())
            .collect();
        if candidates.is_empty() {
            return true;
        }
        let action_words = text::content_words(action);
        candidates
            .iter()
            .any(|words| words.iter().any(|word| action_words.contains(word)))
    }
}

fn tense_violation(action: &str) -> Option<String> {
    let mut words = action
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'').to_lowercase());
    let first = words.next()?;
    if CONTRACTED_AUXILIARIES.contains(&first.as_str()) {
        return Some(first);
    }
    let second = words.next()?;
    (first == "i" && AUXILIARIES.contains(&second.as_str())).then_some(second)
}

impl Contract for BotActionContract<'_> {
    type Value = BotAction;

    fn name(&self) -> &'static str {
        "bot-action"
    }

    #[instrument(skip(self, raw), fields(options = self.options.len()))]
    fn parse(&self, raw: &str) -> Result<BotAction, Vec<Violation>> {
        let body = text::strip_preamble(raw);
        let body = text::extract_fields(&body, &[ACTION])
            .remove(ACTION)
            .unwrap_or(body);
        let body = text::collapse_whitespace(&text::strip_decorations(&body));
        if body.is_empty() {
            return Err(vec![Violation::new("format", "the response contained no action")]);
        }
        debug!(words = text::word_count(&body), "Parsed bot action");
        Ok(BotAction(body))
    }

    #[instrument(skip(self, value))]
    fn validate(&self, value: &BotAction) -> Result<(), Vec<Violation>> {
        let mut violations = Vec::new();
        let action = value.text();

        let first = action.split_whitespace().next().unwrap_or_default();
        if first != "I" && !first.starts_with("I'") && !first.starts_with("I\u{2019}") {
            violations.push(Violation::new(
                "first-person",
                "the action must start with the word \"I\"",
            ));
        }

        if let Some(word) = tense_violation(action) {
            violations.push(Violation::new(
                "present-tense",
                format!("use the present tense, not \"{word}\""),
            ));
        }

        let words = text::word_count(action);
        let range = self.rules.bot_action_words();
        if !range.contains(words) {
            violations.push(Violation::new(
                "word-count",
                format!("the action must have {range} words, not {words}"),
            ));
        }

        let sentences = text::sentences(action);
        if sentences.len() != 1 || !text::ends_with_terminal(action) {
            violations.push(Violation::new(
                "single-sentence",
                "write exactly one complete sentence",
            ));
        }

        if !self.commits_to_option(action) {
            violations.push(Violation::new(
                "commitment",
                format!(
                    "commit to one of the scenario's options: {}",
                    self.options.join(" / ")
                ),
            ));
        }

        verdict_of(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = "A swarm of angry hornets pours out of the hollow oak beside the trail, \
        and you could either dive into the cold creek below or wrap your jacket around \
        your head and walk calmly away. What do you do?";

    #[test]
    fn test_implied_options_from_either_or() {
        let options = implied_options(SCENARIO);
        assert_eq!(options, vec![
            "dive into the cold creek below".to_string(),
            "wrap your jacket around your head and walk calmly away".to_string(),
        ]);
    }

    #[test]
    fn test_implied_options_from_could_or() {
        let options = implied_options("The vat tips toward you; you could vault the railing or drop flat. What do you do?");
        assert_eq!(options, vec!["vault the railing".to_string(), "drop flat".to_string()]);
    }

    #[test]
    fn test_no_options_without_alternatives() {
        assert!(implied_options("Smoke fills the hall. What do you do?").is_empty());
    }

    #[test]
    fn test_accepts_committed_present_tense_action() {
        let rules = ContentRules::default();
        let options = implied_options(SCENARIO);
        let contract = BotActionContract::new(&rules, &options);
        let action = contract
            .accept("Action: \"I wrap my jacket tight around my head and stroll away from the buzzing oak.\"")
            .unwrap();
        assert!(action.text().starts_with("I wrap"));
    }

    #[test]
    fn test_rejects_future_tense() {
        let rules = ContentRules::default();
        let contract = BotActionContract::new(&rules, &[]);
        let violations = contract
            .accept("I will dive into the cold creek and hold my breath until the hornets lose interest.")
            .unwrap_err();
        assert!(violations.iter().any(|v| v.rule == "present-tense"));
    }

    #[test]
    fn test_rejects_uncommitted_action() {
        let rules = ContentRules::default();
        let options = implied_options(SCENARIO);
        let contract = BotActionContract::new(&rules, &options);
        let violations = contract
            .accept("I start singing loudly and hope that everyone nearby forgets that I am here.")
            .unwrap_err();
        assert!(violations.iter().any(|v| v.rule == "commitment"));
    }

    #[test]
    fn test_rejects_third_person_and_short_text() {
        let rules = ContentRules::default();
        let contract = BotActionContract::new(&rules, &[]);
        let violations = contract.accept("The bot runs.").unwrap_err();
        assert!(violations.iter().any(|v| v.rule == "first-person"));
        assert!(violations.iter().any(|v| v.rule == "word-count"));
    }
}
