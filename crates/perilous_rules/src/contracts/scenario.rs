//! Scenario contract: the danger each player faces on their turn.

use super::{Contract, Violation, text, verdict_of};
use crate::ContentRules;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, instrument};

static ENDING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)what\s+do\s+you\s+do\s*\?").expect("static regex"));

static LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*scenario\s*(?:\d+)?\s*[:\-]\s*").expect("static regex"));

/// A validated two-sentence danger scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scenario(String);

impl Scenario {
    /// Wraps scenario text.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Returns the scenario text.
    pub fn text(&self) -> &str {
        &self.0
    }

    /// Consumes the scenario, returning its text.
    pub fn into_text(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rules a scenario must satisfy, including the recent-history denylist.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioContract<'a> {
    rules: &'a ContentRules,
    recent: &'a [String],
}

impl<'a> ScenarioContract<'a> {
    /// Creates a contract that rejects any of the `recent` scenarios.
    pub fn new(rules: &'a ContentRules, recent: &'a [String]) -> Self {
        Self { rules, recent }
    }

    /// Returns true if `candidate` repeats a recent scenario.
    pub fn is_recent(&self, candidate: &str) -> bool {
        let normalized = text::normalize(candidate);
        self.recent.iter().any(|seen| text::normalize(seen) == normalized)
    }
}

impl Contract for ScenarioContract<'_> {
    type Value = Scenario;

    fn name(&self) -> &'static str {
        "scenario"
    }

    #[instrument(skip(self, raw), fields(raw_len = raw.len()))]
    fn parse(&self, raw: &str) -> Result<Scenario, Vec<Violation>> {
        let body = text::strip_preamble(raw);
        let body = LABEL.replace(&body, "");
        let mut body = text::collapse_whitespace(&body);

        // Anything after the closing question is commentary.
        let ending = self.rules.scenario_ending();
        if let Some(found) = ENDING.find(&body) {
            body = format!("{}{}", &body[..found.start()], ending);
        }

        let body = text::strip_decorations(&body);
        if body.is_empty() {
            return Err(vec![Violation::new("format", "the response contained no scenario text")]);
        }
        debug!(words = text::word_count(&body), "Parsed scenario");
        Ok(Scenario(body))
    }

    #[instrument(skip(self, value))]
    fn validate(&self, value: &Scenario) -> Result<(), Vec<Violation>> {
        let mut violations = Vec::new();
        let body = value.text();

        let sentences = text::sentences(body);
        let wanted = *self.rules.scenario_sentences();
        if sentences.len() != wanted {
            violations.push(Violation::new(
                "sentence-count",
                format!("write exactly {wanted} sentences, not {}", sentences.len()),
            ));
        }

        let words = text::word_count(body);
        let range = self.rules.scenario_words();
        if !range.contains(words) {
            violations.push(Violation::new(
                "word-count",
                format!("use {range} words in total, not {words}"),
            ));
        }

        let ending = self.rules.scenario_ending();
        if !sentences.last().is_some_and(|last| last.ends_with(ending.as_str())) {
            violations.push(Violation::new(
                "ending",
                format!("the second sentence must end with the exact question \"{ending}\""),
            ));
        }

        if let Some(trope) = self.rules.find_trope(body) {
            violations.push(Violation::new(
                "banned-trope",
                format!("do not use the overused hazard \"{trope}\""),
            ));
        }

        if self.is_recent(body) {
            violations.push(Violation::new(
                "repeat",
                "this scenario was used recently; invent a different danger",
            ));
        }

        verdict_of(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "A swarm of angry hornets pours out of the hollow oak beside the trail, \
        and you could either dive into the cold creek below or wrap your jacket around \
        your head and walk calmly away. What do you do?";

    #[test]
    fn test_accepts_well_formed_scenario() {
        let rules = ContentRules::default();
        let contract = ScenarioContract::new(&rules, &[]);
        assert!(contract.accept(VALID).is_ok());
    }

    #[test]
    fn test_strips_commentary_and_trailing_text() {
        let rules = ContentRules::default();
        let contract = ScenarioContract::new(&rules, &[]);
        let raw = format!("Sure! Here's one:\n\n{}\n\nLet me know if you want another!", VALID);
        let scenario = contract.accept(&raw).unwrap();
        assert!(scenario.text().ends_with("What do you do?"));
        assert!(!scenario.text().contains("Let me know"));
    }

    #[test]
    fn test_canonicalizes_lowercase_ending() {
        let rules = ContentRules::default();
        let contract = ScenarioContract::new(&rules, &[]);
        let raw = VALID.replace("What do you do?", "what do you do ?");
        let scenario = contract.accept(&raw).unwrap();
        assert!(scenario.text().ends_with("What do you do?"));
    }

    #[test]
    fn test_rejects_three_sentences() {
        let rules = ContentRules::default();
        let contract = ScenarioContract::new(&rules, &[]);
        let raw = VALID.replace("below or", "below. Or");
        let violations = contract.accept(&raw).unwrap_err();
        assert!(violations.iter().any(|v| v.rule == "sentence-count"));
    }

    #[test]
    fn test_rejects_recent_repeat() {
        let rules = ContentRules::default();
        let recent = vec![VALID.to_uppercase()];
        let contract = ScenarioContract::new(&rules, &recent);
        let violations = contract.accept(VALID).unwrap_err();
        assert!(violations.iter().any(|v| v.rule == "repeat"));
    }

    #[test]
    fn test_rejects_banned_trope() {
        let rules = ContentRules::default();
        let contract = ScenarioContract::new(&rules, &[]);
        let raw = VALID.replace("cold creek below", "spike pit below");
        let violations = contract.accept(&raw).unwrap_err();
        assert!(violations.iter().any(|v| v.rule == "banned-trope"));
    }

    #[test]
    fn test_rejects_missing_question() {
        let rules = ContentRules::default();
        let contract = ScenarioContract::new(&rules, &[]);
        let raw = VALID.replace(" What do you do?", " Choose quickly.");
        let violations = contract.accept(&raw).unwrap_err();
        assert!(violations.iter().any(|v| v.rule == "ending"));
    }
}
