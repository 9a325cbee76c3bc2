//! Verdict contract: whether an action succeeded and what happened.

use super::{Contract, Violation, text, verdict_of};
use crate::ContentRules;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, instrument};

const VERDICT: &str = "VERDICT";
const RESULT: &str = "RESULT";
const OUTCOME: &str = "OUTCOME";

static LEAKED_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(verdict|result|outcome|success|failure)\s*[:=]").expect("static regex")
});

const SUCCESS_WORDS: &[&str] = &[
    "success", "successful", "succeed", "succeeds", "succeeded", "survive", "survives",
    "survived", "pass", "passed", "win", "yes", "true",
];

const FAILURE_WORDS: &[&str] = &[
    "fail", "fails", "failed", "failure", "lose", "loses", "lost", "death", "dies", "no",
    "false",
];

/// Judgement of one player action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionVerdict {
    /// Whether the action succeeded.
    pub success: bool,
    /// One to three sentences describing the result.
    pub outcome: String,
}

impl ActionVerdict {
    /// Creates a verdict.
    pub fn new(success: bool, outcome: impl Into<String>) -> Self {
        Self {
            success,
            outcome: outcome.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    #[serde(default, alias = "result", alias = "verdict")]
    success: Option<serde_json::Value>,
    #[serde(default, alias = "narration", alias = "description")]
    outcome: Option<String>,
}

/// Reads a verdict word such as `SUCCESS` or `Failed.` as a boolean.
pub fn read_verdict_word(raw: &str) -> Option<bool> {
    let first = text::tokens(raw).into_iter().next()?;
    if SUCCESS_WORDS.contains(&first.as_str()) {
        Some(true)
    } else if FAILURE_WORDS.contains(&first.as_str()) {
        Some(false)
    } else {
        None
    }
}

fn read_json_success(value: &serde_json::Value) -> Option<bool> {
    match value {
        serde_json::Value::Bool(b) => Some(*b),
        serde_json::Value::String(s) => read_verdict_word(s),
        _ => None,
    }
}

/// Rules for a verdict, optionally pinned to a pre-decided result.
#[derive(Debug, Clone, Copy)]
pub struct VerdictContract<'a> {
    rules: &'a ContentRules,
    expected: Option<bool>,
    context: Option<(&'a str, &'a str)>,
}

impl<'a> VerdictContract<'a> {
    /// Creates a contract. When `expected` is set, the parsed verdict must match it.
    pub fn new(rules: &'a ContentRules, expected: Option<bool>) -> Self {
        Self {
            rules,
            expected,
            context: None,
        }
    }

    /// Requires the outcome to talk about this scenario or action.
    pub fn grounded_in(mut self, scenario: &'a str, action: &'a str) -> Self {
        self.context = Some((scenario, action));
        self
    }

    /// The pre-decided result, if any.
    pub fn expected(&self) -> Option<bool> {
        self.expected
    }

    /// Whether `outcome` shares a content word with the scenario or action.
    ///
    /// An action with no content words of its own imposes no check.
    pub fn is_grounded(&self, outcome: &str) -> bool {
        let Some((scenario, action)) = self.context else {
            return true;
        };
        let action_words = text::content_words(action);
        if action_words.is_empty() {
            return true;
        }
        let outcome_words = text::content_words(outcome);
        action_words
            .iter()
            .chain(text::content_words(scenario).iter())
            .any(|word| outcome_words.contains(word))
    }

    fn from_json(&self, raw: &str) -> Option<(Option<bool>, Option<String>)> {
        let json = text::json_object(raw)?;
        let parsed: RawVerdict = serde_json::from_str(json).ok()?;
        Some((
            parsed.success.as_ref().and_then(read_json_success),
            parsed.outcome,
        ))
    }

    fn from_markers(raw: &str) -> (Option<bool>, Option<String>) {
        let mut fields = text::extract_fields(raw, &[VERDICT, RESULT, OUTCOME]);
        let success = fields
            .remove(VERDICT)
            .or_else(|| fields.remove(RESULT))
            .and_then(|word| read_verdict_word(&word));
        (success, fields.remove(OUTCOME))
    }
}

impl Contract for VerdictContract<'_> {
    type Value = ActionVerdict;

    fn name(&self) -> &'static str {
        "verdict"
    }

    #[instrument(skip(self, raw), fields(expected = ?self.expected))]
    fn parse(&self, raw: &str) -> Result<ActionVerdict, Vec<Violation>> {
        let (success, outcome) = self
            .from_json(raw)
            .unwrap_or_else(|| Self::from_markers(raw));

        let mut violations = Vec::new();
        if success.is_none() {
            violations.push(Violation::new(
                "format",
                "missing a VERDICT: line reading SUCCESS or FAILURE",
            ));
        }
        let outcome = outcome
            .map(|o| text::trim_to_complete_sentences(&text::strip_decorations(&o)))
            .filter(|o| !o.is_empty());
        if outcome.is_none() {
            violations.push(Violation::new("format", "missing the OUTCOME: line"));
        }
        let (Some(success), Some(outcome)) = (success, outcome) else {
            return Err(violations);
        };

        debug!(success, words = text::word_count(&outcome), "Parsed verdict");
        Ok(ActionVerdict { success, outcome })
    }

    #[instrument(skip(self, value))]
    fn validate(&self, value: &ActionVerdict) -> Result<(), Vec<Violation>> {
        let mut violations = Vec::new();

        let sentences = text::sentences(&value.outcome).len();
        let max_sentences = *self.rules.outcome_max_sentences();
        if sentences == 0 || sentences > max_sentences {
            violations.push(Violation::new(
                "sentence-count",
                format!("the outcome must be 1 to {max_sentences} sentences, not {sentences}"),
            ));
        }

        let words = text::word_count(&value.outcome);
        let max_words = *self.rules.outcome_max_words();
        if words > max_words {
            violations.push(Violation::new(
                "word-count",
                format!("the outcome must be at most {max_words} words, not {words}"),
            ));
        }

        if LEAKED_MARKER.is_match(&value.outcome) {
            violations.push(Violation::new(
                "leaked-marker",
                "the outcome must be plain narration without field labels",
            ));
        }

        if !self.is_grounded(&value.outcome) {
            let action = self.context.map(|(_, action)| action).unwrap_or_default();
            violations.push(Violation::new(
                "grounding",
                format!("the outcome must describe what happens when the player tries: {action}"),
            ));
        }

        if let Some(expected) = self.expected
            && expected != value.success
        {
            let wanted = if expected { "SUCCESS" } else { "FAILURE" };
            violations.push(Violation::new(
                "verdict-mismatch",
                format!("the verdict for this action has been decided: it must be {wanted}"),
            ));
        }

        verdict_of(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_marker_layout() {
        let rules = ContentRules::default();
        let contract = VerdictContract::new(&rules, None);
        let verdict = contract
            .accept("VERDICT: SUCCESS\nOUTCOME: You slip behind the crates as the beam sweeps past.")
            .unwrap();
        assert!(verdict.success);
        assert!(verdict.outcome.starts_with("You slip"));
    }

    #[test]
    fn test_parses_json_layout() {
        let rules = ContentRules::default();
        let contract = VerdictContract::new(&rules, None);
        let verdict = contract
            .accept(r#"Sure: {"success": false, "outcome": "The hornets find you first."}"#)
            .unwrap();
        assert!(!verdict.success);
    }

    #[test]
    fn test_json_string_verdict() {
        let rules = ContentRules::default();
        let contract = VerdictContract::new(&rules, None);
        let verdict = contract
            .accept(r#"{"verdict": "Failed", "outcome": "The ice cracks beneath you."}"#)
            .unwrap();
        assert!(!verdict.success);
    }

    #[test]
    fn test_truncated_outcome_is_cut_back() {
        let rules = ContentRules::default();
        let contract = VerdictContract::new(&rules, None);
        let verdict = contract
            .accept("VERDICT: FAILURE OUTCOME: You leap too late. The water swallows your")
            .unwrap();
        assert_eq!(verdict.outcome, "You leap too late.");
    }

    #[test]
    fn test_missing_verdict_is_format_violation() {
        let rules = ContentRules::default();
        let contract = VerdictContract::new(&rules, None);
        let violations = contract.accept("OUTCOME: Something happens.").unwrap_err();
        assert!(violations.iter().any(|v| v.rule == "format"));
    }

    #[test]
    fn test_rejects_mismatched_decided_verdict() {
        let rules = ContentRules::default();
        let contract = VerdictContract::new(&rules, Some(true));
        let violations = contract
            .accept("VERDICT: FAILURE\nOUTCOME: The rope snaps.")
            .unwrap_err();
        assert!(violations.iter().any(|v| v.rule == "verdict-mismatch"));
    }

    #[test]
    fn test_rejects_long_outcome() {
        let rules = ContentRules::default();
        let contract = VerdictContract::new(&rules, None);
        let verdict = ActionVerdict::new(
            true,
            "You run. You hide. You wait. You breathe.",
        );
        let violations = contract.validate(&verdict).unwrap_err();
        assert!(violations.iter().any(|v| v.rule == "sentence-count"));
    }

    #[test]
    fn test_grounded_outcome_mentions_action_or_scenario() {
        let rules = ContentRules::default();
        let scenario = "A forklift rolls toward the loading dock while you stand on the pallet.";
        let contract = VerdictContract::new(&rules, None)
            .grounded_in(scenario, "I leap onto the stacked crates");

        let from_action = ActionVerdict::new(true, "You land on the crates as the forklift passes.");
        assert!(contract.validate(&from_action).is_ok());

        let from_scenario = ActionVerdict::new(false, "The forklift clips your heel and you go down.");
        assert!(contract.validate(&from_scenario).is_ok());

        let unrelated = ActionVerdict::new(true, "Everything turns out fine in the end.");
        let violations = contract.validate(&unrelated).unwrap_err();
        assert!(violations.iter().any(|v| v.rule == "grounding"));
    }

    #[test]
    fn test_grounding_skipped_for_actions_without_content() {
        let rules = ContentRules::default();
        let contract = VerdictContract::new(&rules, None).grounded_in("Smoke fills the hall.", "I do it");
        let verdict = ActionVerdict::new(false, "Nothing good comes of that.");
        assert!(contract.validate(&verdict).is_ok());
    }
}
