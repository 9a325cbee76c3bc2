//! Content contracts for generated artifacts.
//!
//! A contract pairs a tolerant parser with hard validators. Parsing turns raw
//! model text into a typed value; validation checks every rule the value must
//! satisfy. Both report failures as [`Violation`]s whose descriptions are
//! written to be restated verbatim in a repair prompt.

mod bot_action;
mod puzzle;
mod scenario;
pub mod text;
mod verdict;

pub use bot_action::{BotAction, BotActionContract, implied_options};
pub use puzzle::{GeneratedPuzzle, PuzzleContract};
pub use scenario::{Scenario, ScenarioContract};
pub use verdict::{ActionVerdict, VerdictContract};

/// A single broken rule.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
#[display("{rule}: {description}")]
pub struct Violation {
    /// Short identifier of the rule, e.g. `word-count`.
    pub rule: &'static str,
    /// Human-readable description of what was wrong.
    pub description: String,
}

impl Violation {
    /// Creates a new violation.
    pub fn new(rule: &'static str, description: impl Into<String>) -> Self {
        Self {
            rule,
            description: description.into(),
        }
    }
}

/// Structural and semantic rules for one kind of generated artifact.
///
/// Mirrors a pre/post contract: [`Contract::parse`] establishes the shape,
/// [`Contract::validate`] checks the meaning.
pub trait Contract {
    /// The typed value this contract produces.
    type Value;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Parses raw text into a value.
    ///
    /// # Errors
    ///
    /// Returns the violations that prevented a value from being read.
    fn parse(&self, raw: &str) -> Result<Self::Value, Vec<Violation>>;

    /// Checks every hard rule against a parsed value.
    ///
    /// # Errors
    ///
    /// Returns all violated rules, not just the first.
    fn validate(&self, value: &Self::Value) -> Result<(), Vec<Violation>>;

    /// Parses and validates in one step.
    ///
    /// # Errors
    ///
    /// Returns parse violations, or validation violations if parsing succeeded.
    fn accept(&self, raw: &str) -> Result<Self::Value, Vec<Violation>> {
        let value = self.parse(raw)?;
        self.validate(&value)?;
        Ok(value)
    }
}

/// Collects violations into a result.
pub(crate) fn verdict_of(violations: Vec<Violation>) -> Result<(), Vec<Violation>> {
    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}
