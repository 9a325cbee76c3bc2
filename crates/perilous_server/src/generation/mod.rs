//! Generation adapter: free text in, strictly valid game content out.
//!
//! Every artifact goes through one pipeline. The adapter renders a strict
//! instruction, calls the [`TextGenerator`](crate::llm::TextGenerator),
//! parses and validates the response against the artifact's contract, and
//! issues repair calls restating the broken rules. When attempts run out it
//! picks a curated fallback, so callers always receive a valid value.

mod adapter;
mod pipeline;
pub mod prompts;
mod settings;

pub use adapter::ContentGenerator;
pub use pipeline::{ArtifactKind, GenerationExhausted};
pub use settings::{GenerationSettings, PerArtifact};

use async_trait::async_trait;
use perilous_rules::{ActionVerdict, BotAction, Difficulty, GeneratedPuzzle, Scenario};

/// Context for the next scenario.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioRequest<'a> {
    /// Scenarios the new one must not repeat, oldest first.
    pub recent: &'a [String],
    /// Round the scenario is for.
    pub round: u32,
}

/// Context for a puzzle.
#[derive(Debug, Clone, Copy)]
pub struct PuzzleRequest<'a> {
    /// Target difficulty.
    pub difficulty: Difficulty,
    /// Phrases to avoid.
    pub recent: &'a [String],
    /// Deterministic fallback selector.
    pub selector: u64,
}

/// Context for judging an action.
#[derive(Debug, Clone, Copy)]
pub struct VerdictRequest<'a> {
    /// Scenario the player faced.
    pub scenario: &'a str,
    /// What the player did.
    pub action: &'a str,
}

/// Context for a bot's move.
#[derive(Debug, Clone, Copy)]
pub struct BotActionRequest<'a> {
    /// Scenario the bot faces.
    pub scenario: &'a str,
    /// Lives the bot has left.
    pub lives: u8,
    /// Current round, used as fallback selector.
    pub round: u32,
}

/// Source of validated content for the state machine.
///
/// Implementations never fail: whatever happens underneath, they return a
/// value satisfying the artifact's contract.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Next danger scenario.
    async fn scenario(&self, request: ScenarioRequest<'_>) -> Scenario;

    /// Puzzle phrase and category.
    async fn puzzle(&self, request: PuzzleRequest<'_>) -> GeneratedPuzzle;

    /// Verdict for a player's action.
    async fn verdict(&self, request: VerdictRequest<'_>) -> ActionVerdict;

    /// A bot's action sentence.
    async fn bot_action(&self, request: BotActionRequest<'_>) -> BotAction;
}

/// Stable 64-bit FNV-1a hash, used to pick fallbacks from free text.
pub fn selector_for(text: &str) -> u64 {
    text.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_is_stable() {
        assert_eq!(selector_for(""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(selector_for("I hide"), selector_for("I hide"));
        assert_ne!(selector_for("I hide"), selector_for("I run"));
    }
}
