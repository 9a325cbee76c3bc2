//! Test doubles for the generation seams.
//!
//! - [`ScriptedGenerator`] replays queued responses through the real
//!   adapter and records every prompt it receives.
//! - [`FixedContent`] skips generation entirely and serves valid content
//!   with scripted verdicts, for driving the state machine.
//!
//! ```
//! use perilous_server::testing::ScriptedGenerator;
//!
//! let script = ScriptedGenerator::new(["PHRASE: NIGHT OWL | CATEGORY: Sleep Habits"]);
//! assert_eq!(script.remaining(), 1);
//! ```

use crate::generation::{
    BotActionRequest, ContentSource, PuzzleRequest, ScenarioRequest, VerdictRequest,
};
use crate::llm::{GenerateOptions, LlmError, Prompt, TextGenerator};
use async_trait::async_trait;
use perilous_rules::{
    ActionVerdict, BotAction, ContentRules, GeneratedPuzzle, PerilLevel, Scenario, fallback,
    implied_options,
};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Replays queued responses in order; fails once the queue is empty.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<Prompt>>,
}

impl ScriptedGenerator {
    /// Queues successful responses.
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let generator = Self::default();
        for response in responses {
            generator.push(response);
        }
        generator
    }

    /// Queues a successful response.
    pub fn push(&self, response: impl Into<String>) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Ok(response.into()));
    }

    /// Queues a transport failure.
    pub fn push_failure(&self, message: impl Into<String>) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Err(message.into()));
    }

    /// Responses not yet consumed.
    pub fn remaining(&self) -> usize {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Every prompt received, in order.
    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of calls made.
    pub fn calls(&self) -> usize {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        prompt: &Prompt,
        _options: &GenerateOptions,
    ) -> Result<String, LlmError> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.clone());
        let next = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match next {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(LlmError::new(message)),
            None => Err(LlmError::new("script exhausted")),
        }
    }
}

/// Valid content without a model. Verdicts come from a queue, then a default.
#[derive(Debug)]
pub struct FixedContent {
    verdicts: Mutex<VecDeque<bool>>,
    default_success: bool,
    puzzle: GeneratedPuzzle,
    rules: ContentRules,
}

impl Default for FixedContent {
    fn default() -> Self {
        Self::succeeding()
    }
}

impl FixedContent {
    /// Every action succeeds.
    pub fn succeeding() -> Self {
        Self::with_default(true)
    }

    /// Every action fails.
    pub fn failing() -> Self {
        Self::with_default(false)
    }

    fn with_default(default_success: bool) -> Self {
        Self {
            verdicts: Mutex::new(VecDeque::new()),
            default_success,
            puzzle: GeneratedPuzzle::new("HOT POTATO", "Party Games"),
            rules: ContentRules::default(),
        }
    }

    /// Serves `puzzle` instead of the default.
    pub fn with_puzzle(mut self, puzzle: GeneratedPuzzle) -> Self {
        self.puzzle = puzzle;
        self
    }

    /// Queues verdicts to hand out before the default.
    pub fn with_verdicts(self, verdicts: impl IntoIterator<Item = bool>) -> Self {
        self.verdicts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(verdicts);
        self
    }

    fn next_verdict(&self) -> bool {
        self.verdicts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(self.default_success)
    }
}

#[async_trait]
impl ContentSource for FixedContent {
    async fn scenario(&self, request: ScenarioRequest<'_>) -> Scenario {
        fallback::scenario(request.recent, u64::from(request.round))
    }

    async fn puzzle(&self, _request: PuzzleRequest<'_>) -> GeneratedPuzzle {
        self.puzzle.clone()
    }

    async fn verdict(&self, request: VerdictRequest<'_>) -> ActionVerdict {
        let success = self.next_verdict();
        fallback::verdict(request.action, success, 0)
    }

    async fn bot_action(&self, request: BotActionRequest<'_>) -> BotAction {
        let options = implied_options(request.scenario);
        fallback::bot_action(
            &self.rules,
            PerilLevel::from_lives(request.lives),
            &options,
            u64::from(request.round),
        )
    }
}
