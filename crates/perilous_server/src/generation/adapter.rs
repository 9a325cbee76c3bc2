//! The model-backed [`ContentSource`].

use super::pipeline::{self, ArtifactKind, Attempt, ContractAttempt};
use super::{
    BotActionRequest, ContentSource, GenerationSettings, PuzzleRequest, ScenarioRequest,
    VerdictRequest, prompts, selector_for,
};
use crate::llm::{GenerateOptions, Prompt, TextGenerator};
use async_trait::async_trait;
use perilous_rules::{
    ActionVerdict, BotAction, BotActionContract, ContentRules, GeneratedPuzzle, Leaning,
    PerilLevel, PuzzleContract, Scenario, ScenarioContract, VerdictContract, Violation,
    assess_action, fallback, implied_options, text,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, instrument};

const PARAGRAPH_BREAK: &str = "\n\n";

/// Generates content through a [`TextGenerator`], falling back to curated
/// pools when the model cannot satisfy a contract.
pub struct ContentGenerator {
    generator: Arc<dyn TextGenerator>,
    rules: ContentRules,
    settings: GenerationSettings,
    rng: Mutex<StdRng>,
}

impl std::fmt::Debug for ContentGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentGenerator")
            .field("generator", &self.generator.name())
            .field("settings", &self.settings)
            .finish()
    }
}

impl ContentGenerator {
    /// Creates an adapter with an OS-seeded random source.
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        rules: ContentRules,
        settings: GenerationSettings,
    ) -> Self {
        Self::with_rng(generator, rules, settings, StdRng::from_os_rng())
    }

    /// Creates an adapter whose verdict rolls repeat for a given seed.
    pub fn seeded(
        generator: Arc<dyn TextGenerator>,
        rules: ContentRules,
        settings: GenerationSettings,
        seed: u64,
    ) -> Self {
        Self::with_rng(generator, rules, settings, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        generator: Arc<dyn TextGenerator>,
        rules: ContentRules,
        settings: GenerationSettings,
        rng: StdRng,
    ) -> Self {
        info!(generator = generator.name(), "Creating content generator");
        Self {
            generator,
            rules,
            settings,
            rng: Mutex::new(rng),
        }
    }

    /// Content rules every value is checked against.
    pub fn rules(&self) -> &ContentRules {
        &self.rules
    }

    fn roll(&self) -> f64 {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.random::<f64>()
    }

    fn options(&self, temperature: f32, max_tokens: u32, stop: &[&str]) -> GenerateOptions {
        GenerateOptions::new(
            temperature,
            max_tokens,
            stop.iter().map(|s| s.to_string()).collect(),
        )
    }
}

/// Puzzle attempts keep an accepted phrase and only regenerate the category.
struct PuzzleAttempt<'a> {
    contract: PuzzleContract<'a>,
    rules: &'a ContentRules,
    phrase: Option<String>,
}

impl Attempt for PuzzleAttempt<'_> {
    type Value = GeneratedPuzzle;

    fn evaluate(&mut self, raw: &str) -> Result<GeneratedPuzzle, Vec<Violation>> {
        if let Some(phrase) = &self.phrase {
            let (_, category) = self.contract.fields(raw);
            let category = category.unwrap_or_else(|| text::strip_preamble(raw));
            let category = self.contract.accept_category(&category, phrase)?;
            return Ok(GeneratedPuzzle::new(phrase.clone(), category));
        }

        let (phrase, category) = self.contract.fields(raw);
        let Some(phrase) = phrase else {
            return Err(vec![Violation::new(
                "format",
                "reply with PHRASE: <PHRASE> | CATEGORY: <Category>",
            )]);
        };
        let phrase = self.contract.accept_phrase(&phrase)?;
        let Some(category) = category else {
            self.phrase = Some(phrase);
            return Err(vec![Violation::new("format", "the category was missing")]);
        };
        match self.contract.accept_category(&category, &phrase) {
            Ok(category) => Ok(GeneratedPuzzle::new(phrase, category)),
            Err(violations) => {
                self.phrase = Some(phrase);
                Err(violations)
            }
        }
    }

    fn repair(&self, original: &Prompt, raw: &str, violations: &[Violation]) -> Prompt {
        match &self.phrase {
            Some(phrase) => prompts::category(self.rules, phrase, violations),
            None => prompts::repair(original, raw, violations),
        }
    }
}

#[async_trait]
impl ContentSource for ContentGenerator {
    #[instrument(skip(self, request), fields(round = request.round, recent = request.recent.len()))]
    async fn scenario(&self, request: ScenarioRequest<'_>) -> Scenario {
        let contract = ScenarioContract::new(&self.rules, request.recent);
        let prompt = prompts::scenario(&self.rules, request.recent);
        let options = self.options(
            self.settings.temperatures().scenario,
            self.settings.max_tokens().scenario,
            &[],
        );
        let mut attempt = ContractAttempt(contract);
        match pipeline::run(
            self.generator.as_ref(),
            &self.settings,
            ArtifactKind::Scenario,
            &mut attempt,
            prompt,
            options,
        )
        .await
        {
            Ok(scenario) => scenario,
            Err(_) => fallback::scenario(request.recent, u64::from(request.round)),
        }
    }

    #[instrument(skip(self, request), fields(difficulty = %request.difficulty))]
    async fn puzzle(&self, request: PuzzleRequest<'_>) -> GeneratedPuzzle {
        let contract = PuzzleContract::new(&self.rules, request.difficulty, request.recent);
        let prompt = prompts::puzzle(&self.rules, request.difficulty, request.recent);
        let options = self.options(
            self.settings.temperatures().puzzle,
            self.settings.max_tokens().puzzle,
            &[PARAGRAPH_BREAK],
        );
        let mut attempt = PuzzleAttempt {
            contract,
            rules: &self.rules,
            phrase: None,
        };
        match pipeline::run(
            self.generator.as_ref(),
            &self.settings,
            ArtifactKind::Puzzle,
            &mut attempt,
            prompt,
            options,
        )
        .await
        {
            Ok(puzzle) => puzzle,
            Err(_) => fallback::puzzle(request.difficulty, request.recent, request.selector),
        }
    }

    /// Judges an action.
    ///
    /// The result is rolled up front from the action's leaning. For
    /// ambiguous actions the model only narrates the roll and the fallback
    /// reuses it; otherwise the model decides and the fallback follows the
    /// leaning.
    #[instrument(skip(self, request))]
    async fn verdict(&self, request: VerdictRequest<'_>) -> ActionVerdict {
        let leaning = assess_action(request.action);
        let decided = leaning.decide(self.rules.verdict_weights(), self.roll());
        let expected = (leaning == Leaning::Ambiguous).then_some(decided);
        info!(%leaning, decided, pinned = expected.is_some(), "Rolled verdict");

        let contract = VerdictContract::new(&self.rules, expected)
            .grounded_in(request.scenario, request.action);
        let prompt = prompts::verdict(
            &self.rules,
            request.scenario,
            request.action,
            leaning,
            expected,
        );
        let options = self.options(
            self.settings.temperatures().verdict,
            self.settings.max_tokens().verdict,
            &[],
        );
        let mut attempt = ContractAttempt(contract);
        match pipeline::run(
            self.generator.as_ref(),
            &self.settings,
            ArtifactKind::Verdict,
            &mut attempt,
            prompt,
            options,
        )
        .await
        {
            Ok(verdict) => verdict,
            Err(_) => fallback::verdict(
                request.action,
                leaning.fallback_success(decided),
                selector_for(request.action),
            ),
        }
    }

    #[instrument(skip(self, request), fields(lives = request.lives, round = request.round))]
    async fn bot_action(&self, request: BotActionRequest<'_>) -> BotAction {
        let peril = PerilLevel::from_lives(request.lives);
        let options = implied_options(request.scenario);
        let contract = BotActionContract::new(&self.rules, &options);
        let prompt = prompts::bot_action(&self.rules, request.scenario, &options, peril);
        let generate = self.options(
            self.settings.temperatures().bot_action,
            self.settings.max_tokens().bot_action,
            &[PARAGRAPH_BREAK],
        );
        let mut attempt = ContractAttempt(contract);
        match pipeline::run(
            self.generator.as_ref(),
            &self.settings,
            ArtifactKind::BotAction,
            &mut attempt,
            prompt,
            generate,
        )
        .await
        {
            Ok(action) => action,
            Err(_) => fallback::bot_action(&self.rules, peril, &options, u64::from(request.round)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedGenerator;
    use perilous_rules::{Contract, Difficulty};

    const VALID_SCENARIO: &str = "A runaway hot air balloon drags its basket across the county fair \
        while you cling to the rope, and you could either let go above the hay bales or climb \
        into the basket and pull the vent cord. What do you do?";

    fn adapter(script: &Arc<ScriptedGenerator>) -> ContentGenerator {
        ContentGenerator::seeded(
            script.clone(),
            ContentRules::default(),
            GenerationSettings::default().with_timeout_ms(1_000),
            7,
        )
    }

    #[tokio::test]
    async fn test_valid_scenario_is_used_first_time() {
        let script = Arc::new(ScriptedGenerator::new([VALID_SCENARIO]));
        let scenario = adapter(&script)
            .scenario(ScenarioRequest {
                recent: &[],
                round: 1,
            })
            .await;
        assert!(scenario.text().starts_with("A runaway hot air balloon"));
        assert_eq!(script.calls(), 1);
    }

    #[tokio::test]
    async fn test_category_only_repair_keeps_phrase() {
        let script = Arc::new(ScriptedGenerator::new([
            "PHRASE: NIGHT OWL | CATEGORY: Things",
            "CATEGORY: Sleep Habits",
        ]));
        let puzzle = adapter(&script)
            .puzzle(PuzzleRequest {
                difficulty: Difficulty::Easy,
                recent: &[],
                selector: 0,
            })
            .await;
        assert_eq!(puzzle, GeneratedPuzzle::new("NIGHT OWL", "Sleep Habits"));

        let prompts = script.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].user().contains("The phrase is: NIGHT OWL"));
    }

    #[tokio::test]
    async fn test_ambiguous_verdict_must_match_roll() {
        let rules = ContentRules::default();
        let script = Arc::new(ScriptedGenerator::new([
            "VERDICT: SUCCESS\nOUTCOME: The blue door swings open onto a quiet hallway.",
            "VERDICT: FAILURE\nOUTCOME: The blue door sticks and the alarm starts to wail.",
        ]));
        let verdict = adapter(&script)
            .verdict(VerdictRequest {
                scenario: VALID_SCENARIO,
                action: "I open the blue door",
            })
            .await;
        assert!(VerdictContract::new(&rules, Some(verdict.success)).validate(&verdict).is_ok());
    }

    #[tokio::test]
    async fn test_bot_action_falls_back_after_three_rejections() {
        let rules = ContentRules::default();
        let script = Arc::new(ScriptedGenerator::new(["The bot waits.", "no", "nope"]));
        let action = adapter(&script)
            .bot_action(BotActionRequest {
                scenario: VALID_SCENARIO,
                lives: 1,
                round: 4,
            })
            .await;
        assert_eq!(script.calls(), 3);
        let options = implied_options(VALID_SCENARIO);
        assert!(BotActionContract::new(&rules, &options).validate(&action).is_ok());
        assert!(action.text().contains("desperately"));
    }
}
