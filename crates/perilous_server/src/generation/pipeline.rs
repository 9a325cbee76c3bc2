//! The parse, validate and repair loop shared by every artifact kind.

use super::{GenerationSettings, prompts};
use crate::llm::{GenerateOptions, Prompt, TextGenerator};
use perilous_rules::{Contract, Violation};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Artifact kinds the adapter produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ArtifactKind {
    /// Next danger scenario.
    Scenario,
    /// Puzzle phrase and category.
    Puzzle,
    /// Action verdict.
    Verdict,
    /// Bot action sentence.
    BotAction,
}

/// Every attempt for an artifact failed.
///
/// Never leaves the adapter: the caller answers it with a fallback value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("{kind} generation exhausted after {attempts} attempts")]
pub struct GenerationExhausted {
    /// Artifact that could not be generated.
    pub kind: ArtifactKind,
    /// Calls made.
    pub attempts: u32,
}

/// Turns raw responses into a value and says how to ask again.
pub(crate) trait Attempt {
    /// The value being generated.
    type Value;

    /// Parses and validates one response.
    fn evaluate(&mut self, raw: &str) -> Result<Self::Value, Vec<Violation>>;

    /// Instruction for the next call after `raw` broke `violations`.
    fn repair(&self, original: &Prompt, raw: &str, violations: &[Violation]) -> Prompt;
}

/// Any contract is an attempt that repairs by restating the broken rules.
pub(crate) struct ContractAttempt<C>(pub C);

impl<C: Contract> Attempt for ContractAttempt<C> {
    type Value = C::Value;

    fn evaluate(&mut self, raw: &str) -> Result<C::Value, Vec<Violation>> {
        self.0.accept(raw)
    }

    fn repair(&self, original: &Prompt, raw: &str, violations: &[Violation]) -> Prompt {
        prompts::repair(original, raw, violations)
    }
}

/// Runs up to `max_attempts` calls, returning the first value that passes.
///
/// Transport errors, timeouts and rejected responses all count as failed
/// attempts. A rejected response turns the next call into a repair; a
/// transport failure retries the last instruction.
///
/// # Errors
///
/// Returns [`GenerationExhausted`] when every attempt failed.
#[instrument(skip_all, fields(kind = %kind, generator = generator.name()))]
pub(crate) async fn run<A>(
    generator: &dyn TextGenerator,
    settings: &GenerationSettings,
    kind: ArtifactKind,
    attempt: &mut A,
    prompt: Prompt,
    options: GenerateOptions,
) -> Result<A::Value, GenerationExhausted>
where
    A: Attempt + Send,
{
    let base = *options.temperature();
    let timeout = (*settings.timeout_ms()).map(Duration::from_millis);
    let mut next = prompt.clone();

    for number in 0..*settings.max_attempts() {
        let options = options.with_temperature(settings.temperature_for(base, number));
        debug!(attempt = number + 1, temperature = options.temperature(), "Calling generator");

        let call = generator.generate(&next, &options);
        let response = match timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(response) => response,
                Err(_) => {
                    warn!(attempt = number + 1, timeout_ms = limit.as_millis() as u64, "Generation timed out");
                    continue;
                }
            },
            None => call.await,
        };

        let raw = match response {
            Ok(raw) => raw,
            Err(e) => {
                warn!(attempt = number + 1, error = %e.message, "Generation call failed");
                continue;
            }
        };

        match attempt.evaluate(&raw) {
            Ok(value) => {
                info!(attempt = number + 1, "Generated value accepted");
                return Ok(value);
            }
            Err(violations) => {
                let rules: Vec<&str> = violations.iter().map(|v| v.rule).collect();
                warn!(attempt = number + 1, ?rules, "Generated value rejected");
                next = attempt.repair(&prompt, &raw, &violations);
            }
        }
    }

    let exhausted = GenerationExhausted {
        kind,
        attempts: *settings.max_attempts(),
    };
    warn!(%exhausted, "Falling back");
    Err(exhausted)
}
