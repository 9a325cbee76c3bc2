//! Tuning for the generation adapter.

use derive_getters::Getters;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};

/// One value per artifact kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerArtifact<T> {
    /// Next danger scenario.
    pub scenario: T,
    /// Puzzle phrase and category.
    pub puzzle: T,
    /// Action verdict.
    pub verdict: T,
    /// Bot action sentence.
    pub bot_action: T,
}

/// Attempts, temperatures and limits for every artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, Setters)]
#[serde(default)]
#[setters(prefix = "with_")]
pub struct GenerationSettings {
    /// Calls per artifact, the first included, before falling back.
    max_attempts: u32,
    /// Sampling temperature of the first call.
    temperatures: PerArtifact<f32>,
    /// Temperature drop applied to each repair call.
    repair_step: f32,
    /// Lowest temperature a repair call uses.
    min_temperature: f32,
    /// Output token bound per call.
    max_tokens: PerArtifact<u32>,
    /// Per-call timeout in milliseconds; a timed-out call is a failed attempt.
    #[setters(strip_option)]
    timeout_ms: Option<u64>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            temperatures: PerArtifact {
                scenario: 0.9,
                puzzle: 0.7,
                verdict: 0.6,
                bot_action: 0.8,
            },
            repair_step: 0.2,
            min_temperature: 0.1,
            max_tokens: PerArtifact {
                scenario: 160,
                puzzle: 60,
                verdict: 160,
                bot_action: 80,
            },
            timeout_ms: Some(20_000),
        }
    }
}

impl GenerationSettings {
    /// Temperature for a zero-based attempt, stepping down on each repair.
    pub fn temperature_for(&self, base: f32, attempt: u32) -> f32 {
        let lowered = base - self.repair_step * attempt as f32;
        lowered.max(self.min_temperature).min(base)
    }
}
