//! Text-generation port: prompt in, free text out.
//!
//! The adapter in [`crate::generation`] only ever sees [`TextGenerator`].
//! [`LlmClient`] talks to a hosted model; [`OfflineGenerator`] always fails
//! so every artifact comes from the curated fallback pools.

mod client;
mod offline;

pub use client::{LlmClient, LlmConfig, LlmError, LlmProvider};
pub use offline::OfflineGenerator;

use async_trait::async_trait;
use derive_getters::Getters;
use derive_new::new;

/// System instruction plus user message for one call.
#[derive(Debug, Clone, PartialEq, Eq, Getters, new)]
pub struct Prompt {
    /// Instruction describing the exact output format.
    system: String,
    /// Context and request for this call.
    user: String,
}

/// Sampling options for one call.
#[derive(Debug, Clone, PartialEq, Getters, new)]
pub struct GenerateOptions {
    /// Sampling temperature.
    temperature: f32,
    /// Upper bound on output tokens.
    max_output_tokens: u32,
    /// Sequences that end generation early.
    stop: Vec<String>,
}

impl GenerateOptions {
    /// Returns a copy with a different temperature.
    pub fn with_temperature(&self, temperature: f32) -> Self {
        Self {
            temperature,
            ..self.clone()
        }
    }
}

/// A free-text generation capability.
///
/// Implementations report transport failures and malformed responses as
/// [`LlmError`]; the caller treats both as a failed attempt.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Generates text for a prompt.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] if the call fails or the response has no text.
    async fn generate(&self, prompt: &Prompt, options: &GenerateOptions)
    -> Result<String, LlmError>;
}
