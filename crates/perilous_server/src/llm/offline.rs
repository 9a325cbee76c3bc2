//! A generator with no model behind it.

use super::{GenerateOptions, LlmError, Prompt, TextGenerator};
use async_trait::async_trait;
use tracing::debug;

/// Always fails, so the adapter serves every artifact from its fallback pools.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineGenerator;

#[async_trait]
impl TextGenerator for OfflineGenerator {
    fn name(&self) -> &str {
        "offline"
    }

    async fn generate(
        &self,
        _prompt: &Prompt,
        _options: &GenerateOptions,
    ) -> Result<String, LlmError> {
        debug!("Offline generator declining call");
        Err(LlmError::new("text generation is offline"))
    }
}
