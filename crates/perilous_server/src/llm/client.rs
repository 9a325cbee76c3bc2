//! Hosted model client for OpenAI and Anthropic.

use super::{GenerateOptions, Prompt, TextGenerator};
use async_openai::{
    Client as OpenAIClient,
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Chat completions accept at most this many stop sequences.
const OPENAI_MAX_STOP: usize = 4;

/// LLM provider selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// OpenAI chat completions.
    #[default]
    OpenAI,
    /// Anthropic messages.
    Anthropic,
}

impl LlmProvider {
    /// Environment variable holding this provider's API key.
    pub fn api_key_var(self) -> &'static str {
        match self {
            Self::OpenAI => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

/// Connection settings for [`LlmClient`].
#[derive(Debug, Clone)]
pub struct LlmConfig {
    provider: LlmProvider,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl LlmConfig {
    /// Creates a new LLM configuration.
    #[instrument(skip(api_key), fields(provider = ?provider, model = %model))]
    pub fn new(provider: LlmProvider, api_key: String, model: String, max_tokens: u32) -> Self {
        debug!("Creating LLM config");
        Self {
            provider,
            api_key,
            model,
            max_tokens,
        }
    }

    /// Gets the provider.
    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    /// Gets the model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Hard ceiling on output tokens for any call.
    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

/// Client that generates text through a hosted model.
#[derive(Clone)]
pub struct LlmClient {
    config: LlmConfig,
    http: reqwest::Client,
    openai: OpenAIClient<OpenAIConfig>,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("provider", &self.config.provider)
            .field("model", &self.config.model)
            .finish()
    }
}

impl LlmClient {
    /// Creates a new LLM client.
    #[instrument(skip(config), fields(provider = ?config.provider()))]
    pub fn new(config: LlmConfig) -> Self {
        info!(model = %config.model, "Creating LLM client");
        let openai =
            OpenAIClient::with_config(OpenAIConfig::new().with_api_key(config.api_key.clone()));
        Self {
            config,
            http: reqwest::Client::new(),
            openai,
        }
    }

    /// Gets the configuration.
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn output_tokens(&self, options: &GenerateOptions) -> u32 {
        (*options.max_output_tokens()).min(self.config.max_tokens)
    }

    /// Generates a completion using Anthropic messages.
    #[instrument(skip_all)]
    async fn generate_anthropic(
        &self,
        prompt: &Prompt,
        options: &GenerateOptions,
    ) -> Result<String, LlmError> {
        debug!("Building Anthropic API request");
        let mut request_body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.output_tokens(options),
            "temperature": options.temperature(),
            "system": prompt.system(),
            "messages": [
                {
                    "role": "user",
                    "content": prompt.user()
                }
            ]
        });
        if !options.stop().is_empty() {
            request_body["stop_sequences"] = serde_json::json!(options.stop());
        }

        debug!("Sending request to Anthropic");
        let response = self
            .http
            .post(ANTHROPIC_URL)
            .header("x-api-key", self.config.api_key.clone())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| LlmError::new(format!("Anthropic API request failed: {}", e)))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| LlmError::new(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(LlmError::new(format!(
                "Anthropic API error {}: {}",
                status, response_text
            )));
        }

        let response_json: serde_json::Value = serde_json::from_str(&response_text)
            .map_err(|e| LlmError::new(format!("Failed to parse response: {}", e)))?;

        let content = response_json["content"][0]["text"]
            .as_str()
            .ok_or_else(|| LlmError::new("No text content in Anthropic response"))?
            .to_string();

        info!(content_length = content.len(), "Generated completion");
        Ok(content)
    }

    /// Builds a chat completion request.
    fn openai_request(
        &self,
        prompt: &Prompt,
        options: &GenerateOptions,
    ) -> Result<CreateChatCompletionRequest, LlmError> {
        debug!("Building chat completion request");
        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(prompt.system().as_str())
                    .build()
                    .map_err(|e| LlmError::new(format!("Failed to build system message: {}", e)))?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt.user().as_str())
                    .build()
                    .map_err(|e| LlmError::new(format!("Failed to build user message: {}", e)))?,
            ),
        ];

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.config.model)
            .messages(messages)
            .max_completion_tokens(self.output_tokens(options))
            .temperature(*options.temperature());
        if !options.stop().is_empty() {
            let stop: Vec<String> = options
                .stop()
                .iter()
                .take(OPENAI_MAX_STOP)
                .cloned()
                .collect();
            args.stop(stop);
        }
        args.build()
            .map_err(|e| LlmError::new(format!("Failed to build request: {}", e)))
    }

    /// Generates a completion using OpenAI chat completions.
    #[instrument(skip_all)]
    async fn generate_openai(
        &self,
        prompt: &Prompt,
        options: &GenerateOptions,
    ) -> Result<String, LlmError> {
        let request = self.openai_request(prompt, options)?;

        debug!("Sending request to OpenAI");
        let response = self
            .openai
            .chat()
            .create(request)
            .await
            .map_err(|e| LlmError::new(format!("OpenAI API error: {}", e)))?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| LlmError::new("No content in OpenAI response"))?;

        info!(content_length = content.len(), "Generated completion");
        Ok(content)
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    #[instrument(skip(self, prompt, options), fields(provider = ?self.config.provider, model = %self.config.model))]
    async fn generate(
        &self,
        prompt: &Prompt,
        options: &GenerateOptions,
    ) -> Result<String, LlmError> {
        debug!(temperature = options.temperature(), "Generating completion");
        match self.config.provider {
            LlmProvider::OpenAI => self.generate_openai(prompt, options).await,
            LlmProvider::Anthropic => self.generate_anthropic(prompt, options).await,
        }
    }
}

/// LLM client error.
#[derive(Debug, Clone, Display, Error)]
#[display("LLM error: {} at {}:{}", message, file, line)]
pub struct LlmError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl LlmError {
    /// Creates a new LLM error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        let message = message.into();
        error!(error_message = %message, "LLM error created");
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
