//! Server configuration loaded from TOML.

use crate::generation::GenerationSettings;
use crate::llm::{LlmConfig, LlmProvider};
use derive_getters::Getters;
use derive_more::{Display, Error};
use perilous_rules::ContentRules;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// HTTP and pacing settings.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct ServerSection {
    /// Address to bind.
    #[serde(default = "default_host")]
    host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    port: u16,

    /// Drive bots in the background after each request.
    #[serde(default = "default_auto_bots")]
    auto_bots: bool,

    /// Pause before each bot move, in milliseconds.
    #[serde(default = "default_bot_think_ms")]
    bot_think_ms: u64,

    /// Upper bound on consecutive bot moves per drive.
    #[serde(default = "default_max_bot_steps")]
    max_bot_steps: usize,
}

#[instrument]
fn default_host() -> String {
    "127.0.0.1".to_string()
}

#[instrument]
fn default_port() -> u16 {
    3000
}

#[instrument]
fn default_auto_bots() -> bool {
    true
}

#[instrument]
fn default_bot_think_ms() -> u64 {
    1_500
}

#[instrument]
fn default_max_bot_steps() -> usize {
    500
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            auto_bots: default_auto_bots(),
            bot_think_ms: default_bot_think_ms(),
            max_bot_steps: default_max_bot_steps(),
        }
    }
}

/// Where games are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process map; games vanish on restart.
    #[default]
    Memory,
    /// SQLite file.
    Sqlite,
}

/// Persistence settings.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct StoreSection {
    /// Backend to use.
    #[serde(default)]
    backend: StoreBackend,

    /// SQLite database path.
    #[serde(default = "default_db_path")]
    path: String,

    /// Seconds a game is kept after its last save.
    #[serde(default = "default_ttl_secs")]
    ttl_secs: Option<u64>,
}

#[instrument]
fn default_db_path() -> String {
    "perilous.db".to_string()
}

#[instrument]
fn default_ttl_secs() -> Option<u64> {
    Some(24 * 60 * 60)
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_db_path(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl StoreSection {
    /// TTL as a duration.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }
}

/// Text-generation model settings.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct LlmSection {
    /// Use a hosted model; when off, content comes from the fallback pools.
    #[serde(default = "default_enabled")]
    enabled: bool,

    /// LLM provider (openai or anthropic).
    #[serde(default)]
    provider: LlmProvider,

    /// Model name.
    #[serde(default = "default_model")]
    model: String,

    /// Ceiling on output tokens for any call.
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,
}

#[instrument]
fn default_enabled() -> bool {
    true
}

#[instrument]
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

#[instrument]
fn default_max_tokens() -> u32 {
    300
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            provider: LlmProvider::default(),
            model: default_model(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl LlmSection {
    /// Creates the client configuration.
    /// Requires OPENAI_API_KEY or ANTHROPIC_API_KEY environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the provider's key is not set.
    #[instrument(skip(self), fields(provider = ?self.provider, model = %self.model))]
    pub fn create_llm_config(&self) -> Result<LlmConfig, ConfigError> {
        debug!("Creating LLM config");
        let var = self.provider.api_key_var();
        let api_key = std::env::var(var)
            .map_err(|_| ConfigError::new(format!("{var} environment variable not set")))?;
        Ok(LlmConfig::new(
            self.provider,
            api_key,
            self.model.clone(),
            self.max_tokens,
        ))
    }
}

/// Complete server configuration.
#[derive(Debug, Clone, Default, PartialEq, Getters, Serialize, Deserialize)]
pub struct ServerConfig {
    /// `[server]` section.
    #[serde(default)]
    server: ServerSection,

    /// `[store]` section.
    #[serde(default)]
    store: StoreSection,

    /// `[llm]` section.
    #[serde(default)]
    llm: LlmSection,

    /// `[generation]` section.
    #[serde(default)]
    generation: GenerationSettings,

    /// `[content]` section.
    #[serde(default)]
    content: ContentRules,
}

impl ServerConfig {
    /// Loads configuration from TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        let config = Self::from_toml(&content)?;
        info!(backend = ?config.store.backend, provider = ?config.llm.provider, "Config loaded successfully");
        Ok(config)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the text is not valid configuration.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))
    }

    /// Overrides the listening port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.server.port = port;
        self
    }

    /// Turns the hosted model off.
    pub fn offline(mut self) -> Self {
        self.llm.enabled = false;
        self
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perilous_rules::Difficulty;

    #[test]
    fn test_empty_file_is_all_defaults() {
        let config = ServerConfig::from_toml("").unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(*config.server().port(), 3000);
        assert_eq!(*config.store().backend(), StoreBackend::Memory);
    }

    #[test]
    fn test_sections_override_defaults() {
        let config = ServerConfig::from_toml(
            r#"
            [server]
            port = 8080
            auto_bots = false

            [store]
            backend = "sqlite"
            path = "/tmp/games.db"
            ttl_secs = 60

            [llm]
            provider = "anthropic"
            model = "claude-haiku"

            [generation]
            max_attempts = 2

            [content.word_ranges]
            easy = { min = 2, max = 2 }
            medium = { min = 3, max = 4 }
            hard = { min = 4, max = 5 }
            very-hard = { min = 5, max = 7 }
            "#,
        )
        .unwrap();

        assert_eq!(*config.server().port(), 8080);
        assert!(!config.server().auto_bots());
        assert_eq!(*config.server().bot_think_ms(), 1_500);
        assert_eq!(*config.store().backend(), StoreBackend::Sqlite);
        assert_eq!(config.store().ttl(), Some(Duration::from_secs(60)));
        assert_eq!(*config.llm().provider(), LlmProvider::Anthropic);
        assert_eq!(*config.generation().max_attempts(), 2);
        assert_eq!(config.content().phrase_words(Difficulty::Easy).max, 2);
    }

    #[test]
    fn test_example_config_parses() {
        let config =
            ServerConfig::from_toml(include_str!("../../../perilous.example.toml")).unwrap();
        assert_eq!(*config.server().port(), 3000);
        assert_eq!(config.content().banned_tropes().len(), 4);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = ServerConfig::from_toml("[server]\nport = \"many\"").unwrap_err();
        assert!(err.message.contains("Failed to parse config"));
    }
}
