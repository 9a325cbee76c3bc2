//! Wires configuration into a running [`Orchestrator`].

use crate::config::{ServerConfig, StoreBackend};
use crate::error::StoreError;
use crate::generation::ContentGenerator;
use crate::llm::{LlmClient, OfflineGenerator, TextGenerator};
use crate::orchestrator::{Orchestrator, PlaySettings};
use crate::store::{GameStore, MemoryStore, SqliteStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Picks the text generator: the configured model, or offline when it is
/// disabled or its API key is missing.
#[instrument(skip(config))]
pub fn text_generator(config: &ServerConfig) -> Arc<dyn TextGenerator> {
    if !config.llm().enabled() {
        info!("Text generation disabled, serving fallback content");
        return Arc::new(OfflineGenerator);
    }
    match config.llm().create_llm_config() {
        Ok(llm) => Arc::new(LlmClient::new(llm)),
        Err(e) => {
            warn!(error = %e, "No model available, serving fallback content");
            Arc::new(OfflineGenerator)
        }
    }
}

/// Opens the configured store.
///
/// # Errors
///
/// Returns [`StoreError`] if the SQLite database cannot be opened.
#[instrument(skip(config))]
pub fn game_store(config: &ServerConfig) -> Result<Arc<dyn GameStore>, StoreError> {
    let store: Arc<dyn GameStore> = match config.store().backend() {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::Sqlite => Arc::new(SqliteStore::open(config.store().path().clone())?),
    };
    Ok(store)
}

/// Builds an orchestrator from configuration.
///
/// `seed` makes verdict rolls repeatable.
///
/// # Errors
///
/// Returns [`StoreError`] if the store cannot be opened.
pub fn orchestrator(config: &ServerConfig, seed: Option<u64>) -> Result<Orchestrator, StoreError> {
    let generator = text_generator(config);
    let rules = config.content().clone();
    let settings = config.generation().clone();
    let content = match seed {
        Some(seed) => ContentGenerator::seeded(generator, rules, settings, seed),
        None => ContentGenerator::new(generator, rules, settings),
    };
    let server = config.server();
    let play = PlaySettings::default()
        .with_ttl(config.store().ttl())
        .with_bot_think(Duration::from_millis(*server.bot_think_ms()))
        .with_max_bot_steps(*server.max_bot_steps());
    Ok(Orchestrator::new(
        game_store(config)?,
        Arc::new(content),
        play,
    ))
}
