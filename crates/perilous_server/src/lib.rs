//! Perilous server - game orchestration, content generation and REST API.
//!
//! # Architecture
//!
//! - **Engine**: [`Engine`] joins the pure transitions in `perilous_rules`
//!   to generated content
//! - **Generation**: [`ContentGenerator`] turns free model text into valid
//!   scenarios, puzzles, verdicts and bot actions, falling back to curated
//!   pools when the model cannot comply
//! - **Persistence**: [`GameStore`] with [`MemoryStore`] and [`SqliteStore`],
//!   revision-checked so concurrent writers cannot clobber each other
//! - **Orchestration**: [`Orchestrator`] runs load, transition, save
//! - **HTTP**: [`router`] exposes the operations over axum
//!
//! # Example
//!
//! ```
//! use perilous_server::testing::FixedContent;
//! use perilous_server::{MemoryStore, Orchestrator, PlaySettings};
//! use perilous_rules::{Difficulty, Phase};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let orch = Orchestrator::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(FixedContent::default()),
//!     PlaySettings::default(),
//! );
//! let host = orch.create_game("Alice", Difficulty::Easy).await.unwrap();
//! orch.join_game(&host.game_id, "Bob").await.unwrap();
//! let view = orch.start_game(&host.game_id).await.unwrap();
//! assert_eq!(view.phase, Phase::Playing);
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod app;
mod config;
mod engine;
mod error;
pub mod generation;
mod http;
pub mod llm;
mod orchestrator;
mod simulate;
mod store;
pub mod testing;
mod view;

pub use config::{
    ConfigError, LlmSection, ServerConfig, ServerSection, StoreBackend, StoreSection,
};
pub use engine::{BotMove, Engine, LETTER_FREQUENCY, next_letter};
pub use error::{GameError, StoreError};
pub use generation::{ContentGenerator, ContentSource, GenerationSettings};
pub use http::{ApiError, AppState, router};
pub use orchestrator::{Joined, Orchestrator, PlaySettings, Played};
pub use simulate::{Simulation, simulate};
pub use store::{GameStore, MemoryStore, SqliteStore};
pub use view::{GameView, PlayerView};
