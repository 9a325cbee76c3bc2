//! Persistence port: load and save games by id.
//!
//! Saves are revision-checked. A game loaded at revision `n` can only be
//! saved while the store still holds revision `n`; the saved copy carries
//! `n + 1`. A fresh game has revision 0 and is only saved if the id is free.

mod memory;
mod models;
mod schema;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::StoreError;
use async_trait::async_trait;
use perilous_rules::GameState;
use std::time::Duration;

/// Load/save-by-id storage for games.
#[async_trait]
pub trait GameStore: Send + Sync {
    /// Loads a game, or `None` if it does not exist or has expired.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails.
    async fn get(&self, game_id: &str) -> Result<Option<GameState>, StoreError>;

    /// Saves a game loaded at `game.revision()`, returning the new revision.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails or another write landed
    /// since the game was loaded; nothing is written in either case.
    async fn put(
        &self,
        game_id: &str,
        game: &GameState,
        ttl: Option<Duration>,
    ) -> Result<u64, StoreError>;

    /// Removes a game. Removing a missing game is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails.
    async fn delete(&self, game_id: &str) -> Result<(), StoreError>;
}

fn expiry(ttl: Option<Duration>) -> Option<chrono::DateTime<chrono::Utc>> {
    ttl.and_then(|ttl| chrono::Duration::from_std(ttl).ok())
        .map(|ttl| chrono::Utc::now() + ttl)
}
