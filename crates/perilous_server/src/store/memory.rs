//! In-process game store.

use super::{GameStore, expiry};
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use perilous_rules::GameState;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone)]
struct Entry {
    game: GameState,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Games held in a map; expired entries are dropped when next touched.
#[derive(Debug, Default)]
pub struct MemoryStore {
    games: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live games.
    pub async fn len(&self) -> usize {
        let now = Utc::now();
        let games = self.games.lock().await;
        games.values().filter(|entry| !entry.is_expired(now)).count()
    }

    /// Whether the store holds no live games.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl GameStore for MemoryStore {
    #[instrument(skip(self))]
    async fn get(&self, game_id: &str) -> Result<Option<GameState>, StoreError> {
        let mut games = self.games.lock().await;
        let expired = games
            .get(game_id)
            .is_some_and(|entry| entry.is_expired(Utc::now()));
        if expired {
            debug!("Dropping expired game");
            games.remove(game_id);
            return Ok(None);
        }
        Ok(games.get(game_id).map(|entry| entry.game.clone()))
    }

    #[instrument(skip(self, game, ttl), fields(revision = game.revision()))]
    async fn put(
        &self,
        game_id: &str,
        game: &GameState,
        ttl: Option<Duration>,
    ) -> Result<u64, StoreError> {
        let mut games = self.games.lock().await;
        let stored = games
            .get(game_id)
            .filter(|entry| !entry.is_expired(Utc::now()))
            .map(|entry| entry.game.revision());

        let expected = game.revision();
        if stored.unwrap_or(0) != expected {
            warn!(expected, ?stored, "Revision mismatch");
            return Err(StoreError::conflict(game_id));
        }

        let mut saved = game.clone();
        saved.set_revision(expected + 1);
        games.insert(
            game_id.to_string(),
            Entry {
                game: saved,
                expires_at: expiry(ttl),
            },
        );
        debug!(revision = expected + 1, "Game saved");
        Ok(expected + 1)
    }

    #[instrument(skip(self))]
    async fn delete(&self, game_id: &str) -> Result<(), StoreError> {
        self.games.lock().await.remove(game_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perilous_rules::Difficulty;

    fn game(id: &str) -> GameState {
        GameState::new(id, Difficulty::Easy, Utc::now())
    }

    #[tokio::test]
    async fn test_put_then_get_bumps_revision() {
        let store = MemoryStore::new();
        let revision = store.put("ABC123", &game("ABC123"), None).await.unwrap();
        assert_eq!(revision, 1);
        let loaded = store.get("ABC123").await.unwrap().unwrap();
        assert_eq!(loaded.revision(), 1);
    }

    #[tokio::test]
    async fn test_stale_write_is_rejected() {
        let store = MemoryStore::new();
        store.put("ABC123", &game("ABC123"), None).await.unwrap();
        let first = store.get("ABC123").await.unwrap().unwrap();
        let second = first.clone();

        store.put("ABC123", &first, None).await.unwrap();
        let err = store.put("ABC123", &second, None).await.unwrap_err();
        assert!(err.message.contains("concurrent modification"));
        assert_eq!(store.get("ABC123").await.unwrap().unwrap().revision(), 2);
    }

    #[tokio::test]
    async fn test_fresh_game_cannot_overwrite_existing_id() {
        let store = MemoryStore::new();
        store.put("ABC123", &game("ABC123"), None).await.unwrap();
        assert!(store.put("ABC123", &game("ABC123"), None).await.is_err());
    }

    #[tokio::test]
    async fn test_expired_games_disappear() {
        let store = MemoryStore::new();
        store
            .put("ABC123", &game("ABC123"), Some(Duration::ZERO))
            .await
            .unwrap();
        assert!(store.get("ABC123").await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryStore::new();
        store.put("ABC123", &game("ABC123"), None).await.unwrap();
        store.delete("ABC123").await.unwrap();
        store.delete("ABC123").await.unwrap();
        assert!(store.get("ABC123").await.unwrap().is_none());
    }
}
