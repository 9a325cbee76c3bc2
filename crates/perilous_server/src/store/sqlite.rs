//! SQLite game store.

use super::models::{GameRow, NewGameRow};
use super::{GameStore, expiry, schema};
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use perilous_rules::GameState;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Games stored as JSON in a SQLite file.
///
/// Every call opens its own connection, so an in-memory database path does
/// not persist between calls; use a file.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db_path: String,
}

impl SqliteStore {
    /// Opens the database at `db_path`, applying pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the database cannot be opened or migrated.
    #[instrument(skip_all)]
    pub fn open(db_path: impl Into<String>) -> Result<Self, StoreError> {
        let store = Self {
            db_path: db_path.into(),
        };
        info!(path = %store.db_path, "Opening game store");
        let mut conn = store.connection()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| StoreError::new(format!("Migrations failed: {}", e)))?;
        info!(applied = applied.len(), "Game store ready");
        Ok(store)
    }

    fn connection(&self) -> Result<SqliteConnection, StoreError> {
        debug!(path = %self.db_path, "Establishing connection");
        SqliteConnection::establish(&self.db_path)
            .map_err(|e| StoreError::new(format!("Failed to connect to '{}': {}", self.db_path, e)))
    }

    fn load(&self, game_id: &str) -> Result<Option<GameState>, StoreError> {
        use schema::games::dsl::{games, id};

        let mut conn = self.connection()?;
        let row = games
            .filter(id.eq(game_id))
            .select(GameRow::as_select())
            .first(&mut conn)
            .optional()?;

        match row {
            Some(row) if row.is_expired(Utc::now().naive_utc()) => {
                debug!("Dropping expired game");
                diesel::delete(games.filter(id.eq(game_id))).execute(&mut conn)?;
                Ok(None)
            }
            Some(row) => row.decode().map(Some),
            None => Ok(None),
        }
    }

    fn save(
        &self,
        game_id: &str,
        game: &GameState,
        ttl: Option<Duration>,
    ) -> Result<u64, StoreError> {
        use schema::games::dsl::{expires_at, games, id, revision, state, updated_at};

        let expected = game.revision();
        let next = expected + 1;
        let json = serde_json::to_string(game)?;
        let expires = expiry(ttl).map(|at| at.naive_utc());
        let now = Utc::now().naive_utc();
        let expected_i64 = i64::try_from(expected)
            .map_err(|_| StoreError::new(format!("revision {expected} out of range")))?;

        let mut conn = self.connection()?;
        conn.immediate_transaction::<_, StoreError, _>(|conn| {
            let stored = games
                .filter(id.eq(game_id))
                .select(GameRow::as_select())
                .first(conn)
                .optional()?;

            match stored {
                Some(row) if !row.is_expired(now) => {
                    if *row.revision() != expected_i64 {
                        warn!(expected, stored = row.revision(), "Revision mismatch");
                        return Err(StoreError::conflict(game_id));
                    }
                    diesel::update(games.filter(id.eq(game_id)))
                        .set((
                            state.eq(json.as_str()),
                            revision.eq(expected_i64 + 1),
                            expires_at.eq(expires),
                            updated_at.eq(now),
                        ))
                        .execute(conn)?;
                }
                stale => {
                    if expected != 0 {
                        warn!(expected, "Saving a game that is no longer stored");
                        return Err(StoreError::conflict(game_id));
                    }
                    if stale.is_some() {
                        diesel::delete(games.filter(id.eq(game_id))).execute(conn)?;
                    }
                    diesel::insert_into(games)
                        .values(&NewGameRow::new(
                            game_id.to_string(),
                            json.clone(),
                            1,
                            expires,
                            now,
                        ))
                        .execute(conn)?;
                }
            }
            Ok(())
        })?;

        debug!(revision = next, "Game saved");
        Ok(next)
    }

    fn remove(&self, game_id: &str) -> Result<(), StoreError> {
        use schema::games::dsl::{games, id};

        let mut conn = self.connection()?;
        let removed = diesel::delete(games.filter(id.eq(game_id))).execute(&mut conn)?;
        debug!(removed, "Game deleted");
        Ok(())
    }

    async fn blocking<T, F>(&self, work: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(SqliteStore) -> Result<T, StoreError> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || work(store))
            .await
            .map_err(|e| StoreError::new(format!("Store task failed: {}", e)))?
    }
}

#[async_trait]
impl GameStore for SqliteStore {
    #[instrument(skip(self))]
    async fn get(&self, game_id: &str) -> Result<Option<GameState>, StoreError> {
        let game_id = game_id.to_string();
        self.blocking(move |store| store.load(&game_id)).await
    }

    #[instrument(skip(self, game, ttl), fields(revision = game.revision()))]
    async fn put(
        &self,
        game_id: &str,
        game: &GameState,
        ttl: Option<Duration>,
    ) -> Result<u64, StoreError> {
        let game_id = game_id.to_string();
        let game = game.clone();
        self.blocking(move |store| store.save(&game_id, &game, ttl))
            .await
    }

    #[instrument(skip(self))]
    async fn delete(&self, game_id: &str) -> Result<(), StoreError> {
        let game_id = game_id.to_string();
        self.blocking(move |store| store.remove(&game_id)).await
    }
}
