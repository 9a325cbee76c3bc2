//! Database rows for stored games.

use chrono::NaiveDateTime;
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;
use perilous_rules::GameState;
use tracing::instrument;

use super::schema;
use crate::error::StoreError;

/// A stored game.
#[derive(Debug, Clone, Queryable, Selectable, Getters)]
#[diesel(table_name = schema::games)]
pub struct GameRow {
    id: String,
    state: String,
    revision: i64,
    expires_at: Option<NaiveDateTime>,
    updated_at: NaiveDateTime,
}

impl GameRow {
    /// Whether the row has outlived its TTL.
    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Decodes the stored JSON state.
    #[instrument(skip(self), fields(id = %self.id))]
    pub fn decode(&self) -> Result<GameState, StoreError> {
        let mut game: GameState = serde_json::from_str(&self.state)?;
        game.set_revision(u64::try_from(self.revision).unwrap_or_default());
        Ok(game)
    }
}

/// Insertable game row.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::games)]
pub struct NewGameRow {
    id: String,
    state: String,
    revision: i64,
    expires_at: Option<NaiveDateTime>,
    updated_at: NaiveDateTime,
}
