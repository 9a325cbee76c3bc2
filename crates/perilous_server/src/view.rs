//! What clients see of a game.

use perilous_rules::{Difficulty, GameState, Phase, Player, TurnEvent};
use serde::{Deserialize, Serialize};

/// Public projection of a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    /// Player id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Lives left.
    pub lives: u8,
    /// Points scored.
    pub score: u32,
    /// Whether the player is still in.
    pub is_alive: bool,
    /// Whether the player is a bot.
    pub is_bot: bool,
}

impl From<&Player> for PlayerView {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id().to_string(),
            name: player.name().to_string(),
            lives: player.lives(),
            score: player.score(),
            is_alive: player.is_alive(),
            is_bot: player.is_bot(),
        }
    }
}

/// Public projection of a game, with the hidden phrase masked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    /// Join code.
    pub id: String,
    /// Current phase.
    pub phase: Phase,
    /// Puzzle difficulty.
    pub difficulty: Difficulty,
    /// Players in turn order.
    pub players: Vec<PlayerView>,
    /// Player expected to move, while the game is running.
    pub current_player_id: Option<String>,
    /// Phrase with unrevealed letters as `_`; the full phrase once over.
    pub masked_phrase: Option<String>,
    /// Puzzle category.
    pub category: Option<String>,
    /// Letters found in the phrase, in order.
    pub revealed_letters: Vec<char>,
    /// Every letter picked, in order.
    pub guessed_letters: Vec<char>,
    /// Scenario the current player faces.
    pub current_scenario: Option<String>,
    /// Round number, starting at 1.
    pub round_number: u32,
    /// Winner, once decided.
    pub winner_id: Option<String>,
    /// Most recent event.
    pub last_event: Option<TurnEvent>,
    /// Recent events, oldest first.
    pub recent_events: Vec<TurnEvent>,
    /// Events recorded since creation.
    pub event_count: u64,
    /// Whether a bot is due to move.
    pub awaiting_bot: bool,
    /// Viewer the flags below refer to.
    pub viewer_id: Option<String>,
    /// Whether the viewer is expected to move.
    pub is_your_turn: bool,
    /// Storage revision of the state shown.
    pub revision: u64,
}

impl GameView {
    /// Projects a game for an optional viewer.
    pub fn of(game: &GameState, viewer_id: Option<&str>) -> Self {
        let running = !matches!(game.phase(), Phase::Lobby | Phase::GameOver);
        let current_player_id = running
            .then(|| game.current_player().map(|p| p.id().to_string()))
            .flatten();
        let puzzle = game.puzzle();
        let masked_phrase = puzzle.map(|p| {
            if game.phase().is_terminal() {
                p.phrase().to_string()
            } else {
                p.masked()
            }
        });
        let is_your_turn = match (viewer_id, current_player_id.as_deref()) {
            (Some(viewer), Some(current)) => viewer == current,
            _ => false,
        };

        Self {
            id: game.id().to_string(),
            phase: game.phase(),
            difficulty: game.difficulty(),
            players: game.players().iter().map(PlayerView::from).collect(),
            current_player_id,
            masked_phrase,
            category: puzzle.map(|p| p.category().to_string()),
            revealed_letters: puzzle.map(|p| p.revealed_letters().to_vec()).unwrap_or_default(),
            guessed_letters: game.guessed_letters().to_vec(),
            current_scenario: game.current_scenario().map(str::to_string),
            round_number: game.round_number(),
            winner_id: game.winner_id().map(str::to_string),
            last_event: game.last_event().cloned(),
            recent_events: game.events().cloned().collect(),
            event_count: game.event_count(),
            awaiting_bot: game.is_bot_turn(),
            viewer_id: viewer_id.map(str::to_string),
            is_your_turn,
            revision: game.revision(),
        }
    }

    /// Events recorded after `seen` of them had been observed.
    pub fn events_since(&self, seen: u64) -> &[TurnEvent] {
        let fresh = usize::try_from(self.event_count.saturating_sub(seen)).unwrap_or(usize::MAX);
        let skip = self.recent_events.len().saturating_sub(fresh);
        &self.recent_events[skip..]
    }
}
