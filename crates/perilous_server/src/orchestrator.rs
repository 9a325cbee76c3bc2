//! Game operations over the persistence port.
//!
//! Every operation loads the game, runs one engine transition in memory,
//! checks the invariants and saves once. Nothing is held between calls, so
//! two requests racing on the same game meet at the store's revision check.

use crate::engine::{BotMove, Engine};
use crate::error::GameError;
use crate::generation::ContentSource;
use crate::store::GameStore;
use crate::view::GameView;
use chrono::Utc;
use derive_getters::Getters;
use derive_setters::Setters;
use perilous_rules::{
    ActOutcome, Difficulty, GameInvariants, GameState, GuessOutcome, InvariantSet, LetterOutcome,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Alphabet for join codes: Crockford base32, no I, L, O or U.
const CODE_ALPHABET: &[u8] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";
const CODE_LEN: usize = 6;
const CODE_ATTEMPTS: usize = 8;

/// Names handed to bots, first free one wins.
const BOT_NAMES: &[&str] = &[
    "Clanky",
    "Bolt",
    "Sprocket",
    "Widget",
    "Gizmo",
    "Rusty",
    "Cog",
    "Servo",
];

/// Pacing and retention for games.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct PlaySettings {
    /// How long a game survives after its last save.
    ttl: Option<Duration>,
    /// Pause before each bot move.
    bot_think: Duration,
    /// Upper bound on bot moves per drive.
    max_bot_steps: usize,
}

impl Default for PlaySettings {
    fn default() -> Self {
        Self {
            ttl: Some(Duration::from_secs(24 * 60 * 60)),
            bot_think: Duration::from_millis(1_500),
            max_bot_steps: 500,
        }
    }
}

/// A player's seat in a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Joined {
    /// Game joined.
    pub game_id: String,
    /// Id the player acts under.
    pub player_id: String,
    /// The game as the new player sees it.
    pub view: GameView,
}

/// Result of a single move, with the game after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Played<T> {
    /// What the move did.
    pub outcome: T,
    /// The game after the move.
    pub view: GameView,
}

/// Runs game operations against a [`GameStore`].
#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<dyn GameStore>,
    engine: Engine,
    settings: PlaySettings,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Creates an orchestrator.
    pub fn new(
        store: Arc<dyn GameStore>,
        content: Arc<dyn ContentSource>,
        settings: PlaySettings,
    ) -> Self {
        Self {
            store,
            engine: Engine::new(content),
            settings,
        }
    }

    /// Pacing and retention in use.
    pub fn settings(&self) -> &PlaySettings {
        &self.settings
    }

    /// Opens an empty lobby.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Storage`] if no free join code could be saved.
    #[instrument(skip(self))]
    pub async fn create_lobby(&self, difficulty: Difficulty) -> Result<GameView, GameError> {
        let game = self.insert(difficulty, |_| Ok(())).await?;
        Ok(GameView::of(&game, None))
    }

    /// Opens a lobby with `name` as its first player.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidInput`] for a bad name or
    /// [`GameError::Storage`] if the lobby cannot be saved.
    #[instrument(skip(self))]
    pub async fn create_game(
        &self,
        name: &str,
        difficulty: Difficulty,
    ) -> Result<Joined, GameError> {
        let player_id = new_player_id();
        let game = self
            .insert(difficulty, |game| {
                game.add_player(player_id.clone(), name, false)?;
                Ok(())
            })
            .await?;
        info!(game_id = %game.id(), %player_id, "Game created");
        Ok(Joined {
            game_id: game.id().to_string(),
            view: GameView::of(&game, Some(&player_id)),
            player_id,
        })
    }

    /// Adds a human to a lobby.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::GameNotFound`], [`GameError::WrongPhase`] once
    /// started, or [`GameError::InvalidInput`] for a bad or taken name or a
    /// full lobby.
    #[instrument(skip(self))]
    pub async fn join_game(&self, game_id: &str, name: &str) -> Result<Joined, GameError> {
        let mut game = self.load(game_id).await?;
        let player_id = new_player_id();
        game.add_player(player_id.clone(), name, false)?;
        self.save(&mut game).await?;
        Ok(Joined {
            game_id: game.id().to_string(),
            view: GameView::of(&game, Some(&player_id)),
            player_id,
        })
    }

    /// Adds a bot to a lobby under the first free bot name.
    ///
    /// # Errors
    ///
    /// Same as [`Orchestrator::join_game`].
    #[instrument(skip(self))]
    pub async fn add_bot(&self, game_id: &str) -> Result<GameView, GameError> {
        let mut game = self.load(game_id).await?;
        let name = bot_name(&game);
        game.add_player(new_player_id(), &name, true)?;
        self.save(&mut game).await?;
        Ok(GameView::of(&game, None))
    }

    /// Starts the game.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InsufficientPlayers`] with fewer than two players.
    #[instrument(skip(self))]
    pub async fn start_game(&self, game_id: &str) -> Result<GameView, GameError> {
        let mut game = self.load(game_id).await?;
        self.engine.start(&mut game).await?;
        self.save(&mut game).await?;
        Ok(GameView::of(&game, None))
    }

    /// The current player describes what they do.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotYourTurn`] for anyone but the current player.
    #[instrument(skip(self, text))]
    pub async fn submit_action(
        &self,
        game_id: &str,
        player_id: &str,
        text: &str,
    ) -> Result<Played<ActOutcome>, GameError> {
        let mut game = self.load(game_id).await?;
        let outcome = self
            .engine
            .act(&mut game, player_id, text)
            .await
            .inspect_err(|e| warn!(error = %e, "Action rejected"))?;
        self.save(&mut game).await?;
        Ok(Played {
            outcome,
            view: GameView::of(&game, Some(player_id)),
        })
    }

    /// The current player picks a letter after a successful action.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DuplicateGuess`] for a letter already picked.
    #[instrument(skip(self))]
    pub async fn pick_letter(
        &self,
        game_id: &str,
        player_id: &str,
        letter: &str,
    ) -> Result<Played<LetterOutcome>, GameError> {
        let mut game = self.load(game_id).await?;
        let outcome = self
            .engine
            .pick_letter(&mut game, player_id, letter)
            .await
            .inspect_err(|e| warn!(error = %e, "Letter rejected"))?;
        self.save(&mut game).await?;
        Ok(Played {
            outcome,
            view: GameView::of(&game, Some(player_id)),
        })
    }

    /// The current player guesses the whole phrase.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidInput`] for a guess without letters.
    #[instrument(skip(self, guess))]
    pub async fn guess_phrase(
        &self,
        game_id: &str,
        player_id: &str,
        guess: &str,
    ) -> Result<Played<GuessOutcome>, GameError> {
        let mut game = self.load(game_id).await?;
        let outcome = self
            .engine
            .guess_phrase(&mut game, player_id, guess)
            .await
            .inspect_err(|e| warn!(error = %e, "Guess rejected"))?;
        self.save(&mut game).await?;
        Ok(Played {
            outcome,
            view: GameView::of(&game, Some(player_id)),
        })
    }

    /// Passes the turn on after a failed action.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::WrongPhase`] unless the game waits to continue.
    #[instrument(skip(self))]
    pub async fn continue_turn(&self, game_id: &str) -> Result<GameView, GameError> {
        let mut game = self.load(game_id).await?;
        self.engine.continue_turn(&mut game).await?;
        self.save(&mut game).await?;
        Ok(GameView::of(&game, None))
    }

    /// Performs exactly one move for the bot whose turn it is.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidInput`] when no bot is due to move.
    #[instrument(skip(self))]
    pub async fn bot_act(&self, game_id: &str) -> Result<Played<BotMove>, GameError> {
        let mut game = self.load(game_id).await?;
        let Some(step) = self.engine.bot_step(&mut game).await? else {
            return Err(GameError::InvalidInput(
                "no bot is due to move".to_string(),
            ));
        };
        self.save(&mut game).await?;
        Ok(Played {
            outcome: step,
            view: GameView::of(&game, None),
        })
    }

    /// Lets bots move, one save per move, until a human must act, the game
    /// ends or the step cap is hit. Returns the moves made.
    ///
    /// # Errors
    ///
    /// Stops at the first failed load, transition or save.
    #[instrument(skip(self))]
    pub async fn drive_bots(&self, game_id: &str) -> Result<Vec<BotMove>, GameError> {
        let mut moves = Vec::new();
        while moves.len() < self.settings.max_bot_steps {
            let game = self.load(game_id).await?;
            if !game.is_bot_turn() {
                break;
            }
            if !self.settings.bot_think.is_zero() {
                tokio::time::sleep(self.settings.bot_think).await;
            }
            // Reload: a human may have acted during the pause.
            let mut game = self.load(game_id).await?;
            let Some(step) = self.engine.bot_step(&mut game).await? else {
                break;
            };
            self.save(&mut game).await?;
            moves.push(step);
        }
        if moves.len() >= self.settings.max_bot_steps {
            warn!(steps = moves.len(), "Bot drive hit the step cap");
        }
        debug!(steps = moves.len(), "Bot drive finished");
        Ok(moves)
    }

    /// The game as `viewer_id` sees it.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::GameNotFound`] for an unknown or expired id.
    #[instrument(skip(self))]
    pub async fn public_state(
        &self,
        game_id: &str,
        viewer_id: Option<&str>,
    ) -> Result<GameView, GameError> {
        let game = self.load(game_id).await?;
        Ok(GameView::of(&game, viewer_id))
    }

    async fn load(&self, game_id: &str) -> Result<GameState, GameError> {
        let code = game_id.trim().to_ascii_uppercase();
        self.store
            .get(&code)
            .await?
            .ok_or_else(|| GameError::GameNotFound(game_id.to_string()))
    }

    async fn save(&self, game: &mut GameState) -> Result<(), GameError> {
        if let Err(violations) = GameInvariants::check_all(game) {
            for violation in &violations {
                error!(game_id = %game.id(), %violation, "Invariant violated, refusing to save");
            }
            let summary = violations
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(GameError::InvariantViolated(summary));
        }
        let revision = self
            .store
            .put(&game.id().to_string(), game, self.settings.ttl)
            .await?;
        game.set_revision(revision);
        Ok(())
    }

    async fn insert<F>(&self, difficulty: Difficulty, seat: F) -> Result<GameState, GameError>
    where
        F: Fn(&mut GameState) -> Result<(), GameError>,
    {
        for _ in 0..CODE_ATTEMPTS {
            let code = join_code();
            if self.store.get(&code).await?.is_some() {
                debug!(%code, "Join code taken");
                continue;
            }
            let mut game = GameState::new(code, difficulty, Utc::now());
            seat(&mut game)?;
            self.save(&mut game).await?;
            return Ok(game);
        }
        Err(crate::error::StoreError::new("no free join code").into())
    }
}

fn join_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LEN)
        .map(|_| char::from(CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())]))
        .collect()
}

fn new_player_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn bot_name(game: &GameState) -> String {
    let taken = |name: &str| {
        game.players()
            .iter()
            .any(|p| p.name().eq_ignore_ascii_case(name))
    };
    BOT_NAMES
        .iter()
        .find(|name| !taken(name))
        .map(|name| name.to_string())
        .unwrap_or_else(|| format!("Bot {}", game.players().len() + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testing::FixedContent;
    use perilous_rules::{GeneratedPuzzle, Phase, PuzzleState};

    fn orchestrator(content: FixedContent) -> Orchestrator {
        Orchestrator::new(
            Arc::new(MemoryStore::new()),
            Arc::new(content),
            PlaySettings::default().with_bot_think(Duration::ZERO),
        )
    }

    #[test]
    fn test_join_code_alphabet() {
        for _ in 0..100 {
            let code = join_code();
            assert_eq!(code.len(), CODE_LEN);
            assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
        }
    }

    #[tokio::test]
    async fn test_create_and_join() {
        let orch = orchestrator(FixedContent::default());
        let host = orch.create_game("Alice", Difficulty::Easy).await.unwrap();
        assert_eq!(host.view.players.len(), 1);
        assert_eq!(host.view.revision, 1);

        let guest = orch.join_game(&host.game_id, "Bob").await.unwrap();
        assert_eq!(guest.view.players.len(), 2);
        assert_ne!(guest.player_id, host.player_id);
        assert_eq!(guest.view.viewer_id.as_deref(), Some(guest.player_id.as_str()));
    }

    #[tokio::test]
    async fn test_join_code_is_case_insensitive() {
        let orch = orchestrator(FixedContent::default());
        let host = orch.create_game("Alice", Difficulty::Easy).await.unwrap();
        let lower = host.game_id.to_ascii_lowercase();
        assert!(orch.public_state(&lower, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_game() {
        let orch = orchestrator(FixedContent::default());
        let err = orch.start_game("NOPE00").await.unwrap_err();
        assert!(matches!(err, GameError::GameNotFound(_)));
    }

    #[tokio::test]
    async fn test_bot_names_are_unique() {
        let orch = orchestrator(FixedContent::default());
        let host = orch.create_game("Clanky", Difficulty::Easy).await.unwrap();
        let view = orch.add_bot(&host.game_id).await.unwrap();
        let view2 = orch.add_bot(&host.game_id).await.unwrap();
        assert_eq!(view.players[1].name, "Bolt");
        assert_eq!(view2.players[2].name, "Sprocket");
        assert!(view2.players[2].is_bot);
    }

    #[tokio::test]
    async fn test_bot_act_without_bot_turn() {
        let orch = orchestrator(FixedContent::default());
        let host = orch.create_game("Alice", Difficulty::Easy).await.unwrap();
        orch.join_game(&host.game_id, "Bob").await.unwrap();
        orch.start_game(&host.game_id).await.unwrap();
        let err = orch.bot_act(&host.game_id).await.unwrap_err();
        assert!(matches!(err, GameError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_drive_bots_finishes_all_bot_game() {
        let orch = orchestrator(FixedContent::default());
        let lobby = orch.create_lobby(Difficulty::Easy).await.unwrap();
        for _ in 0..3 {
            orch.add_bot(&lobby.id).await.unwrap();
        }
        orch.start_game(&lobby.id).await.unwrap();
        let moves = orch.drive_bots(&lobby.id).await.unwrap();
        assert!(!moves.is_empty());

        let view = orch.public_state(&lobby.id, None).await.unwrap();
        assert_eq!(view.phase, Phase::GameOver);
        assert!(view.winner_id.is_some());
    }

    #[tokio::test]
    async fn test_drive_bots_stops_for_humans() {
        let orch = orchestrator(FixedContent::default());
        let host = orch.create_game("Alice", Difficulty::Easy).await.unwrap();
        orch.add_bot(&host.game_id).await.unwrap();
        orch.start_game(&host.game_id).await.unwrap();
        let moves = orch.drive_bots(&host.game_id).await.unwrap();
        assert!(moves.is_empty());
    }

    #[tokio::test]
    async fn test_save_refuses_broken_state() {
        let orch = orchestrator(FixedContent::default());
        let host = orch.create_game("Alice", Difficulty::Easy).await.unwrap();
        let mut game = orch.load(&host.game_id).await.unwrap();
        assert_eq!(game.revision(), 1);

        game.add_player("b", "Bob", false).unwrap();
        let puzzle = PuzzleState::new(
            GeneratedPuzzle::new("night  owl", "Sleep Habits"),
            Difficulty::Easy,
        );
        game.begin(puzzle, "scenario".to_string()).unwrap();

        let err = orch.save(&mut game).await.unwrap_err();
        assert!(matches!(err, GameError::InvariantViolated(_)));
        assert_eq!(err.code(), "InvariantViolated");

        let stored = orch.store.get(&host.game_id).await.unwrap().unwrap();
        assert_eq!(stored.revision(), 1);
        assert_eq!(stored.phase(), Phase::Lobby);
        assert_eq!(stored.players().len(), 1);
    }

    #[tokio::test]
    async fn test_broken_fresh_game_is_never_stored() {
        let orch = orchestrator(FixedContent::default());
        let mut game = GameState::new("BROKEN", Difficulty::Easy, Utc::now());
        game.add_player("a", "Alice", false).unwrap();
        game.add_player("b", "Bob", false).unwrap();
        let puzzle = PuzzleState::new(GeneratedPuzzle::new("NIGHT 0WL", "Sleep Habits"), Difficulty::Easy);
        game.begin(puzzle, "scenario".to_string()).unwrap();

        assert!(orch.save(&mut game).await.is_err());
        assert!(orch.store.get("BROKEN").await.unwrap().is_none());
        assert_eq!(game.revision(), 0);
    }
}
