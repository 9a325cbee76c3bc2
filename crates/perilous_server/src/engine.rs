//! Game state machine: pure transitions joined to generated content.
//!
//! Each method mutates an in-memory [`GameState`] and may ask the
//! [`ContentSource`] for a verdict, scenario, puzzle or bot action. Nothing
//! here touches storage; a rejected move returns before any mutation.

use crate::error::GameError;
use crate::generation::{
    BotActionRequest, ContentSource, PuzzleRequest, ScenarioRequest, VerdictRequest, selector_for,
};
use perilous_rules::{
    ActOutcome, Advance, GameState, GuessOutcome, LetterOutcome, Phase, PuzzleState,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Order in which bots pick letters.
pub const LETTER_FREQUENCY: &str = "ETAOINSHRDLCUMWFGYPBVKJXQZ";

/// What a bot did on its step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BotMove {
    /// Described an action and had it judged.
    Acted {
        /// The bot's action sentence.
        action: String,
        /// Whether it succeeded.
        success: bool,
    },
    /// Picked a letter.
    Picked {
        /// The letter picked.
        letter: char,
    },
    /// Passed the turn on after a failure.
    Continued,
}

/// Drives transitions for one game at a time.
#[derive(Clone)]
pub struct Engine {
    content: Arc<dyn ContentSource>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").finish_non_exhaustive()
    }
}

impl Engine {
    /// Creates an engine drawing content from `content`.
    pub fn new(content: Arc<dyn ContentSource>) -> Self {
        Self { content }
    }

    /// Starts the game: generates the puzzle and the first scenario.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InsufficientPlayers`] with fewer than two players
    /// or [`GameError::WrongPhase`] outside the lobby.
    #[instrument(skip(self, game), fields(game_id = %game.id()))]
    pub async fn start(&self, game: &mut GameState) -> Result<(), GameError> {
        game.check_can_start()?;
        let generated = self
            .content
            .puzzle(PuzzleRequest {
                difficulty: game.difficulty(),
                recent: &[],
                selector: selector_for(game.id()),
            })
            .await;
        let scenario = self
            .content
            .scenario(ScenarioRequest {
                recent: &[],
                round: 1,
            })
            .await;
        let puzzle = PuzzleState::new(generated, game.difficulty());
        game.begin(puzzle, scenario.into_text())?;
        Ok(())
    }

    /// Judges the current player's action.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotYourTurn`], [`GameError::WrongPhase`] or
    /// [`GameError::InvalidInput`] for an empty action.
    #[instrument(skip(self, game, text), fields(game_id = %game.id()))]
    pub async fn act(
        &self,
        game: &mut GameState,
        player_id: &str,
        text: &str,
    ) -> Result<ActOutcome, GameError> {
        game.ensure_turn(player_id, Phase::Playing)?;
        let action = GameState::sanitize_action(text)?;
        let scenario = game.current_scenario().unwrap_or_default().to_string();
        let verdict = self
            .content
            .verdict(VerdictRequest {
                scenario: &scenario,
                action: &action,
            })
            .await;
        let outcome = game.record_verdict(player_id, &action, verdict.success, &verdict.outcome)?;
        Ok(outcome)
    }

    /// Picks a letter and, unless that solved the phrase, passes the turn on.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotYourTurn`], [`GameError::WrongPhase`],
    /// [`GameError::InvalidInput`] for a non-letter or
    /// [`GameError::DuplicateGuess`].
    #[instrument(skip(self, game), fields(game_id = %game.id()))]
    pub async fn pick_letter(
        &self,
        game: &mut GameState,
        player_id: &str,
        letter: &str,
    ) -> Result<LetterOutcome, GameError> {
        game.ensure_turn(player_id, Phase::LetterSelection)?;
        let letter = GameState::parse_letter(letter)?;
        let outcome = game.pick_letter(player_id, letter)?;
        if !outcome.solved {
            self.advance(game).await?;
        }
        Ok(outcome)
    }

    /// Guesses the phrase; a wrong guess eliminates the guesser.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotYourTurn`], [`GameError::WrongPhase`] or
    /// [`GameError::InvalidInput`] for a guess without letters.
    #[instrument(skip(self, game, guess), fields(game_id = %game.id()))]
    pub async fn guess_phrase(
        &self,
        game: &mut GameState,
        player_id: &str,
        guess: &str,
    ) -> Result<GuessOutcome, GameError> {
        let outcome = game.guess_phrase(player_id, guess)?;
        if outcome.ended.is_none() {
            self.advance(game).await?;
        }
        Ok(outcome)
    }

    /// Passes the turn on after a failed action.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::WrongPhase`] unless the game waits to continue.
    #[instrument(skip(self, game), fields(game_id = %game.id()))]
    pub async fn continue_turn(&self, game: &mut GameState) -> Result<(), GameError> {
        let advance = game.continue_turn()?;
        self.install(game, advance).await;
        Ok(())
    }

    async fn advance(&self, game: &mut GameState) -> Result<(), GameError> {
        let advance = game.prepare_advance()?;
        self.install(game, advance).await;
        Ok(())
    }

    async fn install(&self, game: &mut GameState, advance: Advance) {
        if let Advance::Continue { denylist } = advance {
            let scenario = self
                .content
                .scenario(ScenarioRequest {
                    recent: &denylist,
                    round: game.round_number(),
                })
                .await;
            debug!(round = game.round_number(), "Installing scenario");
            game.set_scenario(scenario.into_text());
        }
    }

    /// Performs one move for the current player if it is a bot.
    ///
    /// Returns `None` when no bot is due to move.
    ///
    /// # Errors
    ///
    /// Propagates the rejection of the underlying transition.
    #[instrument(skip(self, game), fields(game_id = %game.id()))]
    pub async fn bot_step(&self, game: &mut GameState) -> Result<Option<BotMove>, GameError> {
        if !game.is_bot_turn() {
            return Ok(None);
        }
        let Some(bot) = game.current_player().cloned() else {
            return Ok(None);
        };

        let step = match game.phase() {
            Phase::Playing => {
                let scenario = game.current_scenario().unwrap_or_default().to_string();
                let action = self
                    .content
                    .bot_action(BotActionRequest {
                        scenario: &scenario,
                        lives: bot.lives(),
                        round: game.round_number(),
                    })
                    .await;
                let outcome = self.act(game, bot.id(), action.text()).await?;
                BotMove::Acted {
                    action: action.into_text(),
                    success: outcome.success,
                }
            }
            Phase::LetterSelection => {
                let letter = next_letter(game.guessed_letters()).ok_or_else(|| {
                    GameError::InvalidInput("every letter has been guessed".to_string())
                })?;
                self.pick_letter(game, bot.id(), &letter.to_string()).await?;
                BotMove::Picked { letter }
            }
            Phase::WaitingContinue => {
                self.continue_turn(game).await?;
                BotMove::Continued
            }
            Phase::Lobby | Phase::GameOver => return Ok(None),
        };
        info!(bot = %bot.name(), ?step, "Bot moved");
        Ok(Some(step))
    }
}

/// The most frequent English letter not yet guessed.
pub fn next_letter(guessed: &[char]) -> Option<char> {
    LETTER_FREQUENCY.chars().find(|c| !guessed.contains(c))
}
