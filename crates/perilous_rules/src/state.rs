//! Game state and its pure transitions.
//!
//! Every method here is synchronous and free of I/O. Transitions that need
//! fresh content split into two steps: a `prepare_*` step that mutates what it
//! can and tells the caller what to generate, and a setter that installs the
//! generated value.

use crate::{Difficulty, GeneratedPuzzle, Phase, RuleError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info, instrument, warn};

/// Lives each player starts with.
pub const STARTING_LIVES: u8 = 3;
/// Players required to start.
pub const MIN_PLAYERS: usize = 2;
/// Lobby capacity.
pub const MAX_PLAYERS: usize = 8;
/// Maximum display name length in characters.
pub const MAX_NAME_LEN: usize = 20;
/// Maximum action length in characters; longer input is cut.
pub const MAX_ACTION_LEN: usize = 500;
/// Scenarios remembered to avoid repeats.
pub const SCENARIO_HISTORY_LEN: usize = 5;
/// Events kept for polling clients.
pub const EVENT_LOG_LEN: usize = 10;

/// Points for a successful action.
pub const SUCCESS_POINTS: u32 = 10;
/// Points per revealed occurrence of a letter.
pub const LETTER_POINTS: u32 = 5;
/// Points for solving the phrase.
pub const SOLVE_POINTS: u32 = 100;

/// A participant, human or bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    id: String,
    name: String,
    is_alive: bool,
    lives: u8,
    score: u32,
    is_bot: bool,
}

impl Player {
    /// Creates a living player with full lives and no score.
    pub fn new(id: impl Into<String>, name: impl Into<String>, is_bot: bool) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_alive: true,
            lives: STARTING_LIVES,
            score: 0,
            is_bot,
        }
    }

    /// Player id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the player is still in the game.
    pub fn is_alive(&self) -> bool {
        self.is_alive
    }

    /// Remaining lives.
    pub fn lives(&self) -> u8 {
        self.lives
    }

    /// Current score.
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Whether the player is a bot.
    pub fn is_bot(&self) -> bool {
        self.is_bot
    }

    fn lose_life(&mut self) {
        self.lives = self.lives.saturating_sub(1);
        if self.lives == 0 {
            self.is_alive = false;
        }
    }

    fn eliminate(&mut self) {
        self.lives = 0;
        self.is_alive = false;
    }

    fn award(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
    }
}

/// The hidden phrase and what has been revealed of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PuzzleState {
    phrase: String,
    category: String,
    revealed_letters: Vec<char>,
    difficulty: Difficulty,
}

impl PuzzleState {
    /// Creates an unrevealed puzzle.
    pub fn new(puzzle: GeneratedPuzzle, difficulty: Difficulty) -> Self {
        Self {
            phrase: puzzle.phrase,
            category: puzzle.category,
            revealed_letters: Vec::new(),
            difficulty,
        }
    }

    /// The full phrase.
    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    /// The category hint.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Revealed letters in reveal order.
    pub fn revealed_letters(&self) -> &[char] {
        &self.revealed_letters
    }

    /// Difficulty the phrase was chosen for.
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Number of times `letter` occurs in the phrase.
    pub fn occurrences(&self, letter: char) -> usize {
        self.phrase.chars().filter(|c| *c == letter).count()
    }

    /// Whether every distinct phrase letter has been revealed.
    pub fn is_solved(&self) -> bool {
        self.phrase
            .chars()
            .filter(char::is_ascii_alphabetic)
            .all(|c| self.revealed_letters.contains(&c))
    }

    /// The phrase with unrevealed letters as `_`.
    pub fn masked(&self) -> String {
        self.phrase
            .chars()
            .map(|c| {
                if c == ' ' || self.revealed_letters.contains(&c) {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }

    /// Case-insensitive comparison ignoring spacing and punctuation.
    pub fn matches(&self, guess: &str) -> bool {
        normalize_guess(guess) == self.phrase
    }

    fn reveal(&mut self, letter: char) {
        if !self.revealed_letters.contains(&letter) {
            self.revealed_letters.push(letter);
        }
    }

    fn reveal_all(&mut self) {
        let letters: Vec<char> = self.phrase.chars().filter(char::is_ascii_alphabetic).collect();
        for letter in letters {
            self.reveal(letter);
        }
    }
}

fn normalize_guess(guess: &str) -> String {
    guess
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase()
}

/// The most recent scenarios, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioHistory(VecDeque<String>);

impl ScenarioHistory {
    /// Appends a scenario, dropping the oldest beyond capacity.
    pub fn push(&mut self, scenario: String) {
        self.0.push_back(scenario);
        while self.0.len() > SCENARIO_HISTORY_LEN {
            self.0.pop_front();
        }
    }

    /// Scenarios oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    /// Number of remembered scenarios.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing has been remembered yet.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Owned copy, used as a generation denylist.
    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

/// Why the game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum EndReason {
    /// One player survived everyone else.
    LastSurvivor,
    /// The phrase was solved.
    PhraseSolved,
    /// Nobody survived; the highest score wins.
    AllEliminated,
}

/// Something that happened, recorded for polling clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TurnEvent {
    /// An action was judged.
    ActionJudged {
        /// Acting player.
        player_id: String,
        /// The action text.
        action: String,
        /// Whether it succeeded.
        success: bool,
        /// Narrated outcome.
        outcome: String,
    },
    /// A letter was picked.
    LetterPicked {
        /// Picking player.
        player_id: String,
        /// Uppercase letter.
        letter: char,
        /// Occurrences in the phrase.
        occurrences: usize,
    },
    /// A full phrase guess was made.
    PhraseGuessed {
        /// Guessing player.
        player_id: String,
        /// The guess as typed.
        guess: String,
        /// Whether it matched.
        correct: bool,
    },
    /// The turn moved on.
    TurnPassed {
        /// Outgoing player.
        from: String,
        /// Incoming player.
        to: String,
    },
    /// The game ended.
    GameEnded {
        /// Winning player, if any.
        winner_id: Option<String>,
        /// How it ended.
        reason: EndReason,
    },
}

/// Result of judging an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActOutcome {
    /// Whether the action succeeded.
    pub success: bool,
    /// Narrated outcome.
    pub outcome: String,
    /// Whether the actor lost their last life.
    pub eliminated: bool,
    /// Set when the game ended as a result.
    pub ended: Option<EndReason>,
}

/// Result of picking a letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LetterOutcome {
    /// The normalized letter.
    pub letter: char,
    /// Occurrences revealed.
    pub occurrences: usize,
    /// Whether the pick solved the phrase.
    pub solved: bool,
}

/// Result of a full phrase guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuessOutcome {
    /// Whether the guess matched.
    pub correct: bool,
    /// Set when the game ended as a result.
    pub ended: Option<EndReason>,
}

/// What turn advancement needs from the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// The game is over; nothing to generate.
    Ended(EndReason),
    /// A new scenario is needed for the incoming player.
    Continue {
        /// Scenarios the new one must not repeat.
        denylist: Vec<String>,
    },
}

/// One match, from lobby to game over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    id: String,
    players: Vec<Player>,
    current_player_index: usize,
    phase: Phase,
    difficulty: Difficulty,
    puzzle: Option<PuzzleState>,
    current_scenario: Option<String>,
    scenario_history: ScenarioHistory,
    round_number: u32,
    winner_id: Option<String>,
    guessed_letters: Vec<char>,
    events: VecDeque<TurnEvent>,
    #[serde(default)]
    event_count: u64,
    created_at: DateTime<Utc>,
    revision: u64,
}

impl GameState {
    /// Creates an empty lobby.
    pub fn new(id: impl Into<String>, difficulty: Difficulty, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            players: Vec::new(),
            current_player_index: 0,
            phase: Phase::Lobby,
            difficulty,
            puzzle: None,
            current_scenario: None,
            scenario_history: ScenarioHistory::default(),
            round_number: 0,
            winner_id: None,
            guessed_letters: Vec::new(),
            events: VecDeque::new(),
            event_count: 0,
            created_at,
            revision: 0,
        }
    }

    /// Game id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Players in turn order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Looks a player up by id.
    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    /// Index of the current player.
    pub fn current_player_index(&self) -> usize {
        self.current_player_index
    }

    /// The current player, if any players have joined.
    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.current_player_index)
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Difficulty chosen at creation.
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// The puzzle, once the game has started.
    pub fn puzzle(&self) -> Option<&PuzzleState> {
        self.puzzle.as_ref()
    }

    /// The scenario the current player faces.
    pub fn current_scenario(&self) -> Option<&str> {
        self.current_scenario.as_deref()
    }

    /// Recently shown scenarios.
    pub fn scenario_history(&self) -> &ScenarioHistory {
        &self.scenario_history
    }

    /// Round number, starting at 1 once playing.
    pub fn round_number(&self) -> u32 {
        self.round_number
    }

    /// Winner, once the game is over.
    pub fn winner_id(&self) -> Option<&str> {
        self.winner_id.as_deref()
    }

    /// Every letter picked so far, hits and misses, in order.
    pub fn guessed_letters(&self) -> &[char] {
        &self.guessed_letters
    }

    /// Recent events, oldest first.
    pub fn events(&self) -> impl Iterator<Item = &TurnEvent> {
        self.events.iter()
    }

    /// The most recent event.
    pub fn last_event(&self) -> Option<&TurnEvent> {
        self.events.back()
    }

    /// Events recorded since creation, including those no longer kept.
    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    /// Creation time.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Optimistic concurrency token.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Sets the concurrency token. Only stores call this.
    pub fn set_revision(&mut self, revision: u64) {
        self.revision = revision;
    }

    /// Number of living players.
    pub fn alive_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_alive).count()
    }

    /// Whether a bot is expected to move next.
    pub fn is_bot_turn(&self) -> bool {
        let awaiting = self.phase.requires_live_current() || self.phase == Phase::WaitingContinue;
        awaiting && self.current_player().is_some_and(Player::is_bot)
    }

    fn record(&mut self, event: TurnEvent) {
        debug!(game_id = %self.id, ?event, "Recording event");
        self.events.push_back(event);
        self.event_count += 1;
        while self.events.len() > EVENT_LOG_LEN {
            self.events.pop_front();
        }
    }

    // ─────────────────────────────────────────────────────────────
    //  Preconditions
    // ─────────────────────────────────────────────────────────────

    /// Rejects unless the game is in `expected`.
    pub fn ensure_phase(&self, expected: Phase) -> Result<(), RuleError> {
        if self.phase == expected {
            Ok(())
        } else {
            warn!(game_id = %self.id, %expected, actual = %self.phase, "Wrong phase");
            Err(RuleError::WrongPhase {
                expected,
                actual: self.phase,
            })
        }
    }

    /// Rejects unless `player_id` is the current player.
    pub fn ensure_current(&self, player_id: &str) -> Result<(), RuleError> {
        match self.current_player() {
            Some(current) if current.id == player_id => Ok(()),
            Some(current) => {
                warn!(game_id = %self.id, player_id, expected = %current.id, "Not this player's turn");
                Err(RuleError::NotYourTurn {
                    expected: current.name.clone(),
                })
            }
            None => Err(RuleError::InvalidInput("no players have joined".to_string())),
        }
    }

    /// Turn check for in-game moves.
    ///
    /// Outside the lobby and game over, a move by anyone but the current
    /// player is `NotYourTurn` whatever the phase.
    pub fn ensure_turn(&self, player_id: &str, expected: Phase) -> Result<(), RuleError> {
        if matches!(self.phase, Phase::Lobby | Phase::GameOver) {
            return self.ensure_phase(expected);
        }
        self.ensure_current(player_id)?;
        self.ensure_phase(expected)
    }

    /// Trims a display name and checks its length.
    pub fn sanitize_name(name: &str) -> Result<String, RuleError> {
        let cleaned: String = name.chars().filter(|c| !c.is_control()).collect();
        let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
        let length = cleaned.chars().count();
        if length == 0 || length > MAX_NAME_LEN {
            return Err(RuleError::InvalidInput(format!(
                "name must be 1 to {MAX_NAME_LEN} characters"
            )));
        }
        Ok(cleaned)
    }

    /// Trims an action and cuts it to the maximum length.
    pub fn sanitize_action(action: &str) -> Result<String, RuleError> {
        let cleaned = action.split_whitespace().collect::<Vec<_>>().join(" ");
        if cleaned.is_empty() {
            return Err(RuleError::InvalidInput("action must not be empty".to_string()));
        }
        Ok(cleaned.chars().take(MAX_ACTION_LEN).collect())
    }

    /// Reads a single letter, normalized to uppercase.
    pub fn parse_letter(input: &str) -> Result<char, RuleError> {
        let mut chars = input.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphabetic() => Ok(c.to_ascii_uppercase()),
            _ => Err(RuleError::InvalidInput(format!(
                "\"{input}\" is not a single letter A-Z"
            ))),
        }
    }

    // ─────────────────────────────────────────────────────────────
    //  Transitions
    // ─────────────────────────────────────────────────────────────

    /// Adds a player to the lobby.
    #[instrument(skip(self, id), fields(game_id = %self.id))]
    pub fn add_player(
        &mut self,
        id: impl Into<String>,
        name: &str,
        is_bot: bool,
    ) -> Result<&Player, RuleError> {
        self.ensure_phase(Phase::Lobby)?;
        let name = Self::sanitize_name(name)?;
        if self.players.len() >= MAX_PLAYERS {
            return Err(RuleError::InvalidInput(format!(
                "the lobby is full ({MAX_PLAYERS} players)"
            )));
        }
        if self.players.iter().any(|p| p.name.eq_ignore_ascii_case(&name)) {
            return Err(RuleError::InvalidInput(format!("the name \"{name}\" is taken")));
        }
        let id = id.into();
        if self.player(&id).is_some() {
            return Err(RuleError::InvalidInput(format!("player {id} already joined")));
        }

        info!(player_id = %id, name = %name, is_bot, "Player joined");
        let index = self.players.len();
        self.players.push(Player::new(id, name, is_bot));
        Ok(&self.players[index])
    }

    /// Checks the lobby can start.
    pub fn check_can_start(&self) -> Result<(), RuleError> {
        self.ensure_phase(Phase::Lobby)?;
        if self.players.len() < MIN_PLAYERS {
            warn!(game_id = %self.id, have = self.players.len(), "Not enough players");
            return Err(RuleError::InsufficientPlayers {
                have: self.players.len(),
                need: MIN_PLAYERS,
            });
        }
        Ok(())
    }

    /// Starts play with a puzzle and the first scenario.
    #[instrument(skip(self, puzzle, scenario), fields(game_id = %self.id))]
    pub fn begin(&mut self, puzzle: PuzzleState, scenario: String) -> Result<(), RuleError> {
        self.check_can_start()?;
        self.puzzle = Some(puzzle);
        self.current_scenario = Some(scenario);
        self.current_player_index = 0;
        self.round_number = 1;
        self.phase = Phase::Playing;
        info!(players = self.players.len(), "Game started");
        Ok(())
    }

    /// Applies a verdict to the current player's action.
    ///
    /// Success scores and moves to letter selection. Failure costs a life and,
    /// unless that ends the game, waits for the turn to be passed on.
    #[instrument(skip(self, action, outcome), fields(game_id = %self.id))]
    pub fn record_verdict(
        &mut self,
        player_id: &str,
        action: &str,
        success: bool,
        outcome: &str,
    ) -> Result<ActOutcome, RuleError> {
        self.ensure_turn(player_id, Phase::Playing)?;
        let index = self.current_player_index;
        let player = &mut self.players[index];
        if success {
            player.award(SUCCESS_POINTS);
        } else {
            player.lose_life();
        }
        let eliminated = !player.is_alive;
        info!(success, lives = player.lives, eliminated, "Action judged");

        self.record(TurnEvent::ActionJudged {
            player_id: player_id.to_string(),
            action: action.to_string(),
            success,
            outcome: outcome.to_string(),
        });

        let ended = if success {
            self.phase = Phase::LetterSelection;
            None
        } else {
            let ended = self.check_end();
            if ended.is_none() {
                self.phase = Phase::WaitingContinue;
            }
            ended
        };

        Ok(ActOutcome {
            success,
            outcome: outcome.to_string(),
            eliminated,
            ended,
        })
    }

    /// Picks a letter. Unless the pick solves the phrase, the caller must
    /// then advance the turn.
    #[instrument(skip(self), fields(game_id = %self.id))]
    pub fn pick_letter(&mut self, player_id: &str, letter: char) -> Result<LetterOutcome, RuleError> {
        self.ensure_turn(player_id, Phase::LetterSelection)?;
        let letter = Self::parse_letter(letter.encode_utf8(&mut [0; 4]))?;
        if self.guessed_letters.contains(&letter) {
            warn!(%letter, "Letter already guessed");
            return Err(RuleError::DuplicateGuess(letter));
        }
        let Some(puzzle) = self.puzzle.as_mut() else {
            return Err(RuleError::InvalidInput("the game has no puzzle".to_string()));
        };

        self.guessed_letters.push(letter);
        let occurrences = puzzle.occurrences(letter);
        if occurrences > 0 {
            puzzle.reveal(letter);
        }
        let solved = puzzle.is_solved();

        let index = self.current_player_index;
        let points = LETTER_POINTS.saturating_mul(u32::try_from(occurrences).unwrap_or(u32::MAX));
        self.players[index].award(points);
        info!(%letter, occurrences, solved, "Letter picked");
        self.record(TurnEvent::LetterPicked {
            player_id: player_id.to_string(),
            letter,
            occurrences,
        });

        if solved {
            self.players[index].award(SOLVE_POINTS);
            self.finish(Some(player_id.to_string()), EndReason::PhraseSolved);
        }
        Ok(LetterOutcome {
            letter,
            occurrences,
            solved,
        })
    }

    /// Guesses the whole phrase. A wrong guess eliminates the guesser; unless
    /// the game then ends, the caller must advance the turn.
    #[instrument(skip(self, guess), fields(game_id = %self.id))]
    pub fn guess_phrase(&mut self, player_id: &str, guess: &str) -> Result<GuessOutcome, RuleError> {
        self.ensure_turn(player_id, Phase::LetterSelection)?;
        if normalize_guess(guess).is_empty() {
            return Err(RuleError::InvalidInput("the guess must contain letters".to_string()));
        }
        let Some(puzzle) = self.puzzle.as_mut() else {
            return Err(RuleError::InvalidInput("the game has no puzzle".to_string()));
        };

        let correct = puzzle.matches(guess);
        if correct {
            puzzle.reveal_all();
        }
        info!(correct, "Phrase guessed");
        self.record(TurnEvent::PhraseGuessed {
            player_id: player_id.to_string(),
            guess: guess.trim().to_string(),
            correct,
        });

        let index = self.current_player_index;
        if correct {
            self.players[index].award(SOLVE_POINTS);
            let ended = self.finish(Some(player_id.to_string()), EndReason::PhraseSolved);
            return Ok(GuessOutcome { correct, ended });
        }

        self.players[index].eliminate();
        let ended = self.check_end();
        Ok(GuessOutcome { correct, ended })
    }

    /// Evaluates the survivor conditions, ending the game if one fires.
    ///
    /// No survivors: the top scorer wins, ties going to the earlier player.
    /// One survivor: that player wins.
    pub fn check_end(&mut self) -> Option<EndReason> {
        if self.phase.is_terminal() {
            return None;
        }
        let alive: Vec<usize> = (0..self.players.len())
            .filter(|&i| self.players[i].is_alive)
            .collect();
        match alive.as_slice() {
            [] => {
                let winner = self.top_scorer();
                self.finish(winner, EndReason::AllEliminated)
            }
            [survivor] => {
                let winner = self.players[*survivor].id.clone();
                self.finish(Some(winner), EndReason::LastSurvivor)
            }
            _ => None,
        }
    }

    fn top_scorer(&self) -> Option<String> {
        let mut best: Option<&Player> = None;
        for player in &self.players {
            if best.is_none_or(|b| player.score > b.score) {
                best = Some(player);
            }
        }
        best.map(|p| p.id.clone())
    }

    fn finish(&mut self, winner_id: Option<String>, reason: EndReason) -> Option<EndReason> {
        info!(game_id = %self.id, winner = ?winner_id, %reason, "Game over");
        self.winner_id = winner_id.clone();
        self.phase = Phase::GameOver;
        self.record(TurnEvent::GameEnded { winner_id, reason });
        Some(reason)
    }

    /// Passes the turn on after a letter pick, a wrong guess or a failed action.
    ///
    /// Ends the game if fewer than two players survive. Otherwise moves to the
    /// next living player, archives the outgoing scenario and returns the
    /// denylist the next scenario must avoid; install it with
    /// [`GameState::set_scenario`].
    #[instrument(skip(self), fields(game_id = %self.id))]
    pub fn prepare_advance(&mut self) -> Result<Advance, RuleError> {
        if !matches!(self.phase, Phase::LetterSelection | Phase::WaitingContinue) {
            return Err(RuleError::WrongPhase {
                expected: Phase::WaitingContinue,
                actual: self.phase,
            });
        }
        if let Some(reason) = self.check_end() {
            return Ok(Advance::Ended(reason));
        }

        let count = self.players.len();
        let from = self.current_player_index;
        let next = (1..=count)
            .map(|step| (from + step) % count)
            .find(|&i| self.players[i].is_alive)
            .unwrap_or(from);

        if let Some(outgoing) = self.current_scenario.take() {
            self.scenario_history.push(outgoing);
        }
        self.current_player_index = next;
        self.round_number += 1;
        self.phase = Phase::Playing;

        let event = TurnEvent::TurnPassed {
            from: self.players[from].id.clone(),
            to: self.players[next].id.clone(),
        };
        info!(round = self.round_number, next = %self.players[next].name, "Turn advanced");
        self.record(event);
        Ok(Advance::Continue {
            denylist: self.scenario_history.to_vec(),
        })
    }

    /// Passes the turn on after a failed action.
    pub fn continue_turn(&mut self) -> Result<Advance, RuleError> {
        self.ensure_phase(Phase::WaitingContinue)?;
        self.prepare_advance()
    }

    /// Installs the scenario for the current player.
    pub fn set_scenario(&mut self, scenario: String) {
        self.current_scenario = Some(scenario);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn puzzle() -> PuzzleState {
        PuzzleState::new(GeneratedPuzzle::new("HOT POTATO", "Party Games"), Difficulty::Easy)
    }

    fn started(names: &[&str]) -> GameState {
        let mut game = GameState::new("ABC123", Difficulty::Easy, Utc::now());
        for name in names {
            game.add_player(format!("id-{name}"), name, false).unwrap();
        }
        game.begin(puzzle(), "first".to_string()).unwrap();
        game
    }

    #[test]
    fn test_start_requires_two_players() {
        let mut game = GameState::new("G", Difficulty::Easy, Utc::now());
        game.add_player("a", "Alice", false).unwrap();
        assert_eq!(
            game.begin(puzzle(), "s".to_string()),
            Err(RuleError::InsufficientPlayers { have: 1, need: 2 })
        );
        assert_eq!(game.phase(), Phase::Lobby);
    }

    #[test]
    fn test_lobby_rejects_bad_names_and_overflow() {
        let mut game = GameState::new("G", Difficulty::Easy, Utc::now());
        assert!(game.add_player("x", "   ", false).is_err());
        assert!(game.add_player("x", "A name that is far too long", false).is_err());
        for i in 0..MAX_PLAYERS {
            game.add_player(format!("p{i}"), &format!("Player {i}"), false).unwrap();
        }
        assert!(game.add_player("extra", "Extra", false).is_err());
    }

    #[test]
    fn test_success_scores_and_enters_letter_selection() {
        let mut game = started(&["A", "B"]);
        let outcome = game.record_verdict("id-A", "hide", true, "You hide.").unwrap();
        assert!(outcome.success);
        assert_eq!(game.players()[0].score(), SUCCESS_POINTS);
        assert_eq!(game.phase(), Phase::LetterSelection);
    }

    #[test]
    fn test_failure_costs_life_and_waits() {
        let mut game = started(&["A", "B"]);
        game.record_verdict("id-A", "poke it", false, "Ouch.").unwrap();
        assert_eq!(game.players()[0].lives(), STARTING_LIVES - 1);
        assert_eq!(game.phase(), Phase::WaitingContinue);
    }

    #[test]
    fn test_wrong_player_is_rejected_without_mutation() {
        let mut game = started(&["A", "B"]);
        let before = game.clone();
        let err = game.record_verdict("id-B", "run", true, "ok").unwrap_err();
        assert!(matches!(err, RuleError::NotYourTurn { .. }));
        assert_eq!(game, before);
    }

    #[test]
    fn test_last_life_lost_ends_game_for_survivor() {
        let mut game = started(&["A", "B"]);
        for _ in 0..STARTING_LIVES - 1 {
            game.players[0].lose_life();
        }
        let outcome = game.record_verdict("id-A", "lick the wire", false, "Zap.").unwrap();
        assert!(outcome.eliminated);
        assert_eq!(outcome.ended, Some(EndReason::LastSurvivor));
        assert_eq!(game.winner_id(), Some("id-B"));
        assert_eq!(game.phase(), Phase::GameOver);
    }

    #[test]
    fn test_letter_pick_reveals_and_scores() {
        let mut game = started(&["A", "B"]);
        game.record_verdict("id-A", "hide", true, "ok").unwrap();
        let outcome = game.pick_letter("id-A", 'o').unwrap();
        assert_eq!(outcome.letter, 'O');
        assert_eq!(outcome.occurrences, 3);
        assert_eq!(game.players()[0].score(), SUCCESS_POINTS + 3 * LETTER_POINTS);
        assert_eq!(game.puzzle().unwrap().masked(), "_O_ _O___O");
    }

    #[test]
    fn test_duplicate_letter_is_rejected() {
        let mut game = started(&["A", "B"]);
        game.record_verdict("id-A", "hide", true, "ok").unwrap();
        game.pick_letter("id-A", 'Z').unwrap();
        game.prepare_advance().unwrap();
        game.set_scenario("second".to_string());
        game.record_verdict("id-B", "hide", true, "ok").unwrap();
        assert_eq!(game.pick_letter("id-B", 'z'), Err(RuleError::DuplicateGuess('Z')));
        assert_eq!(game.guessed_letters(), &['Z']);
    }

    #[test]
    fn test_correct_guess_wins() {
        let mut game = started(&["A", "B"]);
        game.record_verdict("id-A", "hide", true, "ok").unwrap();
        let outcome = game.guess_phrase("id-A", "  hot   potato! ").unwrap();
        assert!(outcome.correct);
        assert_eq!(outcome.ended, Some(EndReason::PhraseSolved));
        assert_eq!(game.winner_id(), Some("id-A"));
        assert!(game.puzzle().unwrap().is_solved());
    }

    #[test]
    fn test_wrong_guess_eliminates_guesser() {
        let mut game = started(&["A", "B", "C"]);
        game.record_verdict("id-A", "hide", true, "ok").unwrap();
        let outcome = game.guess_phrase("id-A", "cold potato").unwrap();
        assert!(!outcome.correct);
        assert_eq!(outcome.ended, None);
        assert!(!game.players()[0].is_alive());
        let advance = game.prepare_advance().unwrap();
        assert!(matches!(advance, Advance::Continue { .. }));
        assert_eq!(game.current_player().unwrap().id(), "id-B");
    }

    #[test]
    fn test_advance_skips_dead_players_and_archives_scenario() {
        let mut game = started(&["A", "B", "C"]);
        game.players[1].eliminate();
        game.record_verdict("id-A", "poke", false, "Ouch.").unwrap();
        let advance = game.continue_turn().unwrap();
        assert_eq!(advance, Advance::Continue {
            denylist: vec!["first".to_string()]
        });
        assert_eq!(game.current_player().unwrap().id(), "id-C");
        assert_eq!(game.round_number(), 2);
        assert_eq!(game.current_scenario(), None);
    }

    #[test]
    fn test_all_eliminated_picks_top_scorer_by_list_order() {
        let mut game = started(&["A", "B"]);
        game.players[0].award(20);
        game.players[1].award(20);
        game.players[0].eliminate();
        game.players[1].eliminate();
        assert_eq!(game.check_end(), Some(EndReason::AllEliminated));
        assert_eq!(game.winner_id(), Some("id-A"));
    }

    #[test]
    fn test_history_is_capped() {
        let mut history = ScenarioHistory::default();
        for i in 0..8 {
            history.push(format!("s{i}"));
        }
        assert_eq!(history.len(), SCENARIO_HISTORY_LEN);
        assert_eq!(history.iter().next().map(String::as_str), Some("s3"));
    }

    #[test]
    fn test_parse_letter() {
        assert_eq!(GameState::parse_letter(" q "), Ok('Q'));
        assert!(GameState::parse_letter("ab").is_err());
        assert!(GameState::parse_letter("é").is_err());
        assert!(GameState::parse_letter("").is_err());
    }

    #[test]
    fn test_serializes_camel_case() {
        let game = started(&["A", "B"]);
        let json = serde_json::to_value(&game).unwrap();
        assert_eq!(json["currentPlayerIndex"], 0);
        assert_eq!(json["phase"], "playing");
        assert_eq!(json["players"][0]["isAlive"], true);
        let back: GameState = serde_json::from_value(json).unwrap();
        assert_eq!(back, game);
    }
}
