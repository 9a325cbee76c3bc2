//! Error types for game operations and persistence.

use derive_more::{Display, Error};
use perilous_rules::{Phase, RuleError};
use tracing::instrument;

/// Persistence failure with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Storage error: {} at {}:{}", message, file, line)]
pub struct StoreError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl StoreError {
    /// Creates a new storage error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        let message = message.into();
        tracing::error!(%message, "Storage error");
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// A save lost a race against another writer.
    #[track_caller]
    pub fn conflict(game_id: &str) -> Self {
        Self::new(format!("concurrent modification of game {game_id}"))
    }
}

impl From<diesel::result::Error> for StoreError {
    #[track_caller]
    fn from(err: diesel::result::Error) -> Self {
        Self::new(format!("Diesel error: {}", err))
    }
}

impl From<diesel::ConnectionError> for StoreError {
    #[track_caller]
    fn from(err: diesel::ConnectionError) -> Self {
        Self::new(format!("Connection error: {}", err))
    }
}

impl From<serde_json::Error> for StoreError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::new(format!("Serialization error: {}", err))
    }
}

/// Why an operation was rejected.
///
/// No variant leaves a partial write behind: the stored game is either
/// untouched or replaced by one complete, invariant-checked state.
#[derive(Debug, Clone, Display, Error)]
pub enum GameError {
    /// No game exists under the id.
    #[display("Game {} not found", _0)]
    GameNotFound(#[error(not(source))] String),

    /// Someone other than the current player tried to move.
    #[display("It's not your turn: waiting for {expected}")]
    NotYourTurn {
        /// Name of the player whose turn it is.
        expected: String,
    },

    /// The operation is not valid in the current phase.
    #[display("Action not allowed during {actual} (expected {expected})")]
    WrongPhase {
        /// Phase the operation requires.
        expected: Phase,
        /// Phase the game is in.
        actual: Phase,
    },

    /// Too few players to start.
    #[display("Need at least {need} players to start, have {have}")]
    InsufficientPlayers {
        /// Players currently in the lobby.
        have: usize,
        /// Minimum required.
        need: usize,
    },

    /// Malformed caller input.
    #[display("Invalid input: {}", _0)]
    InvalidInput(#[error(not(source))] String),

    /// The letter has already been guessed.
    #[display("Letter {} has already been guessed", _0)]
    DuplicateGuess(#[error(not(source))] char),

    /// The store failed or a concurrent write won.
    #[display("{}", _0)]
    Storage(StoreError),

    /// An operation produced a state that breaks a game invariant; nothing was saved.
    #[display("Invariant violated: {}", _0)]
    InvariantViolated(#[error(not(source))] String),
}

impl GameError {
    /// Stable machine-readable code for the error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::GameNotFound(_) => "GameNotFound",
            Self::NotYourTurn { .. } => "NotYourTurn",
            Self::WrongPhase { .. } => "WrongPhase",
            Self::InsufficientPlayers { .. } => "InsufficientPlayers",
            Self::InvalidInput(_) => "InvalidInput",
            Self::DuplicateGuess(_) => "DuplicateGuess",
            Self::Storage(_) => "StorageError",
            Self::InvariantViolated(_) => "InvariantViolated",
        }
    }
}

impl From<RuleError> for GameError {
    fn from(err: RuleError) -> Self {
        match err {
            RuleError::NotYourTurn { expected } => Self::NotYourTurn { expected },
            RuleError::WrongPhase { expected, actual } => Self::WrongPhase { expected, actual },
            RuleError::InsufficientPlayers { have, need } => {
                Self::InsufficientPlayers { have, need }
            }
            RuleError::InvalidInput(message) => Self::InvalidInput(message),
            RuleError::DuplicateGuess(letter) => Self::DuplicateGuess(letter),
        }
    }
}

impl From<StoreError> for GameError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err)
    }
}
