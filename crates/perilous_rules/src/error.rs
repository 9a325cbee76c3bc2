//! Precondition failures for game transitions.

use crate::Phase;

/// A transition was rejected before anything changed.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum RuleError {
    /// Someone other than the current player tried to move.
    #[display("It's not your turn: waiting for {expected}")]
    NotYourTurn {
        /// Name of the player whose turn it is.
        expected: String,
    },

    /// The transition is not valid in the current phase.
    #[display("Action not allowed during {actual} (expected {expected})")]
    WrongPhase {
        /// Phase the transition requires.
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
    InvalidInput(String),

    /// The letter has already been guessed this game.
    #[display("Letter {} has already been guessed", _0)]
    DuplicateGuess(char),
}

impl std::error::Error for RuleError {}
