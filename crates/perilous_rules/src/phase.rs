//! Coarse game phases.

use serde::{Deserialize, Serialize};
use strum::Display;

/// Phase of a match.
///
/// `Lobby` is initial and `GameOver` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Phase {
    /// Players are joining.
    Lobby,
    /// The current player must describe an action.
    Playing,
    /// The current player survived and picks a letter or guesses the phrase.
    LetterSelection,
    /// The current player failed and the turn waits to be passed on.
    WaitingContinue,
    /// A winner has been decided.
    GameOver,
}

impl Phase {
    /// Returns true for phases in which the current player must be alive.
    pub fn requires_live_current(self) -> bool {
        matches!(self, Phase::Playing | Phase::LetterSelection)
    }

    /// Returns true once the match is decided.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::GameOver)
    }
}
