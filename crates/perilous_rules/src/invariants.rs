//! First-class invariants for a match.
//!
//! Invariants are logical properties that must hold whenever a state is saved.
//! The server checks [`GameInvariants`] after every transition in debug
//! builds, and the property tests check them after every step.

use crate::{GameState, Phase, SCENARIO_HISTORY_LEN};

/// A logical property that must hold for a given state.
pub trait Invariant<S> {
    /// Checks if the invariant holds for the given state.
    fn holds(state: &S) -> bool;

    /// Human-readable description of the invariant.
    fn description() -> &'static str;
}

/// Violation of an invariant.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
#[display("invariant violated: {description}")]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub description: String,
}

impl InvariantViolation {
    /// Creates a new invariant violation.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// A set of invariants checked together.
///
/// Implemented for tuples of up to five invariants.
pub trait InvariantSet<S> {
    /// Checks all invariants in the set, reporting every one that fails.
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>>;
}

macro_rules! impl_invariant_set {
    ($($inv:ident),+) => {
        impl<S, $($inv),+> InvariantSet<S> for ($($inv,)+)
        where
            $($inv: Invariant<S>,)+
        {
            fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
                let mut violations = Vec::new();
                $(
                    if !$inv::holds(state) {
                        violations.push(InvariantViolation::new($inv::description()));
                    }
                )+
                if violations.is_empty() {
                    Ok(())
                } else {
                    Err(violations)
                }
            }
        }
    };
}

impl_invariant_set!(I1, I2);
impl_invariant_set!(I1, I2, I3);
impl_invariant_set!(I1, I2, I3, I4);
impl_invariant_set!(I1, I2, I3, I4, I5);

/// While someone must act, the current player is alive.
pub struct CurrentPlayerAlive;

impl Invariant<GameState> for CurrentPlayerAlive {
    fn holds(game: &GameState) -> bool {
        !game.phase().requires_live_current()
            || game.current_player().is_some_and(|p| p.is_alive())
    }

    fn description() -> &'static str {
        "The current player is alive while playing or selecting a letter"
    }
}

/// The phrase is uppercase letters separated by single spaces.
pub struct PhraseCharset;

impl Invariant<GameState> for PhraseCharset {
    fn holds(game: &GameState) -> bool {
        game.puzzle().is_none_or(|puzzle| {
            let phrase = puzzle.phrase();
            !phrase.is_empty()
                && phrase.chars().all(|c| c.is_ascii_uppercase() || c == ' ')
                && phrase.split(' ').all(|word| !word.is_empty())
        })
    }

    fn description() -> &'static str {
        "The phrase matches [A-Z ]+ with single spaces"
    }
}

/// Every revealed letter occurs in the phrase and was guessed.
pub struct RevealedInPhrase;

impl Invariant<GameState> for RevealedInPhrase {
    fn holds(game: &GameState) -> bool {
        game.puzzle().is_none_or(|puzzle| {
            puzzle.revealed_letters().iter().all(|letter| {
                puzzle.phrase().contains(*letter)
                    && (game.phase() == Phase::GameOver || game.guessed_letters().contains(letter))
            })
        })
    }

    fn description() -> &'static str {
        "Every revealed letter occurs in the phrase and was picked"
    }
}

/// A winner, when set, is one of the players and the game is over.
pub struct WinnerIsMember;

impl Invariant<GameState> for WinnerIsMember {
    fn holds(game: &GameState) -> bool {
        match game.winner_id() {
            Some(winner) => game.phase() == Phase::GameOver && game.player(winner).is_some(),
            None => true,
        }
    }

    fn description() -> &'static str {
        "The winner is a member of the game and only set once it is over"
    }
}

/// The scenario history never exceeds its capacity.
pub struct HistoryBounded;

impl Invariant<GameState> for HistoryBounded {
    fn holds(game: &GameState) -> bool {
        game.scenario_history().len() <= SCENARIO_HISTORY_LEN
    }

    fn description() -> &'static str {
        "At most five scenarios are remembered"
    }
}

/// All match invariants as a composable set.
pub type GameInvariants = (
    CurrentPlayerAlive,
    PhraseCharset,
    RevealedInPhrase,
    WinnerIsMember,
    HistoryBounded,
);
