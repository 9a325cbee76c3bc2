//! Perilous rules - pure game logic for the perilous party game.
//!
//! Nothing in this crate performs I/O. It defines the domain model, the
//! content contracts every generated artifact must satisfy, the tolerant
//! parsers that read raw model text, and the curated fallback pools used
//! when generation gives up.
//!
//! # Architecture
//!
//! - **State**: [`GameState`], [`Player`], [`PuzzleState`] and the pure
//!   transitions the server's engine composes
//! - **Contracts**: [`ScenarioContract`], [`PuzzleContract`],
//!   [`VerdictContract`], [`BotActionContract`]
//! - **Rules**: [`ContentRules`], the configuration data all validators read
//! - **Fallback**: curated static values per contract
//!
//! # Example
//!
//! ```
//! use perilous_rules::{Contract, ContentRules, ScenarioContract};
//!
//! let rules = ContentRules::default();
//! let contract = ScenarioContract::new(&rules, &[]);
//! let raw = "A chemical spill hisses across the lab bench while the ventilation fans \
//!            stutter and die, and you could either seal the fume hood or sprint for the \
//!            emergency shower down the hall. What do you do?";
//! assert!(contract.accept(raw).is_ok());
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod assessment;
mod contracts;
mod difficulty;
mod error;
pub mod fallback;
mod invariants;
mod phase;
mod rules;
mod state;

pub use assessment::{Leaning, PerilLevel, assess_action};
pub use contracts::{
    ActionVerdict, BotAction, BotActionContract, Contract, GeneratedPuzzle, PuzzleContract,
    Scenario, ScenarioContract, VerdictContract, Violation, implied_options, text,
};
pub use difficulty::Difficulty;
pub use error::RuleError;
pub use invariants::{
    CurrentPlayerAlive, GameInvariants, HistoryBounded, Invariant, InvariantSet,
    InvariantViolation, PhraseCharset, RevealedInPhrase, WinnerIsMember,
};
pub use phase::Phase;
pub use rules::{ContentRules, VerdictWeights, WordRange, WordRanges};
pub use state::{
    ActOutcome, Advance, EVENT_LOG_LEN, EndReason, GameState, GuessOutcome, LETTER_POINTS,
    LetterOutcome, MAX_ACTION_LEN, MAX_NAME_LEN, MAX_PLAYERS, MIN_PLAYERS, Player, PuzzleState,
    SCENARIO_HISTORY_LEN, SOLVE_POINTS, STARTING_LIVES, SUCCESS_POINTS, ScenarioHistory,
    TurnEvent,
};
