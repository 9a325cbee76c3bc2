//! Puzzle difficulty levels.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Difficulty of the hidden phrase.
///
/// Each level maps to a word-count range through
/// [`WordRanges`](crate::WordRanges).
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum Difficulty {
    /// Short, everyday phrases.
    Easy,
    /// The default level.
    #[default]
    Medium,
    /// Longer idioms and titles.
    Hard,
    /// Full sayings.
    VeryHard,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_parses_kebab_case() {
        assert_eq!(Difficulty::from_str("very-hard").ok(), Some(Difficulty::VeryHard));
        assert_eq!(Difficulty::from_str("EASY").ok(), Some(Difficulty::Easy));
        assert!(Difficulty::from_str("impossible").is_err());
    }

    #[test]
    fn test_serde_uses_kebab_case() {
        let json = serde_json::to_string(&Difficulty::VeryHard).unwrap();
        assert_eq!(json, "\"very-hard\"");
    }
}
