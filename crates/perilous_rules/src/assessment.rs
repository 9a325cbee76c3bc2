//! Action assessment: reading a free-text action for its likely result.

use crate::VerdictWeights;
use crate::text;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Cues for careful or inventive play.
const FAVORABLE_CUES: &[&str] = &[
    "carefully", "cautiously", "slowly", "quietly", "calmly", "gently", "hide", "shield",
    "protect", "cover", "plan", "distract", "wait", "observe", "watch", "check", "listen",
    "tie", "use", "build", "barricade", "signal", "call for help", "retreat", "back away",
    "sneak", "crouch", "duck", "climb", "wrap", "block", "trap", "lure", "improvise",
    "hold my breath", "stay low", "look for", "search for", "test the",
];

/// Cues for reckless or dismissive play.
const UNFAVORABLE_CUES: &[&str] = &[
    "charge", "punch", "kick", "attack", "fight", "taunt", "yell at", "ignore", "lick", "eat",
    "poke", "blindly", "recklessly", "headfirst", "jump in", "run straight", "stand still",
    "do nothing", "give up", "sleep", "nap", "dance", "insult", "stare at", "scream",
];

/// Answers that show no effort at all.
const EMPTY_EFFORT: &[&str] = &[
    "nothing", "idk", "i don't know", "i dont know", "dunno", "no idea", "pass", "whatever",
    "nah", "skip", "i give up", "not sure",
];

/// How an action reads before it is judged.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Leaning {
    /// Cautious or creative.
    Favorable,
    /// Reckless, ignorant or empty effort.
    Unfavorable,
    /// No clear signal either way.
    Ambiguous,
}

impl Leaning {
    /// Probability of success for this leaning.
    pub fn success_probability(self, weights: &VerdictWeights) -> f64 {
        match self {
            Self::Favorable => weights.favorable,
            Self::Unfavorable => weights.unfavorable,
            Self::Ambiguous => weights.ambiguous,
        }
    }

    /// Turns a uniform roll in `[0, 1)` into a success decision.
    pub fn decide(self, weights: &VerdictWeights, roll: f64) -> bool {
        roll < self.success_probability(weights)
    }

    /// Verdict used when no model answer could be accepted.
    ///
    /// Clear leanings settle the outcome outright; only an ambiguous action
    /// falls back to its roll.
    pub fn fallback_success(self, rolled: bool) -> bool {
        match self {
            Self::Favorable => true,
            Self::Unfavorable => false,
            Self::Ambiguous => rolled,
        }
    }

    /// Guidance for the judge describing how this leaning usually ends.
    pub fn guidance(self) -> &'static str {
        match self {
            Self::Favorable => "The action is cautious or creative, so it usually succeeds.",
            Self::Unfavorable => "The action is reckless or shows no effort, so it usually fails.",
            Self::Ambiguous => "The action could go either way.",
        }
    }
}

/// Classifies an action by keyword cues.
///
/// Empty-effort answers are always unfavorable. Otherwise the side with more
/// cue hits wins, and a tie is ambiguous.
#[instrument(ret)]
pub fn assess_action(action: &str) -> Leaning {
    let normalized = text::normalize(action);
    if normalized.is_empty()
        || EMPTY_EFFORT
            .iter()
            .any(|answer| text::normalize(answer) == normalized)
    {
        return Leaning::Unfavorable;
    }

    let tokens = text::tokens(action);
    let hits = |cues: &[&str]| cues.iter().filter(|cue| text::contains_phrase(&tokens, cue)).count();
    let favorable = hits(FAVORABLE_CUES);
    let unfavorable = hits(UNFAVORABLE_CUES);

    match favorable.cmp(&unfavorable) {
        std::cmp::Ordering::Greater => Leaning::Favorable,
        std::cmp::Ordering::Less => Leaning::Unfavorable,
        std::cmp::Ordering::Equal => Leaning::Ambiguous,
    }
}

/// How close a player is to elimination.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum PerilLevel {
    /// Three or more lives.
    Calm,
    /// Two lives.
    Wary,
    /// One life or fewer.
    Desperate,
}

impl PerilLevel {
    /// Peril for a number of remaining lives.
    pub fn from_lives(lives: u8) -> Self {
        match lives {
            0 | 1 => Self::Desperate,
            2 => Self::Wary,
            _ => Self::Calm,
        }
    }

    /// Tone instruction for a bot at this peril level.
    pub fn tone(self) -> &'static str {
        match self {
            Self::Calm => "confident and playful",
            Self::Wary => "careful and focused",
            Self::Desperate => "tense and desperate, every move counts",
        }
    }

    /// Adverb used in template bot actions.
    pub fn adverb(self) -> &'static str {
        match self {
            Self::Calm => "confidently",
            Self::Wary => "carefully",
            Self::Desperate => "desperately",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cautious_action_is_favorable() {
        assert_eq!(
            assess_action("I carefully back away and hide behind the crates"),
            Leaning::Favorable
        );
    }

    #[test]
    fn test_reckless_action_is_unfavorable() {
        assert_eq!(assess_action("I charge headfirst and punch the bear"), Leaning::Unfavorable);
    }

    #[test]
    fn test_empty_effort_is_unfavorable() {
        assert_eq!(assess_action("nothing"), Leaning::Unfavorable);
        assert_eq!(assess_action("I don't know"), Leaning::Unfavorable);
        assert_eq!(assess_action("   "), Leaning::Unfavorable);
    }

    #[test]
    fn test_unclear_action_is_ambiguous() {
        assert_eq!(assess_action("I open the blue door"), Leaning::Ambiguous);
    }

    #[test]
    fn test_peril_from_lives() {
        assert_eq!(PerilLevel::from_lives(3), PerilLevel::Calm);
        assert_eq!(PerilLevel::from_lives(2), PerilLevel::Wary);
        assert_eq!(PerilLevel::from_lives(1), PerilLevel::Desperate);
        assert_eq!(PerilLevel::from_lives(0), PerilLevel::Desperate);
    }

    #[test]
    fn test_decide_uses_weights() {
        let weights = VerdictWeights::default();
        assert!(Leaning::Favorable.decide(&weights, 0.8));
        assert!(!Leaning::Unfavorable.decide(&weights, 0.2));
        assert!(Leaning::Ambiguous.decide(&weights, 0.49));
        assert!(!Leaning::Ambiguous.decide(&weights, 0.5));
    }

    #[test]
    fn test_fallback_follows_clear_leanings() {
        for rolled in [true, false] {
            assert!(Leaning::Favorable.fallback_success(rolled));
            assert!(!Leaning::Unfavorable.fallback_success(rolled));
            assert_eq!(Leaning::Ambiguous.fallback_success(rolled), rolled);
        }
    }
}
