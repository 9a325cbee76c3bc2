//! Strict instructions for each artifact, and their repairs.

use crate::llm::Prompt;
use perilous_rules::{ContentRules, Difficulty, Leaning, PerilLevel, Violation};

const STYLE: &str = "You write content for a fast, funny party game about surviving absurd danger. \
Follow the output format exactly. Do not add greetings, explanations or markdown.";

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Instruction for the next danger scenario.
pub fn scenario(rules: &ContentRules, recent: &[String]) -> Prompt {
    let system = format!(
        "{STYLE}\n\nWrite one danger scenario.\n\
         Rules:\n\
         - exactly {sentences} sentences and {words} words in total\n\
         - the first sentence describes a sudden, specific danger and offers two choices \
           with \"either ... or ...\"\n\
         - the second sentence is exactly \"{ending}\"\n\
         - never use these overused hazards: {tropes}\n\
         Reply with the scenario text only.",
        sentences = rules.scenario_sentences(),
        words = rules.scenario_words(),
        ending = rules.scenario_ending(),
        tropes = rules.banned_tropes().join(", "),
    );
    let user = if recent.is_empty() {
        "Write the opening scenario.".to_string()
    } else {
        format!(
            "Do not repeat or closely echo any of these recent scenarios:\n{}\n\nWrite the next scenario.",
            bullet_list(recent)
        )
    };
    Prompt::new(system, user)
}

/// Instruction for a puzzle phrase and its category.
pub fn puzzle(rules: &ContentRules, difficulty: Difficulty, recent: &[String]) -> Prompt {
    let system = format!(
        "{STYLE}\n\nInvent a hidden phrase for a letter-guessing puzzle.\n\
         Rules:\n\
         - the phrase is a common idiom, saying or everyday expression with {words} words\n\
         - letters and single spaces only, no digits, punctuation or names of people and places\n\
         - the category is {category_words} words that hint at the phrase without reusing its words\n\
         - never use these generic categories: {banned}\n\
         Reply with exactly one line in this format:\n\
         PHRASE: <PHRASE IN CAPITALS> | CATEGORY: <Category>",
        words = rules.phrase_words(difficulty),
        category_words = rules.category_words(),
        banned = rules.banned_categories().join(", "),
    );
    let user = if recent.is_empty() {
        format!("Difficulty: {difficulty}. Write the puzzle.")
    } else {
        format!(
            "Difficulty: {difficulty}. Avoid these recent phrases:\n{}\n\nWrite the puzzle.",
            bullet_list(recent)
        )
    };
    Prompt::new(system, user)
}

/// Instruction to replace only the category of an accepted phrase.
pub fn category(rules: &ContentRules, phrase: &str, violations: &[Violation]) -> Prompt {
    let system = format!(
        "{STYLE}\n\nWrite a category for a letter-guessing puzzle.\n\
         Rules:\n\
         - {category_words} words, letters and spaces only\n\
         - hint at the phrase without reusing any of its words\n\
         - never use these generic categories: {banned}\n\
         Reply with exactly one line in this format:\n\
         CATEGORY: <Category>",
        category_words = rules.category_words(),
        banned = rules.banned_categories().join(", "),
    );
    let user = format!(
        "The phrase is: {phrase}\n\nThe previous category broke these rules:\n{}\n\nWrite a new category.",
        describe(violations)
    );
    Prompt::new(system, user)
}

/// Instruction to judge, or narrate a decided result for, one action.
pub fn verdict(
    rules: &ContentRules,
    scenario: &str,
    action: &str,
    leaning: Leaning,
    decided: Option<bool>,
) -> Prompt {
    let ruling = match decided {
        Some(true) => "The action SUCCEEDS. Narrate how it works out.".to_string(),
        Some(false) => "The action FAILS. Narrate how it goes wrong.".to_string(),
        None => format!(
            "Decide whether the action succeeds. {} Cautious or creative actions tend to \
             succeed; reckless or lazy ones tend to fail.",
            leaning.guidance()
        ),
    };
    let system = format!(
        "{STYLE}\n\nYou are the judge. {ruling}\n\
         Rules:\n\
         - the outcome is 1 to {sentences} sentences and at most {words} words\n\
         - refer to what the player actually did in this scenario\n\
         - never write the words VERDICT, RESULT or OUTCOME inside the outcome\n\
         Reply with exactly two lines:\n\
         VERDICT: SUCCESS or FAILURE\n\
         OUTCOME: <what happens>",
        sentences = rules.outcome_max_sentences(),
        words = rules.outcome_max_words(),
    );
    let user = format!("Scenario: {scenario}\n\nPlayer action: {action}");
    Prompt::new(system, user)
}

/// Instruction for a bot's action.
pub fn bot_action(
    rules: &ContentRules,
    scenario: &str,
    options: &[String],
    peril: PerilLevel,
) -> Prompt {
    let commitment = if options.is_empty() {
        "- pick one concrete thing to do".to_string()
    } else {
        format!(
            "- commit to exactly one of these options:\n{}",
            bullet_list(options)
        )
    };
    let system = format!(
        "{STYLE}\n\nYou are a player in the game. Describe what you do.\n\
         Rules:\n\
         - one sentence of {words} words\n\
         - first person, present tense, starting with \"I\"\n\
         {commitment}\n\
         - tone: {tone}\n\
         Reply with the sentence only.",
        words = rules.bot_action_words(),
        tone = peril.tone(),
    );
    let user = format!("Scenario: {scenario}");
    Prompt::new(system, user)
}

/// Amends an instruction with the rules the previous answer broke.
pub fn repair(original: &Prompt, previous: &str, violations: &[Violation]) -> Prompt {
    let user = format!(
        "{}\n\nYour previous answer was:\n{}\n\nIt broke these rules:\n{}\n\n\
         Rewrite it so every rule holds. Reply in the same format with nothing else.",
        original.user(),
        previous.trim(),
        describe(violations)
    );
    Prompt::new(original.system().clone(), user)
}

fn describe(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| format!("- {}", v.description))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_puzzle_prompt_states_word_range() {
        let rules = ContentRules::default();
        let prompt = puzzle(&rules, Difficulty::Easy, &[]);
        assert!(prompt.system().contains("2 to 3 words"));
        assert!(prompt.system().contains("PHRASE:"));
    }

    #[test]
    fn test_repair_restates_violations() {
        let rules = ContentRules::default();
        let original = scenario(&rules, &["Old scenario. What do you do?".to_string()]);
        let violation = Violation::new("word-count", "use 30 to 55 words in total, not 12");
        let repaired = repair(&original, "Too short. What do you do?", &[violation]);
        assert_eq!(repaired.system(), original.system());
        assert!(repaired.user().contains("Old scenario"));
        assert!(repaired.user().contains("Too short"));
        assert!(repaired.user().contains("not 12"));
    }

    #[test]
    fn test_verdict_prompt_pins_decided_result() {
        let rules = ContentRules::default();
        let prompt = verdict(&rules, "Bees.", "I wave", Leaning::Ambiguous, Some(false));
        assert!(prompt.system().contains("The action FAILS"));
        let prompt = verdict(&rules, "Bees.", "I hide", Leaning::Favorable, None);
        assert!(prompt.system().contains("Decide whether"));
    }
}
