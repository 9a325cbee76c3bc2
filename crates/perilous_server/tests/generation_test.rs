//! Generation adapter behavior against scripted model output.

use perilous_rules::{
    BotActionContract, ContentRules, Contract, Difficulty, PuzzleContract, ScenarioContract,
    VerdictContract, implied_options,
};
use perilous_server::generation::{
    BotActionRequest, PuzzleRequest, ScenarioRequest, VerdictRequest,
};
use perilous_server::llm::OfflineGenerator;
use perilous_server::testing::ScriptedGenerator;
use perilous_server::{ContentGenerator, ContentSource, GenerationSettings};
use proptest::prelude::*;
use std::sync::Arc;

const SCENARIO: &str = "The ferry lurches as a container slides loose on the flooded deck \
    and pins the railing, and you could either crawl under it toward the lifeboats or climb \
    the stacked crates to the bridge. What do you do?";

fn adapter(script: &Arc<ScriptedGenerator>) -> ContentGenerator {
    ContentGenerator::seeded(
        script.clone(),
        ContentRules::default(),
        GenerationSettings::default().with_timeout_ms(1_000),
        3,
    )
}

#[tokio::test]
async fn test_four_word_easy_phrase_triggers_repair() {
    let script = Arc::new(ScriptedGenerator::new([
        "PHRASE: A PIECE OF CAKE | CATEGORY: Easy Tasks",
        "PHRASE: COLD FEET | CATEGORY: Wedding Nerves",
    ]));
    let puzzle = adapter(&script)
        .puzzle(PuzzleRequest {
            difficulty: Difficulty::Easy,
            recent: &[],
            selector: 0,
        })
        .await;

    assert_eq!(puzzle.phrase, "COLD FEET");
    assert_eq!(puzzle.category, "Wedding Nerves");
    let prompts = script.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].user().contains("A PIECE OF CAKE"));
}

#[tokio::test]
async fn test_leading_commentary_is_tolerated() {
    let script = Arc::new(ScriptedGenerator::new([format!(
        "Sure! Here is your scenario:\n\n{SCENARIO}"
    )]));
    let scenario = adapter(&script)
        .scenario(ScenarioRequest {
            recent: &[],
            round: 1,
        })
        .await;
    assert!(scenario.text().starts_with("The ferry lurches"));
    assert_eq!(script.calls(), 1);
}

#[tokio::test]
async fn test_recent_scenario_is_refused() {
    let recent = vec![SCENARIO.to_string()];
    let script = Arc::new(ScriptedGenerator::new([SCENARIO, SCENARIO, SCENARIO]));
    let scenario = adapter(&script)
        .scenario(ScenarioRequest {
            recent: &recent,
            round: 2,
        })
        .await;
    assert_ne!(scenario.text(), SCENARIO);
    assert_eq!(script.calls(), 3);
}

#[tokio::test]
async fn test_transport_failures_fall_back() {
    let script = Arc::new(ScriptedGenerator::default());
    for _ in 0..3 {
        script.push_failure("connection reset");
    }
    let verdict = adapter(&script)
        .verdict(VerdictRequest {
            scenario: SCENARIO,
            action: "I carefully crawl under the container",
        })
        .await;
    assert_eq!(script.remaining(), 0);
    assert!(
        VerdictContract::new(&ContentRules::default(), None)
            .validate(&verdict)
            .is_ok()
    );
}

#[tokio::test]
async fn test_exhausted_verdict_follows_clear_leaning() {
    // Across many seeds some up-front rolls land above the favorable weight,
    // so any roll leaking into the fallback would flip at least one outcome.
    for seed in 0..64 {
        let adapter = ContentGenerator::seeded(
            Arc::new(OfflineGenerator),
            ContentRules::default(),
            GenerationSettings::default(),
            seed,
        );
        let cautious = adapter
            .verdict(VerdictRequest {
                scenario: SCENARIO,
                action: "I carefully back away and hide behind the crates",
            })
            .await;
        assert!(cautious.success, "seed {seed}: cautious action failed");

        let reckless = adapter
            .verdict(VerdictRequest {
                scenario: SCENARIO,
                action: "I charge headfirst and punch the container",
            })
            .await;
        assert!(!reckless.success, "seed {seed}: reckless action succeeded");
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_every_returned_value_satisfies_its_contract(
        responses in proptest::collection::vec(".{0,200}", 3),
        round in 0u32..50,
        lives in 1u8..=3,
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let rules = ContentRules::default();
            let recent: Vec<String> = Vec::new();

            let script = Arc::new(ScriptedGenerator::new(responses.clone()));
            let scenario = adapter(&script)
                .scenario(ScenarioRequest { recent: &recent, round })
                .await;
            assert!(ScenarioContract::new(&rules, &recent).validate(&scenario).is_ok());

            let script = Arc::new(ScriptedGenerator::new(responses.clone()));
            let puzzle = adapter(&script)
                .puzzle(PuzzleRequest {
                    difficulty: Difficulty::Medium,
                    recent: &recent,
                    selector: u64::from(round),
                })
                .await;
            assert!(
                PuzzleContract::new(&rules, Difficulty::Medium, &recent)
                    .validate(&puzzle)
                    .is_ok()
            );

            let script = Arc::new(ScriptedGenerator::new(responses.clone()));
            let verdict = adapter(&script)
                .verdict(VerdictRequest { scenario: SCENARIO, action: "I wait" })
                .await;
            assert!(
                VerdictContract::new(&rules, None)
                    .grounded_in(SCENARIO, "I wait")
                    .validate(&verdict)
                    .is_ok()
            );

            let script = Arc::new(ScriptedGenerator::new(responses.clone()));
            let action = adapter(&script)
                .bot_action(BotActionRequest { scenario: SCENARIO, lives, round })
                .await;
            let options = implied_options(SCENARIO);
            assert!(BotActionContract::new(&rules, &options).validate(&action).is_ok());
        });
    }
}
