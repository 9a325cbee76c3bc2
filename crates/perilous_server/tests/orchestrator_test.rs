//! End-to-end game operations over the in-memory store.

use perilous_rules::{Difficulty, Phase};
use perilous_server::llm::OfflineGenerator;
use perilous_server::testing::FixedContent;
use perilous_server::{
    ContentGenerator, GameError, GameView, GenerationSettings, MemoryStore, Orchestrator,
    PlaySettings,
};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn orchestrator(content: FixedContent) -> Orchestrator {
    Orchestrator::new(
        Arc::new(MemoryStore::new()),
        Arc::new(content),
        PlaySettings::default().with_bot_think(Duration::ZERO),
    )
}

/// Two humans in a started game; returns the game id and both player ids.
async fn two_player_game(orch: &Orchestrator) -> (String, String, String) {
    let a = orch.create_game("Alice", Difficulty::Easy).await.unwrap();
    let b = orch.join_game(&a.game_id, "Bob").await.unwrap();
    orch.start_game(&a.game_id).await.unwrap();
    (a.game_id, a.player_id, b.player_id)
}

#[tokio::test]
async fn test_last_life_lost_ends_game_regardless_of_score() {
    let content =
        FixedContent::default().with_verdicts([true, false, false, true, false, true, false]);
    let orch = orchestrator(content);
    let (game, a, b) = two_player_game(&orch).await;

    // A scores 25, B is hurt.
    orch.submit_action(&game, &a, "I hide").await.unwrap();
    orch.pick_letter(&game, &a, "o").await.unwrap();
    orch.submit_action(&game, &b, "I run").await.unwrap();
    orch.continue_turn(&game).await.unwrap();

    // A drops to one life while B scores 20.
    orch.submit_action(&game, &a, "I wait").await.unwrap();
    orch.continue_turn(&game).await.unwrap();
    orch.submit_action(&game, &b, "I duck").await.unwrap();
    orch.pick_letter(&game, &b, "z").await.unwrap();
    orch.submit_action(&game, &a, "I wait again").await.unwrap();
    orch.continue_turn(&game).await.unwrap();
    orch.submit_action(&game, &b, "I duck again").await.unwrap();
    orch.pick_letter(&game, &b, "q").await.unwrap();

    let before = orch.public_state(&game, None).await.unwrap();
    let alice = &before.players[0];
    assert_eq!(alice.lives, 1);
    assert!(alice.score > before.players[1].score);

    let played = orch.submit_action(&game, &a, "I leap").await.unwrap();
    assert!(played.outcome.eliminated);
    assert_eq!(played.view.phase, Phase::GameOver);
    assert_eq!(played.view.winner_id.as_deref(), Some(b.as_str()));
}

#[tokio::test]
async fn test_wrong_player_rejected_and_state_unchanged() {
    let orch = orchestrator(FixedContent::default());
    let (game, _a, b) = two_player_game(&orch).await;
    let before = orch.public_state(&game, None).await.unwrap();

    for _ in 0..3 {
        let err = orch.submit_action(&game, &b, "I cut in").await.unwrap_err();
        assert!(matches!(err, GameError::NotYourTurn { .. }));
    }
    let err = orch
        .submit_action(&game, "no-such-player", "I cut in")
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::NotYourTurn { .. }));

    let after = orch.public_state(&game, None).await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_wrong_phase_and_bad_input() {
    let orch = orchestrator(FixedContent::default());
    let (game, a, _b) = two_player_game(&orch).await;

    let err = orch.pick_letter(&game, &a, "e").await.unwrap_err();
    assert!(matches!(err, GameError::WrongPhase { .. }));

    let err = orch.submit_action(&game, &a, "   ").await.unwrap_err();
    assert!(matches!(err, GameError::InvalidInput(_)));

    orch.submit_action(&game, &a, "I hide").await.unwrap();
    let err = orch.pick_letter(&game, &a, "7").await.unwrap_err();
    assert!(matches!(err, GameError::InvalidInput(_)));

    let err = orch.continue_turn(&game).await.unwrap_err();
    assert!(matches!(err, GameError::WrongPhase { .. }));
}

#[tokio::test]
async fn test_duplicate_letter_rejected() {
    let orch = orchestrator(FixedContent::default());
    let (game, a, b) = two_player_game(&orch).await;

    orch.submit_action(&game, &a, "I hide").await.unwrap();
    orch.pick_letter(&game, &a, "e").await.unwrap();
    orch.submit_action(&game, &b, "I hide too").await.unwrap();
    let err = orch.pick_letter(&game, &b, "E").await.unwrap_err();
    assert!(matches!(err, GameError::DuplicateGuess('E')));
}

#[tokio::test]
async fn test_correct_guess_wins_and_wrong_guess_eliminates() {
    let orch = orchestrator(FixedContent::default());
    let a = orch.create_game("Alice", Difficulty::Easy).await.unwrap();
    let b = orch.join_game(&a.game_id, "Bob").await.unwrap();
    let c = orch.join_game(&a.game_id, "Cara").await.unwrap();
    let game = a.game_id.clone();
    orch.start_game(&game).await.unwrap();

    orch.submit_action(&game, &a.player_id, "I hide").await.unwrap();
    let played = orch
        .guess_phrase(&game, &a.player_id, "cold potato")
        .await
        .unwrap();
    assert!(!played.outcome.correct);
    assert!(!played.view.players[0].is_alive);
    assert_eq!(played.view.current_player_id.as_deref(), Some(b.player_id.as_str()));

    orch.submit_action(&game, &b.player_id, "I hide").await.unwrap();
    let played = orch
        .guess_phrase(&game, &b.player_id, "  hot   POTATO ")
        .await
        .unwrap();
    assert!(played.outcome.correct);
    assert_eq!(played.view.phase, Phase::GameOver);
    assert_eq!(played.view.winner_id.as_deref(), Some(b.player_id.as_str()));
    assert_ne!(played.view.winner_id.as_deref(), Some(c.player_id.as_str()));
}

#[tokio::test]
async fn test_lobby_rules() {
    let orch = orchestrator(FixedContent::default());
    let host = orch.create_game("Alice", Difficulty::Easy).await.unwrap();

    let err = orch.start_game(&host.game_id).await.unwrap_err();
    assert!(matches!(
        err,
        GameError::InsufficientPlayers { have: 1, need: 2 }
    ));

    let err = orch.join_game(&host.game_id, "alice").await.unwrap_err();
    assert!(matches!(err, GameError::InvalidInput(_)));

    for _ in 0..7 {
        orch.add_bot(&host.game_id).await.unwrap();
    }
    let err = orch.join_game(&host.game_id, "Late").await.unwrap_err();
    assert!(matches!(err, GameError::InvalidInput(_)));

    orch.start_game(&host.game_id).await.unwrap();
    let err = orch.add_bot(&host.game_id).await.unwrap_err();
    assert!(matches!(err, GameError::WrongPhase { .. }));
}

#[tokio::test]
async fn test_letters_serialize_in_pick_order() {
    let orch = orchestrator(FixedContent::default());
    let (game, a, b) = two_player_game(&orch).await;
    orch.submit_action(&game, &a, "I hide").await.unwrap();
    orch.pick_letter(&game, &a, "t").await.unwrap();
    orch.submit_action(&game, &b, "I hide").await.unwrap();
    orch.pick_letter(&game, &b, "h").await.unwrap();

    let view = orch.public_state(&game, Some(&a)).await.unwrap();
    let json = serde_json::to_value(&view).unwrap();
    assert_eq!(json["guessedLetters"], serde_json::json!(["T", "H"]));
    assert_eq!(json["revealedLetters"], serde_json::json!(["T", "H"]));
    assert_eq!(json["maskedPhrase"], "H_T __T_T_");
    assert_eq!(json["isYourTurn"], true);
}

fn history_window(seen: &[String]) -> &[String] {
    &seen[seen.len().saturating_sub(5)..]
}

#[tokio::test]
async fn test_scenarios_do_not_repeat_recent_ones() {
    let content = ContentGenerator::seeded(
        Arc::new(OfflineGenerator),
        Default::default(),
        GenerationSettings::default(),
        11,
    );
    let orch = Orchestrator::new(
        Arc::new(MemoryStore::new()),
        Arc::new(content),
        PlaySettings::default().with_bot_think(Duration::ZERO),
    );

    let mut advancements = 0;
    let mut games = 0;
    while advancements < 50 {
        games += 1;
        assert!(games <= 40, "too few advancements across {games} games");

        let lobby = orch.create_lobby(Difficulty::Hard).await.unwrap();
        for _ in 0..8 {
            orch.add_bot(&lobby.id).await.unwrap();
        }
        let mut view: GameView = orch.start_game(&lobby.id).await.unwrap();
        let mut shown = vec![view.current_scenario.clone().unwrap()];
        let mut round = view.round_number;

        while view.awaiting_bot {
            view = orch.bot_act(&lobby.id).await.unwrap().view;
            if view.round_number != round && view.phase != Phase::GameOver {
                round = view.round_number;
                let scenario = view.current_scenario.clone().unwrap();
                assert!(
                    !history_window(&shown).contains(&scenario),
                    "round {round} repeated a recent scenario"
                );
                shown.push(scenario);
                advancements += 1;
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_turn_rotates_to_a_living_player(
        players in 2usize..6,
        verdicts in proptest::collection::vec(any::<bool>(), 1..40),
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let orch = orchestrator(FixedContent::default().with_verdicts(verdicts.clone()));
            let lobby = orch.create_lobby(Difficulty::Medium).await.unwrap();
            for _ in 0..players {
                orch.add_bot(&lobby.id).await.unwrap();
            }
            let mut view = orch.start_game(&lobby.id).await.unwrap();
            let mut lives: Vec<u8> = view.players.iter().map(|p| p.lives).collect();

            for _ in 0..(verdicts.len() * 3) {
                if view.phase == Phase::GameOver {
                    break;
                }
                let before = view.current_player_id.clone();
                let round = view.round_number;
                view = orch.bot_act(&lobby.id).await.unwrap().view;

                for (player, old) in view.players.iter().zip(&lives) {
                    assert!(player.lives <= *old, "lives went up");
                }
                lives = view.players.iter().map(|p| p.lives).collect();

                if view.round_number > round && view.phase != Phase::GameOver {
                    let current = view.current_player_id.clone().unwrap();
                    assert_ne!(before.as_deref(), Some(current.as_str()));
                    let player = view.players.iter().find(|p| p.id == current).unwrap();
                    assert!(player.is_alive);
                }
            }

            if view.phase == Phase::GameOver {
                let winner = view.winner_id.clone().unwrap();
                assert!(view.players.iter().any(|p| p.id == winner));
            }
        });
    }
}
