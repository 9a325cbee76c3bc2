//! All-bot games played in-process, for demos and smoke tests.

use crate::error::GameError;
use crate::orchestrator::Orchestrator;
use crate::view::GameView;
use perilous_rules::{Difficulty, EndReason, Phase, TurnEvent};
use tracing::{info, instrument};

/// Finished simulation: the final state and a readable log.
#[derive(Debug, Clone)]
pub struct Simulation {
    /// The game once the bots stopped.
    pub view: GameView,
    /// One line per event, in order.
    pub log: Vec<String>,
}

impl Simulation {
    /// Whether the game reached game over.
    pub fn finished(&self) -> bool {
        self.view.phase == Phase::GameOver
    }
}

/// Plays a game between `bots` bots until it ends or the step cap is hit.
///
/// # Errors
///
/// Returns [`GameError::InsufficientPlayers`] for fewer than two bots and
/// propagates storage failures.
#[instrument(skip(orchestrator))]
pub async fn simulate(
    orchestrator: &Orchestrator,
    bots: usize,
    difficulty: Difficulty,
) -> Result<Simulation, GameError> {
    let lobby = orchestrator.create_lobby(difficulty).await?;
    let game_id = lobby.id;
    for _ in 0..bots {
        orchestrator.add_bot(&game_id).await?;
    }
    let mut view = orchestrator.start_game(&game_id).await?;
    let mut log = vec![format!(
        "Game {game_id} ({difficulty}): {}",
        view.players
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    )];
    if let Some(category) = &view.category {
        log.push(format!("Category: {category}"));
    }
    if let Some(scenario) = &view.current_scenario {
        log.push(format!("Round 1: {scenario}"));
    }

    let mut seen = view.event_count;
    let mut steps = 0;
    while view.awaiting_bot && steps < *orchestrator.settings().max_bot_steps() {
        let played = orchestrator.bot_act(&game_id).await?;
        view = played.view;
        steps += 1;
        for event in view.events_since(seen) {
            log.push(describe(&view, event));
        }
        seen = view.event_count;
    }

    if let Some(phrase) = &view.masked_phrase {
        log.push(format!("Phrase: {phrase}"));
    }
    info!(steps, phase = %view.phase, "Simulation finished");
    Ok(Simulation { view, log })
}

fn name<'a>(view: &'a GameView, player_id: &'a str) -> &'a str {
    view.players
        .iter()
        .find(|p| p.id == player_id)
        .map(|p| p.name.as_str())
        .unwrap_or(player_id)
}

fn describe(view: &GameView, event: &TurnEvent) -> String {
    match event {
        TurnEvent::ActionJudged {
            player_id,
            action,
            success,
            outcome,
        } => {
            let verdict = if *success { "survives" } else { "fails" };
            format!("{} {verdict}: \"{action}\" {outcome}", name(view, player_id))
        }
        TurnEvent::LetterPicked {
            player_id,
            letter,
            occurrences,
        } => format!(
            "{} picks {letter} ({occurrences} found)",
            name(view, player_id)
        ),
        TurnEvent::PhraseGuessed {
            player_id,
            guess,
            correct,
        } => {
            let verdict = if *correct { "right" } else { "wrong" };
            format!("{} guesses \"{guess}\": {verdict}", name(view, player_id))
        }
        TurnEvent::TurnPassed { to, .. } => match &view.current_scenario {
            Some(scenario) if view.current_player_id.as_deref() == Some(to.as_str()) => {
                format!("{}'s turn: {scenario}", name(view, to))
            }
            _ => format!("{}'s turn", name(view, to)),
        },
        TurnEvent::GameEnded { winner_id, reason } => {
            let winner = winner_id
                .as_deref()
                .map(|id| name(view, id))
                .unwrap_or("nobody");
            let how = match reason {
                EndReason::LastSurvivor => "last one standing",
                EndReason::PhraseSolved => "solved the phrase",
                EndReason::AllEliminated => "highest score after everyone fell",
            };
            format!("{winner} wins: {how}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::PlaySettings;
    use crate::store::MemoryStore;
    use crate::testing::FixedContent;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_simulation_reaches_game_over() {
        let orch = Orchestrator::new(
            Arc::new(MemoryStore::new()),
            Arc::new(FixedContent::default()),
            PlaySettings::default().with_bot_think(Duration::ZERO),
        );
        let sim = simulate(&orch, 3, Difficulty::Easy).await.unwrap();
        assert!(sim.finished());
        assert!(sim.log.iter().any(|line| line.contains("wins")));
        assert_eq!(sim.view.masked_phrase.as_deref(), Some("HOT POTATO"));
    }

    #[tokio::test]
    async fn test_one_bot_cannot_start() {
        let orch = Orchestrator::new(
            Arc::new(MemoryStore::new()),
            Arc::new(FixedContent::default()),
            PlaySettings::default(),
        );
        let err = simulate(&orch, 1, Difficulty::Easy).await.unwrap_err();
        assert!(matches!(err, GameError::InsufficientPlayers { .. }));
    }
}
