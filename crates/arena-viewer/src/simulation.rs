//! Random-walk race generator.
//!
//! Each game wanders the link graph by picking a random outgoing link per
//! step. Solver answers for a page are held back until the game has made
//! `solver_lag` more moves, so the stream exercises late attachment the
//! same way a live server does.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use arena_protocol::{GameEvent, GameEventKind, GameStatus, PageRef};
use arena_state::GameConfig;

use crate::config::SimulationConfig;
use crate::solver::{shortest_paths, LinkGraph};
use crate::ViewerError;

/// Registrations plus the interleaved event stream for one race.
#[derive(Debug, Clone)]
pub struct SimulatedRace {
    pub configs: Vec<GameConfig>,
    pub events: Vec<GameEvent>,
}

struct Walker {
    game_id: String,
    page: String,
    steps: u32,
    /// Solver events and the step count after which they are released.
    pending: VecDeque<(u32, GameEvent)>,
    done: bool,
}

pub struct Simulation<'a> {
    graph: &'a LinkGraph,
    config: &'a SimulationConfig,
    rng: StdRng,
}

impl<'a> Simulation<'a> {
    pub fn new(graph: &'a LinkGraph, config: &'a SimulationConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { graph, config, rng }
    }

    /// Race `config.games` walkers from `start` to `target`, round-robin.
    pub fn run(mut self, start: &str, target: &str) -> Result<SimulatedRace, ViewerError> {
        for page in [start, target] {
            if !self.graph.contains(page) {
                return Err(ViewerError::UnknownPage(page.to_string()));
            }
        }

        let configs: Vec<GameConfig> = (1..=self.config.games)
            .map(|n| GameConfig::new(&format!("game-{n}"), start, target))
            .collect();

        let mut walkers = Vec::with_capacity(configs.len());
        for config in &configs {
            let mut walker = Walker {
                game_id: config.game_id.clone(),
                page: start.to_string(),
                steps: 0,
                pending: VecDeque::new(),
                done: false,
            };
            let answer = self.solver_event(&walker.game_id, None, start, target)?;
            walker.pending.push_back((self.config.solver_lag, answer));
            walkers.push(walker);
        }

        let mut events = Vec::new();
        while walkers.iter().any(|w| !w.done) {
            for walker in walkers.iter_mut().filter(|w| !w.done) {
                self.step(walker, target, &mut events)?;
            }
        }

        events.push(GameEvent::new(
            "",
            GameEventKind::TaskEnded {
                start_page: Some(PageRef {
                    title: start.to_string(),
                    links: self.graph.links(start).to_vec(),
                }),
                target_page: Some(PageRef {
                    title: target.to_string(),
                    links: Vec::new(),
                }),
            },
        ));

        tracing::info!(games = configs.len(), events = events.len(), "Simulated race");
        Ok(SimulatedRace { configs, events })
    }

    fn step(&mut self, walker: &mut Walker, target: &str, events: &mut Vec<GameEvent>) -> Result<(), ViewerError> {
        let Some(next) = self.graph.links(&walker.page).choose(&mut self.rng).cloned() else {
            tracing::debug!(game_id = %walker.game_id, page = %walker.page, "Dead end");
            self.finish(walker, GameStatus::LostInvalidMove, events);
            return Ok(());
        };

        walker.steps += 1;
        let status = if next == target {
            GameStatus::Won
        } else {
            GameStatus::InProgress
        };
        events.push(GameEvent::move_completed(
            &walker.game_id,
            &walker.page,
            &next,
            walker.steps,
            status.as_str(),
        ));

        let answer = self.solver_event(&walker.game_id, Some(&walker.page), &next, target)?;
        walker.pending.push_back((walker.steps + self.config.solver_lag, answer));
        walker.page = next;

        while walker.pending.front().is_some_and(|(due, _)| *due <= walker.steps) {
            if let Some((_, event)) = walker.pending.pop_front() {
                events.push(event);
            }
        }

        if status == GameStatus::Won {
            self.finish(walker, GameStatus::Won, events);
        } else if walker.steps >= self.config.max_steps {
            self.finish(walker, GameStatus::LostMaxSteps, events);
        }
        Ok(())
    }

    /// Release held solver answers, then end the game.
    fn finish(&self, walker: &mut Walker, status: GameStatus, events: &mut Vec<GameEvent>) {
        events.extend(walker.pending.drain(..).map(|(_, event)| event));
        events.push(GameEvent::game_ended(&walker.game_id, status.as_str()));
        walker.done = true;
        tracing::debug!(game_id = %walker.game_id, steps = walker.steps, %status, "Walker finished");
    }

    fn solver_event(&self, game_id: &str, from: Option<&str>, page: &str, target: &str) -> Result<GameEvent, ViewerError> {
        let paths = shortest_paths(self.graph, page, target, self.config.max_paths)?;
        let length = paths.first().map(|p| p.len() as i64 - 1).unwrap_or(-1);
        Ok(GameEvent::optimal_paths(game_id, from, Some(page), paths, Some(length)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_state::TaskStateEngine;

    fn config(seed: u64) -> SimulationConfig {
        SimulationConfig {
            games: 3,
            max_steps: 8,
            seed: Some(seed),
            solver_lag: 2,
            max_paths: 3,
        }
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let graph = LinkGraph::sample();
        let config = config(7);
        let a = Simulation::new(&graph, &config).run("Potato", "Philosophy").unwrap();
        let b = Simulation::new(&graph, &config).run("Potato", "Philosophy").unwrap();
        assert_eq!(a.events, b.events);
    }

    #[test]
    fn test_every_game_ends_and_task_ends_last() {
        let graph = LinkGraph::sample();
        let config = config(11);
        let race = Simulation::new(&graph, &config).run("Potato", "Philosophy").unwrap();

        for game in &race.configs {
            let ended = race
                .events
                .iter()
                .filter(|e| e.game_id == game.game_id && matches!(e.kind, GameEventKind::GameEnded { .. }))
                .count();
            assert_eq!(ended, 1, "{} must end exactly once", game.game_id);
        }
        assert!(matches!(race.events.last().map(|e| &e.kind), Some(GameEventKind::TaskEnded { .. })));
    }

    #[test]
    fn test_stream_applies_cleanly() {
        let graph = LinkGraph::sample();
        let config = config(3);
        let race = Simulation::new(&graph, &config).run("Potato", "Philosophy").unwrap();

        let mut engine = TaskStateEngine::new();
        engine.create_task(&race.configs);
        for event in &race.events {
            let outcome = engine.handle_game_event(&event.game_id, event);
            assert!(outcome.is_applied(), "{} was {:?}", event.event_type(), outcome);
        }

        let task = engine.get_task().unwrap();
        assert!(task.task_ended);
        assert_eq!(task.shortest_path_length(), Some(4));
        assert!(task.games().all(|g| g.is_finished()));
        assert!(
            task.games().all(|g| g.current_page().is_some_and(|s| s.is_resolved())),
            "held answers are released before each game ends"
        );
    }

    #[test]
    fn test_unknown_start_rejected() {
        let graph = LinkGraph::sample();
        let config = config(1);
        assert!(matches!(
            Simulation::new(&graph, &config).run("Atlantis", "Philosophy"),
            Err(ViewerError::UnknownPage(_))
        ));
    }
}
