//! Per-game append-only histories and the rules that mutate them.
//!
//! Moves append. Solver results never append: they are attached to the
//! most recent state whose title matches the result's `to_page_title`,
//! because a game can move again before the solver answers for the page
//! it just left.

use std::collections::HashMap;

use serde::Serialize;

use arena_protocol::{
    resolved_distance, CompleteState, GameEventKind, GameSnapshot, GameStatus, MoveRecord,
};

use crate::task::{GameConfig, GameSequence, PageState};
use crate::StateError;

/// Owns every game's page sequence for one task.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryStore {
    start_page: String,
    target_page: String,
    /// Set by the first resolved distance and never changed afterwards.
    shortest_path_length: Option<u32>,
    /// Highest move index reached by any game.
    current_page_index: usize,
    /// Registration order is the order of this vector.
    games: Vec<GameSequence>,
    #[serde(skip)]
    slots: HashMap<String, usize>,
}

impl HistoryStore {
    pub fn new(start_page: &str, target_page: &str) -> Self {
        Self {
            start_page: start_page.to_string(),
            target_page: target_page.to_string(),
            shortest_path_length: None,
            current_page_index: 0,
            games: Vec::new(),
            slots: HashMap::new(),
        }
    }

    /// Build a store from host registrations. The first config decides the
    /// shared start and target pages; returns `None` for an empty list.
    pub fn from_configs(configs: &[GameConfig]) -> Option<Self> {
        let first = configs.first()?;
        let mut store = Self::new(&first.start_page, &first.target_page);
        for config in configs {
            if config.start_page != first.start_page || config.target_page != first.target_page {
                tracing::warn!(
                    game_id = %config.game_id,
                    start = %config.start_page,
                    target = %config.target_page,
                    "Game registered with a different start/target pair; using the task's pair"
                );
            }
            if !store.register_game(&config.game_id) {
                tracing::warn!(game_id = %config.game_id, "Duplicate game registration ignored");
            }
        }
        Some(store)
    }

    /// Add a game seeded with its start page. Returns false if the id is taken.
    pub fn register_game(&mut self, game_id: &str) -> bool {
        if self.slots.contains_key(game_id) {
            return false;
        }
        self.slots.insert(game_id.to_string(), self.games.len());
        self.games
            .push(GameSequence::seeded(game_id, &self.start_page, &self.target_page));
        true
    }

    pub fn start_page(&self) -> &str {
        &self.start_page
    }

    pub fn target_page(&self) -> &str {
        &self.target_page
    }

    pub fn shortest_path_length(&self) -> Option<u32> {
        self.shortest_path_length
    }

    pub fn current_page_index(&self) -> usize {
        self.current_page_index
    }

    pub fn games(&self) -> impl Iterator<Item = &GameSequence> {
        self.games.iter()
    }

    pub fn game(&self, game_id: &str) -> Option<&GameSequence> {
        self.slots.get(game_id).map(|&slot| &self.games[slot])
    }

    pub fn game_order(&self) -> Vec<String> {
        self.games.iter().map(|g| g.game_id.clone()).collect()
    }

    pub fn contains_game(&self, game_id: &str) -> bool {
        self.slots.contains_key(game_id)
    }

    /// Apply one per-game event to the owning sequence.
    ///
    /// On error the store is left exactly as it was.
    pub fn apply_event(&mut self, game_id: &str, kind: &GameEventKind) -> Result<(), StateError> {
        self.slot(game_id)?;
        kind.validate()?;

        match kind {
            GameEventKind::ConnectionEstablished { complete_state } => {
                self.apply_connection(game_id, complete_state.as_ref())
            }
            GameEventKind::GameMoveCompleted { mv, status } => {
                self.append_move(game_id, mv, status).map(|_| ())
            }
            GameEventKind::OptimalPathsUpdated {
                to_page_title,
                optimal_paths,
                optimal_path_length,
                ..
            } => self
                .attach_optimal_paths(
                    game_id,
                    to_page_title.as_deref(),
                    optimal_paths,
                    *optimal_path_length,
                )
                .map(|_| ()),
            GameEventKind::GameEnded {
                state,
                final_status,
                error_message,
            } => self.apply_game_ended(
                game_id,
                state.as_ref(),
                final_status.as_deref(),
                error_message.as_deref(),
            ),
            GameEventKind::TaskEnded { .. } => Err(StateError::NotAGameEvent(kind.event_type())),
        }
    }

    /// Append the destination of a move. Returns the new move index.
    pub fn append_move(&mut self, game_id: &str, mv: &MoveRecord, status: &str) -> Result<usize, StateError> {
        let slot = self.slot(game_id)?;
        let to = mv
            .to_page_title
            .as_deref()
            .ok_or_else(|| StateError::Malformed(format!("move {} has no destination", mv.step)))?;

        let game = &mut self.games[slot];
        let move_index = game.page_states.len();
        game.page_states.push(PageState::visited(
            game_id,
            move_index,
            to,
            &mv.from_page_title,
            &self.target_page,
        ));
        game.status = if status.is_empty() {
            GameStatus::InProgress.to_string()
        } else {
            status.to_string()
        };

        self.current_page_index = self.current_page_index.max(move_index);

        tracing::debug!(
            game_id,
            move_index,
            page = %to,
            "Appended move"
        );
        Ok(move_index)
    }

    /// Attach solver output to the most recent state titled `to_page_title`
    /// (the current tail when no title is given). Returns the index written.
    pub fn attach_optimal_paths(
        &mut self,
        game_id: &str,
        to_page_title: Option<&str>,
        optimal_paths: &[Vec<String>],
        optimal_path_length: Option<i64>,
    ) -> Result<usize, StateError> {
        let slot = self.slot(game_id)?;
        let game = &mut self.games[slot];

        let index = match to_page_title {
            Some(title) => game
                .page_states
                .iter()
                .rposition(|s| s.page_title == title)
                .ok_or_else(|| StateError::UnresolvedAttachment {
                    game_id: game_id.to_string(),
                    page_title: title.to_string(),
                })?,
            None => game.last_index(),
        };

        let distance = resolved_distance(optimal_path_length, optimal_paths);
        let state = &mut game.page_states[index];
        // An "unknown" answer carries no paths and must not erase earlier ones.
        if !optimal_paths.is_empty() {
            state.optimal_paths = optimal_paths.to_vec();
        }
        if let Some(distance) = distance {
            state.distance_to_target = Some(distance);
        }
        recompute_distance_changes(&mut game.page_states, index);

        if self.shortest_path_length.is_none() {
            if let Some(distance) = distance {
                self.shortest_path_length = Some(distance);
                tracing::info!(game_id, shortest_path_length = distance, "Shortest path length resolved");
            }
        }

        tracing::debug!(
            game_id,
            move_index = index,
            distance = ?distance,
            paths = optimal_paths.len(),
            "Attached optimal paths"
        );
        Ok(index)
    }

    /// Replace a game's states with the server's authoritative history.
    ///
    /// Solver data already attached locally survives wherever the rebuilt
    /// state has the same index and title.
    pub fn rebuild_from_snapshot(&mut self, game_id: &str, snapshot: &GameSnapshot) -> Result<(), StateError> {
        let slot = self.slot(game_id)?;
        let mut rebuilt = rebuild_states(game_id, snapshot, &self.target_page);

        let game = &mut self.games[slot];
        for (fresh, old) in rebuilt.iter_mut().zip(game.page_states.iter()) {
            if fresh.page_title == old.page_title {
                fresh.optimal_paths = old.optimal_paths.clone();
                fresh.distance_to_target = old.distance_to_target;
            }
        }
        recompute_distance_changes(&mut rebuilt, 0);

        let previous_len = game.page_states.len();
        game.page_states = rebuilt;
        if !snapshot.status.is_empty() {
            game.status = snapshot.status.clone();
        }
        if snapshot.error_message.is_some() {
            game.error_message = snapshot.error_message.clone();
        }

        tracing::info!(
            game_id,
            previous_len,
            rebuilt_len = game.page_states.len(),
            "Rebuilt game history from server snapshot"
        );

        self.recompute_current_index();
        Ok(())
    }

    fn apply_connection(&mut self, game_id: &str, complete_state: Option<&CompleteState>) -> Result<(), StateError> {
        let Some(complete_state) = complete_state else {
            return Ok(());
        };

        if let Some(snapshot) = &complete_state.game {
            if snapshot.move_history.is_empty() {
                if !snapshot.status.is_empty() {
                    let slot = self.slot(game_id)?;
                    self.games[slot].status = snapshot.status.clone();
                }
            } else {
                self.rebuild_from_snapshot(game_id, snapshot)?;
            }
        }

        for result in &complete_state.solver_results {
            match self.attach_optimal_paths(
                game_id,
                result.to_page_title.as_deref(),
                &result.optimal_paths,
                result.optimal_path_length,
            ) {
                Ok(_) => {}
                Err(StateError::UnresolvedAttachment { page_title, .. }) => {
                    tracing::debug!(game_id, page = %page_title, "Bundled solver result matches no visited page");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn apply_game_ended(
        &mut self,
        game_id: &str,
        snapshot: Option<&GameSnapshot>,
        final_status: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<(), StateError> {
        let slot = self.slot(game_id)?;

        if let Some(snapshot) = snapshot {
            let reported = successful_moves(snapshot);
            if reported > self.games[slot].last_index() {
                self.rebuild_from_snapshot(game_id, snapshot)?;
            }
        }

        let status = final_status
            .filter(|s| !s.is_empty())
            .or_else(|| snapshot.map(|s| s.status.as_str()).filter(|s| !s.is_empty()))
            .unwrap_or(GameStatus::Finished.as_str())
            .to_string();

        let game = &mut self.games[slot];
        game.status = status;
        if let Some(message) = error_message.or_else(|| snapshot.and_then(|s| s.error_message.as_deref())) {
            game.error_message = Some(message.to_string());
        }

        tracing::info!(game_id, status = %game.status, moves = game.last_index(), "Game ended");
        Ok(())
    }

    fn slot(&self, game_id: &str) -> Result<usize, StateError> {
        self.slots
            .get(game_id)
            .copied()
            .ok_or_else(|| StateError::UnknownGame(game_id.to_string()))
    }

    fn recompute_current_index(&mut self) {
        self.current_page_index = self.games.iter().map(|g| g.last_index()).max().unwrap_or(0);
    }
}

fn successful_moves(snapshot: &GameSnapshot) -> usize {
    snapshot
        .move_history
        .iter()
        .filter(|m| m.to_page_title.is_some())
        .count()
}

/// One state per successful move, after the start state. Failed attempts
/// (no destination) leave no page behind.
fn rebuild_states(game_id: &str, snapshot: &GameSnapshot, target_page: &str) -> Vec<PageState> {
    let mut states = vec![PageState::start(
        game_id,
        &snapshot.config.start_page_title,
        target_page,
    )];
    for mv in &snapshot.move_history {
        if let Some(to) = mv.to_page_title.as_deref() {
            let index = states.len();
            states.push(PageState::visited(game_id, index, to, &mv.from_page_title, target_page));
        }
    }
    states
}

/// Recompute `distance_change` for every state from `from` onward against
/// the nearest earlier resolved distance.
fn recompute_distance_changes(states: &mut [PageState], from: usize) {
    let mut previous = states[..from].iter().rev().find_map(|s| s.distance_to_target);
    for state in &mut states[from..] {
        match state.distance_to_target {
            Some(distance) => {
                state.distance_change = previous.map(|p| i64::from(p) - i64::from(distance));
                previous = Some(distance);
            }
            None => state.distance_change = None,
        }
    }
}
