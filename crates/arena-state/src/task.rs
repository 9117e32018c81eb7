//! Race data model: one task, its games, and each game's page history.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::history::HistoryStore;
use crate::viewport::{RenderingMode, Viewport};

/// Registration triple handed to `create_task` by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    pub game_id: String,
    pub start_page: String,
    pub target_page: String,
}

impl GameConfig {
    pub fn new(game_id: &str, start_page: &str, target_page: &str) -> Self {
        Self {
            game_id: game_id.to_string(),
            start_page: start_page.to_string(),
            target_page: target_page.to_string(),
        }
    }
}

/// One page visited at one step of one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageState {
    pub game_id: String,
    pub page_title: String,
    /// Position in the owning sequence; 0 is the start page.
    pub move_index: usize,
    /// Paths from this page to the target. Empty until the solver reports.
    pub optimal_paths: Vec<Vec<String>>,
    pub distance_to_target: Option<u32>,
    /// Previous resolved distance minus this one; positive means closer.
    pub distance_change: Option<i64>,
    pub is_start_page: bool,
    pub is_target_page: bool,
    pub visited_from_page: Option<String>,
}

impl PageState {
    pub fn start(game_id: &str, page_title: &str, target_page: &str) -> Self {
        Self {
            game_id: game_id.to_string(),
            page_title: page_title.to_string(),
            move_index: 0,
            optimal_paths: Vec::new(),
            distance_to_target: None,
            distance_change: None,
            is_start_page: true,
            is_target_page: page_title == target_page,
            visited_from_page: None,
        }
    }

    pub fn visited(game_id: &str, move_index: usize, page_title: &str, from: &str, target_page: &str) -> Self {
        Self {
            game_id: game_id.to_string(),
            page_title: page_title.to_string(),
            move_index,
            optimal_paths: Vec::new(),
            distance_to_target: None,
            distance_change: None,
            is_start_page: false,
            is_target_page: page_title == target_page,
            visited_from_page: Some(from.to_string()),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.distance_to_target.is_some()
    }
}

/// One agent's run within a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSequence {
    pub game_id: String,
    pub status: String,
    pub error_message: Option<String>,
    pub(crate) page_states: Vec<PageState>,
}

impl GameSequence {
    pub(crate) fn seeded(game_id: &str, start_page: &str, target_page: &str) -> Self {
        Self {
            game_id: game_id.to_string(),
            status: arena_protocol::GameStatus::NotStarted.to_string(),
            error_message: None,
            page_states: vec![PageState::start(game_id, start_page, target_page)],
        }
    }

    pub fn page_states(&self) -> &[PageState] {
        &self.page_states
    }

    /// Highest move index in the sequence.
    pub fn last_index(&self) -> usize {
        self.page_states.len().saturating_sub(1)
    }

    pub fn current_page(&self) -> Option<&PageState> {
        self.page_states.last()
    }

    /// The state shown at a global viewing index, clipped to this game's
    /// own length so a shorter game never shows a fabricated future step.
    pub fn state_at(&self, viewing_index: usize) -> Option<&PageState> {
        self.page_states.get(viewing_index.min(self.last_index()))
    }

    /// Most recent resolved distance at or before `index`.
    pub fn latest_distance_at(&self, index: usize) -> Option<u32> {
        let end = index.min(self.last_index());
        self.page_states[..=end]
            .iter()
            .rev()
            .find_map(|s| s.distance_to_target)
    }

    pub fn is_finished(&self) -> bool {
        arena_protocol::GameStatus::is_terminal_str(&self.status)
    }
}

/// One race: several games sharing a start and target page.
///
/// Owned by the engine; renderers only ever see `&Task` or a clone.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    /// Identifies this task instance in logs, so events meant for an older
    /// task can be told apart.
    pub generation: Uuid,
    pub task_ended: bool,
    pub(crate) history: HistoryStore,
    pub(crate) viewport: Viewport,
}

impl Task {
    pub(crate) fn new(history: HistoryStore) -> Self {
        Self {
            generation: Uuid::new_v4(),
            task_ended: false,
            history,
            viewport: Viewport::new(),
        }
    }

    pub fn start_page(&self) -> &str {
        self.history.start_page()
    }

    pub fn target_page(&self) -> &str {
        self.history.target_page()
    }

    pub fn shortest_path_length(&self) -> Option<u32> {
        self.history.shortest_path_length()
    }

    pub fn current_page_index(&self) -> usize {
        self.history.current_page_index()
    }

    pub fn viewing_page_index(&self) -> usize {
        self.viewport.viewing_page_index()
    }

    pub fn rendering_mode(&self) -> RenderingMode {
        self.viewport.mode()
    }

    /// Games in registration order.
    pub fn games(&self) -> impl Iterator<Item = &GameSequence> {
        self.history.games()
    }

    pub fn game(&self, game_id: &str) -> Option<&GameSequence> {
        self.history.game(game_id)
    }

    pub fn game_order(&self) -> Vec<String> {
        self.history.game_order()
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequence(titles: &[&str]) -> GameSequence {
        let mut game = GameSequence::seeded("g1", titles[0], "Z");
        for (i, pair) in titles.windows(2).enumerate() {
            game.page_states
                .push(PageState::visited("g1", i + 1, pair[1], pair[0], "Z"));
        }
        game
    }

    #[test]
    fn test_seeded_sequence_has_start_state() {
        let game = GameSequence::seeded("g1", "A", "Z");
        assert_eq!(game.page_states().len(), 1);
        let start = &game.page_states()[0];
        assert!(start.is_start_page);
        assert!(!start.is_target_page);
        assert_eq!(start.move_index, 0);
        assert!(start.visited_from_page.is_none());
        assert_eq!(game.status, "not_started");
    }

    #[test]
    fn test_state_at_clips_to_game_length() {
        let game = sequence(&["A", "B", "C"]);
        assert_eq!(game.state_at(1).unwrap().page_title, "B");
        assert_eq!(game.state_at(7).unwrap().page_title, "C");
    }

    #[test]
    fn test_latest_distance_walks_backward() {
        let mut game = sequence(&["A", "B", "C", "D"]);
        game.page_states[1].distance_to_target = Some(4);
        assert_eq!(game.latest_distance_at(3), Some(4));
        assert_eq!(game.latest_distance_at(0), None);
        game.page_states[3].distance_to_target = Some(2);
        assert_eq!(game.latest_distance_at(3), Some(2));
        assert_eq!(game.latest_distance_at(2), Some(4));
    }

    #[test]
    fn test_target_flag_set_on_arrival() {
        let game = sequence(&["A", "Z"]);
        assert!(game.page_states()[1].is_target_page);
    }
}
