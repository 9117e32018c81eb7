//! Text and JSON summaries of the engine's current view.

use std::fmt::Write as _;

use serde::Serialize;

use arena_state::{EdgeType, GameProgress, PageGraphData, RenderingMode, TaskStateEngine};

use crate::ViewerError;

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub start_page: String,
    pub target_page: String,
    pub shortest_path_length: Option<u32>,
    pub current_page_index: usize,
    pub viewing_page_index: usize,
    pub rendering_mode: RenderingMode,
    pub task_ended: bool,
    pub progress: Vec<GameProgress>,
    pub graph: PageGraphData,
}

impl Report {
    pub fn capture(engine: &TaskStateEngine) -> Result<Self, ViewerError> {
        let task = engine.get_task().ok_or(ViewerError::NoTask)?;
        Ok(Self {
            start_page: task.start_page().to_string(),
            target_page: task.target_page().to_string(),
            shortest_path_length: task.shortest_path_length(),
            current_page_index: task.current_page_index(),
            viewing_page_index: task.viewing_page_index(),
            rendering_mode: task.rendering_mode(),
            task_ended: task.task_ended,
            progress: engine.get_game_progress(),
            graph: engine.get_visualization_data(),
        })
    }

    pub fn to_json(&self) -> Result<String, ViewerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let shortest = self
            .shortest_path_length
            .map(|s| s.to_string())
            .unwrap_or_else(|| "?".into());

        let _ = writeln!(out, "{} -> {} (shortest {shortest})", self.start_page, self.target_page);
        let _ = writeln!(
            out,
            "step {}/{} [{}]{}",
            self.viewing_page_index,
            self.current_page_index,
            self.rendering_mode,
            if self.task_ended { " task ended" } else { "" }
        );

        for game in &self.progress {
            let distance = game
                .distance_to_target
                .map(|d| d.to_string())
                .unwrap_or_else(|| "?".into());
            let bar = progress_bar(game.progress, 20);
            let _ = writeln!(
                out,
                "  {:<12} {bar} {:<24} d={:<3} {}",
                game.game_id, game.viewed_page, distance, game.status
            );
        }

        let moves = self.graph.edges_of_type(EdgeType::Move).count();
        let suggestions = self.graph.edges_of_type(EdgeType::OptimalPath).count();
        let _ = writeln!(
            out,
            "graph: {} pages, {moves} moves, {suggestions} suggested links",
            self.graph.pages.len()
        );
        out
    }
}

fn progress_bar(progress: Option<f64>, width: usize) -> String {
    let Some(progress) = progress else {
        return format!("[{}]", "?".repeat(width));
    };
    let filled = ((progress.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_protocol::GameEvent;
    use arena_state::GameConfig;

    #[test]
    fn test_no_task_is_error() {
        let engine = TaskStateEngine::new();
        assert!(matches!(Report::capture(&engine), Err(ViewerError::NoTask)));
    }

    #[test]
    fn test_text_report_lists_games() {
        let mut engine = TaskStateEngine::new();
        engine.create_task(&[GameConfig::new("g1", "A", "Z"), GameConfig::new("g2", "A", "Z")]);
        engine.handle_game_event("g1", &GameEvent::move_completed("g1", "A", "B", 1, "in_progress"));

        let text = Report::capture(&engine).unwrap().to_text();
        assert!(text.starts_with("A -> Z (shortest ?)"));
        assert!(text.contains("step 1/1 [live]"));
        assert!(text.contains("g1"));
        assert!(text.contains("g2"));
        assert!(text.contains("graph: 2 pages, 1 moves"));
    }

    #[test]
    fn test_json_report_has_graph() {
        let mut engine = TaskStateEngine::new();
        engine.create_task(&[GameConfig::new("g1", "A", "Z")]);
        let json = Report::capture(&engine).unwrap().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["graph"]["pages"][0]["type"], "start");
        assert_eq!(value["rendering_mode"], "live");
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(Some(0.5), 4), "[##--]");
        assert_eq!(progress_bar(None, 2), "[??]");
    }
}
