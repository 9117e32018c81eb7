//! Per-game standing at the viewed step, as shown by a race HUD.

use serde::{Deserialize, Serialize};

use crate::history::HistoryStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameProgress {
    pub game_id: String,
    pub status: String,
    /// The game's own index shown, clipped to its length.
    pub viewed_index: usize,
    pub viewed_page: String,
    pub distance_to_target: Option<u32>,
    /// 0.0 at the start distance, 1.0 at the target.
    pub progress: Option<f64>,
    pub finished: bool,
}

/// Progress of every game at `viewing_index`, in registration order.
///
/// An unresolved viewed page falls back to the latest resolved distance
/// before it, then to the task's shortest path length.
pub fn game_progress(history: &HistoryStore, viewing_index: usize) -> Vec<GameProgress> {
    let shortest = history.shortest_path_length();

    history
        .games()
        .filter_map(|game| {
            let viewed_index = viewing_index.min(game.last_index());
            let state = game.state_at(viewed_index)?;
            let distance = game.latest_distance_at(viewed_index).or(shortest);
            let progress = match (shortest, distance) {
                (Some(s), Some(d)) if s > 0 => {
                    Some(((f64::from(s) - f64::from(d)) / f64::from(s)).clamp(0.0, 1.0))
                }
                _ => None,
            };
            Some(GameProgress {
                game_id: game.game_id.clone(),
                status: game.status.clone(),
                viewed_index,
                viewed_page: state.page_title.clone(),
                distance_to_target: distance,
                progress,
                finished: game.is_finished(),
            })
        })
        .collect()
}
