//! Which step of the race the user is looking at.
//!
//! The viewport never reads or writes history. It only knows the global
//! "now" index it is handed, so data arrival and viewing position stay
//! independent and meet only when a snapshot is built.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RenderingMode {
    /// Follows the newest step as data arrives.
    #[default]
    Live,
    /// Pinned to an index the user chose.
    Stepping,
}

impl std::fmt::Display for RenderingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Live => "live",
            Self::Stepping => "stepping",
        };
        write!(f, "{s}")
    }
}

/// Live/stepping mode plus the viewed index.
///
/// Every method takes the current global index and keeps
/// `0 <= viewing_page_index <= current` afterwards. Methods that act on user
/// input return whether anything changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Viewport {
    mode: RenderingMode,
    viewing_page_index: usize,
}

impl Viewport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> RenderingMode {
        self.mode
    }

    pub fn viewing_page_index(&self) -> usize {
        self.viewing_page_index
    }

    pub fn is_live(&self) -> bool {
        self.mode == RenderingMode::Live
    }

    /// Step one index back. Always detaches from live.
    pub fn step_backward(&mut self, current: usize) -> bool {
        let index = self.viewing_page_index.min(current).saturating_sub(1);
        self.set(RenderingMode::Stepping, index)
    }

    /// Step one index forward, clamped to `current`. A live viewport is
    /// already at "now" and stays live.
    pub fn step_forward(&mut self, current: usize) -> bool {
        if self.is_live() {
            return false;
        }
        let index = (self.viewing_page_index + 1).min(current);
        self.set(RenderingMode::Stepping, index)
    }

    /// Jump to an index. Out-of-range requests are clamped, and the result
    /// is always stepping; only [`Viewport::enter_live_mode`] goes live.
    pub fn set_viewing_index(&mut self, index: usize, current: usize) -> bool {
        self.set(RenderingMode::Stepping, index.min(current))
    }

    pub fn enter_live_mode(&mut self, current: usize) -> bool {
        self.set(RenderingMode::Live, current)
    }

    /// Called whenever history changed `current`. Live follows it; stepping
    /// stays put unless history shrank below the viewed index.
    pub fn follow(&mut self, current: usize) {
        match self.mode {
            RenderingMode::Live => self.viewing_page_index = current,
            RenderingMode::Stepping => {
                self.viewing_page_index = self.viewing_page_index.min(current)
            }
        }
    }

    pub fn can_step_forward(&self, current: usize) -> bool {
        self.viewing_page_index < current
    }

    pub fn can_step_backward(&self) -> bool {
        self.viewing_page_index > 0
    }

    fn set(&mut self, mode: RenderingMode, index: usize) -> bool {
        let changed = self.mode != mode || self.viewing_page_index != index;
        self.mode = mode;
        self.viewing_page_index = index;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live_at(current: usize) -> Viewport {
        let mut viewport = Viewport::new();
        viewport.follow(current);
        viewport
    }

    #[test]
    fn test_live_follows_current() {
        let mut viewport = live_at(2);
        viewport.follow(5);
        assert_eq!(viewport.viewing_page_index(), 5);
        assert!(viewport.is_live());
    }

    #[test]
    fn test_step_backward_detaches() {
        let mut viewport = live_at(3);
        assert!(viewport.step_backward(3));
        assert_eq!(viewport.mode(), RenderingMode::Stepping);
        assert_eq!(viewport.viewing_page_index(), 2);
    }

    #[test]
    fn test_stepping_ignores_new_data() {
        let mut viewport = live_at(3);
        viewport.set_viewing_index(1, 3);
        viewport.follow(4);
        assert_eq!(viewport.viewing_page_index(), 1);
        assert!(viewport.can_step_forward(4));
    }

    #[test]
    fn test_step_backward_clamps_at_zero() {
        let mut viewport = live_at(0);
        viewport.step_backward(0);
        assert!(!viewport.step_backward(0), "second step at zero changes nothing");
        assert_eq!(viewport.viewing_page_index(), 0);
        assert!(!viewport.can_step_backward());
    }

    #[test]
    fn test_step_forward_stays_stepping_at_current() {
        let mut viewport = live_at(2);
        viewport.step_backward(2);
        viewport.step_forward(2);
        assert_eq!(viewport.viewing_page_index(), 2);
        assert_eq!(viewport.mode(), RenderingMode::Stepping);
        assert!(!viewport.step_forward(2));
        assert!(!viewport.can_step_forward(2));
    }

    #[test]
    fn test_step_forward_in_live_is_noop() {
        let mut viewport = live_at(2);
        assert!(!viewport.step_forward(2));
        assert!(viewport.is_live());
    }

    #[test]
    fn test_set_viewing_index_clamps() {
        let mut viewport = live_at(3);
        viewport.set_viewing_index(99, 3);
        assert_eq!(viewport.viewing_page_index(), 3);
        assert_eq!(viewport.mode(), RenderingMode::Stepping);
    }

    #[test]
    fn test_enter_live_snaps_to_current() {
        let mut viewport = live_at(3);
        viewport.set_viewing_index(0, 3);
        assert!(viewport.enter_live_mode(6));
        assert_eq!(viewport.viewing_page_index(), 6);
        assert!(viewport.is_live());
    }

    #[test]
    fn test_follow_clamps_stepping_when_history_shrinks() {
        let mut viewport = live_at(5);
        viewport.set_viewing_index(4, 5);
        viewport.follow(2);
        assert_eq!(viewport.viewing_page_index(), 2);
    }
}
