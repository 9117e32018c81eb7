//! Game lifecycle statuses as reported by the game server.
//!
//! Statuses travel as free-form strings; the engine stores them verbatim.
//! This module only classifies the known values.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    NotStarted,
    InProgress,
    Won,
    Finished,
    LostMaxSteps,
    LostInvalidMove,
    LostForfeit,
    Error,
}

impl GameStatus {
    /// Classify a wire status string. Unknown strings yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let status = match raw.trim().to_ascii_lowercase().as_str() {
            "not_started" => Self::NotStarted,
            "in_progress" => Self::InProgress,
            "won" => Self::Won,
            "finished" | "completed" => Self::Finished,
            "lost_max_steps" => Self::LostMaxSteps,
            "lost_invalid_move" => Self::LostInvalidMove,
            "lost_forfeit" => Self::LostForfeit,
            "error" => Self::Error,
            _ => return None,
        };
        Some(status)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Won => "won",
            Self::Finished => "finished",
            Self::LostMaxSteps => "lost_max_steps",
            Self::LostInvalidMove => "lost_invalid_move",
            Self::LostForfeit => "lost_forfeit",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::NotStarted | Self::InProgress)
    }

    /// True when the raw status names a finished game of any outcome.
    pub fn is_terminal_str(raw: &str) -> bool {
        Self::parse(raw).is_some_and(|s| s.is_terminal())
    }

    /// True when the raw status names a game that stopped on an error.
    pub fn is_error_str(raw: &str) -> bool {
        matches!(Self::parse(raw), Some(Self::Error))
    }
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
