//! Typed form of the per-game event stream.
//!
//! Each wire message is a flat JSON object: the envelope fields (`game_id`,
//! `timestamp`) sit next to a `type` tag and the type-specific payload.
//! [`GameEvent`] mirrors that by flattening [`GameEventKind`] into the
//! envelope.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::ProtocolError;

/// One event delivered by the transport for a single game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Owning game. The server omits it on the handshake, where the
    /// connection itself identifies the game.
    #[serde(default)]
    pub game_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub kind: GameEventKind,
}

/// Type-specific payload, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameEventKind {
    /// Handshake; carries the server's full view of the game on reconnect.
    ConnectionEstablished {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        complete_state: Option<CompleteState>,
    },
    /// A game navigated from one page to another.
    GameMoveCompleted {
        #[serde(rename = "move")]
        mv: MoveRecord,
        #[serde(default)]
        status: String,
    },
    /// Solver output for one page, computed off the move path.
    OptimalPathsUpdated {
        #[serde(default)]
        from_page_title: Option<String>,
        #[serde(default)]
        to_page_title: Option<String>,
        #[serde(default)]
        optimal_paths: Vec<Vec<String>>,
        #[serde(default)]
        optimal_path_length: Option<i64>,
    },
    /// A single game stopped.
    GameEnded {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<GameSnapshot>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        final_status: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_message: Option<String>,
    },
    /// Every game of the task stopped.
    TaskEnded {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start_page: Option<PageRef>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_page: Option<PageRef>,
    },
}

/// Server-side state bundled with the handshake.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompleteState {
    #[serde(default)]
    pub game: Option<GameSnapshot>,
    #[serde(default)]
    pub solver_results: Vec<SolverResult>,
}

/// Authoritative snapshot of one game as the server knows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    #[serde(default)]
    pub game_id: String,
    pub config: GameSettings,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub steps: u32,
    #[serde(default)]
    pub current_page: Option<PageRef>,
    #[serde(default)]
    pub move_history: Vec<MoveRecord>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSettings {
    pub start_page_title: String,
    pub target_page_title: String,
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
}

fn default_max_steps() -> u32 {
    DEFAULT_MAX_STEPS
}

/// One navigation attempt. A failed attempt has no destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveRecord {
    #[serde(default)]
    pub step: u32,
    pub from_page_title: String,
    #[serde(default)]
    pub to_page_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Cached solver output for one page, as bundled on reconnect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverResult {
    #[serde(default)]
    pub optimal_paths: Vec<Vec<String>>,
    #[serde(default)]
    pub optimal_path_length: Option<i64>,
    #[serde(default)]
    pub from_page_title: Option<String>,
    #[serde(default)]
    pub to_page_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRef {
    pub title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
}

/// Distance a solver result implies for its page.
///
/// The server reports `-1` for "unknown"; any negative length counts as
/// absent and the shortest supplied path is used instead.
pub fn resolved_distance(optimal_path_length: Option<i64>, optimal_paths: &[Vec<String>]) -> Option<u32> {
    if let Some(length) = optimal_path_length.filter(|l| *l >= 0) {
        return u32::try_from(length).ok();
    }
    optimal_paths
        .iter()
        .filter(|p| !p.is_empty())
        .map(|p| (p.len() - 1) as u32)
        .min()
}

impl GameEvent {
    pub fn new(game_id: &str, kind: GameEventKind) -> Self {
        Self {
            game_id: game_id.to_string(),
            timestamp: None,
            kind,
        }
    }

    pub fn move_completed(game_id: &str, from: &str, to: &str, step: u32, status: &str) -> Self {
        Self::new(
            game_id,
            GameEventKind::GameMoveCompleted {
                mv: MoveRecord {
                    step,
                    from_page_title: from.to_string(),
                    to_page_title: Some(to.to_string()),
                    timestamp: None,
                },
                status: status.to_string(),
            },
        )
    }

    pub fn optimal_paths(
        game_id: &str,
        from: Option<&str>,
        to: Option<&str>,
        optimal_paths: Vec<Vec<String>>,
        optimal_path_length: Option<i64>,
    ) -> Self {
        Self::new(
            game_id,
            GameEventKind::OptimalPathsUpdated {
                from_page_title: from.map(str::to_string),
                to_page_title: to.map(str::to_string),
                optimal_paths,
                optimal_path_length,
            },
        )
    }

    pub fn game_ended(game_id: &str, final_status: &str) -> Self {
        Self::new(
            game_id,
            GameEventKind::GameEnded {
                state: None,
                final_status: Some(final_status.to_string()),
                error_message: None,
            },
        )
    }

    /// Decode one wire message.
    pub fn from_json(raw: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    /// The game this event belongs to. A handshake without an envelope id
    /// is owned by the game in its bundled snapshot; empty when neither
    /// names one.
    pub fn routing_game_id(&self) -> &str {
        if !self.game_id.is_empty() {
            return &self.game_id;
        }
        match &self.kind {
            GameEventKind::ConnectionEstablished {
                complete_state: Some(CompleteState { game: Some(game), .. }),
            } => &game.game_id,
            _ => "",
        }
    }

    /// Parse the envelope timestamp. The server emits both RFC 3339 and
    /// naive ISO-8601 forms; naive values are read as UTC.
    pub fn timestamp_utc(&self) -> Result<Option<DateTime<Utc>>, ProtocolError> {
        let Some(raw) = self.timestamp.as_deref() else {
            return Ok(None);
        };
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Ok(Some(ts.with_timezone(&Utc)));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| Some(naive.and_utc()))
            .map_err(|_| ProtocolError::InvalidTimestamp(raw.to_string()))
    }

    /// Check the fields the engine relies on for this event type.
    ///
    /// Every per-game event must name its game. The handshake may leave the
    /// envelope id out, and TASK_ENDED belongs to no game.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        let needs_game = !matches!(
            self.kind,
            GameEventKind::ConnectionEstablished { .. } | GameEventKind::TaskEnded { .. }
        );
        if needs_game && self.game_id.trim().is_empty() {
            return Err(ProtocolError::malformed(self.event_type(), "missing game_id"));
        }
        self.kind.validate()
    }
}

impl GameEventKind {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ConnectionEstablished { .. } => EVENT_CONNECTION_ESTABLISHED,
            Self::GameMoveCompleted { .. } => EVENT_GAME_MOVE_COMPLETED,
            Self::OptimalPathsUpdated { .. } => EVENT_OPTIMAL_PATHS_UPDATED,
            Self::GameEnded { .. } => EVENT_GAME_ENDED,
            Self::TaskEnded { .. } => EVENT_TASK_ENDED,
        }
    }

    pub fn validate(&self) -> Result<(), ProtocolError> {
        let event_type = self.event_type();
        match self {
            Self::ConnectionEstablished { complete_state } => {
                if let Some(game) = complete_state.as_ref().and_then(|s| s.game.as_ref()) {
                    validate_snapshot(event_type, game)?;
                }
                Ok(())
            }
            Self::GameMoveCompleted { mv, .. } => {
                if mv.from_page_title.trim().is_empty() {
                    return Err(ProtocolError::malformed(event_type, "move has no source page"));
                }
                match mv.to_page_title.as_deref() {
                    Some(to) if !to.trim().is_empty() => Ok(()),
                    _ => Err(ProtocolError::malformed(
                        event_type,
                        format!("move {} has no destination page", mv.step),
                    )),
                }
            }
            Self::OptimalPathsUpdated {
                to_page_title,
                optimal_paths,
                ..
            } => {
                if to_page_title.as_deref().is_some_and(|t| t.trim().is_empty()) {
                    return Err(ProtocolError::malformed(event_type, "empty to_page_title"));
                }
                if optimal_paths
                    .iter()
                    .any(|p| p.is_empty() || p.iter().any(|t| t.trim().is_empty()))
                {
                    return Err(ProtocolError::malformed(event_type, "optimal path contains an empty step"));
                }
                Ok(())
            }
            Self::GameEnded { state, .. } => {
                if let Some(game) = state {
                    validate_snapshot(event_type, game)?;
                }
                Ok(())
            }
            Self::TaskEnded { .. } => Ok(()),
        }
    }
}

fn validate_snapshot(event_type: &'static str, game: &GameSnapshot) -> Result<(), ProtocolError> {
    if game.config.start_page_title.trim().is_empty() {
        return Err(ProtocolError::malformed(event_type, "snapshot has no start page"));
    }
    if let Some(mv) = game.move_history.iter().find(|m| m.from_page_title.trim().is_empty()) {
        return Err(ProtocolError::malformed(
            event_type,
            format!("history move {} has no source page", mv.step),
        ));
    }
    Ok(())
}
