//! Arena State - the task state engine behind the race visualizer
//!
//! Ingests an unordered stream of per-game events, keeps each game's page
//! history consistent, and derives one deduplicated page graph across all
//! games for whatever step the user is viewing.
//!
//! - [`history`]: append-only per-game histories and late solver attachment
//! - [`viewport`]: live/stepping mode and the viewed index
//! - [`graph`]: the derived page graph handed to renderers
//! - [`progress`]: per-game distance and progress at the viewed index
//! - [`engine`]: composition of the above with subscribe/notify

pub mod engine;
pub mod graph;
pub mod history;
pub mod progress;
pub mod task;
pub mod viewport;

pub use engine::{EventOutcome, IgnoreReason, SubscriptionId, TaskStateEngine};
pub use graph::{
    build_page_graph, EdgeType, GraphOptions, NavigationEdge, PageGraphData, PageNode, PageNodeType, Visit,
};
pub use history::HistoryStore;
pub use progress::{game_progress, GameProgress};
pub use task::{GameConfig, GameSequence, PageState, Task};
pub use viewport::{RenderingMode, Viewport};

use arena_protocol::ProtocolError;

/// Why a history mutation was refused. The store is unchanged on error.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Unknown game: {0}")]
    UnknownGame(String),

    #[error("No page titled {page_title:?} in game {game_id}")]
    UnresolvedAttachment { game_id: String, page_title: String },

    #[error("Malformed event: {0}")]
    Malformed(String),

    #[error("{0} is a task-level event")]
    NotAGameEvent(&'static str),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
