//! Arena Viewer - host application for the task state engine
//!
//! Supplies what the engine deliberately leaves outside: an event transport
//! ([`feed`]), configuration ([`config`]), a local solver and random-walk
//! race generator for offline runs ([`solver`], [`simulation`]), and
//! terminal output ([`report`]).

pub mod config;
pub mod error;
pub mod feed;
pub mod report;
pub mod simulation;
pub mod solver;

pub use config::ViewerConfig;
pub use error::ViewerError;
pub use feed::{drive, DriveStats, EventFeed, FeedStats};
pub use report::Report;
pub use simulation::{SimulatedRace, Simulation};
pub use solver::{shortest_paths, LinkGraph};
