//! Arena Protocol - wire types for the race event stream
//!
//! Every game in a race reports its progress as a stream of JSON events
//! tagged by a `type` field. This crate owns the typed form of those events
//! and the checks that tell a well-formed event from a malformed one.

pub mod constants;
pub mod error;
pub mod events;
pub mod status;

pub use constants::*;
pub use error::*;
pub use events::*;
pub use status::GameStatus;
