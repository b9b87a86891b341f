//! Duel rooms for Codeduel.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! round state and the outboxes of the connections subscribed to it.
//!
//! # Key types
//!
//! - [`score`]: the feedback engine, a pure function
//! - [`RoomSession`]: one room's round state machine, synchronous
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`RoomStore`]: creates rooms, looks them up by code, routes requests
//! - [`RoomConfig`]: guest cap and actor channel size

mod code;
mod config;
mod error;
pub mod feedback;
mod room;
mod session;
mod store;

pub use code::generate_room_code;
pub use config::RoomConfig;
pub use error::RoomError;
pub use feedback::{FeedbackError, score};
pub use room::{PlayerOutbox, RoomHandle};
pub use session::{
    GuessRecord, LeaveOutcome, Outbound, Phase, Player, RoomSession,
};
pub use store::{MAX_CODE_ATTEMPTS, RoomStore};
