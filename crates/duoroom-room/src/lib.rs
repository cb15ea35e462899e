//! Two-seat session rooms for Duoroom.
//!
//! Each room is an isolated Tokio task (actor) owning one
//! [`SessionController`], which in turn owns the session's [`GameState`]
//! and its [`Replicator`]. Rooms share no mutable state.
//!
//! # Key types
//!
//! - [`GameState`] - board, seats, turn, outcome; pure data
//! - [`rules`] - pure win/draw/legality checks
//! - [`SessionController`] - the only writer of a `GameState`
//! - [`Replicator`] - pushes welcomes and snapshots to participants
//! - [`RoomHandle`] - sends commands to a running room actor
//! - [`SessionRegistry`] - creates/destroys rooms, seats participants

mod config;
mod controller;
mod error;
mod registry;
mod replication;
mod room;
pub mod rules;
mod state;

pub use config::{DEFAULT_MAX_NAME_LEN, RoomConfig};
pub use controller::SessionController;
pub use error::{InvariantViolation, RoomError};
pub use registry::{Assignment, SessionRegistry};
pub use replication::{ParticipantSender, Replicator};
pub use room::{RoomHandle, RoomInfo};
pub use state::{GameState, Participant, SEATS};
