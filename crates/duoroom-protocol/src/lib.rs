//! Wire protocol for Duoroom.
//!
//! This crate defines what participants and the server say to each other:
//!
//! - **Messages** ([`ClientMessage`], [`ServerMessage`]) wrapped in an
//!   [`Envelope`] - the logical contract of the session.
//! - **Snapshots** ([`StateSnapshot`]) - the full, self-consistent view
//!   of a session that is broadcast after every mutation.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) - how those messages
//!   are converted to/from bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! The protocol layer knows nothing about sockets or rooms:
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Room (commands, snapshots)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    BOARD_CELLS, Board, Cell, ClientMessage, Envelope, Marker, Outcome,
    ParticipantId, ParticipantInfo, Phase, RoomId, ServerMessage,
    StateSnapshot,
};
