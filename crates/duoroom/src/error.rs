//! Unified error type for Duoroom.

use duoroom_protocol::ProtocolError;
use duoroom_room::RoomError;
use duoroom_session::SessionError;
use duoroom_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` lift sub-crate errors
/// into this one.
#[derive(Debug, thiserror::Error)]
pub enum DuoroomError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (duplicate or unknown connection).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (not found, unavailable, already seated).
    #[error(transparent)]
    Room(#[from] RoomError),
}
