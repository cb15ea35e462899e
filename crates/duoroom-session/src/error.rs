//! Error types for the session layer.

use duoroom_transport::ConnectionId;

/// Errors that can occur while tracking sessions.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session exists for the connection.
    #[error("session not found for {0}")]
    NotFound(ConnectionId),

    /// The connection already has a session.
    #[error("{0} already has an active session")]
    AlreadyConnected(ConnectionId),
}
