//! Transport layer for Duoroom.
//!
//! The session core never touches sockets. It sees a participant as a
//! [`Connection`]: something that yields inbound frames and accepts
//! outbound ones.
//!
//! Getting one takes two steps. [`Transport::accept`] returns as soon as
//! a peer is accepted, as a [`PendingConnection`]. The protocol handshake
//! runs later in [`PendingConnection::upgrade`], off the accept loop, so a
//! peer that never finishes it holds up nobody but itself.
//!
//! # Feature Flags
//!
//! - `websocket` (default) - WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{PendingWebSocket, WebSocketConnection, WebSocketTransport};

use std::fmt;

/// Opaque identifier for one accepted connection.
///
/// Unique for the lifetime of the process. It is not the participant's
/// identity on the wire; the session layer mints that separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// An accepted peer that has not completed its handshake.
    type Pending: PendingConnection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next peer. Does not wait for its handshake.
    async fn accept(&mut self) -> Result<Self::Pending, Self::Error>;
}

/// An accepted peer whose handshake is still outstanding.
///
/// `upgrade` has no deadline of its own; callers bound it.
pub trait PendingConnection: Send + 'static {
    /// The connection produced by a completed handshake.
    type Connection: Connection;
    /// The error type for the handshake.
    type Error: std::error::Error + Send + Sync;

    /// Runs the handshake.
    async fn upgrade(self) -> Result<Self::Connection, Self::Error>;

    /// The id the finished connection will carry.
    fn id(&self) -> ConnectionId;
}

/// A single participant connection that moves whole frames.
///
/// `send` and `recv` may be called concurrently from the same task
/// (e.g. from two branches of a `tokio::select!`); implementations must
/// not make one wait on the other.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends one frame to the remote peer.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
