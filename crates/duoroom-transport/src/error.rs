//! Error types for the transport layer.

/// Errors that can occur in the transport layer.
///
/// Past `accept`, every variant means the same thing to the session
/// core: the participant behind this connection is gone.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the listener or accepting a TCP connection failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The peer connected but the protocol upgrade did not complete.
    #[error("handshake with {peer} failed: {source}")]
    HandshakeFailed {
        peer: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Writing a frame failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Reading a frame failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),
}
