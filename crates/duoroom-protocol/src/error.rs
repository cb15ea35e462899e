//! Error types for the protocol layer.

/// Errors that can occur while turning frames into messages and back.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, an unknown `type` tag,
    /// or a field of the wrong shape.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame decoded but is not acceptable at this point of the
    /// conversation (e.g. a `move` before `join`).
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
