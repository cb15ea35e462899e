//! Codec trait and implementations for serializing/deserializing messages.
//!
//! The server only ever talks to a [`Codec`]; swapping JSON for a binary
//! format is a one-type change in the server builder.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes Rust values to frames and decodes frames back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task on the runtime.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T)
    -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// JSON keeps the protocol readable from browser DevTools, which is how
/// the reference web client is debugged.
///
/// ## Example
///
/// ```rust
/// use duoroom_protocol::{ClientMessage, Codec, Envelope, JsonCodec};
///
/// let codec = JsonCodec;
/// let frame = br#"{"message":{"type":"move","position":4}}"#;
///
/// let envelope: Envelope<ClientMessage> = codec.decode(frame).unwrap();
/// assert_eq!(envelope.seq, 0);
/// assert_eq!(envelope.message, ClientMessage::Move { position: 4 });
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
