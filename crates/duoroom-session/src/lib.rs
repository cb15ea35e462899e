//! Participant identity for Duoroom.
//!
//! Every accepted connection gets exactly one [`Session`]: the pairing of
//! its transport-level [`ConnectionId`](duoroom_transport::ConnectionId)
//! with the opaque [`ParticipantId`](duoroom_protocol::ParticipantId) the
//! rest of the system (and the wire) uses.
//!
//! ```text
//! Room Layer (above)     ← keys seats and turns by ParticipantId
//!     ↕
//! Session Layer (here)   ← mints ParticipantIds, one per connection
//!     ↕
//! Transport (below)      ← knows only ConnectionIds
//! ```
//!
//! Sessions end with their connection. There is no resume.

mod error;
mod manager;
mod session;

pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{SESSION_ID_LEN, Session};
