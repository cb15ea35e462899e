//! The record of one connected participant.

use std::time::Instant;

use duoroom_protocol::ParticipantId;
use duoroom_transport::ConnectionId;

/// Length of a generated participant id.
pub const SESSION_ID_LEN: usize = 9;

/// One live connection and the identity it speaks under.
#[derive(Debug, Clone)]
pub struct Session {
    pub connection_id: ConnectionId,
    pub participant_id: ParticipantId,
    pub connected_at: Instant,
}
