//! The session manager: mints identities and tracks live sessions.
//!
//! Not thread-safe on its own (plain `HashMap`s). The server keeps it
//! behind a mutex and only holds that lock for the map update.

use std::collections::HashMap;
use std::time::Instant;

use duoroom_protocol::ParticipantId;
use duoroom_transport::ConnectionId;
use rand::Rng;
use rand::distr::Alphanumeric;

use crate::{SESSION_ID_LEN, Session, SessionError};

/// Tracks every live session, indexed both ways.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: HashMap<ConnectionId, Session>,
    /// Reverse index, kept in sync with `sessions`. Also the uniqueness
    /// check for freshly generated ids.
    by_participant: HashMap<ParticipantId, ConnectionId>,
}

impl SessionManager {
    /// Creates an empty session manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session for a newly accepted connection and mints its
    /// participant id.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyConnected`] if the connection
    /// already has a session.
    pub fn create(
        &mut self,
        connection_id: ConnectionId,
    ) -> Result<&Session, SessionError> {
        if self.sessions.contains_key(&connection_id) {
            return Err(SessionError::AlreadyConnected(connection_id));
        }

        let participant_id = loop {
            let candidate = generate_session_id();
            if !self.by_participant.contains_key(&candidate) {
                break candidate;
            }
        };

        tracing::info!(
            conn_id = %connection_id,
            participant_id = %participant_id,
            "session created"
        );

        self.by_participant
            .insert(participant_id.clone(), connection_id);
        let session = self.sessions.entry(connection_id).or_insert(Session {
            connection_id,
            participant_id,
            connected_at: Instant::now(),
        });
        Ok(session)
    }

    /// Ends the session for a connection and returns it.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if there is no such session.
    pub fn end(
        &mut self,
        connection_id: ConnectionId,
    ) -> Result<Session, SessionError> {
        let session = self
            .sessions
            .remove(&connection_id)
            .ok_or(SessionError::NotFound(connection_id))?;
        self.by_participant.remove(&session.participant_id);

        tracing::info!(
            conn_id = %connection_id,
            participant_id = %session.participant_id,
            duration_ms = session.connected_at.elapsed().as_millis() as u64,
            "session ended"
        );
        Ok(session)
    }

    /// Looks up a session by connection.
    pub fn get(&self, connection_id: &ConnectionId) -> Option<&Session> {
        self.sessions.get(connection_id)
    }

    /// Finds which connection a participant speaks through.
    pub fn connection_of(
        &self,
        participant_id: &ParticipantId,
    ) -> Option<ConnectionId> {
        self.by_participant.get(participant_id).copied()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if there are no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Random alphanumeric id, the same shape browser clients already get
/// from common room servers.
fn generate_session_id() -> ParticipantId {
    let id: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(SESSION_ID_LEN)
        .map(char::from)
        .collect();
    ParticipantId::from(id)
}
