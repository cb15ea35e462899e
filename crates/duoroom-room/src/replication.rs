//! Outbound half of the replication channel.
//!
//! Each admitted participant has an unbounded outbox. The connection
//! handler drains it onto the socket at whatever pace the client
//! manages, so a slow reader never stalls the room.
//!
//! All sends for a session happen on the room actor, one after another,
//! so every participant observes that session's snapshots in the order
//! they were produced.

use duoroom_protocol::{ParticipantId, ServerMessage, StateSnapshot};
use tokio::sync::mpsc;

use crate::{GameState, Participant};

/// Channel sender for delivering outbound messages to one participant.
pub type ParticipantSender = mpsc::UnboundedSender<ServerMessage>;

/// Fans messages out to the admitted participants of one session.
#[derive(Debug, Default)]
pub struct Replicator {
    /// Admission order, so fan-out order is deterministic.
    outboxes: Vec<(ParticipantId, ParticipantSender)>,
    /// Number of snapshots broadcast so far.
    revision: u64,
}

impl Replicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts delivering to a participant. Replaces any previous outbox
    /// for the same id.
    pub fn attach(&mut self, id: ParticipantId, outbox: ParticipantSender) {
        self.detach(&id);
        self.outboxes.push((id, outbox));
    }

    /// Stops delivering to a participant.
    pub fn detach(&mut self, id: &ParticipantId) {
        self.outboxes.retain(|(pid, _)| pid != id);
    }

    /// Sends the one-off admission acknowledgment to a new participant.
    pub fn welcome(&self, participant: &Participant) {
        self.send_to(
            &participant.id,
            ServerMessage::Welcome {
                participant_id: participant.id.clone(),
                marker: participant.marker,
            },
        );
    }

    /// Stamps the next revision on a snapshot of `state` and sends it to
    /// every attached participant. Returns the snapshot sent.
    pub fn broadcast(&mut self, state: &GameState) -> StateSnapshot {
        self.revision += 1;
        let snapshot = state.snapshot(self.revision);
        for (id, outbox) in &self.outboxes {
            if outbox.send(ServerMessage::State(snapshot.clone())).is_err() {
                tracing::debug!(
                    participant_id = %id,
                    revision = self.revision,
                    "outbox closed, snapshot dropped"
                );
            }
        }
        snapshot
    }

    /// Revision of the most recent broadcast (0 before the first).
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of attached outboxes.
    pub fn len(&self) -> usize {
        self.outboxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outboxes.is_empty()
    }

    /// Delivers to one participant. Silently drops if the receiver is
    /// gone; the connection handler reports that as a departure.
    fn send_to(&self, id: &ParticipantId, msg: ServerMessage) {
        if let Some((_, outbox)) = self.outboxes.iter().find(|(pid, _)| pid == id) {
            let _ = outbox.send(msg);
        }
    }
}
