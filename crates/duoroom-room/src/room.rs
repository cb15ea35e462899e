//! Room actor: an isolated Tokio task that owns one session.
//!
//! Each room drains its command channel one command at a time, so
//! `admit`, `remove`, `submit_move` and `request_reset` never interleave
//! within a session. Rooms share nothing with each other.

use duoroom_protocol::{ParticipantId, Phase, RoomId, StateSnapshot};
use tokio::sync::{mpsc, oneshot};

use crate::{
    Participant, ParticipantSender, RoomConfig, RoomError, SEATS,
    SessionController,
};

/// Commands sent to a room actor through its channel.
///
/// Variants with a `reply` are request/response; the rest are
/// fire-and-forget. Inbound participant messages arrive here already
/// decoded into one of these.
pub(crate) enum RoomCommand {
    /// Seat a participant.
    Join {
        participant_id: ParticipantId,
        name: Option<String>,
        outbox: ParticipantSender,
        reply: oneshot::Sender<Result<Participant, RoomError>>,
    },

    /// Unseat a participant. Replies with the number still seated.
    Leave {
        participant_id: ParticipantId,
        reply: oneshot::Sender<usize>,
    },

    /// Place the sender's marker.
    Move {
        sender: ParticipantId,
        position: i64,
    },

    /// Start a new round.
    Reset { sender: ParticipantId },

    /// Request room metadata.
    GetInfo { reply: oneshot::Sender<RoomInfo> },

    /// Request the current snapshot.
    GetSnapshot {
        reply: oneshot::Sender<StateSnapshot>,
    },

    /// Stop the actor.
    Shutdown,
}

impl std::fmt::Debug for RoomCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Join { participant_id, .. } => {
                write!(f, "Join({participant_id})")
            }
            Self::Leave { participant_id, .. } => {
                write!(f, "Leave({participant_id})")
            }
            Self::Move { sender, position } => {
                write!(f, "Move({sender}, {position})")
            }
            Self::Reset { sender } => write!(f, "Reset({sender})"),
            Self::GetInfo { .. } => f.write_str("GetInfo"),
            Self::GetSnapshot { .. } => f.write_str("GetSnapshot"),
            Self::Shutdown => f.write_str("Shutdown"),
        }
    }
}

/// A summary of a room (not the game state itself).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub phase: Phase,
    pub participant_count: usize,
    pub capacity: usize,
}

impl RoomInfo {
    /// Returns `true` if another participant can be seated.
    pub fn has_free_seat(&self) -> bool {
        self.participant_count < self.capacity
    }
}

/// Handle to a running room actor. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Asks the room to seat a participant.
    ///
    /// On success the participant's outbox has already received its
    /// `welcome` followed by the post-admission snapshot.
    pub async fn join(
        &self,
        participant_id: ParticipantId,
        name: Option<String>,
        outbox: ParticipantSender,
    ) -> Result<Participant, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Join {
            participant_id,
            name,
            outbox,
            reply: reply_tx,
        })
        .await?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))?
    }

    /// Asks the room to unseat a participant. Returns how many remain.
    pub async fn leave(
        &self,
        participant_id: ParticipantId,
    ) -> Result<usize, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Leave {
            participant_id,
            reply: reply_tx,
        })
        .await?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))
    }

    /// Queues a move (fire-and-forget). The outcome shows up as a
    /// snapshot, or not at all if the move was illegal.
    pub async fn submit_move(
        &self,
        sender: ParticipantId,
        position: i64,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::Move { sender, position }).await
    }

    /// Queues a reset request (fire-and-forget).
    pub async fn request_reset(
        &self,
        sender: ParticipantId,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::Reset { sender }).await
    }

    /// Requests the current room info.
    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::GetInfo { reply: reply_tx }).await?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))
    }

    /// Requests the state as last broadcast.
    pub async fn snapshot(&self) -> Result<StateSnapshot, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::GetSnapshot { reply: reply_tx })
            .await?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))
    }

    /// Tells the room to shut down.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.send(RoomCommand::Shutdown).await
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    controller: SessionController,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    /// Runs the actor loop, processing commands until shutdown.
    async fn run(mut self) {
        let room_id = self.controller.room_id();
        tracing::info!(%room_id, "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Join {
                    participant_id,
                    name,
                    outbox,
                    reply,
                } => {
                    let result = self.controller.admit(
                        participant_id,
                        name.as_deref(),
                        outbox,
                    );
                    let _ = reply.send(result);
                }
                RoomCommand::Leave {
                    participant_id,
                    reply,
                } => {
                    self.controller.remove(&participant_id);
                    let _ = reply.send(self.controller.seated());
                }
                RoomCommand::Move { sender, position } => {
                    self.controller.submit_move(&sender, position);
                }
                RoomCommand::Reset { sender } => {
                    if self.controller.state().participant(&sender).is_none() {
                        tracing::warn!(
                            %room_id,
                            participant_id = %sender,
                            "reset from non-member, ignoring"
                        );
                        continue;
                    }
                    self.controller.request_reset();
                }
                RoomCommand::GetInfo { reply } => {
                    let _ = reply.send(self.info());
                }
                RoomCommand::GetSnapshot { reply } => {
                    let _ = reply.send(self.controller.snapshot());
                }
                RoomCommand::Shutdown => {
                    tracing::info!(%room_id, "room shutting down");
                    break;
                }
            }
        }

        tracing::info!(%room_id, "room disposed");
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.controller.room_id(),
            phase: self.controller.state().phase(),
            participant_count: self.controller.seated(),
            capacity: SEATS,
        }
    }
}

/// Spawns a new room actor task and returns a handle to it.
///
/// `config.command_buffer` bounds the command channel; senders wait
/// when it is full.
pub(crate) fn spawn_room(room_id: RoomId, config: RoomConfig) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.command_buffer.max(1));

    let actor = RoomActor {
        controller: SessionController::new(room_id, config),
        receiver: rx,
    };
    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        sender: tx,
    }
}
