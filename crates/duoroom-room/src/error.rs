//! Error types for the room layer.

use duoroom_protocol::{Marker, Outcome, ParticipantId, Phase, RoomId};

/// Errors that can occur during session operations.
///
/// Illegal moves and resets are not errors; the controller ignores them.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// Both seats are taken. The registry routes the participant to
    /// another session; this never reaches a client.
    #[error("room {0} is full")]
    SessionFull(RoomId),

    /// The participant is already seated somewhere.
    #[error("participant {0} already in room {1}")]
    AlreadyInRoom(ParticipantId, RoomId),

    /// The room's actor has stopped or its command channel is closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}

/// A structural rule of [`GameState`](crate::GameState) that does not hold.
///
/// Only reachable through a controller bug; the controller asserts on it
/// in debug builds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("{0} participants seated, at most {max} allowed", max = crate::SEATS)]
    TooManySeats(usize),

    #[error("both participants hold {0}")]
    SharedMarker(Marker),

    #[error("participant {0} seated twice")]
    DuplicateSeat(ParticipantId),

    #[error("active with an empty seat")]
    ActiveWithEmptySeat,

    #[error("turn held by non-participant {0}")]
    TurnHolderNotSeated(ParticipantId),

    #[error("active without a turn holder")]
    ActiveWithoutTurnHolder,

    #[error("turn holder set while {0}")]
    StrayTurnHolder(Phase),

    #[error("{phase} with outcome {outcome:?}")]
    PrematureOutcome { phase: Phase, outcome: Outcome },

    #[error("waiting with markers on the board")]
    WaitingWithMarkers,

    #[error("board implies {expected:?} but outcome is {actual:?}")]
    OutcomeMismatch { expected: Outcome, actual: Outcome },

    #[error("concluded on an undecided board")]
    ConcludedUndecided,
}
