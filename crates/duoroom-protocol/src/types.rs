//! Message and snapshot types that travel on the wire.
//!
//! JSON shapes are part of the contract with the browser client, so the
//! serde attributes here are load-bearing. The tests at the bottom pin
//! them down.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Opaque identity of one admitted participant.
///
/// Minted per connection by the session layer. Clients only ever compare
/// it for equality (e.g. "is `turn_holder` me?"), so it serializes as a
/// bare string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Wraps an already-minted identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for ParticipantId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of one session (room). Never sent to clients; used in logs
/// and by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Board vocabulary
// ---------------------------------------------------------------------------

/// Number of cells on the board. Row-major: 0-2 top, 3-5 middle, 6-8 bottom.
pub const BOARD_CELLS: usize = 9;

/// One of the two symbols a participant places.
///
/// A newcomer takes whichever marker is free, `X` first. `X` always
/// moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Marker {
    X,
    O,
}

impl Marker {
    /// The opponent's marker.
    pub fn other(self) -> Self {
        match self {
            Self::X => Self::O,
            Self::O => Self::X,
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X => f.write_str("X"),
            Self::O => f.write_str("O"),
        }
    }
}

/// The value of one board cell. Serialized as `""`, `"X"` or `"O"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    #[serde(rename = "")]
    Empty,
    X,
    O,
}

impl Cell {
    /// Returns `true` if no marker occupies this cell.
    pub fn is_empty(self) -> bool {
        self == Self::Empty
    }

    /// The marker in this cell, if any.
    pub fn marker(self) -> Option<Marker> {
        match self {
            Self::Empty => None,
            Self::X => Some(Marker::X),
            Self::O => Some(Marker::O),
        }
    }
}

impl From<Marker> for Cell {
    fn from(marker: Marker) -> Self {
        match marker {
            Marker::X => Self::X,
            Marker::O => Self::O,
        }
    }
}

/// The nine cells of a session's board.
pub type Board = [Cell; BOARD_CELLS];

// ---------------------------------------------------------------------------
// Session lifecycle vocabulary
// ---------------------------------------------------------------------------

/// Lifecycle phase of a session.
///
/// ```text
/// Waiting ──(2nd admit)──→ Active ──(win/draw)──→ Concluded
///    ↑                       │  ↑                     │
///    └──(departure, any)─────┘  └───────(reset)───────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Fewer than two participants.
    #[default]
    Waiting,
    /// Two participants, moves are being accepted.
    Active,
    /// The round ended; only a reset is accepted.
    Concluded,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => f.write_str("waiting"),
            Self::Active => f.write_str("active"),
            Self::Concluded => f.write_str("concluded"),
        }
    }
}

/// Result of the current round. Meaningful only in [`Phase::Concluded`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    #[default]
    Undecided,
    Winner(Marker),
    Draw,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Public view of one admitted participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub id: ParticipantId,
    pub name: String,
    pub marker: Marker,
}

/// A complete, self-consistent copy of a session's state.
///
/// Always sent whole, never as a diff: a client that only ever applies
/// the latest snapshot it received is always correct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Per-session broadcast counter. Increases by exactly one per
    /// snapshot, so gaps or reordering are detectable client-side.
    pub revision: u64,
    pub board: Board,
    /// Participants in admission order.
    pub participants: Vec<ParticipantInfo>,
    pub turn_holder: Option<ParticipantId>,
    pub phase: Phase,
    pub outcome: Outcome,
}

impl StateSnapshot {
    /// Looks up a participant by identity.
    pub fn participant(&self, id: &ParticipantId) -> Option<&ParticipantInfo> {
        self.participants.iter().find(|p| &p.id == id)
    }

    /// Number of cells holding a marker.
    pub fn occupied_cells(&self) -> usize {
        self.board.iter().filter(|c| !c.is_empty()).count()
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Participant → session.
///
/// Internally tagged: `{"type": "move", "position": 4}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Request admission. Must be the first message on a connection.
    Join {
        #[serde(default)]
        name: Option<String>,
    },

    /// Place the sender's marker. Signed so that a negative position
    /// decodes and is then ignored like any other illegal move.
    Move { position: i64 },

    /// Start a new round after the current one concluded.
    Reset,

    /// Leave the session. Same effect as disconnecting.
    Leave,

    /// Keep-alive. Echoed back as [`ServerMessage::HeartbeatAck`].
    Heartbeat { client_time: u64 },
}

/// Session → participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once, only to the participant that was just admitted.
    Welcome {
        participant_id: ParticipantId,
        marker: Marker,
    },

    /// Full session state, sent to every participant after each mutation.
    State(StateSnapshot),

    /// The frame could not be understood. Illegal moves never produce
    /// this; they are dropped silently.
    Error { code: u16, message: String },

    /// Reply to [`ClientMessage::Heartbeat`].
    HeartbeatAck { client_time: u64, server_time: u64 },
}

/// Framing for every message on the wire.
///
/// `seq` and `timestamp` are filled in by the sender; clients may omit
/// them, in which case they decode as 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<M> {
    /// Per-connection, per-direction frame counter.
    #[serde(default)]
    pub seq: u64,

    /// Milliseconds since the server accepted the connection.
    #[serde(default)]
    pub timestamp: u64,

    pub message: M,
}

impl<M> Envelope<M> {
    pub fn new(seq: u64, timestamp: u64, message: M) -> Self {
        Self {
            seq,
            timestamp,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn empty_snapshot() -> StateSnapshot {
        StateSnapshot {
            revision: 0,
            board: [Cell::Empty; BOARD_CELLS],
            participants: vec![],
            turn_holder: None,
            phase: Phase::Waiting,
            outcome: Outcome::Undecided,
        }
    }

    #[test]
    fn test_participant_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&ParticipantId::from("k2Hd9aQ1z")).unwrap();
        assert_eq!(json, "\"k2Hd9aQ1z\"");
    }

    #[test]
    fn test_room_id_display() {
        assert_eq!(RoomId(3).to_string(), "R-3");
    }

    #[test]
    fn test_marker_other() {
        assert_eq!(Marker::X.other(), Marker::O);
        assert_eq!(Marker::O.other(), Marker::X);
    }

    #[test]
    fn test_cell_serializes_as_empty_string_or_symbol() {
        let board = [Cell::Empty, Cell::X, Cell::O];
        assert_eq!(serde_json::to_value(board).unwrap(), json!(["", "X", "O"]));
    }

    #[test]
    fn test_cell_from_marker() {
        assert_eq!(Cell::from(Marker::X), Cell::X);
        assert_eq!(Cell::from(Marker::O).marker(), Some(Marker::O));
        assert_eq!(Cell::Empty.marker(), None);
    }

    #[test]
    fn test_phase_and_outcome_json() {
        assert_eq!(serde_json::to_value(Phase::Concluded).unwrap(), json!("concluded"));
        assert_eq!(serde_json::to_value(Outcome::Draw).unwrap(), json!("draw"));
        assert_eq!(
            serde_json::to_value(Outcome::Winner(Marker::X)).unwrap(),
            json!({ "winner": "X" })
        );
    }

    #[test]
    fn test_client_join_without_name() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"join"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Join { name: None });
    }

    #[test]
    fn test_client_join_with_name() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"join","name":"Alice"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Join { name: Some("Alice".into()) });
    }

    #[test]
    fn test_client_move_accepts_negative_position() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"move","position":-1}"#).unwrap();
        assert_eq!(msg, ClientMessage::Move { position: -1 });
    }

    #[test]
    fn test_client_reset_and_leave_are_bare_tags() {
        let reset: ClientMessage = serde_json::from_str(r#"{"type":"reset"}"#).unwrap();
        let leave: ClientMessage = serde_json::from_str(r#"{"type":"leave"}"#).unwrap();
        assert_eq!(reset, ClientMessage::Reset);
        assert_eq!(leave, ClientMessage::Leave);
    }

    #[test]
    fn test_client_unknown_type_is_rejected() {
        let result: Result<ClientMessage, _> =
            serde_json::from_str(r#"{"type":"fly_to_moon"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_server_state_is_flattened_snapshot() {
        let mut snapshot = empty_snapshot();
        snapshot.revision = 7;
        snapshot.board[4] = Cell::X;
        snapshot.participants.push(ParticipantInfo {
            id: ParticipantId::from("a"),
            name: "Alice".into(),
            marker: Marker::X,
        });

        let json = serde_json::to_value(ServerMessage::State(snapshot)).unwrap();

        assert_eq!(json["type"], "state");
        assert_eq!(json["revision"], 7);
        assert_eq!(json["board"][4], "X");
        assert_eq!(json["board"][0], "");
        assert_eq!(json["participants"][0]["name"], "Alice");
        assert!(json["turn_holder"].is_null());
        assert_eq!(json["phase"], "waiting");
        assert_eq!(json["outcome"], "undecided");
    }

    #[test]
    fn test_server_state_decodes_back() {
        let msg = ServerMessage::State(empty_snapshot());
        let bytes = serde_json::to_vec(&msg).unwrap();
        let decoded: ServerMessage = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_envelope_defaults_seq_and_timestamp() {
        let env: Envelope<ClientMessage> =
            serde_json::from_str(r#"{"message":{"type":"reset"}}"#).unwrap();
        assert_eq!(env.seq, 0);
        assert_eq!(env.timestamp, 0);
        assert_eq!(env.message, ClientMessage::Reset);
    }

    #[test]
    fn test_snapshot_helpers() {
        let mut snapshot = empty_snapshot();
        snapshot.board[0] = Cell::X;
        snapshot.board[8] = Cell::O;
        snapshot.participants.push(ParticipantInfo {
            id: ParticipantId::from("b"),
            name: "Bob".into(),
            marker: Marker::O,
        });

        assert_eq!(snapshot.occupied_cells(), 2);
        assert_eq!(
            snapshot.participant(&ParticipantId::from("b")).map(|p| p.marker),
            Some(Marker::O)
        );
        assert!(snapshot.participant(&ParticipantId::from("zz")).is_none());
    }
}
