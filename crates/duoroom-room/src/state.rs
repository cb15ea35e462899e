//! The canonical, replicated state of one session.
//!
//! [`GameState`] is plain data. Everything outside this crate can read it
//! but only [`SessionController`](crate::SessionController) writes it, so
//! the invariants in [`GameState::check_invariants`] have a single owner.

use duoroom_protocol::{
    BOARD_CELLS, Board, Cell, Marker, Outcome, ParticipantId, ParticipantInfo,
    Phase, StateSnapshot,
};

use crate::{InvariantViolation, rules};

/// Seats per session.
pub const SEATS: usize = 2;

/// One admitted participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub marker: Marker,
}

impl Participant {
    /// The public, wire-facing view of this participant.
    pub fn info(&self) -> ParticipantInfo {
        ParticipantInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            marker: self.marker,
        }
    }
}

/// Board, seats, turn and result of one session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GameState {
    pub(crate) board: Board,
    /// Admission order. At most [`SEATS`] long.
    pub(crate) participants: Vec<Participant>,
    pub(crate) turn_holder: Option<ParticipantId>,
    pub(crate) phase: Phase,
    pub(crate) outcome: Outcome,
}

impl GameState {
    /// An empty board in [`Phase::Waiting`] with nobody seated.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn turn_holder(&self) -> Option<&ParticipantId> {
        self.turn_holder.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Looks up a seated participant.
    pub fn participant(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.id == id)
    }

    /// The participant holding `marker`, if seated.
    pub fn holder_of(&self, marker: Marker) -> Option<&Participant> {
        self.participants.iter().find(|p| p.marker == marker)
    }

    /// The first marker no seated participant holds. `X` before `O`.
    pub fn free_marker(&self) -> Option<Marker> {
        [Marker::X, Marker::O]
            .into_iter()
            .find(|m| self.holder_of(*m).is_none())
    }

    /// Copies the state into its wire form, stamped with `revision`.
    pub fn snapshot(&self, revision: u64) -> StateSnapshot {
        StateSnapshot {
            revision,
            board: self.board,
            participants: self.participants.iter().map(Participant::info).collect(),
            turn_holder: self.turn_holder.clone(),
            phase: self.phase,
            outcome: self.outcome,
        }
    }

    /// Checks every structural invariant of a session.
    ///
    /// The controller asserts this after each mutation in debug builds;
    /// tests call it directly.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if self.participants.len() > SEATS {
            return Err(InvariantViolation::TooManySeats(self.participants.len()));
        }
        if let [a, b] = self.participants.as_slice() {
            if a.marker == b.marker {
                return Err(InvariantViolation::SharedMarker(a.marker));
            }
            if a.id == b.id {
                return Err(InvariantViolation::DuplicateSeat(a.id.clone()));
            }
        }

        match self.phase {
            Phase::Active => {
                if self.participants.len() != SEATS {
                    return Err(InvariantViolation::ActiveWithEmptySeat);
                }
                match &self.turn_holder {
                    Some(id) if self.participant(id).is_some() => {}
                    Some(id) => {
                        return Err(InvariantViolation::TurnHolderNotSeated(
                            id.clone(),
                        ));
                    }
                    None => return Err(InvariantViolation::ActiveWithoutTurnHolder),
                }
            }
            Phase::Concluded => {}
            Phase::Waiting => {
                if self.board.iter().any(|c| !c.is_empty()) {
                    return Err(InvariantViolation::WaitingWithMarkers);
                }
            }
        }

        if self.phase != Phase::Active && self.turn_holder.is_some() {
            return Err(InvariantViolation::StrayTurnHolder(self.phase));
        }
        if self.phase != Phase::Concluded && self.outcome != Outcome::Undecided {
            return Err(InvariantViolation::PrematureOutcome {
                phase: self.phase,
                outcome: self.outcome,
            });
        }

        let expected = match rules::evaluate_winner(&self.board) {
            Some(marker) => Some(Outcome::Winner(marker)),
            None if rules::is_full(&self.board) => Some(Outcome::Draw),
            None => None,
        };
        match expected {
            Some(expected) if self.outcome != expected => {
                Err(InvariantViolation::OutcomeMismatch {
                    expected,
                    actual: self.outcome,
                })
            }
            None if self.phase == Phase::Concluded => {
                Err(InvariantViolation::ConcludedUndecided)
            }
            _ => Ok(()),
        }
    }

    /// Clears the board and result. Seats are untouched.
    pub(crate) fn clear_round(&mut self) {
        self.board = [Cell::Empty; BOARD_CELLS];
        self.outcome = Outcome::Undecided;
        self.turn_holder = None;
    }
}
