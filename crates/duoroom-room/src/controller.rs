//! The session controller: sole writer of one [`GameState`].
//!
//! Every operation that changes the state ends with exactly one
//! [`Replicator::broadcast`] of a full snapshot. Operations that change
//! nothing (illegal moves, early resets, unknown participants) broadcast
//! nothing.
//!
//! The controller is synchronous and single-owner. Serializing access
//! to it is the room actor's job (see [`spawn_room`](crate::room)).

use duoroom_protocol::{
    Marker, Outcome, ParticipantId, Phase, RoomId, StateSnapshot,
};

use crate::{
    GameState, Participant, ParticipantSender, Replicator, RoomConfig,
    RoomError, SEATS, rules,
};

/// Owns one session's state and its outbound fan-out.
#[derive(Debug)]
pub struct SessionController {
    room_id: RoomId,
    config: RoomConfig,
    state: GameState,
    replicator: Replicator,
}

impl SessionController {
    /// A fresh session: empty board, no seats taken, `Waiting`.
    pub fn new(room_id: RoomId, config: RoomConfig) -> Self {
        Self {
            room_id,
            config,
            state: GameState::new(),
            replicator: Replicator::new(),
        }
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Read-only view of the canonical state.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// The state as last broadcast.
    pub fn snapshot(&self) -> StateSnapshot {
        self.state.snapshot(self.replicator.revision())
    }

    /// Seats a participant.
    ///
    /// The newcomer takes the free marker (`X` before `O`), receives a
    /// private welcome, and then everyone receives the new snapshot. The
    /// second admission starts the round with `X` to move.
    ///
    /// # Errors
    /// - [`RoomError::SessionFull`] if both seats are taken.
    /// - [`RoomError::AlreadyInRoom`] if `id` is already seated here.
    pub fn admit(
        &mut self,
        id: ParticipantId,
        requested_name: Option<&str>,
        outbox: ParticipantSender,
    ) -> Result<Participant, RoomError> {
        if self.state.participant(&id).is_some() {
            return Err(RoomError::AlreadyInRoom(id, self.room_id));
        }
        let Some(marker) = self.state.free_marker() else {
            return Err(RoomError::SessionFull(self.room_id));
        };

        let participant = Participant {
            id: id.clone(),
            name: self
                .config
                .display_name(requested_name, self.state.participants.len()),
            marker,
        };
        self.state.participants.push(participant.clone());
        self.replicator.attach(id, outbox);
        self.replicator.welcome(&participant);

        tracing::info!(
            room_id = %self.room_id,
            participant_id = %participant.id,
            name = %participant.name,
            %marker,
            seated = self.state.participants.len(),
            "participant admitted"
        );

        if self.state.participants.len() == SEATS {
            self.start_round();
            tracing::info!(room_id = %self.room_id, "round started");
        }

        self.broadcast();
        Ok(participant)
    }

    /// Unseats a participant. Returns `false` (and does nothing) if `id`
    /// is not seated.
    ///
    /// The remaining participant keeps their marker. With a seat empty
    /// the session falls back to `Waiting` and the board is cleared,
    /// whatever phase it was in.
    pub fn remove(&mut self, id: &ParticipantId) -> bool {
        let Some(index) = self.state.participants.iter().position(|p| &p.id == id)
        else {
            tracing::debug!(
                room_id = %self.room_id,
                participant_id = %id,
                "remove for unknown participant ignored"
            );
            return false;
        };

        self.state.participants.remove(index);
        self.replicator.detach(id);

        tracing::info!(
            room_id = %self.room_id,
            participant_id = %id,
            seated = self.state.participants.len(),
            "participant removed"
        );

        if self.state.participants.len() < SEATS {
            self.state.clear_round();
            self.state.phase = Phase::Waiting;
        }

        self.broadcast();
        true
    }

    /// Places the sender's marker at `position` if the move is legal.
    ///
    /// Illegal moves are dropped without feedback; the next snapshot the
    /// client sees is the truth. Returns whether the move was applied.
    pub fn submit_move(&mut self, id: &ParticipantId, position: i64) -> bool {
        if !rules::is_legal_move(&self.state, id, position) {
            tracing::debug!(
                room_id = %self.room_id,
                participant_id = %id,
                position,
                phase = %self.state.phase,
                "illegal move ignored"
            );
            return false;
        }
        let Some(marker) = self.state.participant(id).map(|p| p.marker) else {
            return false;
        };
        // is_legal_move bounds-checked the position.
        let index = position as usize;

        self.state.board[index] = marker.into();

        if let Some(winner) = rules::evaluate_winner(&self.state.board) {
            self.conclude(Outcome::Winner(winner));
        } else if rules::is_full(&self.state.board) {
            self.conclude(Outcome::Draw);
        } else {
            self.state.turn_holder = self
                .state
                .holder_of(marker.other())
                .map(|p| p.id.clone());
        }

        self.broadcast();
        true
    }

    /// Starts a new round with the same two participants.
    ///
    /// Only valid once the current round has concluded and both seats
    /// are still taken; otherwise a no-op. Returns whether it applied.
    pub fn request_reset(&mut self) -> bool {
        if self.state.phase != Phase::Concluded
            || self.state.participants.len() != SEATS
        {
            tracing::debug!(
                room_id = %self.room_id,
                phase = %self.state.phase,
                "reset ignored"
            );
            return false;
        }

        self.start_round();
        tracing::info!(room_id = %self.room_id, "round reset");
        self.broadcast();
        true
    }

    /// Number of seated participants.
    pub fn seated(&self) -> usize {
        self.state.participants.len()
    }

    fn start_round(&mut self) {
        self.state.clear_round();
        self.state.phase = Phase::Active;
        self.state.turn_holder =
            self.state.holder_of(Marker::X).map(|p| p.id.clone());
    }

    fn conclude(&mut self, outcome: Outcome) {
        self.state.phase = Phase::Concluded;
        self.state.outcome = outcome;
        self.state.turn_holder = None;
        tracing::info!(room_id = %self.room_id, ?outcome, "round concluded");
    }

    fn broadcast(&mut self) {
        debug_assert_eq!(self.state.check_invariants(), Ok(()));
        self.replicator.broadcast(&self.state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duoroom_protocol::{Cell, ServerMessage};
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    type Inbox = UnboundedReceiver<ServerMessage>;

    fn pid(id: &str) -> ParticipantId {
        ParticipantId::from(id)
    }

    fn controller() -> SessionController {
        SessionController::new(RoomId(1), RoomConfig::default())
    }

    fn admit(ctl: &mut SessionController, id: &str, name: &str) -> Inbox {
        let (tx, rx) = mpsc::unbounded_channel();
        ctl.admit(pid(id), Some(name), tx).expect("seat available");
        rx
    }

    /// Alice (X) and Bob (O) seated, round active.
    fn started() -> (SessionController, Inbox, Inbox) {
        let mut ctl = controller();
        let a = admit(&mut ctl, "a", "Alice");
        let b = admit(&mut ctl, "b", "Bob");
        (ctl, a, b)
    }

    fn drain(rx: &mut Inbox) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    fn last_state(rx: &mut Inbox) -> StateSnapshot {
        drain(rx)
            .into_iter()
            .rev()
            .find_map(|m| match m {
                ServerMessage::State(s) => Some(s),
                _ => None,
            })
            .expect("at least one snapshot")
    }

    fn play(ctl: &mut SessionController, moves: &[(&str, i64)]) {
        for (who, pos) in moves {
            assert!(ctl.submit_move(&pid(who), *pos), "{who} -> {pos}");
        }
    }

    #[test]
    fn test_admit_assigns_markers_in_order_and_starts_round() {
        let (ctl, _, _) = started();
        let state = ctl.state();

        assert_eq!(state.participants()[0].marker, Marker::X);
        assert_eq!(state.participants()[1].marker, Marker::O);
        assert_eq!(state.phase(), Phase::Active);
        assert_eq!(state.turn_holder(), Some(&pid("a")));
    }

    #[test]
    fn test_admit_single_participant_stays_waiting() {
        let mut ctl = controller();
        admit(&mut ctl, "a", "Alice");
        assert_eq!(ctl.state().phase(), Phase::Waiting);
        assert_eq!(ctl.state().turn_holder(), None);
    }

    #[test]
    fn test_admit_third_participant_is_session_full() {
        let (mut ctl, _, _) = started();
        let (tx, _rx) = mpsc::unbounded_channel();
        let result = ctl.admit(pid("c"), None, tx);
        assert!(matches!(result, Err(RoomError::SessionFull(RoomId(1)))));
        assert_eq!(ctl.seated(), 2);
    }

    #[test]
    fn test_admit_same_participant_twice_fails() {
        let mut ctl = controller();
        admit(&mut ctl, "a", "Alice");
        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(matches!(
            ctl.admit(pid("a"), None, tx),
            Err(RoomError::AlreadyInRoom(_, _))
        ));
    }

    #[test]
    fn test_admit_sends_welcome_then_state() {
        let mut ctl = controller();
        let mut a = admit(&mut ctl, "a", "Alice");

        let msgs = drain(&mut a);
        assert_eq!(msgs.len(), 2);
        assert_eq!(
            msgs[0],
            ServerMessage::Welcome {
                participant_id: pid("a"),
                marker: Marker::X,
            }
        );
        assert!(matches!(&msgs[1], ServerMessage::State(s) if s.revision == 1));
    }

    #[test]
    fn test_admit_welcome_is_not_broadcast() {
        let mut ctl = controller();
        let mut a = admit(&mut ctl, "a", "Alice");
        drain(&mut a);

        admit(&mut ctl, "b", "Bob");

        let msgs = drain(&mut a);
        assert_eq!(msgs.len(), 1, "only the snapshot: {msgs:?}");
        assert!(matches!(msgs[0], ServerMessage::State(_)));
    }

    #[test]
    fn test_admit_without_name_gets_default() {
        let mut ctl = controller();
        let (tx, _rx) = mpsc::unbounded_channel();
        let p = ctl.admit(pid("a"), None, tx).unwrap();
        assert_eq!(p.name, "Player 1");
    }

    // Scenario: Alice and Bob seated, Alice to move.
    #[test]
    fn test_scenario_admission_activates() {
        let (ctl, mut a, mut b) = started();
        let snap_a = last_state(&mut a);
        let snap_b = last_state(&mut b);

        assert_eq!(snap_a, snap_b);
        assert_eq!(snap_a.phase, Phase::Active);
        assert_eq!(snap_a.turn_holder, Some(pid("a")));
        assert_eq!(snap_a.participants[0].name, "Alice");
        assert_eq!(snap_a.participants[1].name, "Bob");
        assert_eq!(ctl.snapshot(), snap_a);
    }

    // Scenario: X takes the top row.
    #[test]
    fn test_scenario_x_wins_top_row() {
        let (mut ctl, _, mut b) = started();
        play(&mut ctl, &[("a", 0), ("b", 4), ("a", 1), ("b", 5), ("a", 2)]);

        let state = ctl.state();
        assert_eq!(rules::evaluate_winner(state.board()), Some(Marker::X));
        assert_eq!(state.phase(), Phase::Concluded);
        assert_eq!(state.outcome(), Outcome::Winner(Marker::X));
        assert_eq!(state.turn_holder(), None);

        let snap = last_state(&mut b);
        assert_eq!(snap.outcome, Outcome::Winner(Marker::X));
    }

    // Scenario: nine moves, no line.
    #[test]
    fn test_scenario_full_board_is_draw() {
        let (mut ctl, _, _) = started();
        //  X | O | X
        //  X | O | O
        //  O | X | X
        play(
            &mut ctl,
            &[
                ("a", 0),
                ("b", 1),
                ("a", 2),
                ("b", 4),
                ("a", 3),
                ("b", 5),
                ("a", 7),
                ("b", 6),
                ("a", 8),
            ],
        );

        assert!(rules::is_full(ctl.state().board()));
        assert_eq!(ctl.state().phase(), Phase::Concluded);
        assert_eq!(ctl.state().outcome(), Outcome::Draw);
    }

    // Scenario: Bob moves out of turn.
    #[test]
    fn test_scenario_wrong_turn_changes_nothing() {
        let (mut ctl, mut a, mut b) = started();
        drain(&mut a);
        drain(&mut b);
        let before = ctl.state().clone();

        assert!(!ctl.submit_move(&pid("b"), 4));

        assert_eq!(ctl.state(), &before);
        assert!(drain(&mut a).is_empty(), "silent rejection");
        assert!(drain(&mut b).is_empty(), "silent rejection");
    }

    // Scenario: reset after a win.
    #[test]
    fn test_scenario_reset_after_conclusion() {
        let (mut ctl, _, _) = started();
        play(&mut ctl, &[("a", 0), ("b", 4), ("a", 1), ("b", 5), ("a", 2)]);

        assert!(ctl.request_reset());

        let state = ctl.state();
        assert!(state.board().iter().all(|c| c.is_empty()));
        assert_eq!(state.phase(), Phase::Active);
        assert_eq!(state.outcome(), Outcome::Undecided);
        assert_eq!(state.turn_holder(), Some(&pid("a")));
    }

    #[test]
    fn test_reset_ignored_while_active() {
        let (mut ctl, _, _) = started();
        play(&mut ctl, &[("a", 0)]);
        let revision = ctl.snapshot().revision;

        assert!(!ctl.request_reset());

        assert_eq!(ctl.state().board()[0], Cell::X);
        assert_eq!(ctl.snapshot().revision, revision);
    }

    #[test]
    fn test_reset_ignored_while_waiting() {
        let mut ctl = controller();
        admit(&mut ctl, "a", "Alice");
        assert!(!ctl.request_reset());
    }

    #[test]
    fn test_moves_after_conclusion_do_not_touch_board() {
        let (mut ctl, _, _) = started();
        play(&mut ctl, &[("a", 0), ("b", 4), ("a", 1), ("b", 5), ("a", 2)]);
        let board = *ctl.state().board();

        for who in ["a", "b"] {
            for pos in 0..9 {
                assert!(!ctl.submit_move(&pid(who), pos));
            }
        }
        assert_eq!(ctl.state().board(), &board);
    }

    #[test]
    fn test_turn_alternates_and_rejections_keep_turn() {
        let (mut ctl, _, _) = started();
        let attempts: [(&str, i64, bool); 8] = [
            ("a", 4, true),
            ("a", 0, false), // not a's turn
            ("b", 4, false), // occupied
            ("b", 9, false), // out of range
            ("b", -3, false),
            ("b", 0, true),
            ("b", 1, false),
            ("a", 8, true),
        ];
        let mut accepted = 0;
        for (who, pos, ok) in attempts {
            let holder = ctl.state().turn_holder().cloned();
            assert_eq!(ctl.submit_move(&pid(who), pos), ok, "{who} -> {pos}");
            if ok {
                accepted += 1;
                assert_ne!(ctl.state().turn_holder().cloned(), holder);
            } else {
                assert_eq!(ctl.state().turn_holder().cloned(), holder);
            }
            let occupied = ctl.state().board().iter().filter(|c| !c.is_empty()).count();
            assert_eq!(occupied, accepted);
        }
        assert_eq!(ctl.state().board()[4], Cell::X);
        assert_eq!(ctl.state().board()[0], Cell::O);
        assert_eq!(ctl.state().board()[8], Cell::X);
    }

    #[test]
    fn test_remove_first_participant_mid_game_resets_to_waiting() {
        let (mut ctl, _, mut b) = started();
        play(&mut ctl, &[("a", 0), ("b", 4)]);

        assert!(ctl.remove(&pid("a")));

        let state = ctl.state();
        assert_eq!(state.phase(), Phase::Waiting);
        assert!(state.board().iter().all(|c| c.is_empty()));
        assert_eq!(state.turn_holder(), None);
        assert_eq!(state.outcome(), Outcome::Undecided);
        assert_eq!(state.participants().len(), 1);
        assert_eq!(state.participants()[0].marker, Marker::O, "keeps marker");

        let snap = last_state(&mut b);
        assert_eq!(snap.phase, Phase::Waiting);
        assert_eq!(snap.participants.len(), 1);
    }

    #[test]
    fn test_remove_after_conclusion_resets_to_waiting() {
        let (mut ctl, _, _) = started();
        play(&mut ctl, &[("a", 0), ("b", 4), ("a", 1), ("b", 5), ("a", 2)]);

        ctl.remove(&pid("b"));

        assert_eq!(ctl.state().phase(), Phase::Waiting);
        assert_eq!(ctl.state().outcome(), Outcome::Undecided);
    }

    #[test]
    fn test_remove_unknown_is_silent_noop() {
        let (mut ctl, mut a, _) = started();
        drain(&mut a);
        let revision = ctl.snapshot().revision;

        assert!(!ctl.remove(&pid("ghost")));

        assert_eq!(ctl.seated(), 2);
        assert_eq!(ctl.snapshot().revision, revision);
        assert!(drain(&mut a).is_empty());
    }

    #[test]
    fn test_removed_participant_stops_receiving() {
        let (mut ctl, mut a, _) = started();
        ctl.remove(&pid("a"));
        drain(&mut a);

        let (tx, _rx) = mpsc::unbounded_channel();
        ctl.admit(pid("c"), Some("Carol"), tx).unwrap();

        assert!(drain(&mut a).is_empty());
    }

    #[test]
    fn test_readmission_after_departure_fills_free_marker() {
        let (mut ctl, _, _) = started();
        ctl.remove(&pid("a"));

        let (tx, _rx) = mpsc::unbounded_channel();
        let carol = ctl.admit(pid("c"), Some("Carol"), tx).unwrap();

        assert_eq!(carol.marker, Marker::X);
        assert_eq!(ctl.state().phase(), Phase::Active);
        // X always opens, even though Bob was seated first.
        assert_eq!(ctl.state().turn_holder(), Some(&pid("c")));
        assert!(ctl.state().check_invariants().is_ok());
    }

    #[test]
    fn test_every_mutation_broadcasts_once() {
        let (mut ctl, mut a, mut b) = started();
        drain(&mut a);
        drain(&mut b);
        let start = ctl.snapshot().revision;

        play(&mut ctl, &[("a", 0), ("b", 4), ("a", 1), ("b", 5), ("a", 2)]);
        ctl.request_reset();

        let revisions: Vec<u64> = drain(&mut b)
            .into_iter()
            .filter_map(|m| match m {
                ServerMessage::State(s) => Some(s.revision),
                _ => None,
            })
            .collect();
        assert_eq!(revisions, ((start + 1)..=(start + 6)).collect::<Vec<_>>());
    }
}
