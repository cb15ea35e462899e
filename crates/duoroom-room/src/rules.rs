//! Pure rule checks over a board or a whole [`GameState`].
//!
//! Nothing here mutates or performs I/O. The controller decides what to
//! do with the answers.

use duoroom_protocol::{BOARD_CELLS, Board, Marker, ParticipantId, Phase};

use crate::GameState;

/// The eight winning triples, in the order they are checked:
/// rows top to bottom, columns left to right, then the two diagonals.
pub const WINNING_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// Returns the marker that fills a winning triple, if any.
///
/// When several triples match (unreachable through legal play) the first
/// one in [`WINNING_LINES`] order wins.
pub fn evaluate_winner(board: &Board) -> Option<Marker> {
    WINNING_LINES.iter().find_map(|&[a, b, c]| {
        let marker = board[a].marker()?;
        (board[b] == board[a] && board[c] == board[a]).then_some(marker)
    })
}

/// Returns `true` if no cell is empty.
pub fn is_full(board: &Board) -> bool {
    board.iter().all(|cell| !cell.is_empty())
}

/// Returns `true` if `participant` may place a marker at `position` now.
///
/// Requires an active round, the caller to hold the turn, a position in
/// `0..9` and an empty target cell.
pub fn is_legal_move(
    state: &GameState,
    participant: &ParticipantId,
    position: i64,
) -> bool {
    if state.phase() != Phase::Active {
        return false;
    }
    if state.turn_holder() != Some(participant) {
        return false;
    }
    let Ok(index) = usize::try_from(position) else {
        return false;
    };
    index < BOARD_CELLS && state.board()[index].is_empty()
}
