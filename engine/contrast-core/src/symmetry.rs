//! Horizontal-flip canonicalisation.
//!
//! The only symmetry the learner exploits is the left-right mirror
//! (`x -> 4 - x`). A board's canonical form is the lexicographically smaller
//! of the board and its mirror when read as the 25 cell codes; ties keep the
//! identity. Tile inventories are player-attached, not position-attached, so
//! canonicalisation never touches them.

use crate::board::{Board, GameState, BOARD_H, BOARD_W};

/// Mirror a board across the vertical axis.
pub fn flip_horizontal(board: &Board) -> Board {
    let mut flipped = *board;
    for y in 0..BOARD_H {
        for x in 0..BOARD_W {
            *flipped.at_mut(x, y) = board.at(BOARD_W - 1 - x, y);
        }
    }
    flipped
}

/// Lexicographically smaller of {board, mirrored board} over the cell codes.
pub fn canonical(board: &Board) -> Board {
    let flipped = flip_horizontal(board);
    for i in 0..board.cells().len() {
        let a = board.cell(i).code();
        let b = flipped.cell(i).code();
        if a < b {
            return *board;
        }
        if b < a {
            return flipped;
        }
    }
    *board
}

/// The state with its board canonicalised; side to move and inventories are
/// carried over unchanged.
pub fn canonical_state(state: &GameState) -> GameState {
    GameState {
        board: canonical(&state.board),
        ..*state
    }
}
