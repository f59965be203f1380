//! Legal-move enumeration and terminal tests.
//!
//! Move generation walks the precomputed rays in `move_table`. Along a ray:
//! an empty cell ends the walk and is a destination when it is either the
//! first step or a landing beyond at least one friendly piece (the jump
//! rule); a friendly piece is crossed transparently; an opposing piece stops
//! the ray dead. Each base move is then expanded with every legal tile
//! placement the mover's inventory allows.

use crate::board::{Board, GameState, BOARD_H, BOARD_W};
use crate::move_table;
use crate::types::{Move, Placement, Player, Square, TileType};

/// Enumerate the side to move's legal moves into a reusable buffer.
pub fn legal_moves_into(state: &GameState, out: &mut Vec<Move>) {
    out.clear();

    let me = state.to_move;
    let mut base_moves: Vec<Move> = Vec::new();

    for y in 0..BOARD_H {
        for x in 0..BOARD_W {
            let cell = state.board.at(x, y);
            if cell.occupant != me {
                continue;
            }

            let origin = Board::index(x, y);
            let from = Square::new(x, y);

            for ray in move_table::entry(cell.tile, origin).rays() {
                let mut encountered_friend = false;

                for (step, &offset) in ray.offsets().iter().enumerate() {
                    let target = (origin as i32 + offset as i32) as usize;
                    let dest = state.board.cell(target);

                    if dest.occupant == Player::None {
                        // An empty cell before the first friendly piece is
                        // only reachable adjacently; past one it is a jump
                        // landing at any depth.
                        if encountered_friend || step == 0 {
                            base_moves.push(Move::step(from, Square::from_index(target)));
                        }
                        break;
                    }
                    if dest.occupant == me {
                        encountered_friend = true;
                        continue;
                    }
                    // Opponent blocks both the landing and further jumping
                    break;
                }
            }
        }
    }

    let inventory = state.inventory(me);
    for &base in &base_moves {
        out.push(base);

        for tile in [TileType::Black, TileType::Gray] {
            if inventory.count(tile) == 0 {
                continue;
            }
            for y in 0..BOARD_H {
                for x in 0..BOARD_W {
                    let at = Square::new(x, y);
                    // The target must be empty and tile-free after the motion
                    // resolves: the vacated origin qualifies, the destination
                    // never does.
                    if at == base.to {
                        continue;
                    }
                    let cell = state.board.at(x, y);
                    if cell.tile != TileType::None {
                        continue;
                    }
                    if cell.occupant != Player::None && at != base.from {
                        continue;
                    }
                    out.push(Move {
                        placement: Some(Placement { at, tile }),
                        ..base
                    });
                }
            }
        }
    }
}

/// Enumerate the side to move's legal moves into a fresh list.
pub fn legal_moves(state: &GameState) -> Vec<Move> {
    let mut moves = Vec::new();
    legal_moves_into(state, &mut moves);
    moves
}

/// Whether the side to move has at least one legal move. Equivalent to
/// `!legal_moves(state).is_empty()` without building the list: tile
/// placements only ever multiply base moves, so emptiness is decided by the
/// ray walk alone.
pub fn has_any_move(state: &GameState) -> bool {
    let me = state.to_move;
    for y in 0..BOARD_H {
        for x in 0..BOARD_W {
            let cell = state.board.at(x, y);
            if cell.occupant != me {
                continue;
            }
            let origin = Board::index(x, y);
            for ray in move_table::entry(cell.tile, origin).rays() {
                let mut encountered_friend = false;
                for (step, &offset) in ray.offsets().iter().enumerate() {
                    let target = (origin as i32 + offset as i32) as usize;
                    let dest = state.board.cell(target);
                    if dest.occupant == Player::None {
                        if encountered_friend || step == 0 {
                            return true;
                        }
                        break;
                    }
                    if dest.occupant == me {
                        encountered_friend = true;
                        continue;
                    }
                    break;
                }
            }
        }
    }
    false
}

/// A side wins when any of its pieces stands on its goal rank.
pub fn is_win(state: &GameState, player: Player) -> bool {
    let goal = player.goal_rank();
    (0..BOARD_W).any(|x| state.board.at(x, goal).occupant == player)
}

/// A side loses when it is to move and has no legal move. Loss is always
/// observed from the side to move.
pub fn is_loss(state: &GameState, player: Player) -> bool {
    state.to_move == player && legal_moves(state).is_empty()
}

/// Winner of a finished game, if any: a side on its goal rank, or the
/// opponent of a side to move with no legal reply. `None` while the game is
/// still live.
pub fn winner(state: &GameState) -> Option<Player> {
    if is_win(state, Player::Black) {
        return Some(Player::Black);
    }
    if is_win(state, Player::White) {
        return Some(Player::White);
    }
    if legal_moves(state).is_empty() {
        return Some(state.to_move.opponent());
    }
    None
}
