//! External encodings: the 29-element state array, textual coordinates and
//! move literals, and the ASCII board rendering.
//!
//! The state array is the canonical wire form of a `GameState`: 25 row-major
//! cell codes followed by the four inventory slots. It does not carry the
//! side to move; callers supply that separately when decoding.
//!
//! Textual squares use files 'a'..'e' for `x = 0..4` and ranks '1'..'5'
//! counted from the bottom, so `y = 5 - rank`. A move literal is
//! `<from>,<to>` optionally followed by a tile token `<file><rank><color>`
//! with color `b`/`B` for a black tile and `g`/`G` for gray.

use thiserror::Error;

use crate::board::{GameState, BOARD_H, BOARD_W, CELL_COUNT};
use crate::types::{Cell, Move, Placement, Player, Square, TileType};

/// Length of the external state array: 25 cells + 4 inventory slots.
pub const STATE_ARRAY_LEN: usize = CELL_COUNT + 4;

/// Errors from decoding external state arrays or textual coordinates.
/// Decoding never mutates on failure; the caller's state is untouched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("state array length must be {STATE_ARRAY_LEN}, got {actual}")]
    ArraySize { actual: usize },

    #[error("{what} out of range: {value}")]
    OutOfRangeCoord { what: &'static str, value: i64 },

    #[error("invalid move literal: {0}")]
    MoveSyntax(String),
}

/// Encode a state as the 29-element array.
pub fn encode_state(state: &GameState) -> [u8; STATE_ARRAY_LEN] {
    let mut out = [0u8; STATE_ARRAY_LEN];
    for i in 0..CELL_COUNT {
        out[i] = state.board.cell(i).code();
    }
    out[25] = state.black_tiles.black;
    out[26] = state.black_tiles.gray;
    out[27] = state.white_tiles.black;
    out[28] = state.white_tiles.gray;
    out
}

/// Decode a 29-element array into a state. The array does not carry the side
/// to move, so it is supplied by the caller.
pub fn decode_state(array: &[u8], to_move: Player) -> Result<GameState, CodecError> {
    if array.len() != STATE_ARRAY_LEN {
        return Err(CodecError::ArraySize {
            actual: array.len(),
        });
    }

    let mut state = GameState::new();
    state.to_move = to_move;

    for (i, &code) in array[..CELL_COUNT].iter().enumerate() {
        *state.board.cell_mut(i) = Cell::from_code(code).ok_or(CodecError::OutOfRangeCoord {
            what: "cell code",
            value: code as i64,
        })?;
    }

    let check = |what: &'static str, value: u8, max: u8| {
        if value > max {
            Err(CodecError::OutOfRangeCoord {
                what,
                value: value as i64,
            })
        } else {
            Ok(value)
        }
    };
    state.black_tiles.black = check("black player's black tiles", array[25], 3)?;
    state.black_tiles.gray = check("black player's gray tiles", array[26], 1)?;
    state.white_tiles.black = check("white player's black tiles", array[27], 3)?;
    state.white_tiles.gray = check("white player's gray tiles", array[28], 1)?;

    Ok(state)
}

/// Parse a square like `a1`. Rank 1 is the bottom row (`y = 4`).
pub fn parse_square(text: &str) -> Result<Square, CodecError> {
    let mut chars = text.chars();
    let (file, rank) = match (chars.next(), chars.next(), chars.next()) {
        (Some(f), Some(r), None) => (f, r),
        _ => {
            return Err(CodecError::MoveSyntax(format!(
                "expected a square like a1, got {text:?}"
            )))
        }
    };

    let x = (file.to_ascii_lowercase() as i64) - ('a' as i64);
    if !(0..BOARD_W as i64).contains(&x) {
        return Err(CodecError::OutOfRangeCoord {
            what: "file",
            value: x,
        });
    }
    let rank = (rank as i64) - ('0' as i64);
    if !(1..=BOARD_H as i64).contains(&rank) {
        return Err(CodecError::OutOfRangeCoord {
            what: "rank",
            value: rank,
        });
    }

    Ok(Square::new(x as usize, BOARD_H - rank as usize))
}

/// Format a square as `a1`..`e5`.
pub fn format_square(square: Square) -> String {
    let file = (b'a' + square.x) as char;
    let rank = BOARD_H - square.y as usize;
    format!("{file}{rank}")
}

/// Parse a move literal `<from>,<to>` with an optional whitespace-separated
/// tile token `<file><rank><color>`.
pub fn parse_move(text: &str) -> Result<Move, CodecError> {
    let mut tokens = text.split_whitespace();
    let motion = tokens
        .next()
        .ok_or_else(|| CodecError::MoveSyntax("empty move".into()))?;
    let tile_token = tokens.next();
    if tokens.next().is_some() {
        return Err(CodecError::MoveSyntax(format!(
            "trailing input in {text:?}"
        )));
    }

    let (from, to) = motion
        .split_once(',')
        .ok_or_else(|| CodecError::MoveSyntax(format!("expected from,to in {motion:?}")))?;
    let from = parse_square(from)?;
    let to = parse_square(to)?;

    let placement = match tile_token {
        None => None,
        Some(token) => {
            if token.len() != 3 || !token.is_ascii() {
                return Err(CodecError::MoveSyntax(format!(
                    "expected tile token like c3g, got {token:?}"
                )));
            }
            let at = parse_square(&token[..2])?;
            let tile = match &token[2..] {
                "b" | "B" => TileType::Black,
                "g" | "G" => TileType::Gray,
                other => {
                    return Err(CodecError::MoveSyntax(format!(
                        "unknown tile color {other:?}"
                    )))
                }
            };
            Some(Placement { at, tile })
        }
    };

    Ok(Move {
        from,
        to,
        placement,
    })
}

/// Format a move as its literal, e.g. `b1,b2` or `b1,b2 c3g`.
pub fn format_move(mv: &Move) -> String {
    let mut out = format!("{},{}", format_square(mv.from), format_square(mv.to));
    if let Some(p) = mv.placement {
        let color = match p.tile {
            TileType::Black => 'b',
            TileType::Gray => 'g',
            TileType::None => '-',
        };
        out.push(' ');
        out.push_str(&format_square(p.at));
        out.push(color);
    }
    out
}

/// Render the board as fixed-width ASCII, rank 5 at the top. Pieces show as
/// `x` (Black) and `o` (White) and take precedence over tiles; a black tile
/// renders as `[ ]`, a gray tile as `( )`.
pub fn board_text(state: &GameState) -> String {
    let mut out = String::new();
    for y in 0..BOARD_H {
        let rank = BOARD_H - y;
        out.push_str(&format!("    {rank:>2}| "));
        for x in 0..BOARD_W {
            let cell = state.board.at(x, y);
            let glyph = match (cell.occupant, cell.tile) {
                (Player::Black, _) => " x ",
                (Player::White, _) => " o ",
                (Player::None, TileType::Black) => "[ ]",
                (Player::None, TileType::Gray) => "( )",
                (Player::None, TileType::None) => "   ",
            };
            out.push_str(glyph);
            if x + 1 < BOARD_W {
                out.push(' ');
            }
        }
        out.push_str(" |\n");
    }
    out.push_str("       ");
    for x in 0..BOARD_W {
        out.push(' ');
        out.push((b'a' + x as u8) as char);
        out.push_str("  ");
    }
    out.push('\n');
    out
}
