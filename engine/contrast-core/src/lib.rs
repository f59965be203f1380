//! Core rules engine for Contrast, a two-player abstract board game on a
//! 5x5 grid with directional tiles.
//!
//! This crate provides the pieces every other component builds on:
//! - `types` / `board`: players, tiles, cells, inventories, moves, `GameState`
//! - `move_table`: precomputed per-(tile, origin) rays for move generation
//! - `rules`: legal-move enumeration, move application, terminal tests
//! - `symmetry`: horizontal-flip canonicalisation of boards
//! - `codec`: the 29-element state array, textual coordinates and move
//!   literals, and the ASCII board rendering

pub mod board;
pub mod codec;
pub mod move_table;
pub mod rules;
pub mod symmetry;
pub mod types;

// Re-export main types for convenience
pub use board::{Board, GameState, BOARD_H, BOARD_W, CELL_COUNT};
pub use codec::{CodecError, STATE_ARRAY_LEN};
pub use types::{Cell, Move, Placement, Player, Square, TileInventory, TileType};
