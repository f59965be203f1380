//! N-tuple value network.
//!
//! The network is a linear function over a fixed catalogue of 12 nine-cell
//! patterns. Each pattern maps the canonicalised board plus both tile
//! inventories to a single index; the value of a position is the sum of the
//! indexed weight of every pattern, negated when White is to move (weights
//! live in the Black-to-move frame).
//!
//! A pattern has `9^9 * 64` states, far beyond what a dense table can hold
//! for 12 patterns, so weights are kept in per-pattern hash maps with exact
//! `u64` keys. Absent keys read as the uniform prior `0.5 / 12`, which makes
//! a fresh network evaluate the opening to 0.5 (a small first-mover
//! advantage) while only touched states ever occupy memory.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use contrast_core::symmetry;
use contrast_core::{GameState, Player, TileInventory};

use crate::evaluator::Evaluator;

/// Cells per pattern.
pub const PATTERN_CELLS: usize = 9;

/// Size of the compiled pattern catalogue. Part of the model's identity:
/// weight files with any other pattern count are rejected.
pub const NUM_PATTERNS: usize = 12;

/// Distinct joint tile-inventory states (8 per side).
const TILE_STATES: u64 = 64;

/// The pattern catalogue: four 5x2 horizontal bands, six 3x3 squares, a
/// T shape and a diagonal, as linear cell indices into the 5x5 board.
#[rustfmt::skip]
const PATTERNS: [[usize; PATTERN_CELLS]; NUM_PATTERNS] = [
    // Horizontal bands (5x2)
    [0, 1, 2, 3, 4, 5, 6, 7, 8],
    [5, 6, 7, 8, 9, 10, 11, 12, 13],
    [10, 11, 12, 13, 14, 15, 16, 17, 18],
    [15, 16, 17, 18, 19, 20, 21, 22, 23],
    // 3x3 squares
    [0, 1, 2, 5, 6, 7, 10, 11, 12],
    [1, 2, 3, 6, 7, 8, 11, 12, 13],
    [5, 6, 7, 10, 11, 12, 15, 16, 17],
    [6, 7, 8, 11, 12, 13, 16, 17, 18],
    [10, 11, 12, 15, 16, 17, 20, 21, 22],
    [11, 12, 13, 16, 17, 18, 21, 22, 23],
    // T shape and diagonal
    [0, 1, 2, 3, 4, 5, 10, 15, 20],
    [0, 1, 2, 3, 4, 7, 12, 17, 22],
];

/// Encode one side's tile stock into 0..=7.
fn encode_inventory(inv: TileInventory) -> u64 {
    inv.black as u64 + 4 * inv.gray as u64
}

/// One pattern: a fixed subset of board cells.
#[derive(Debug, Clone, Copy)]
pub struct NTuple {
    cells: [usize; PATTERN_CELLS],
}

impl NTuple {
    /// Map a (canonicalised) state to this pattern's weight index: the nine
    /// cell codes folded in base 9, then combined with the 6-bit joint
    /// inventory index.
    pub fn to_index(&self, state: &GameState) -> u64 {
        let mut idx: u64 = 0;
        for &cell in &self.cells {
            idx = idx * 9 + state.board.cell(cell).code() as u64;
        }
        let tiles =
            8 * encode_inventory(state.inventory(Player::Black)) + encode_inventory(state.inventory(Player::White));
        idx * TILE_STATES + tiles
    }

    /// Total distinct states this pattern distinguishes.
    pub fn num_states(&self) -> u64 {
        9u64.pow(PATTERN_CELLS as u32) * TILE_STATES
    }
}

/// Errors from weight-file persistence. A failed load leaves the network
/// exactly as it was.
#[derive(Debug, Error)]
pub enum WeightsError {
    #[error("weight file holds {found} patterns, this network has {expected}")]
    Mismatch { expected: usize, found: u64 },

    #[error("weight file is truncated")]
    Truncated,

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// The linear N-tuple network: the pattern catalogue plus one sparse weight
/// table per pattern.
#[derive(Debug, Clone)]
pub struct NTupleNetwork {
    tuples: Vec<NTuple>,
    weights: Vec<HashMap<u64, f32>>,
    prior: f32,
}

impl NTupleNetwork {
    pub fn new() -> NTupleNetwork {
        let tuples: Vec<NTuple> = PATTERNS.iter().map(|&cells| NTuple { cells }).collect();
        let weights = vec![HashMap::new(); tuples.len()];
        NTupleNetwork {
            prior: 0.5 / tuples.len() as f32,
            tuples,
            weights,
        }
    }

    pub fn num_tuples(&self) -> usize {
        self.tuples.len()
    }

    /// Number of weights that have been touched by learning or loading.
    pub fn num_weights(&self) -> usize {
        self.weights.iter().map(HashMap::len).sum()
    }

    /// Weight of one pattern state, the uniform prior if never touched.
    pub fn weight(&self, pattern: usize, index: u64) -> f32 {
        *self.weights[pattern].get(&index).unwrap_or(&self.prior)
    }

    /// Sum of pattern weights in the raw (Black-to-move) frame.
    fn raw_value(&self, canonical: &GameState) -> f32 {
        self.tuples
            .iter()
            .zip(&self.weights)
            .map(|(tuple, table)| {
                let idx = tuple.to_index(canonical);
                *table.get(&idx).unwrap_or(&self.prior)
            })
            .sum()
    }

    /// Value of a position from the side to move's perspective.
    pub fn evaluate(&self, state: &GameState) -> f32 {
        let canonical = symmetry::canonical_state(state);
        let value = self.raw_value(&canonical);
        if state.to_move == Player::White {
            -value
        } else {
            value
        }
    }

    /// TD(0) update toward `target` (also from the mover's perspective).
    /// The step size is `learning_rate / num_patterns` so the effective
    /// per-state step is invariant to the catalogue size.
    pub fn td_update(&mut self, state: &GameState, target: f32, learning_rate: f32) {
        let canonical = symmetry::canonical_state(state);

        let raw = self.raw_value(&canonical);
        let current = if state.to_move == Player::White {
            -raw
        } else {
            raw
        };

        let mut error = target - current;
        // Back to the raw frame before touching weights
        if state.to_move == Player::White {
            error = -error;
        }

        let step = learning_rate / self.tuples.len() as f32;
        let prior = self.prior;
        for (tuple, table) in self.tuples.iter().zip(self.weights.iter_mut()) {
            let idx = tuple.to_index(&canonical);
            *table.entry(idx).or_insert(prior) += step * error;
        }
    }

    /// Write the weights in the binary format: `u64` pattern count, then per
    /// pattern a `u64` entry count followed by `(u64 index, f32 weight)`
    /// records, all little endian.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), WeightsError> {
        let mut out = BufWriter::new(File::create(path.as_ref())?);

        out.write_all(&(self.tuples.len() as u64).to_le_bytes())?;
        for table in &self.weights {
            out.write_all(&(table.len() as u64).to_le_bytes())?;
            for (&idx, &w) in table {
                out.write_all(&idx.to_le_bytes())?;
                out.write_all(&w.to_le_bytes())?;
            }
        }
        out.flush()?;

        debug!(
            path = %path.as_ref().display(),
            patterns = self.tuples.len(),
            weights = self.num_weights(),
            "saved weights"
        );
        Ok(())
    }

    /// Load weights saved by [`NTupleNetwork::save`]. The pattern count is
    /// checked against the compiled catalogue before anything is replaced;
    /// on any error the network keeps its previous weights.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), WeightsError> {
        let mut input = BufReader::new(File::open(path.as_ref())?);

        let found = read_u64(&mut input)?;
        if found != self.tuples.len() as u64 {
            return Err(WeightsError::Mismatch {
                expected: self.tuples.len(),
                found,
            });
        }

        let mut loaded = Vec::with_capacity(self.tuples.len());
        for _ in 0..self.tuples.len() {
            let entries = read_u64(&mut input)?;
            // Capacity is a hint; a lying header runs into Truncated below
            let mut table = HashMap::with_capacity(entries.min(1 << 20) as usize);
            for _ in 0..entries {
                let idx = read_u64(&mut input)?;
                let weight = read_f32(&mut input)?;
                table.insert(idx, weight);
            }
            loaded.push(table);
        }

        self.weights = loaded;
        debug!(
            path = %path.as_ref().display(),
            weights = self.num_weights(),
            "loaded weights"
        );
        Ok(())
    }
}

impl Default for NTupleNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator for NTupleNetwork {
    fn evaluate(&self, state: &GameState) -> f32 {
        NTupleNetwork::evaluate(self, state)
    }
}

fn read_u64(input: &mut impl Read) -> Result<u64, WeightsError> {
    let mut buf = [0u8; 8];
    read_exact(input, &mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_f32(input: &mut impl Read) -> Result<f32, WeightsError> {
    let mut buf = [0u8; 4];
    read_exact(input, &mut buf)?;
    Ok(f32::from_le_bytes(buf))
}

fn read_exact(input: &mut impl Read, buf: &mut [u8]) -> Result<(), WeightsError> {
    input.read_exact(buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            WeightsError::Truncated
        } else {
            WeightsError::Io(e)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use contrast_core::{Board, TileType, CELL_COUNT};
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("contrast-ntuple-{}-{}", std::process::id(), name));
        path
    }

    #[test]
    fn patterns_cover_nine_valid_cells_each() {
        for pattern in &PATTERNS {
            for &cell in pattern {
                assert!(cell < CELL_COUNT);
            }
        }
        let net = NTupleNetwork::new();
        assert_eq!(net.num_tuples(), NUM_PATTERNS);
        assert_eq!(net.tuples[0].num_states(), 9u64.pow(9) * 64);
    }

    #[test]
    fn fresh_network_evaluates_opening_to_half() {
        let net = NTupleNetwork::new();
        let state = GameState::new();
        assert!((net.evaluate(&state) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn index_depends_only_on_pattern_cells_and_inventories() {
        let net = NTupleNetwork::new();
        let a = GameState::new();

        // Change a cell outside pattern 4 (top-left 3x3): (4, 4) = index 24
        let mut b = a;
        b.board.at_mut(4, 4).occupant = Player::None;

        let tuple = net.tuples[4];
        assert_eq!(tuple.to_index(&a), tuple.to_index(&b));

        // Changing an inventory changes every pattern's index
        let mut c = a;
        c.white_tiles.gray = 0;
        for tuple in &net.tuples {
            assert_ne!(tuple.to_index(&a), tuple.to_index(&c));
        }
    }

    #[test]
    fn index_formula_matches_manual_fold() {
        let net = NTupleNetwork::new();
        let state = GameState::new();
        let tuple = net.tuples[0];

        let mut expected: u64 = 0;
        for &cell in &tuple.cells {
            expected = expected * 9 + state.board.cell(cell).code() as u64;
        }
        // Both sides at full stock: 3 + 4*1 = 7 each
        expected = expected * 64 + (8 * 7 + 7);
        assert_eq!(tuple.to_index(&state), expected);
    }

    #[test]
    fn td_update_moves_value_toward_target() {
        let mut net = NTupleNetwork::new();
        let state = GameState::new();

        let before = net.evaluate(&state);
        net.td_update(&state, 1.0, 0.1);
        let after = net.evaluate(&state);
        assert!(after > before, "{after} should exceed {before}");
        assert!(after < 1.0);

        let mut net = NTupleNetwork::new();
        net.td_update(&state, -1.0, 0.1);
        assert!(net.evaluate(&state) < 0.5);
    }

    #[test]
    fn td_update_converges_under_repetition() {
        let mut net = NTupleNetwork::new();
        let state = GameState::new();
        for _ in 0..200 {
            net.td_update(&state, 1.0, 0.1);
        }
        assert!((net.evaluate(&state) - 1.0).abs() < 0.05);
    }

    #[test]
    fn white_to_move_negates_value() {
        let net = NTupleNetwork::new();
        let mut state = GameState::new();
        state.board.at_mut(1, 1).tile = TileType::Black;

        let as_black = net.evaluate(&state);
        state.to_move = Player::White;
        let as_white = net.evaluate(&state);
        assert!((as_black + as_white).abs() < 1e-6);
    }

    #[test]
    fn white_update_trains_the_raw_frame_consistently() {
        // Teaching White that a position is winning must make the same
        // position look losing for Black.
        let mut net = NTupleNetwork::new();
        let mut state = GameState::new();
        state.to_move = Player::White;

        for _ in 0..100 {
            net.td_update(&state, 1.0, 0.1);
        }
        assert!(net.evaluate(&state) > 0.8);

        state.to_move = Player::Black;
        assert!(net.evaluate(&state) < -0.8);
    }

    #[test]
    fn mirror_positions_evaluate_identically() {
        let mut net = NTupleNetwork::new();

        let mut left = GameState::new();
        left.board.at_mut(1, 2).tile = TileType::Black;
        let mut right = GameState::new();
        right.board.at_mut(3, 2).tile = TileType::Black;

        assert!((net.evaluate(&left) - net.evaluate(&right)).abs() < 1e-6);

        // Training one side of the mirror trains the other
        net.td_update(&left, 1.0, 0.1);
        assert!((net.evaluate(&left) - net.evaluate(&right)).abs() < 1e-6);
    }

    #[test]
    fn save_load_roundtrip() {
        let path = temp_path("roundtrip.bin");
        let state = GameState::new();

        let mut net = NTupleNetwork::new();
        net.td_update(&state, 1.0, 0.1);
        let trained_value = net.evaluate(&state);
        net.save(&path).unwrap();

        let mut restored = NTupleNetwork::new();
        restored.load(&path).unwrap();
        assert_eq!(restored.num_weights(), net.num_weights());
        assert!((restored.evaluate(&state) - trained_value).abs() < 1e-6);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn load_rejects_pattern_count_mismatch_and_keeps_weights() {
        let path = temp_path("mismatch.bin");

        // Forge a file with the wrong pattern count
        {
            let mut out = BufWriter::new(File::create(&path).unwrap());
            out.write_all(&3u64.to_le_bytes()).unwrap();
            for _ in 0..3 {
                out.write_all(&0u64.to_le_bytes()).unwrap();
            }
        }

        let state = GameState::new();
        let mut net = NTupleNetwork::new();
        net.td_update(&state, 1.0, 0.1);
        let before = net.evaluate(&state);

        let err = net.load(&path).unwrap_err();
        assert!(matches!(
            err,
            WeightsError::Mismatch {
                expected: NUM_PATTERNS,
                found: 3
            }
        ));
        assert!((net.evaluate(&state) - before).abs() < 1e-6);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn load_reports_truncation() {
        let path = temp_path("truncated.bin");
        {
            let mut out = BufWriter::new(File::create(&path).unwrap());
            out.write_all(&(NUM_PATTERNS as u64).to_le_bytes()).unwrap();
            out.write_all(&5u64.to_le_bytes()).unwrap();
            // Promised 5 entries, delivered none
        }

        let mut net = NTupleNetwork::new();
        assert!(matches!(
            net.load(&path).unwrap_err(),
            WeightsError::Truncated
        ));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let mut net = NTupleNetwork::new();
        let err = net
            .load(temp_path("does-not-exist.bin"))
            .unwrap_err();
        assert!(matches!(err, WeightsError::Io(_)));
    }

    #[test]
    fn canonicalisation_ignores_board_identity_of_mirror_states() {
        // Directly exercise evaluate on a flipped board: same value, and the
        // same stored weights are touched by updates on either orientation.
        let mut net = NTupleNetwork::new();
        let mut state = GameState::new();
        state.board.at_mut(0, 2).occupant = Player::Black;

        let mut mirror = state;
        mirror.board = Board::empty();
        for x in 0..5 {
            mirror.board.at_mut(x, 0).occupant = Player::Black;
            mirror.board.at_mut(x, 4).occupant = Player::White;
        }
        mirror.board.at_mut(4, 2).occupant = Player::Black;

        net.td_update(&state, 1.0, 0.1);
        let weights_after_first = net.num_weights();
        net.td_update(&mirror, 1.0, 0.1);
        assert_eq!(net.num_weights(), weights_after_first);
    }
}
