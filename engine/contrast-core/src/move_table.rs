//! Precomputed move-generation table.
//!
//! For each `(tile kind, origin cell)` pair the table stores the rays a piece
//! standing there may travel: per direction, the ordered linear-index offsets
//! of the cells reached at step 1, 2, 3, ... until the board edge. Direction
//! counts match the tile kinds: no tile moves along the 4 orthogonals, a
//! black tile along the 4 diagonals, a gray tile along all 8. A direction
//! flush against the edge keeps a zero-step ray.
//!
//! The table encodes geometry only, never occupancy. It is built once on
//! first use and read-only afterwards, so it is shared freely across threads.

use once_cell::sync::Lazy;

use crate::board::{BOARD_H, BOARD_W, CELL_COUNT};
use crate::types::TileType;

/// One direction's walk from a fixed origin: cumulative offsets from the
/// origin's linear index, in step order.
#[derive(Debug, Clone)]
pub struct Ray {
    offsets: Vec<i8>,
}

impl Ray {
    #[inline]
    pub fn offsets(&self) -> &[i8] {
        &self.offsets
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

/// All rays available from one `(tile, origin)` key.
#[derive(Debug, Clone)]
pub struct TableEntry {
    rays: Vec<Ray>,
}

impl TableEntry {
    #[inline]
    pub fn rays(&self) -> &[Ray] {
        &self.rays
    }
}

const ORTHOGONAL: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const DIAGONAL: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

fn directions_for(tile: TileType) -> &'static [(i32, i32)] {
    const ALL: [(i32, i32); 8] = [
        (1, 0),
        (-1, 0),
        (0, 1),
        (0, -1),
        (1, 1),
        (1, -1),
        (-1, 1),
        (-1, -1),
    ];
    match tile {
        TileType::None => &ORTHOGONAL,
        TileType::Black => &DIAGONAL,
        TileType::Gray => &ALL,
    }
}

fn build_table() -> Vec<TableEntry> {
    let tiles = [TileType::None, TileType::Black, TileType::Gray];
    let mut table = Vec::with_capacity(tiles.len() * CELL_COUNT);

    for tile in tiles {
        for origin in 0..CELL_COUNT {
            let ox = (origin % BOARD_W) as i32;
            let oy = (origin / BOARD_W) as i32;
            let rays = directions_for(tile)
                .iter()
                .map(|&(dx, dy)| {
                    let mut offsets = Vec::new();
                    let (mut x, mut y) = (ox + dx, oy + dy);
                    while (0..BOARD_W as i32).contains(&x) && (0..BOARD_H as i32).contains(&y) {
                        let target = y * BOARD_W as i32 + x;
                        offsets.push((target - origin as i32) as i8);
                        x += dx;
                        y += dy;
                    }
                    Ray { offsets }
                })
                .collect();
            table.push(TableEntry { rays });
        }
    }

    table
}

// Flat layout keyed by tile * CELL_COUNT + origin.
static MOVE_TABLE: Lazy<Vec<TableEntry>> = Lazy::new(build_table);

/// Table entry for a piece with the given tile under it at `origin`.
#[inline]
pub fn entry(tile: TileType, origin: usize) -> &'static TableEntry {
    &MOVE_TABLE[tile as usize * CELL_COUNT + origin]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;

    #[test]
    fn direction_counts_per_tile() {
        for origin in 0..CELL_COUNT {
            assert_eq!(entry(TileType::None, origin).rays().len(), 4);
            assert_eq!(entry(TileType::Black, origin).rays().len(), 4);
            assert_eq!(entry(TileType::Gray, origin).rays().len(), 8);
        }
    }

    #[test]
    fn corner_rays_are_bounded_by_edge_distance() {
        // From (0, 0) no ray can exceed 4 steps, and the inward orthogonals
        // reach exactly 4 cells while the outward ones are empty.
        let e = entry(TileType::None, 0);
        let lengths: Vec<usize> = e.rays().iter().map(Ray::len).collect();
        assert_eq!(lengths, vec![4, 0, 4, 0]);

        for origin in 0..CELL_COUNT {
            for tile in [TileType::None, TileType::Black, TileType::Gray] {
                for ray in entry(tile, origin).rays() {
                    assert!(ray.len() <= BOARD_W.max(BOARD_H) - 1);
                }
            }
        }
    }

    #[test]
    fn offsets_stay_on_board_and_on_line() {
        // Every offset must land on the board, and consecutive steps of a
        // ray must stay on the same file, rank or diagonal; this is what
        // makes the table safe to walk without bounds checks.
        for tile in [TileType::None, TileType::Black, TileType::Gray] {
            for origin in 0..CELL_COUNT {
                let ox = (origin % BOARD_W) as i32;
                let oy = (origin / BOARD_W) as i32;
                for ray in entry(tile, origin).rays() {
                    for (step, &off) in ray.offsets().iter().enumerate() {
                        let target = origin as i32 + off as i32;
                        assert!((0..CELL_COUNT as i32).contains(&target));
                        let tx = target % BOARD_W as i32;
                        let ty = target / BOARD_W as i32;
                        let k = step as i32 + 1;
                        assert_eq!((tx - ox).abs().max((ty - oy).abs()), k);
                    }
                }
            }
        }
    }

    #[test]
    fn center_gray_covers_all_neighbours() {
        let origin = Board::index(2, 2);
        let first_steps: Vec<i32> = entry(TileType::Gray, origin)
            .rays()
            .iter()
            .filter(|r| !r.is_empty())
            .map(|r| origin as i32 + r.offsets()[0] as i32)
            .collect();
        assert_eq!(first_steps.len(), 8);
        for (dx, dy) in [
            (1, 0),
            (-1, 0),
            (0, 1),
            (0, -1),
            (1, 1),
            (1, -1),
            (-1, 1),
            (-1, -1),
        ] {
            let neighbour = (2 + dy) * BOARD_W as i32 + (2 + dx);
            assert!(first_steps.contains(&neighbour));
        }
    }
}
