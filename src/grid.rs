//! Occupancy grid derived from live block positions.

use crate::block::Block;
use crate::consts::{GRID_HEIGHT, GRID_WIDTH};
use crate::physics::PhysicsWorld;
use crate::tetromino::TetrominoKind;

/// GRID_HEIGHT × GRID_WIDTH cells; row 0 is the top of the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    cells: [[Option<TetrominoKind>; GRID_WIDTH]; GRID_HEIGHT],
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

impl Grid {
    pub fn new() -> Self {
        Self {
            cells: [[None; GRID_WIDTH]; GRID_HEIGHT],
        }
    }

    /// Rebuild from scratch. Blocks sharing a cell: the later one in `blocks` wins.
    pub fn from_blocks(blocks: &mut [Block], world: &PhysicsWorld) -> Self {
        let mut grid = Self::new();
        for block in blocks.iter_mut() {
            let (x, y) = block.discretize(world);
            grid.cells[y][x] = Some(block.kind);
        }
        grid
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<TetrominoKind> {
        self.cells.get(y).and_then(|row| row.get(x)).copied().flatten()
    }

    /// Write a cell; out-of-range coordinates are ignored.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: Option<TetrominoKind>) {
        if let Some(cell) = self.cells.get_mut(y).and_then(|row| row.get_mut(x)) {
            *cell = value;
        }
    }

    pub fn is_occupied(&self, x: usize, y: usize) -> bool {
        self.get(x, y).is_some()
    }

    /// True if (x, y) lies on the board and holds a block. Off-board is false.
    pub fn is_occupied_signed(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && self.is_occupied(x as usize, y as usize)
    }

    pub fn row_is_full(&self, y: usize) -> bool {
        self.cells
            .get(y)
            .is_some_and(|row| row.iter().all(Option::is_some))
    }

    /// Indices of full rows, top to bottom.
    pub fn full_rows(&self) -> Vec<usize> {
        (0..GRID_HEIGHT).filter(|&y| self.row_is_full(y)).collect()
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.is_some()).count()
    }

    /// Numeric view: 0 = empty, 1..=7 = tetromino id.
    pub fn ids(&self) -> [[u8; GRID_WIDTH]; GRID_HEIGHT] {
        self.cells
            .map(|row| row.map(|cell| cell.map_or(0, TetrominoKind::id)))
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Option<TetrominoKind>; GRID_WIDTH]> {
        self.cells.iter()
    }
}
