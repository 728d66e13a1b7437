//! Tetromino kinds, colours, and the player-controlled piece.

use crate::consts::{GRID_HEIGHT, GRID_WIDTH};
use crate::grid::Grid;

/// 24-bit colour used by the core; the renderer converts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Each channel reduced by `amount`, floored at 0.
    pub fn darken(self, amount: u8) -> Self {
        Self(
            self.0.saturating_sub(amount),
            self.1.saturating_sub(amount),
            self.2.saturating_sub(amount),
        )
    }

    /// Outline colour drawn around a cell of this colour.
    pub fn outline(self) -> Self {
        self.darken(50)
    }
}

/// Tetromino kinds (I, J, L, O, S, T, Z).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TetrominoKind {
    I,
    J,
    L,
    O,
    S,
    T,
    Z,
}

impl TetrominoKind {
    pub const ALL: [Self; 7] = [Self::I, Self::J, Self::L, Self::O, Self::S, Self::T, Self::Z];

    /// Spawn offsets relative to the anchor; y grows downward.
    pub fn offsets(self) -> [(i32, i32); 4] {
        match self {
            Self::I => [(0, 0), (0, -1), (0, 1), (0, 2)],
            Self::J => [(0, 0), (0, -1), (0, 1), (-1, 1)],
            Self::L => [(0, 0), (0, -1), (0, 1), (1, 1)],
            Self::O => [(0, 0), (1, 0), (0, 1), (1, 1)],
            Self::S => [(0, 0), (1, 0), (0, -1), (-1, -1)],
            Self::T => [(0, 0), (-1, 0), (1, 0), (0, 1)],
            Self::Z => [(0, 0), (-1, 0), (0, -1), (1, -1)],
        }
    }

    pub fn color(self) -> Rgb {
        match self {
            Self::I => Rgb(0, 240, 240),
            Self::J => Rgb(0, 0, 240),
            Self::L => Rgb(240, 160, 0),
            Self::O => Rgb(240, 240, 0),
            Self::S => Rgb(0, 240, 0),
            Self::T => Rgb(160, 0, 240),
            Self::Z => Rgb(240, 0, 0),
        }
    }

    /// 1-based id, the value a cell holds in the numeric grid view.
    pub fn id(self) -> u8 {
        match self {
            Self::I => 1,
            Self::J => 2,
            Self::L => 3,
            Self::O => 4,
            Self::S => 5,
            Self::T => 6,
            Self::Z => 7,
        }
    }
}

/// The falling piece. Purely logical until it locks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tetromino {
    pub kind: TetrominoKind,
    offsets: [(i32, i32); 4],
    pub x: i32,
    pub y: i32,
}

impl Tetromino {
    /// New piece of `kind` at the spawn anchor (top centre).
    pub fn new(kind: TetrominoKind) -> Self {
        Self {
            kind,
            offsets: kind.offsets(),
            x: GRID_WIDTH as i32 / 2,
            y: 1,
        }
    }

    #[cfg(test)]
    pub fn offsets(&self) -> &[(i32, i32); 4] {
        &self.offsets
    }

    /// Absolute cells covered at the current anchor.
    pub fn cells(&self) -> [(i32, i32); 4] {
        self.offsets.map(|(dx, dy)| (self.x + dx, self.y + dy))
    }

    /// Shift the anchor by (dx, dy) if every resulting cell is free.
    pub fn try_move(&mut self, dx: i32, dy: i32, grid: &Grid) -> bool {
        let (x, y) = (self.x + dx, self.y + dy);
        if !fits(&self.offsets, x, y, grid) {
            return false;
        }
        self.x = x;
        self.y = y;
        true
    }

    /// Rotate 90° clockwise about the anchor. No kicks: a collision rejects it.
    pub fn try_rotate(&mut self, grid: &Grid) -> bool {
        let rotated = self.offsets.map(|(dx, dy)| (dy, -dx));
        if !fits(&rotated, self.x, self.y, grid) {
            return false;
        }
        self.offsets = rotated;
        true
    }
}

/// Cells above the board (y < 0) only need to be inside the side walls.
fn fits(offsets: &[(i32, i32); 4], x: i32, y: i32, grid: &Grid) -> bool {
    offsets.iter().all(|&(dx, dy)| {
        let (cx, cy) = (x + dx, y + dy);
        if cx < 0 || cx >= GRID_WIDTH as i32 || cy >= GRID_HEIGHT as i32 {
            return false;
        }
        cy < 0 || grid.get(cx as usize, cy as usize).is_none()
    })
}
