//! A locked cell: one dynamic body plus its visual identity.

use rapier2d::prelude::{Point, Real, vector};

use crate::consts::{
    BLOCK_ELASTICITY, BLOCK_FRICTION, BLOCK_MASS, CELL_SIZE, GRID_HEIGHT, GRID_OFFSET_X,
    GRID_OFFSET_Y, GRID_WIDTH,
};
use crate::physics::{BodyHandle, PhysicsWorld};
use crate::tetromino::{Rgb, TetrominoKind};

/// Screen-space centre of grid cell (x, y). Accepts cells above the board.
pub fn cell_center(x: i32, y: i32) -> (f32, f32) {
    let half = CELL_SIZE / 2.0;
    (
        GRID_OFFSET_X + x as f32 * CELL_SIZE + half,
        GRID_OFFSET_Y + y as f32 * CELL_SIZE + half,
    )
}

/// Grid cell under a screen position, clamped onto the board.
pub fn screen_to_cell(x: f32, y: f32) -> (usize, usize) {
    let gx = ((x - GRID_OFFSET_X) / CELL_SIZE).floor();
    let gy = ((y - GRID_OFFSET_Y) / CELL_SIZE).floor();
    (
        gx.clamp(0.0, (GRID_WIDTH - 1) as f32) as usize,
        gy.clamp(0.0, (GRID_HEIGHT - 1) as f32) as usize,
    )
}

#[derive(Debug)]
pub struct Block {
    body: BodyHandle,
    pub color: Rgb,
    pub kind: TetrominoKind,
    cell: Option<(usize, usize)>,
}

impl Block {
    /// Register a body centred on `cell`. The caller has already validated the cell.
    pub fn create(world: &mut PhysicsWorld, cell: (i32, i32), kind: TetrominoKind) -> Self {
        Self::with_mass(world, cell, kind, BLOCK_MASS)
    }

    pub fn with_mass(
        world: &mut PhysicsWorld,
        (x, y): (i32, i32),
        kind: TetrominoKind,
        mass: f32,
    ) -> Self {
        let (cx, cy) = cell_center(x, y);
        let half = (CELL_SIZE - 2.0) / 2.0;
        let body = world.add_box(
            vector![cx, cy],
            vector![half, half],
            mass,
            BLOCK_ELASTICITY,
            BLOCK_FRICTION,
        );
        Self {
            body,
            color: kind.color(),
            kind,
            cell: None,
        }
    }

    /// Project the live body position onto the grid and cache the result.
    ///
    /// Bodies knocked outside the board are attributed to the nearest valid
    /// cell rather than dropped.
    pub fn discretize(&mut self, world: &PhysicsWorld) -> (usize, usize) {
        let cell = match world.position(self.body) {
            Some(p) => screen_to_cell(p.x, p.y),
            None => self.cell.unwrap_or((0, 0)),
        };
        self.cell = Some(cell);
        cell
    }

    /// Cell from the last `discretize`, if any.
    pub fn cell(&self) -> Option<(usize, usize)> {
        self.cell
    }

    /// Corners of the body for drawing.
    pub fn vertices(&self, world: &PhysicsWorld) -> Option<[Point<Real>; 4]> {
        world.vertices(self.body)
    }

    pub fn outline_color(&self) -> Rgb {
        self.color.outline()
    }

    /// Teleport the body down by whole rows.
    pub fn drop_rows(&self, world: &mut PhysicsWorld, rows: usize) {
        world.translate(self.body, vector![0.0, rows as f32 * CELL_SIZE]);
    }

    /// Deregister the body. Consumes the block so it cannot outlive its body.
    pub fn destroy(self, world: &mut PhysicsWorld) {
        world.remove_body(self.body);
    }

    pub fn body(&self) -> BodyHandle {
        self.body
    }
}
