//! Fixed gameplay and board constants. Distances are screen pixels.

use std::time::Duration;

/// Width of the logical screen the board is centred in.
pub const SCREEN_WIDTH: f32 = 800.0;

pub const GRID_WIDTH: usize = 10;
pub const GRID_HEIGHT: usize = 20;
pub const CELL_SIZE: f32 = 30.0;
pub const GRID_OFFSET_X: f32 = (SCREEN_WIDTH - GRID_WIDTH as f32 * CELL_SIZE) / 2.0;
pub const GRID_OFFSET_Y: f32 = 40.0;
pub const BORDER_WIDTH: f32 = 4.0;

/// Downward acceleration, px/s².
pub const GRAVITY: f32 = 500.0;
/// Largest physics sub-step, seconds.
pub const SIM_DT: f32 = 1.0 / 120.0;
/// Enough sub-steps to cover `MAX_FRAME_DT` in full.
pub const MAX_SUBSTEPS: u32 = 12;
/// Longest frame the game is allowed to see; slower frames are clamped.
pub const MAX_FRAME_DT: Duration = Duration::from_millis(100);

pub const BLOCK_MASS: f32 = 1.0;
pub const BLOCK_ELASTICITY: f32 = 0.1;
pub const BLOCK_FRICTION: f32 = 0.8;

pub const SHAKE_FORCE: f32 = 2000.0;
pub const SHAKE_DURATION: Duration = Duration::from_millis(100);
/// Pointer travel (px) is divided by this before the threshold test.
pub const SHAKE_DIVISOR: f32 = 10.0;
pub const SHAKE_THRESHOLD: f32 = 0.5;

pub const LOCK_DELAY: Duration = Duration::from_millis(500);
pub const BASE_FALL_SPEED: Duration = Duration::from_millis(500);
pub const FALL_SPEED_STEP: Duration = Duration::from_millis(20);
pub const MIN_FALL_SPEED: Duration = Duration::from_millis(100);

pub const LOCK_BONUS: u32 = 10;
pub const HARD_DROP_BONUS: u32 = 2;
pub const LINES_PER_LEVEL: u32 = 10;
pub const LINE_CLEAR_POINTS: [u32; 5] = [0, 40, 100, 300, 1200];
