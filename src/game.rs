//! Game state: the falling piece, locked blocks, line clears, scoring and shake.
//!
//! Locked pieces live in the physics world as individual blocks. The
//! occupancy grid is never stored on its own: it is rebuilt from block
//! positions every tick before anything reads it.

use std::time::Duration;

use log::{debug, info, trace};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use rapier2d::prelude::vector;

use crate::block::Block;
use crate::consts::{
    BASE_FALL_SPEED, BORDER_WIDTH, CELL_SIZE, FALL_SPEED_STEP, GRID_HEIGHT, GRID_OFFSET_X,
    GRID_OFFSET_Y, GRID_WIDTH, HARD_DROP_BONUS, LINE_CLEAR_POINTS, LINES_PER_LEVEL, LOCK_BONUS,
    LOCK_DELAY, MIN_FALL_SPEED, SHAKE_DIVISOR, SHAKE_DURATION, SHAKE_FORCE, SHAKE_THRESHOLD,
};
use crate::grid::Grid;
use crate::physics::{BodyHandle, PhysicsWorld};
use crate::tetromino::{Tetromino, TetrominoKind};

/// Where the game is in the fall → lock → spawn cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Falling,
    /// The piece failed to fall; it locks once `elapsed` reaches the lock delay.
    Locking { elapsed: Duration },
    GameOver,
}

/// Points for clearing `rows` rows at `level`. Counts above four score as four.
pub fn line_clear_points(rows: usize, level: u32) -> u32 {
    LINE_CLEAR_POINTS[rows.min(LINE_CLEAR_POINTS.len() - 1)] * level
}

pub fn level_for_lines(lines: u32) -> u32 {
    lines / LINES_PER_LEVEL + 1
}

/// Time between gravity steps of the falling piece.
pub fn fall_speed_for_level(level: u32) -> Duration {
    BASE_FALL_SPEED
        .saturating_sub(FALL_SPEED_STEP * level.saturating_sub(1))
        .max(MIN_FALL_SPEED)
}

#[derive(Debug, Clone, Copy)]
struct Pointer {
    sampled: (f32, f32),
    latest: (f32, f32),
}

pub struct GameState {
    world: PhysicsWorld,
    walls: Vec<BodyHandle>,
    grid: Grid,
    blocks: Vec<Block>,
    current: Tetromino,
    next: TetrominoKind,
    rng: Pcg32,
    phase: Phase,
    pub score: u32,
    pub level: u32,
    pub lines_cleared: u32,
    fall_time: Duration,
    fall_speed: Duration,
    shake_time: Duration,
    pointer: Option<Pointer>,
    pub debug_grid: bool,
    /// Rows removed by the most recent clear, top to bottom.
    last_cleared: Vec<usize>,
    /// Bumped once per lock that removed rows.
    clear_events: u64,
}

impl GameState {
    /// Fresh game on its own physics world; `reset` can then tear down every body.
    pub fn new(seed: u64) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let current = Tetromino::new(random_kind(&mut rng));
        let next = random_kind(&mut rng);
        let mut state = Self {
            world: PhysicsWorld::new(),
            walls: Vec::new(),
            grid: Grid::new(),
            blocks: Vec::new(),
            current,
            next,
            rng,
            phase: Phase::Falling,
            score: 0,
            level: 1,
            lines_cleared: 0,
            fall_time: Duration::ZERO,
            fall_speed: BASE_FALL_SPEED,
            shake_time: Duration::ZERO,
            pointer: None,
            debug_grid: false,
            last_cleared: Vec::new(),
            clear_events: 0,
        };
        state.reset();
        info!("new game, seed {seed}");
        state
    }

    /// Tear down every body this game owns and start over on the same world.
    pub fn reset(&mut self) {
        for block in self.blocks.drain(..) {
            block.destroy(&mut self.world);
        }
        for wall in self.walls.drain(..) {
            self.world.remove_body(wall);
        }
        self.walls = add_boundary(&mut self.world);
        self.grid = Grid::new();
        self.current = Tetromino::new(random_kind(&mut self.rng));
        self.next = random_kind(&mut self.rng);
        self.phase = Phase::Falling;
        self.score = 0;
        self.level = 1;
        self.lines_cleared = 0;
        self.fall_time = Duration::ZERO;
        self.fall_speed = fall_speed_for_level(1);
        self.shake_time = Duration::ZERO;
        self.pointer = None;
        self.last_cleared.clear();
        debug!(
            "board reset: {} bodies / {} colliders, first piece {:?}, next {:?}",
            self.world.body_count(),
            self.world.collider_count(),
            self.current.kind,
            self.next
        );
    }

    /// Advance the game by one frame.
    pub fn tick(&mut self, dt: Duration) {
        if self.is_game_over() {
            return;
        }

        self.world.step(dt.as_secs_f32());
        self.refresh_grid();

        self.shake_time = self.shake_time.saturating_sub(dt);
        self.sample_pointer();

        self.fall_time += dt;
        if self.fall_time >= self.fall_speed {
            self.fall_time = Duration::ZERO;
            if !self.current.try_move(0, 1, &self.grid) && self.phase == Phase::Falling {
                self.phase = Phase::Locking {
                    elapsed: Duration::ZERO,
                };
            }
        }

        if let Phase::Locking { elapsed } = self.phase {
            let elapsed = elapsed + dt;
            if elapsed >= LOCK_DELAY {
                self.lock_and_spawn();
            } else {
                self.phase = Phase::Locking { elapsed };
            }
        }
    }

    pub fn move_left(&mut self) -> bool {
        !self.is_game_over() && self.current.try_move(-1, 0, &self.grid)
    }

    pub fn move_right(&mut self) -> bool {
        !self.is_game_over() && self.current.try_move(1, 0, &self.grid)
    }

    /// One row down. No score and no effect on locking.
    pub fn soft_drop(&mut self) -> bool {
        !self.is_game_over() && self.current.try_move(0, 1, &self.grid)
    }

    pub fn rotate(&mut self) -> bool {
        !self.is_game_over() && self.current.try_rotate(&self.grid)
    }

    /// Drop straight down, then lock at once without waiting for the delay.
    pub fn hard_drop(&mut self) {
        if self.is_game_over() {
            return;
        }
        let mut rows = 0;
        while self.current.try_move(0, 1, &self.grid) {
            rows += 1;
        }
        self.score += rows * HARD_DROP_BONUS;
        debug!("hard drop {:?} by {rows} rows", self.current.kind);
        self.lock_and_spawn();
    }

    pub fn pause(&mut self) {
        debug!("pause requested; not supported, ignoring");
    }

    pub fn toggle_debug(&mut self) {
        if !self.is_game_over() {
            self.debug_grid = !self.debug_grid;
        }
    }

    /// Start shake tracking at `pos` (screen pixels).
    pub fn pointer_down(&mut self, pos: (f32, f32)) {
        self.pointer = Some(Pointer {
            sampled: pos,
            latest: pos,
        });
    }

    pub fn pointer_moved(&mut self, pos: (f32, f32)) {
        if let Some(pointer) = self.pointer.as_mut() {
            pointer.latest = pos;
        }
    }

    pub fn pointer_up(&mut self) {
        self.pointer = None;
    }

    fn sample_pointer(&mut self) {
        let Some(pointer) = self.pointer.as_mut() else {
            return;
        };
        let dx = (pointer.latest.0 - pointer.sampled.0) / SHAKE_DIVISOR;
        let dy = (pointer.latest.1 - pointer.sampled.1) / SHAKE_DIVISOR;
        pointer.sampled = pointer.latest;
        if dx.abs() > SHAKE_THRESHOLD || dy.abs() > SHAKE_THRESHOLD {
            self.apply_shake(dx, dy);
        }
    }

    fn apply_shake(&mut self, dx: f32, dy: f32) {
        let force = vector![dx * SHAKE_FORCE, dy * SHAKE_FORCE];
        for block in &self.blocks {
            self.world.apply_force(block.body(), force);
        }
        self.shake_time = SHAKE_DURATION;
        trace!("shake ({:.0}, {:.0}) on {} blocks", force.x, force.y, self.blocks.len());
    }

    /// Re-derive the occupancy grid from where the blocks are right now.
    fn refresh_grid(&mut self) {
        self.grid = Grid::from_blocks(&mut self.blocks, &self.world);
    }

    fn lock_and_spawn(&mut self) {
        self.lock_piece();
        self.clear_lines();
        self.spawn_piece();
    }

    /// Turn the current piece into blocks and fold its cells into the grid.
    fn lock_piece(&mut self) {
        let kind = self.current.kind;
        for (x, y) in self.current.cells() {
            self.blocks.push(Block::create(&mut self.world, (x, y), kind));
            if x >= 0 && y >= 0 {
                self.grid.set(x as usize, y as usize, Some(kind));
            }
        }
        self.score += LOCK_BONUS;
        debug!(
            "locked {kind:?} at ({}, {}), {} blocks live",
            self.current.x,
            self.current.y,
            self.blocks.len()
        );
    }

    /// Remove every block in a full row, settle the rest, and score. Returns
    /// the number of rows removed.
    fn clear_lines(&mut self) -> usize {
        let full = self.grid.full_rows();
        if full.is_empty() {
            return 0;
        }

        let mut kept = Vec::with_capacity(self.blocks.len());
        for mut block in self.blocks.drain(..) {
            let (_, row) = block.discretize(&self.world);
            if full.contains(&row) {
                block.destroy(&mut self.world);
            } else {
                kept.push(block);
            }
        }
        for block in &kept {
            let row = block.cell().map_or(0, |(_, y)| y);
            let below = full.iter().filter(|&&r| r > row).count();
            if below > 0 {
                block.drop_rows(&mut self.world, below);
            }
        }
        self.blocks = kept;

        let cleared = full.len();
        self.award_lines(cleared);
        debug!(
            "cleared rows {full:?}, score {}, {} cells still occupied",
            self.score,
            self.grid.occupied_count()
        );
        self.last_cleared = full;
        self.clear_events += 1;
        self.refresh_grid();
        cleared
    }

    /// Score `rows` cleared lines at the current level, then level up.
    fn award_lines(&mut self, rows: usize) {
        self.score += line_clear_points(rows, self.level);
        self.lines_cleared += rows as u32;
        let level = level_for_lines(self.lines_cleared);
        if level != self.level {
            info!("level {level}");
        }
        self.level = level;
        self.fall_speed = fall_speed_for_level(level);
    }

    /// Promote the lookahead piece. Overlapping an occupied cell ends the game.
    fn spawn_piece(&mut self) {
        self.current = Tetromino::new(self.next);
        self.next = random_kind(&mut self.rng);
        self.phase = Phase::Falling;

        let blocked = self
            .current
            .cells()
            .iter()
            .any(|&(x, y)| self.grid.is_occupied_signed(x, y));
        if blocked {
            self.phase = Phase::GameOver;
            info!(
                "game over: score {}, level {}, lines {}",
                self.score, self.level, self.lines_cleared
            );
            debug!("final grid: {:?}", self.grid.ids());
        } else {
            debug!("spawned {:?}, next {:?}", self.current.kind, self.next);
        }
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == Phase::GameOver
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_shaking(&self) -> bool {
        !self.shake_time.is_zero()
    }

    pub fn fall_speed(&self) -> Duration {
        self.fall_speed
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn current(&self) -> &Tetromino {
        &self.current
    }

    pub fn next_kind(&self) -> TetrominoKind {
        self.next
    }

    pub fn last_cleared(&self) -> &[usize] {
        &self.last_cleared
    }

    pub fn clear_events(&self) -> u64 {
        self.clear_events
    }
}

fn random_kind(rng: &mut Pcg32) -> TetrominoKind {
    TetrominoKind::ALL[rng.random_range(0..TetrominoKind::ALL.len())]
}

/// Left, right and bottom walls whose inner faces sit on the board edges.
fn add_boundary(world: &mut PhysicsWorld) -> Vec<BodyHandle> {
    let board_w = GRID_WIDTH as f32 * CELL_SIZE;
    let board_h = GRID_HEIGHT as f32 * CELL_SIZE;
    let half_b = BORDER_WIDTH / 2.0;
    let mid_y = GRID_OFFSET_Y + board_h / 2.0;
    let side_half = vector![half_b, board_h / 2.0 + BORDER_WIDTH];
    vec![
        world.add_wall(vector![GRID_OFFSET_X - half_b, mid_y], side_half),
        world.add_wall(vector![GRID_OFFSET_X + board_w + half_b, mid_y], side_half),
        world.add_wall(
            vector![GRID_OFFSET_X + board_w / 2.0, GRID_OFFSET_Y + board_h + half_b],
            vector![board_w / 2.0 + BORDER_WIDTH, half_b],
        ),
    ]
}

#[cfg(test)]
impl GameState {
    fn set_current(&mut self, kind: TetrominoKind) {
        self.current = Tetromino::new(kind);
    }

    fn place_block(&mut self, x: i32, y: i32, kind: TetrominoKind) {
        self.blocks.push(Block::create(&mut self.world, (x, y), kind));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game() -> GameState {
        GameState::new(7)
    }

    fn fill_row(game: &mut GameState, y: i32) {
        for x in 0..GRID_WIDTH as i32 {
            game.place_block(x, y, TetrominoKind::I);
        }
    }

    #[test]
    fn test_new_game_starts_clean() {
        let g = game();
        assert_eq!(g.phase(), Phase::Falling);
        assert_eq!((g.score, g.level, g.lines_cleared), (0, 1, 0));
        assert_eq!(g.fall_speed(), Duration::from_millis(500));
        assert!(g.blocks().is_empty());
        assert_eq!(g.world().body_count(), 3);
        assert_eq!((g.current().x, g.current().y), (5, 1));
    }

    #[test]
    fn test_same_seed_same_pieces() {
        let a = GameState::new(99);
        let b = GameState::new(99);
        assert_eq!(a.current().kind, b.current().kind);
        assert_eq!(a.next_kind(), b.next_kind());
    }

    #[test]
    fn test_line_clear_points_table() {
        assert_eq!(
            [1, 2, 3, 4, 5].map(|n| line_clear_points(n, 1)),
            [40, 100, 300, 1200, 1200]
        );
        assert_eq!(
            [1, 2, 3, 4].map(|n| line_clear_points(n, 3)),
            [120, 300, 900, 3600]
        );
        assert_eq!(line_clear_points(0, 5), 0);
    }

    #[test]
    fn test_award_lines_uses_level_before_update() {
        let mut g = game();
        g.award_lines(4);
        assert_eq!(g.score, 1200);

        let mut g = game();
        g.lines_cleared = 20;
        g.level = level_for_lines(20);
        g.award_lines(2);
        assert_eq!(g.score, 300);
        assert_eq!(g.lines_cleared, 22);
    }

    #[test]
    fn test_level_and_speed_progression() {
        let mut g = game();
        let mut seen = Vec::new();
        for _ in 0..3 {
            for _ in 0..10 {
                g.award_lines(1);
            }
            seen.push((g.level, g.fall_speed()));
        }
        assert_eq!(
            seen,
            vec![
                (2, Duration::from_millis(480)),
                (3, Duration::from_millis(460)),
                (4, Duration::from_millis(440)),
            ]
        );
        assert_eq!(fall_speed_for_level(21), Duration::from_millis(100));
        assert_eq!(fall_speed_for_level(40), Duration::from_millis(100));
    }

    #[test]
    fn test_clearing_rows_three_and_seven() {
        let mut g = game();
        fill_row(&mut g, 3);
        fill_row(&mut g, 7);
        g.place_block(0, 0, TetrominoKind::T);
        g.place_block(1, 5, TetrominoKind::S);
        g.place_block(2, 9, TetrominoKind::Z);
        g.refresh_grid();
        assert_eq!(g.grid().full_rows(), vec![3, 7]);

        assert_eq!(g.clear_lines(), 2);
        assert_eq!(g.blocks().len(), 3);
        assert_eq!(g.world().body_count(), 3 + 3);
        assert_eq!(g.grid().get(0, 2), Some(TetrominoKind::T));
        assert_eq!(g.grid().get(1, 6), Some(TetrominoKind::S));
        assert_eq!(g.grid().get(2, 9), Some(TetrominoKind::Z));
        assert_eq!(g.grid().occupied_count(), 3);
        assert_eq!(g.score, 100);
        assert_eq!(g.lines_cleared, 2);
        assert_eq!(g.last_cleared(), &[3, 7]);
        assert_eq!(g.clear_events(), 1);
    }

    #[test]
    fn test_no_full_rows_is_untouched() {
        let mut g = game();
        g.place_block(4, 19, TetrominoKind::O);
        g.refresh_grid();
        assert_eq!(g.clear_lines(), 0);
        assert_eq!(g.blocks().len(), 1);
        assert_eq!(g.score, 0);
        assert_eq!(g.clear_events(), 0);
    }

    #[test]
    fn test_hard_drop_scores_and_locks() {
        let mut g = game();
        g.set_current(TetrominoKind::O);
        g.hard_drop();
        // O spawns with its top row at 1 and rests with it at 18.
        assert_eq!(g.score, 17 * HARD_DROP_BONUS + LOCK_BONUS);
        assert_eq!(g.blocks().len(), 4);
        for (x, y) in [(5, 18), (6, 18), (5, 19), (6, 19)] {
            assert_eq!(g.grid().get(x, y), Some(TetrominoKind::O));
        }
        assert_eq!(g.phase(), Phase::Falling);
    }

    #[test]
    fn test_hard_drop_discards_lock_delay() {
        let mut g = game();
        g.set_current(TetrominoKind::T);
        g.phase = Phase::Locking {
            elapsed: Duration::from_millis(400),
        };
        g.hard_drop();
        assert_eq!(g.phase(), Phase::Falling);
        assert_eq!(g.blocks().len(), 4);
    }

    #[test]
    fn test_lock_delay_waits_before_locking() {
        let mut g = game();
        g.set_current(TetrominoKind::O);
        while g.soft_drop() {}
        assert!(g.blocks().is_empty());

        let step = Duration::from_millis(250);
        g.tick(step);
        assert_eq!(g.phase(), Phase::Falling);
        g.tick(step);
        assert_eq!(g.phase(), Phase::Locking { elapsed: step });
        assert!(g.blocks().is_empty());
        g.tick(step);
        assert_eq!(g.blocks().len(), 4);
        assert_eq!(g.score, LOCK_BONUS);
        assert_eq!(g.phase(), Phase::Falling);
        assert_eq!((g.current().x, g.current().y), (5, 1));
    }

    #[test]
    fn test_lock_delay_runs_through_repeated_failed_falls() {
        let mut g = game();
        g.fall_speed = fall_speed_for_level(21);
        assert_eq!(g.fall_speed, Duration::from_millis(100));
        g.set_current(TetrominoKind::O);
        while g.soft_drop() {}

        // Every tick retries the fall; the delay keeps counting from the first failure.
        let step = Duration::from_millis(100);
        for n in 1..=4 {
            g.tick(step);
            assert_eq!(g.phase(), Phase::Locking { elapsed: step * n });
            assert!(g.blocks().is_empty());
        }
        g.tick(step);
        assert_eq!(g.blocks().len(), 4);
        assert_eq!(g.phase(), Phase::Falling);
    }

    #[test]
    fn test_soft_drop_does_not_score() {
        let mut g = game();
        assert!(g.soft_drop());
        assert_eq!(g.current().y, 2);
        assert_eq!(g.score, 0);
    }

    #[test]
    fn test_spawn_collision_ends_game_and_freezes() {
        let mut g = game();
        for y in 0..4 {
            for x in 3..=7 {
                g.place_block(x, y, TetrominoKind::Z);
            }
        }
        g.refresh_grid();
        g.spawn_piece();
        assert!(g.is_game_over());

        let before = (g.score, g.current().clone(), g.grid().clone());
        let probe = g.blocks()[0].body();
        let pos = g.world().position(probe);
        g.tick(Duration::from_secs(1));
        assert!(!g.move_left());
        assert!(!g.rotate());
        g.hard_drop();
        assert_eq!((g.score, g.current().clone(), g.grid().clone()), before);
        assert_eq!(g.world().position(probe), pos);
    }

    #[test]
    fn test_reset_tears_down_bodies() {
        let mut g = game();
        g.set_current(TetrominoKind::I);
        g.hard_drop();
        g.place_block(0, 0, TetrominoKind::L);
        assert_eq!(g.world().body_count(), 3 + 5);
        g.reset();
        assert!(g.blocks().is_empty());
        assert_eq!(g.world().body_count(), 3);
        assert_eq!(g.world().collider_count(), 3);
        assert_eq!(g.score, 0);
        assert_eq!(g.grid().occupied_count(), 0);
    }

    #[test]
    fn test_pointer_shake_pushes_blocks() {
        let mut g = game();
        g.place_block(4, 10, TetrominoKind::J);
        let body = g.blocks()[0].body();
        let start = g.world().position(body).map(|p| p.x);

        g.pointer_down((100.0, 100.0));
        g.pointer_moved((200.0, 100.0));
        let dt = Duration::from_millis(16);
        g.tick(dt);
        assert!(g.is_shaking());
        g.tick(dt);
        let after = g.world().position(body).map(|p| p.x);
        assert!(after > start, "{after:?} vs {start:?}");

        // Timer runs out with no further pointer travel.
        for _ in 0..10 {
            g.tick(dt);
        }
        assert!(!g.is_shaking());
    }

    #[test]
    fn test_small_pointer_travel_is_ignored() {
        let mut g = game();
        g.place_block(4, 10, TetrominoKind::J);
        g.pointer_down((100.0, 100.0));
        g.pointer_moved((103.0, 104.0));
        g.tick(Duration::from_millis(16));
        assert!(!g.is_shaking());

        g.pointer_up();
        g.pointer_moved((400.0, 400.0));
        g.tick(Duration::from_millis(16));
        assert!(!g.is_shaking());
    }

    #[test]
    fn test_four_i_pieces_clear_bottom_row() {
        let mut g = game();
        let mut expected = 0;

        // Two horizontal I pieces: columns 0..=3 and 4..=7.
        g.set_current(TetrominoKind::I);
        assert!(g.rotate());
        for _ in 0..4 {
            assert!(g.move_left());
        }
        g.hard_drop();
        expected += 18 * HARD_DROP_BONUS + LOCK_BONUS;

        g.set_current(TetrominoKind::I);
        assert!(g.rotate());
        g.hard_drop();
        expected += 18 * HARD_DROP_BONUS + LOCK_BONUS;
        assert_eq!(g.score, expected);

        // Two vertical I pieces close the row at columns 8 and 9.
        for shift in [3, 4] {
            g.set_current(TetrominoKind::I);
            for _ in 0..shift {
                assert!(g.move_right());
            }
            g.hard_drop();
            expected += 16 * HARD_DROP_BONUS + LOCK_BONUS;
        }
        expected += 40;

        assert_eq!(g.score, expected);
        assert_eq!(g.lines_cleared, 1);
        assert_eq!(g.clear_events(), 1);
        assert_eq!(g.last_cleared(), &[GRID_HEIGHT - 1]);
        assert_eq!(g.blocks().len(), 6);
        assert!(!g.is_game_over());
        for x in 0..GRID_WIDTH {
            let filled = x >= 8;
            assert_eq!(g.grid().is_occupied(x, 19), filled, "column {x}");
            assert_eq!(g.grid().is_occupied(x, 17), filled, "column {x}");
            assert!(!g.grid().is_occupied(x, 16));
        }
    }

    #[test]
    fn test_settled_blocks_discretize_stably() {
        let mut g = game();
        for x in 0..4 {
            g.place_block(x, 19, TetrominoKind::L);
        }
        let dt = Duration::from_millis(16);
        for _ in 0..120 {
            g.world.step(dt.as_secs_f32());
        }
        g.refresh_grid();
        let settled = g.grid().clone();
        for _ in 0..60 {
            g.world.step(dt.as_secs_f32());
            g.refresh_grid();
            assert_eq!(g.grid(), &settled);
        }
        assert_eq!(settled.occupied_count(), 4);
    }
}
