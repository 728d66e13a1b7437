//! Layout and drawing: board raster, next preview, stats, controls, game over, clear flash.

use crate::consts::{CELL_SIZE, GRID_HEIGHT, GRID_OFFSET_X, GRID_OFFSET_Y, GRID_WIDTH};
use crate::game::{GameState, Phase};
use crate::raster::Raster;
use crate::tetromino::{Rgb, TetrominoKind};
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

pub const SIDEBAR_WIDTH: u16 = 24;

/// Duration of the white flash over cleared rows.
const LINE_CLEAR_FADE_MS: u32 = 350;

/// Next preview: small grid.
const NEXT_MINI_CELL_W: u16 = 2;
const NEXT_MINI_CELL_H: u16 = 1;

const CONTROLS: [(&str, &str); 8] = [
    ("←/→ h/l", "Move"),
    ("↑ k", "Rotate"),
    ("↓ j", "Soft drop"),
    ("Space", "Hard drop"),
    ("P", "Pause"),
    ("R", "Restart"),
    ("D", "Debug grid"),
    ("Mouse drag", "Shake"),
];

impl From<Rgb> for Color {
    fn from(Rgb(r, g, b): Rgb) -> Self {
        Color::Rgb(r, g, b)
    }
}

/// Board outer size in terminal cells (border included) at `scale`.
fn board_outer_size(scale: u16) -> (u16, u16) {
    (
        GRID_WIDTH as u16 * 2 * scale + 2,
        GRID_HEIGHT as u16 * scale + 2,
    )
}

/// Largest board scale (1 or 2) whose board plus sidebar fits the terminal.
pub fn board_scale(term_cols: u16, term_rows: u16) -> u16 {
    let (w, h) = board_outer_size(2);
    if w + SIDEBAR_WIDTH <= term_cols && h <= term_rows {
        2
    } else {
        1
    }
}

/// Where the board and sidebar sit on screen for a given terminal area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardLayout {
    /// Board including its border.
    pub outer: Rect,
    /// Board cells only.
    pub inner: Rect,
    pub sidebar: Rect,
    /// Each grid cell is `2 * scale` columns by `scale` rows.
    pub scale: u16,
}

impl BoardLayout {
    pub fn new(area: Rect) -> Self {
        let scale = board_scale(area.width, area.height);
        let (pw, ph) = board_outer_size(scale);
        let total_w = pw + SIDEBAR_WIDTH;

        let horiz = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Fill(1),
                Constraint::Length(total_w),
                Constraint::Fill(1),
            ])
            .split(area);
        let vert = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Fill(1),
                Constraint::Length(ph),
                Constraint::Fill(1),
            ])
            .split(horiz[1]);
        let split = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(pw), Constraint::Length(SIDEBAR_WIDTH)])
            .split(vert[1]);

        let outer = split[0];
        let inner = Block::default().borders(Borders::ALL).inner(outer);
        Self {
            outer,
            inner,
            sidebar: split[1],
            scale,
        }
    }

    /// Raster pixels per grid cell, both axes.
    fn pixels_per_cell(&self) -> f32 {
        2.0 * f32::from(self.scale)
    }

    /// Screen pixels to raster pixels.
    fn to_raster(&self, x: f32, y: f32) -> (f32, f32) {
        let ppc = self.pixels_per_cell();
        (
            (x - GRID_OFFSET_X) / CELL_SIZE * ppc,
            (y - GRID_OFFSET_Y) / CELL_SIZE * ppc,
        )
    }

    /// Centre of terminal cell (col, row) in screen pixels. Works outside the board too.
    pub fn terminal_to_screen(&self, col: u16, row: u16) -> (f32, f32) {
        let s = f32::from(self.scale);
        let cx = (f32::from(col) - f32::from(self.inner.x) + 0.5) / (2.0 * s);
        let cy = (f32::from(row) - f32::from(self.inner.y) + 0.5) / s;
        (GRID_OFFSET_X + cx * CELL_SIZE, GRID_OFFSET_Y + cy * CELL_SIZE)
    }

    /// Terminal rows covering grid row `y`.
    fn grid_row_span(&self, y: usize) -> std::ops::Range<u16> {
        let top = self.inner.y + y as u16 * self.scale;
        top..top + self.scale
    }
}

/// White fade over the rows removed by the latest clear.
pub struct ClearFlash {
    enabled: bool,
    seen: u64,
    rows: Vec<usize>,
    effect: Option<Effect>,
    last_frame: Option<Instant>,
}

impl ClearFlash {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            seen: 0,
            rows: Vec::new(),
            effect: None,
            last_frame: None,
        }
    }

    /// Pick up a clear the game reported since the last frame.
    pub fn observe(&mut self, state: &GameState) {
        if state.clear_events() == self.seen {
            return;
        }
        self.seen = state.clear_events();
        if self.enabled {
            self.rows = state.last_cleared().to_vec();
            self.effect = None;
            self.last_frame = None;
        }
    }

    fn render(&mut self, frame: &mut Frame, layout: &BoardLayout, now: Instant) {
        if self.rows.is_empty() {
            return;
        }
        let delta = self
            .last_frame
            .map(|t| now.saturating_duration_since(t))
            .unwrap_or_default();
        let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
        self.last_frame = Some(now);

        if self.effect.is_none() {
            let rows: HashSet<u16> = self
                .rows
                .iter()
                .flat_map(|&y| layout.grid_row_span(y))
                .collect();
            let filter = CellFilter::PositionFn(ref_count(move |pos: Position| rows.contains(&pos.y)));
            let effect = fx::fade_from(
                Color::White,
                Color::White,
                (LINE_CLEAR_FADE_MS, Interpolation::Linear),
            )
            .with_filter(filter)
            .with_area(layout.inner);
            self.effect = Some(effect);
        }

        if let Some(effect) = self.effect.as_mut() {
            frame.render_effect(effect, layout.inner, TfxDuration::from_millis(delta_ms));
            if effect.done() {
                self.effect = None;
                self.rows.clear();
            }
        }
    }
}

/// Draw one frame of the game.
pub fn draw(frame: &mut Frame, state: &GameState, theme: &Theme, flash: &mut ClearFlash, now: Instant) {
    let area = frame.area();
    Block::default()
        .style(Style::default().bg(theme.bg))
        .render(area, frame.buffer_mut());

    let layout = BoardLayout::new(area);
    draw_board(frame, state, theme, &layout);
    flash.render(frame, &layout, now);
    draw_sidebar(frame, state, theme, layout.sidebar);
    if state.is_game_over() {
        draw_game_over(frame, state, theme, layout.outer);
    }
}

fn draw_board(frame: &mut Frame, state: &GameState, theme: &Theme, layout: &BoardLayout) {
    let title = if state.is_shaking() {
        Span::styled(" Shaketris ~ shake! ", Style::default().fg(theme.title).bold())
    } else if matches!(state.phase(), Phase::Locking { .. }) {
        Span::styled(" Shaketris ~ locking ", Style::default().fg(theme.inactive_fg))
    } else {
        Span::styled(" Shaketris ", theme.title)
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border).bg(theme.bg))
        .title(title)
        .render(layout.outer, frame.buffer_mut());

    let raster = rasterize(state, theme, layout);
    raster.render(layout.inner, frame.buffer_mut());
}

/// Paint the board: cell grid, block polygons, debug overlay, then the falling piece.
fn rasterize(state: &GameState, theme: &Theme, layout: &BoardLayout) -> Raster {
    let ppc = layout.pixels_per_cell() as usize;
    let mut raster = Raster::new(GRID_WIDTH * ppc, GRID_HEIGHT * ppc, theme.board_bg);
    let edge = if layout.scale >= 2 { 1.0 } else { 0.0 };

    for y in 0..GRID_HEIGHT {
        for x in (0..GRID_WIDTH).filter(|x| (x + y) % 2 == 1) {
            raster.fill_rect(x * ppc, y * ppc, (x + 1) * ppc, (y + 1) * ppc, theme.grid);
        }
    }

    for block in state.blocks() {
        let Some(vertices) = block.vertices(state.world()) else {
            continue;
        };
        let quad = vertices.map(|p| layout.to_raster(p.x, p.y));
        raster.fill_quad(quad, block.color.into(), block.outline_color().into(), edge);
    }

    // Hatched on top of the blocks so drift between body and cell stays visible.
    if state.debug_grid {
        for (y, row) in state.grid().rows().enumerate() {
            for x in (0..GRID_WIDTH).filter(|&x| row[x].is_some()) {
                for py in y * ppc..(y + 1) * ppc {
                    for px in (x * ppc..(x + 1) * ppc).filter(|px| (px + py) % 2 == 0) {
                        raster.set(px, py, theme.debug_cell);
                    }
                }
            }
        }
    }

    if !state.is_game_over() {
        let piece = state.current();
        let color = piece.kind.color();
        for (x, y) in piece.cells() {
            if x < 0 || y < 0 || x >= GRID_WIDTH as i32 || y >= GRID_HEIGHT as i32 {
                continue;
            }
            let (px, py) = (x as f32 * ppc as f32, y as f32 * ppc as f32);
            let side = ppc as f32;
            raster.fill_quad(
                [(px, py), (px + side, py), (px + side, py + side), (px, py + side)],
                color.into(),
                color.outline().into(),
                edge,
            );
        }
    }
    raster
}

fn draw_sidebar(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let border_style = Style::default().fg(theme.border).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // Next (border + title + preview)
            Constraint::Length(1), // gap
            Constraint::Length(6), // Stats
            Constraint::Length(1), // gap
            Constraint::Length(CONTROLS.len() as u16 + 2),
        ])
        .split(area);

    // --- Next ---
    let next_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let next_inner = next_block.inner(chunks[0]);
    next_block.render(chunks[0], frame.buffer_mut());
    let next_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(4)])
        .split(next_inner);
    Paragraph::new(Line::from(Span::styled("Next", title_style)))
        .render(next_layout[0], frame.buffer_mut());
    draw_piece_preview(frame, next_layout[1], state.next_kind());

    // --- Stats ---
    let stats_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let stats_inner = stats_block.inner(chunks[2]);
    stats_block.render(chunks[2], frame.buffer_mut());
    let stat = |label: &'static str, value: u32| {
        Line::from(vec![
            Span::styled(label, title_style),
            Span::styled(value.to_string(), fg_style),
        ])
    };
    Paragraph::new(Text::from(vec![
        stat("Score: ", state.score),
        stat("Level: ", state.level),
        stat("Lines: ", state.lines_cleared),
        Line::from(vec![
            Span::styled("Speed: ", title_style),
            Span::styled(format!("{}ms", state.fall_speed().as_millis()), fg_style),
        ]),
    ]))
    .render(stats_inner, frame.buffer_mut());

    // --- Controls ---
    let help_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Span::styled(" Controls ", title_style));
    let help_inner = help_block.inner(chunks[4]);
    help_block.render(chunks[4], frame.buffer_mut());
    let help: Vec<Line> = CONTROLS
        .iter()
        .map(|(key, what)| {
            Line::from(vec![
                Span::styled(format!("{key:<11}"), fg_style),
                Span::styled(*what, Style::default().fg(theme.inactive_fg)),
            ])
        })
        .collect();
    Paragraph::new(help).render(help_inner, frame.buffer_mut());
}

/// Draw a piece's spawn shape centred in `area`.
fn draw_piece_preview(frame: &mut Frame, area: Rect, kind: TetrominoKind) {
    let offsets = kind.offsets();
    let (dx_lo, dy_lo) = offsets
        .iter()
        .fold((i32::MAX, i32::MAX), |(ax, ay), &(dx, dy)| (ax.min(dx), ay.min(dy)));
    let (dx_hi, dy_hi) = offsets
        .iter()
        .fold((i32::MIN, i32::MIN), |(ax, ay), &(dx, dy)| (ax.max(dx), ay.max(dy)));

    let bw = (dx_hi - dx_lo + 1) as u16;
    let bh = (dy_hi - dy_lo + 1) as u16;
    let off_x = area.width.saturating_sub(bw * NEXT_MINI_CELL_W) / 2;
    let off_y = area.height.saturating_sub(bh * NEXT_MINI_CELL_H) / 2;

    let color: Color = kind.color().into();
    for (dx, dy) in offsets {
        let r = Rect {
            x: area.x + off_x + (dx - dx_lo) as u16 * NEXT_MINI_CELL_W,
            y: area.y + off_y + (dy - dy_lo) as u16 * NEXT_MINI_CELL_H,
            width: NEXT_MINI_CELL_W,
            height: NEXT_MINI_CELL_H,
        }
        .intersection(area);
        Paragraph::new("██")
            .style(Style::default().fg(color))
            .render(r, frame.buffer_mut());
    }
}

fn draw_game_over(frame: &mut Frame, state: &GameState, theme: &Theme, board: Rect) {
    let popup_w = 26u16;
    let popup_h = 8u16;
    let popup = Rect {
        x: board.x + board.width.saturating_sub(popup_w) / 2,
        y: board.y + board.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(board.width),
        height: popup_h.min(board.height),
    };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " GAME OVER ",
            Style::default().fg(Color::White).bg(Color::Red).bold(),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!("Final Score: {}", state.score),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Press R to restart",
            Style::default().fg(theme.inactive_fg),
        )),
    ];
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.border))
                .style(Style::default().bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}
