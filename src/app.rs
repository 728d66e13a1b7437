//! App: terminal init, frame loop, key and mouse handling.

use crate::Args;
use crate::consts::MAX_FRAME_DT;
use crate::game::GameState;
use crate::input::{Action, PointerAction, key_to_action, mouse_to_pointer};
use crate::theme::Theme;
use crate::ui::{self, BoardLayout, ClearFlash};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use log::info;
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};

pub struct App {
    theme: Theme,
    state: GameState,
    flash: ClearFlash,
    animate: bool,
    frame_interval: Duration,
    /// Layout of the last drawn frame, for mapping pointer cells to the board.
    layout: Option<BoardLayout>,
}

impl App {
    pub fn new(args: &Args, theme: Theme, seed: u64) -> Self {
        let mut state = GameState::new(seed);
        state.debug_grid = args.debug_grid;
        let animate = !args.no_animation;
        Self {
            theme,
            state,
            flash: ClearFlash::new(animate),
            animate,
            frame_interval: Duration::from_secs_f64(1.0 / args.frame_rate.max(1.0)),
            layout: None,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{DisableMouseCapture, EnableMouseCapture},
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let result = ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))
            .map_err(anyhow::Error::from)
            .and_then(|mut terminal| self.run_loop(&mut terminal));

        // Restore
        let _ = execute!(std::io::stdout(), DisableMouseCapture);
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;
        info!("quit with score {}", self.state.score);
        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let mut last_tick = Instant::now();
        loop {
            let now = Instant::now();
            self.flash.observe(&self.state);
            terminal.draw(|f| {
                self.layout = Some(BoardLayout::new(f.area()));
                ui::draw(f, &self.state, &self.theme, &mut self.flash, now);
            })?;

            let deadline = now + self.frame_interval;
            loop {
                let timeout = deadline.saturating_duration_since(Instant::now());
                if !event::poll(timeout)? {
                    break;
                }
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if !self.apply_action(key_to_action(key)) {
                            return Ok(());
                        }
                    }
                    Event::Mouse(mouse) => {
                        if let Some(pointer) = mouse_to_pointer(mouse) {
                            self.apply_pointer(pointer);
                        }
                    }
                    _ => {}
                }
            }

            let tick_at = Instant::now();
            let dt = tick_at.duration_since(last_tick).min(MAX_FRAME_DT);
            last_tick = tick_at;
            self.state.tick(dt);
        }
    }

    /// Returns false when the player asked to quit.
    fn apply_action(&mut self, action: Action) -> bool {
        match action {
            Action::Quit => return false,
            Action::Restart => {
                self.state.reset();
                self.flash = ClearFlash::new(self.animate);
                self.flash.observe(&self.state);
                info!("restart");
            }
            Action::MoveLeft => {
                self.state.move_left();
            }
            Action::MoveRight => {
                self.state.move_right();
            }
            Action::Rotate => {
                self.state.rotate();
            }
            Action::SoftDrop => {
                self.state.soft_drop();
            }
            Action::HardDrop => self.state.hard_drop(),
            Action::Pause => self.state.pause(),
            Action::ToggleDebug => self.state.toggle_debug(),
            Action::None => {}
        }
        true
    }

    fn apply_pointer(&mut self, pointer: PointerAction) {
        let Some(layout) = self.layout else {
            return;
        };
        match pointer {
            PointerAction::Down(col, row) => {
                self.state.pointer_down(layout.terminal_to_screen(col, row));
            }
            PointerAction::Moved(col, row) => {
                self.state.pointer_moved(layout.terminal_to_screen(col, row));
            }
            PointerAction::Up => self.state.pointer_up(),
        }
    }
}
