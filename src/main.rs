//! Shaketris: a falling-block puzzle in the terminal where locked pieces turn into rigid bodies.

mod app;
mod block;
mod consts;
mod game;
mod grid;
mod input;
mod physics;
mod raster;
mod tetromino;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use log::{info, warn};
use std::fs::File;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;
    let theme = theme::Theme::load(args.theme.as_deref()).unwrap_or_else(|e| {
        warn!("theme not loaded ({e}), using defaults");
        theme::Theme::default()
    });
    let seed = args.seed.unwrap_or_else(rand::random);
    info!(
        "starting: seed {seed}, {} fps, animation {}",
        args.frame_rate, !args.no_animation
    );
    let mut app = App::new(&args, theme, seed);
    app.run()
}

/// Log to a file when asked; stderr would tear up the screen.
fn init_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = File::create(path)
        .with_context(|| format!("could not create log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

/// Falling-block puzzle with physics in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "shaketris",
    version,
    about = "Falling-block puzzle in the terminal. Locked pieces become physics blocks; shake the board with the mouse.",
    long_about = "Shaketris is a falling-block puzzle where every locked piece breaks into \
        rigid blocks that fall, slide and tumble. Full rows are detected from where the \
        blocks actually are, so a good shake can make or break a line.\n\n\
        CONTROLS:\n  Left/Right h/l  Move      Up k       Rotate     Down j   Soft drop\n  \
        Space/Enter     Hard drop P          Pause      R        Restart\n  \
        D               Debug grid  Q / Esc  Quit\n  \
        Drag with the left mouse button to shake the blocks.\n\n\
        Use --theme to load a btop-style theme file for the UI colours."
)]
pub struct Args {
    /// Seed for the piece sequence. Random if not set.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Target render frames per second.
    #[arg(long, default_value = "60.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Path to theme file (btop-style theme[key]=\"value\"). Only UI colours are themed.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Disable the line-clear flash.
    #[arg(long)]
    pub no_animation: bool,

    /// Start with the occupancy overlay shown (toggle in game with D).
    #[arg(long)]
    pub debug_grid: bool,

    /// Write logs to this file. Filter with RUST_LOG (default: info).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_cli_defaults() {
        let args = Args::try_parse_from(["shaketris"]).unwrap();
        assert_eq!(args.seed, None);
        assert_eq!(args.frame_rate, 60.0);
        assert!(!args.no_animation);
        assert!(!args.debug_grid);
        assert!(args.theme.is_none());
        assert!(args.log_file.is_none());
    }

    #[test]
    fn test_cli_options() {
        let args = Args::try_parse_from([
            "shaketris",
            "--seed",
            "42",
            "--frame-rate",
            "30",
            "-t",
            "onedark.theme",
            "--no-animation",
            "--log-file",
            "game.log",
        ])
        .unwrap();
        assert_eq!(args.seed, Some(42));
        assert_eq!(args.frame_rate, 30.0);
        assert_eq!(args.theme, Some(PathBuf::from("onedark.theme")));
        assert!(args.no_animation);
        assert_eq!(args.log_file, Some(PathBuf::from("game.log")));
    }

    #[test]
    fn test_cli_rejects_bad_seed() {
        assert!(Args::try_parse_from(["shaketris", "--seed", "minus-one"]).is_err());
    }
}
