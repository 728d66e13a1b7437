//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.
//!
//! Only the chrome around the board is themeable. Piece colours are fixed.

use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// UI colours, loaded from a theme file or the built-in dark defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    /// Screen background outside the board.
    pub bg: Color,
    /// Empty board cells.
    pub board_bg: Color,
    /// Cell grid lines.
    pub grid: Color,
    /// Board walls and panel borders.
    pub border: Color,
    /// Text (score, level).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Secondary text (control help).
    pub inactive_fg: Color,
    /// Debug overlay for occupied cells.
    pub debug_cell: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            bg: Color::Rgb(0, 0, 0),
            board_bg: Color::Rgb(20, 20, 20),
            grid: Color::Rgb(50, 50, 50),
            border: Color::Rgb(100, 100, 100),
            main_fg: Color::Rgb(255, 255, 255),
            title: Color::Rgb(229, 192, 123),
            inactive_fg: Color::Rgb(150, 150, 150),
            debug_cell: Color::Rgb(100, 0, 0),
        }
    }
}

impl Theme {
    /// Load from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// No path means the defaults; a path that can't be read is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ThemeError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let s = std::fs::read_to_string(path)?;
        Ok(Self::from_map(&parse_theme_file(&s)))
    }

    /// Keys missing from the file, or with bad hex values, keep their defaults.
    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        let d = Self::default();
        Self {
            bg: get("main_bg").unwrap_or(d.bg),
            board_bg: get("meter_bg").unwrap_or(d.board_bg),
            grid: get("div_line").unwrap_or(d.grid),
            border: get("cpu_box")
                .or_else(|| get("mem_box"))
                .unwrap_or(d.border),
            main_fg: get("main_fg").unwrap_or(d.main_fg),
            title: get("title").unwrap_or(d.title),
            inactive_fg: get("inactive_fg").unwrap_or(d.inactive_fg),
            debug_cell: get("temp_end").unwrap_or(d.debug_cell),
        }
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some(end) = stripped.find(']') else {
            continue;
        };
        let key = stripped[..end].trim();
        let rest = stripped[end + 1..].trim();
        if let Some(value) = rest.strip_prefix('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            if !value.is_empty() {
                map.insert(key.to_string(), value.to_string());
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());
    let (r, g, b) = match s.len() {
        6 if s.is_ascii() => (channel(&s[0..2])?, channel(&s[2..4])?, channel(&s[4..6])?),
        3 if s.is_ascii() => (
            channel(&s[0..1])? * 17,
            channel(&s[1..2])? * 17,
            channel(&s[2..3])? * 17,
        ),
        _ => return Err(invalid()),
    };
    Ok(Color::Rgb(r, g, b))
}
