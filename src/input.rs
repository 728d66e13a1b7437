//! Key and mouse bindings: arrows or vim keys, left button drives shake.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MoveLeft,
    MoveRight,
    Rotate,
    SoftDrop,
    HardDrop,
    Pause,
    Restart,
    ToggleDebug,
    Quit,
    None,
}

/// Pointer event in terminal cell coordinates (column, row).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerAction {
    Down(u16, u16),
    Moved(u16, u16),
    Up,
}

/// Map key event to game action. Supports both normal (arrows, space) and vim (hjkl).
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
        return Action::Quit;
    }
    if !(modifiers.is_empty() || modifiers == KeyModifiers::SHIFT) {
        return Action::None;
    }
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('p') | KeyCode::Char('P') => Action::Pause,
        KeyCode::Char('r') | KeyCode::Char('R') => Action::Restart,
        KeyCode::Char('d') | KeyCode::Char('D') => Action::ToggleDebug,
        KeyCode::Left | KeyCode::Char('h') => Action::MoveLeft,
        KeyCode::Right | KeyCode::Char('l') => Action::MoveRight,
        KeyCode::Up | KeyCode::Char('k') => Action::Rotate,
        KeyCode::Down | KeyCode::Char('j') => Action::SoftDrop,
        KeyCode::Enter | KeyCode::Char(' ') => Action::HardDrop,
        _ => Action::None,
    }
}

/// Only the left button takes part in shaking; hovering never counts as motion.
pub fn mouse_to_pointer(mouse: MouseEvent) -> Option<PointerAction> {
    let (col, row) = (mouse.column, mouse.row);
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => Some(PointerAction::Down(col, row)),
        MouseEventKind::Drag(MouseButton::Left) => Some(PointerAction::Moved(col, row)),
        MouseEventKind::Up(MouseButton::Left) => Some(PointerAction::Up),
        _ => None,
    }
}
