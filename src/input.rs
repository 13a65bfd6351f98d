//! Key bindings: normal and vim-style.

use chainfall::Intent;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MoveLeft,
    MoveRight,
    /// Swap variant: cursor up. Falling variants: rotate.
    Up,
    RotateCcw,
    /// Swap variant: cursor down. Falling variants: soft drop.
    Down,
    /// Hard drop, or pick/confirm a swap.
    Select,
    Pause,
    Restart,
    Quit,
    None,
}

impl Action {
    /// Intent for a falling-piece session, if the action maps to one.
    pub fn intent(self) -> Option<Intent> {
        match self {
            Self::MoveLeft => Some(Intent::MoveLeft),
            Self::MoveRight => Some(Intent::MoveRight),
            Self::Up => Some(Intent::RotateCw),
            Self::RotateCcw => Some(Intent::RotateCcw),
            Self::Down => Some(Intent::SoftDrop),
            Self::Select => Some(Intent::HardDrop),
            Self::Pause | Self::Restart | Self::Quit | Self::None => None,
        }
    }

    /// Held sideways moves auto-repeat after the DAS delay.
    pub fn repeats(self) -> bool {
        matches!(self, Self::MoveLeft | Self::MoveRight)
    }
}

/// Map key event to game action. Supports both normal (arrows, space) and vim (hjkl, etc.).
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
        KeyCode::Char('p') => Action::Pause,
        KeyCode::Char('r') => Action::Restart,
        KeyCode::Left | KeyCode::Char('h') => Action::MoveLeft,
        KeyCode::Right | KeyCode::Char('l') => Action::MoveRight,
        KeyCode::Up | KeyCode::Char('k' | 'i' | 'x') => Action::Up,
        KeyCode::Char('u' | 'z') => Action::RotateCcw,
        KeyCode::Down | KeyCode::Char('j') => Action::Down,
        KeyCode::Enter | KeyCode::Char(' ') => Action::Select,
        _ => Action::None,
    }
}
