//! Key bindings: normal and vim-style.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    /// Pick up the gem under the cursor, or swap with the picked one.
    Select,
    Hint,
    Restart,
    Next,
    Pause,
    Quit,
    None,
}

impl Action {
    /// Row/column step for the cursor keys.
    pub const fn direction(self) -> Option<(isize, isize)> {
        match self {
            Self::Up => Some((-1, 0)),
            Self::Down => Some((1, 0)),
            Self::Left => Some((0, -1)),
            Self::Right => Some((0, 1)),
            _ => None,
        }
    }
}

/// Map key event to game action. Supports both normal (arrows, enter) and vim (hjkl).
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if !no_mod && modifiers != KeyModifiers::CONTROL {
        return Action::None;
    }
    match code {
        KeyCode::Char('c') if modifiers == KeyModifiers::CONTROL => Action::Quit,
        KeyCode::Char('q') | KeyCode::Esc if no_mod => Action::Quit,
        KeyCode::Char('p') if no_mod => Action::Pause,
        KeyCode::Up | KeyCode::Char('k') if no_mod => Action::Up,
        KeyCode::Down | KeyCode::Char('j') if no_mod => Action::Down,
        KeyCode::Left | KeyCode::Char('h') if no_mod => Action::Left,
        KeyCode::Right | KeyCode::Char('l') if no_mod => Action::Right,
        KeyCode::Enter | KeyCode::Char(' ') if no_mod => Action::Select,
        KeyCode::Char('?') if no_mod => Action::Hint,
        KeyCode::Char('r') if no_mod => Action::Restart,
        KeyCode::Char('n') if no_mod => Action::Next,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> Action {
        key_to_action(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn arrows_and_vim_keys_agree() {
        assert_eq!(press(KeyCode::Left), press(KeyCode::Char('h')));
        assert_eq!(press(KeyCode::Down), press(KeyCode::Char('j')));
        assert_eq!(press(KeyCode::Up), Action::Up);
        assert_eq!(Action::Right.direction(), Some((0, 1)));
        assert_eq!(Action::Select.direction(), None);
    }

    #[test]
    fn modifiers_are_filtered() {
        let alt_h = KeyEvent::new(KeyCode::Char('h'), KeyModifiers::ALT);
        assert_eq!(key_to_action(alt_h), Action::None);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(key_to_action(ctrl_c), Action::Quit);
        assert_eq!(
            key_to_action(KeyEvent::new(KeyCode::Char('?'), KeyModifiers::SHIFT)),
            Action::Hint
        );
    }
}
