//! Key bindings: normal and vim-style.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MoveLeft,
    MoveRight,
    Rotate,
    SoftDrop,
    Pause,
    Quit,
    Confirm,
    None,
}

/// Map key event to game action. Supports both normal (arrows) and vim (hjkl).
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if !no_mod && modifiers != KeyModifiers::CONTROL {
        return Action::None;
    }
    match code {
        KeyCode::Char('q') | KeyCode::Esc if no_mod => Action::Quit,
        KeyCode::Char('p') if no_mod => Action::Pause,
        KeyCode::Left | KeyCode::Char('h') if no_mod => Action::MoveLeft,
        KeyCode::Right | KeyCode::Char('l') if no_mod => Action::MoveRight,
        KeyCode::Up | KeyCode::Char('k') | KeyCode::Char('i') if no_mod => Action::Rotate,
        KeyCode::Down | KeyCode::Char('j') if no_mod => Action::SoftDrop,
        KeyCode::Enter | KeyCode::Char(' ') if no_mod => Action::Confirm,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEvent;

    #[test]
    fn test_arrow_and_vim_keys_map_to_same_actions() {
        let pairs = [
            (KeyCode::Left, KeyCode::Char('h'), Action::MoveLeft),
            (KeyCode::Right, KeyCode::Char('l'), Action::MoveRight),
            (KeyCode::Up, KeyCode::Char('k'), Action::Rotate),
            (KeyCode::Down, KeyCode::Char('j'), Action::SoftDrop),
        ];
        for (a, b, expected) in pairs {
            assert_eq!(key_to_action(KeyEvent::from(a)), expected);
            assert_eq!(key_to_action(KeyEvent::from(b)), expected);
        }
    }

    #[test]
    fn test_modified_keys_are_ignored() {
        let key = KeyEvent::new(KeyCode::Left, KeyModifiers::ALT);
        assert_eq!(key_to_action(key), Action::None);
    }
}
