//! Key handling for the dashboard

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// What the loop should do after a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    OpenSubView,
    None,
}

/// Key binding helper
pub struct KeyBinding {
    pub key: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyBinding {
    pub fn new(key: KeyCode) -> Self {
        Self {
            key,
            modifiers: KeyModifiers::NONE,
        }
    }

    pub fn ctrl(key: KeyCode) -> Self {
        Self {
            key,
            modifiers: KeyModifiers::CONTROL,
        }
    }

    /// Letters match either case; SHIFT is ignored since terminals disagree on
    /// whether they report it for uppercase characters.
    pub fn matches(&self, event: &KeyEvent) -> bool {
        if event.kind != KeyEventKind::Press {
            return false;
        }
        let modifiers = event.modifiers.difference(KeyModifiers::SHIFT);
        let code_matches = match (self.key, event.code) {
            (KeyCode::Char(a), KeyCode::Char(b)) => a.eq_ignore_ascii_case(&b),
            (a, b) => a == b,
        };
        code_matches && modifiers == self.modifiers
    }
}

/// Standard key bindings
pub struct KeyBindings;

impl KeyBindings {
    pub fn quit() -> KeyBinding {
        KeyBinding::new(KeyCode::Char('q'))
    }

    pub fn quit_alt() -> KeyBinding {
        KeyBinding::ctrl(KeyCode::Char('c'))
    }

    pub fn ssd_info() -> KeyBinding {
        KeyBinding::new(KeyCode::Char('d'))
    }
}

pub struct InputRouter;

impl InputRouter {
    pub fn route(key: &KeyEvent) -> Command {
        if KeyBindings::quit().matches(key) || KeyBindings::quit_alt().matches(key) {
            Command::Quit
        } else if KeyBindings::ssd_info().matches(key) {
            Command::OpenSubView
        } else {
            Command::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn quit_keys() {
        for event in [
            key(KeyCode::Char('q'), KeyModifiers::NONE),
            key(KeyCode::Char('Q'), KeyModifiers::NONE),
            key(KeyCode::Char('Q'), KeyModifiers::SHIFT),
            key(KeyCode::Char('c'), KeyModifiers::CONTROL),
        ] {
            assert_eq!(InputRouter::route(&event), Command::Quit, "{:?}", event);
        }
    }

    #[test]
    fn ssd_keys() {
        assert_eq!(
            InputRouter::route(&key(KeyCode::Char('d'), KeyModifiers::NONE)),
            Command::OpenSubView
        );
        assert_eq!(
            InputRouter::route(&key(KeyCode::Char('D'), KeyModifiers::SHIFT)),
            Command::OpenSubView
        );
    }

    #[test]
    fn everything_else_is_ignored() {
        for event in [
            key(KeyCode::Char('x'), KeyModifiers::NONE),
            key(KeyCode::Char('c'), KeyModifiers::NONE),
            key(KeyCode::Char('q'), KeyModifiers::CONTROL),
            key(KeyCode::Enter, KeyModifiers::NONE),
            key(KeyCode::Esc, KeyModifiers::NONE),
        ] {
            assert_eq!(InputRouter::route(&event), Command::None, "{:?}", event);
        }
    }

    #[test]
    fn key_release_does_not_trigger() {
        let release = KeyEvent {
            code: KeyCode::Char('q'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert_eq!(InputRouter::route(&release), Command::None);
    }
}
