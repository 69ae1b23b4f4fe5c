//! Keystroke events consumed by the engine.
//!
//! Events arrive already classified: word characters, backspace, one of the
//! fixed terminator keys, or anything else (ignored).

use crossterm::event::{KeyCode, KeyEvent as TermKeyEvent, KeyEventKind, KeyModifiers};

/// Characters that end a word and may fire terminator-class triggers.
pub const TERMINATOR_CHARS: &[char] = &[
    '-', '(', ')', '[', ']', '{', '}', ':', ';', '\'', '"', '/', '\\', ',', '.', '?', '!', ' ',
    '\n',
];

/// Terminators that need shift held when replayed on a US layout.
const SHIFTED_TERMINATORS: &[char] = &['(', ')', '{', '}', ':', '"', '?', '!'];

/// A word-ending key. Enter is represented as `'\n'`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Terminator(char);

impl Terminator {
    pub const SPACE: Self = Self(' ');
    pub const ENTER: Self = Self('\n');

    /// Classify `ch` as a terminator. `'\r'` is folded into enter.
    pub fn from_char(ch: char) -> Option<Self> {
        let ch = if ch == '\r' { '\n' } else { ch };
        TERMINATOR_CHARS.contains(&ch).then_some(Self(ch))
    }

    pub const fn as_char(self) -> char {
        self.0
    }

    /// Whether replaying this key requires the shift modifier.
    pub fn needs_shift(self) -> bool {
        SHIFTED_TERMINATORS.contains(&self.0)
    }
}

/// One event from the keystroke source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    /// A character that extends the current word
    Char(char),
    /// Remove the last buffered character
    Backspace,
    /// A word-ending key
    Terminator(Terminator),
    /// Anything else; ignored
    Other,
}

impl KeyEvent {
    /// Classify a typed character.
    pub fn from_char(ch: char) -> Self {
        Terminator::from_char(ch).map_or(Self::Char(ch), Self::Terminator)
    }

    /// Turn a string into the events produced by typing it.
    pub fn typed(text: &str) -> Vec<Self> {
        text.chars().map(Self::from_char).collect()
    }
}

/// What a raw terminal key means for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Key(KeyEvent),
    /// The session-exit key
    Exit,
    /// Key releases; the engine only sees presses
    Skip,
}

/// Map a crossterm key press to an engine event. `Esc` and `Ctrl+C` exit.
pub fn classify_terminal_key(key: TermKeyEvent) -> KeyInput {
    if key.kind == KeyEventKind::Release {
        return KeyInput::Skip;
    }
    match key.code {
        KeyCode::Esc => KeyInput::Exit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => KeyInput::Exit,
        KeyCode::Char(_) if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {
            KeyInput::Key(KeyEvent::Other)
        }
        KeyCode::Char(ch) => KeyInput::Key(KeyEvent::from_char(ch)),
        KeyCode::Enter => KeyInput::Key(KeyEvent::Terminator(Terminator::ENTER)),
        KeyCode::Backspace => KeyInput::Key(KeyEvent::Backspace),
        _ => KeyInput::Key(KeyEvent::Other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> TermKeyEvent {
        TermKeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn test_from_char_classifies_terminators() {
        assert_eq!(KeyEvent::from_char('a'), KeyEvent::Char('a'));
        assert_eq!(KeyEvent::from_char(' '), KeyEvent::Terminator(Terminator::SPACE));
        assert_eq!(KeyEvent::from_char('\r'), KeyEvent::Terminator(Terminator::ENTER));
        assert!(matches!(KeyEvent::from_char('/'), KeyEvent::Terminator(_)));
        assert_eq!(KeyEvent::from_char('_'), KeyEvent::Char('_'));
    }

    #[test]
    fn test_shift_set() {
        assert!(Terminator::from_char('?').unwrap().needs_shift());
        assert!(Terminator::from_char('"').unwrap().needs_shift());
        assert!(!Terminator::from_char('.').unwrap().needs_shift());
        assert!(!Terminator::SPACE.needs_shift());
    }

    #[test]
    fn test_typed_splits_text_into_events() {
        let events = KeyEvent::typed("ab.");
        assert_eq!(events.len(), 3);
        assert_eq!(events[2], KeyEvent::Terminator(Terminator::from_char('.').unwrap()));
    }

    #[test]
    fn test_classify_terminal_keys() {
        assert_eq!(
            classify_terminal_key(press(KeyCode::Char('x'), KeyModifiers::NONE)),
            KeyInput::Key(KeyEvent::Char('x'))
        );
        assert_eq!(
            classify_terminal_key(press(KeyCode::Char('X'), KeyModifiers::SHIFT)),
            KeyInput::Key(KeyEvent::Char('X'))
        );
        assert_eq!(
            classify_terminal_key(press(KeyCode::Enter, KeyModifiers::NONE)),
            KeyInput::Key(KeyEvent::Terminator(Terminator::ENTER))
        );
        assert_eq!(
            classify_terminal_key(press(KeyCode::Backspace, KeyModifiers::NONE)),
            KeyInput::Key(KeyEvent::Backspace)
        );
        assert_eq!(
            classify_terminal_key(press(KeyCode::Esc, KeyModifiers::NONE)),
            KeyInput::Exit
        );
        assert_eq!(
            classify_terminal_key(press(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            KeyInput::Exit
        );
        assert_eq!(
            classify_terminal_key(press(KeyCode::Left, KeyModifiers::NONE)),
            KeyInput::Key(KeyEvent::Other)
        );
    }

    #[test]
    fn test_classify_skips_releases() {
        let mut key = press(KeyCode::Char('a'), KeyModifiers::NONE);
        key.kind = KeyEventKind::Release;
        assert_eq!(classify_terminal_key(key), KeyInput::Skip);
    }
}
