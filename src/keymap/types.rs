//! Core types for key handling: Key, KeyCode, Modifiers

use std::fmt;

/// Modifier keys as a bitfield for efficient storage and comparison
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Modifiers(u8);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const CTRL: Modifiers = Modifiers(0b0001);
    pub const SHIFT: Modifiers = Modifiers(0b0010);
    pub const ALT: Modifiers = Modifiers(0b0100);
    pub const META: Modifiers = Modifiers(0b1000); // Cmd on macOS, Win on Windows

    /// Create modifiers from individual flags
    pub const fn new(ctrl: bool, shift: bool, alt: bool, meta: bool) -> Self {
        let mut bits = 0u8;
        if ctrl {
            bits |= 0b0001;
        }
        if shift {
            bits |= 0b0010;
        }
        if alt {
            bits |= 0b0100;
        }
        if meta {
            bits |= 0b1000;
        }
        Modifiers(bits)
    }

    #[inline]
    pub const fn ctrl(self) -> bool {
        self.0 & 0b0001 != 0
    }

    #[inline]
    pub const fn shift(self) -> bool {
        self.0 & 0b0010 != 0
    }

    #[inline]
    pub const fn alt(self) -> bool {
        self.0 & 0b0100 != 0
    }

    #[inline]
    pub const fn meta(self) -> bool {
        self.0 & 0b1000 != 0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Combine two modifier sets
    #[inline]
    pub const fn union(self, other: Modifiers) -> Modifiers {
        Modifiers(self.0 | other.0)
    }

    /// Remove the modifiers in `other`
    #[inline]
    pub const fn without(self, other: Modifiers) -> Modifiers {
        Modifiers(self.0 & !other.0)
    }

    /// Check if this contains all modifiers in other
    #[inline]
    pub const fn contains(self, other: Modifiers) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl std::ops::BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl fmt::Display for Modifiers {
    /// Vim-style prefix, e.g. `C-S-`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl() {
            write!(f, "C-")?;
        }
        if self.shift() {
            write!(f, "S-")?;
        }
        if self.alt() {
            write!(f, "A-")?;
        }
        if self.meta() {
            write!(f, "D-")?;
        }
        Ok(())
    }
}

/// A key code representing a logical key
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A character key. Case is significant (`a` and `A` are different keys).
    Char(char),

    // Named keys
    Enter,
    Escape,
    Tab,
    Backspace,
    Delete,

    // Arrow keys
    Up,
    Down,
    Left,
    Right,

    // Navigation
    Home,
    End,
    PageUp,
    PageDown,
    Insert,

    // Function keys
    F(u8), // F1-F24

    /// Sentinel delivered when a remap timeout fires. Never produced by a keyboard.
    TimeoutFinished,
}

impl KeyCode {
    /// Vim name for named keys (`None` for characters)
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            KeyCode::Char(_) | KeyCode::F(_) => return None,
            KeyCode::Enter => "CR",
            KeyCode::Escape => "Esc",
            KeyCode::Tab => "Tab",
            KeyCode::Backspace => "BS",
            KeyCode::Delete => "Del",
            KeyCode::Up => "Up",
            KeyCode::Down => "Down",
            KeyCode::Left => "Left",
            KeyCode::Right => "Right",
            KeyCode::Home => "Home",
            KeyCode::End => "End",
            KeyCode::PageUp => "PageUp",
            KeyCode::PageDown => "PageDown",
            KeyCode::Insert => "Insert",
            KeyCode::TimeoutFinished => "TimeoutFinished",
        };
        Some(name)
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyCode::Char(' ') => write!(f, "Space"),
            KeyCode::Char('<') => write!(f, "lt"),
            KeyCode::Char(c) => write!(f, "{}", c),
            KeyCode::F(n) => write!(f, "F{}", n),
            other => write!(f, "{}", other.name().unwrap_or_default()),
        }
    }
}

/// A single canonical keypress: a key with modifiers
///
/// Shifted letters are stored as the uppercase character without the
/// shift bit, so `<S-a>` and `A` are the same key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Key {
    pub code: KeyCode,
    pub mods: Modifiers,
}

/// An ordered sequence of keys. Order is significant.
pub type KeySequence = Vec<Key>;

impl Key {
    pub const ESCAPE: Key = Key::key(KeyCode::Escape);
    pub const ENTER: Key = Key::key(KeyCode::Enter);
    pub const TIMEOUT_FINISHED: Key = Key::key(KeyCode::TimeoutFinished);

    /// Create a new key
    pub const fn new(code: KeyCode, mods: Modifiers) -> Self {
        Self { code, mods }
    }

    /// Create a key with no modifiers
    pub const fn key(code: KeyCode) -> Self {
        Self {
            code,
            mods: Modifiers::NONE,
        }
    }

    /// Create a plain character key
    pub const fn char(c: char) -> Self {
        Self::key(KeyCode::Char(c))
    }

    /// Create a `<C-x>` key. Control chords are case-insensitive.
    pub fn ctrl(c: char) -> Self {
        Self::new(KeyCode::Char(c.to_ascii_lowercase()), Modifiers::CTRL)
    }

    /// Parse every character of `s` as a plain key (no angle-bracket notation)
    pub fn chars(s: &str) -> KeySequence {
        s.chars().map(Key::char).collect()
    }

    pub fn is_timeout_finished(&self) -> bool {
        self.code == KeyCode::TimeoutFinished
    }

    /// The character produced by this key, if it is a plain character key
    pub fn as_char(&self) -> Option<char> {
        match self.code {
            KeyCode::Char(c) if !self.has_command_modifier() => Some(c),
            _ => None,
        }
    }

    /// Decimal value when this is a plain digit key
    pub fn digit(&self) -> Option<u32> {
        self.as_char().and_then(|c| c.to_digit(10))
    }

    /// Whether this key inserts text when typed (`<any-character>`)
    ///
    /// Plain characters, `<Tab>` and `<CR>` count as characters; chords,
    /// arrows, function keys and the like do not.
    pub fn is_character(&self) -> bool {
        match self.code {
            KeyCode::Char(_) => !self.has_command_modifier(),
            KeyCode::Tab | KeyCode::Enter => self.mods.is_empty(),
            _ => false,
        }
    }

    fn has_command_modifier(&self) -> bool {
        self.mods.ctrl() || self.mods.alt() || self.mods.meta()
    }
}

impl fmt::Display for Key {
    /// Vim angle-bracket notation: `j`, `<Esc>`, `<C-w>`, `<Space>`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            KeyCode::Char(c) if self.mods.is_empty() && c != ' ' && c != '<' => write!(f, "{}", c),
            code => write!(f, "<{}{}>", self.mods, code),
        }
    }
}

/// Render a key sequence in Vim notation (for logs and the status line)
pub fn display_keys(keys: &[Key]) -> String {
    keys.iter().map(|k| k.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifiers_empty() {
        let mods = Modifiers::NONE;
        assert!(mods.is_empty());
        assert!(!mods.ctrl());
        assert!(!mods.shift());
        assert!(!mods.alt());
        assert!(!mods.meta());
    }

    #[test]
    fn test_modifiers_combined() {
        let mods = Modifiers::CTRL | Modifiers::SHIFT;
        assert!(mods.ctrl());
        assert!(mods.shift());
        assert!(!mods.alt());
        assert_eq!(mods.without(Modifiers::SHIFT), Modifiers::CTRL);
    }

    #[test]
    fn test_key_display_vim_notation() {
        assert_eq!(Key::char('j').to_string(), "j");
        assert_eq!(Key::ESCAPE.to_string(), "<Esc>");
        assert_eq!(Key::ctrl('W').to_string(), "<C-w>");
        assert_eq!(Key::char(' ').to_string(), "<Space>");
        assert_eq!(Key::char('<').to_string(), "<lt>");
        assert_eq!(Key::key(KeyCode::F(5)).to_string(), "<F5>");
        assert_eq!(display_keys(&Key::chars("dw")), "dw");
    }

    #[test]
    fn test_key_case_is_significant() {
        assert_ne!(Key::char('a'), Key::char('A'));
        assert_eq!(Key::ctrl('a'), Key::ctrl('A'));
    }

    #[test]
    fn test_character_classification() {
        assert!(Key::char('x').is_character());
        assert!(Key::key(KeyCode::Tab).is_character());
        assert!(!Key::ctrl('x').is_character());
        assert!(!Key::ESCAPE.is_character());
        assert!(!Key::TIMEOUT_FINISHED.is_character());
        assert_eq!(Key::char('7').digit(), Some(7));
        assert_eq!(Key::ctrl('7').digit(), None);
    }
}
