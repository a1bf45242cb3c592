//! Vim key notation parsing
//!
//! Turns configured key names (`j`, `<C-w>`, `ctrl+w`, `<leader>`, `esc`)
//! into canonical [`Key`] values. The leader key is substituted here, at
//! load time, so tables never contain a `<leader>` placeholder.

use super::types::{Key, KeyCode, KeySequence, Modifiers};

/// Default `<leader>` key, as in Vim
pub const DEFAULT_LEADER: Key = Key::char('\\');

/// Errors that can occur when parsing key notation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotationError {
    #[error("empty key")]
    Empty,
    #[error("unknown key: {0}")]
    UnknownKey(String),
}

/// Parse one configured key, e.g. `"j"`, `"<C-w>"`, `"leader"`, `"shift+tab"`
pub fn parse_key(key_str: &str, leader: Key) -> Result<Key, NotationError> {
    let mut chars = key_str.chars();
    match (chars.next(), chars.next()) {
        (None, _) => return Err(NotationError::Empty),
        (Some(c), None) => return Ok(Key::char(c)),
        _ => {}
    }

    let inner = key_str
        .strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(key_str);

    parse_named(inner, leader).ok_or_else(|| NotationError::UnknownKey(key_str.to_string()))
}

/// Parse the configured leader value itself
pub fn parse_leader(leader_str: &str) -> Result<Key, NotationError> {
    parse_key(leader_str, DEFAULT_LEADER)
}

/// Parse a run of keys in Vim notation, e.g. `"<leader>ci<Esc>"`
///
/// A `<` that does not start a recognized key name is taken literally.
pub fn parse_sequence(keys_str: &str, leader: Key) -> Result<KeySequence, NotationError> {
    let mut keys = Vec::new();
    let mut rest = keys_str;

    while let Some(c) = rest.chars().next() {
        if c == '<' {
            if let Some(end) = rest.find('>') {
                if let Some(key) = parse_named(&rest[1..end], leader) {
                    keys.push(key);
                    rest = &rest[end + 1..];
                    continue;
                }
            }
        }
        keys.push(Key::char(c));
        rest = &rest[c.len_utf8()..];
    }

    Ok(keys)
}

/// Modifier prefixes, longest spellings first
const MODIFIER_PREFIXES: &[(&str, Modifiers)] = &[
    ("control+", Modifiers::CTRL),
    ("ctrl+", Modifiers::CTRL),
    ("ctrl-", Modifiers::CTRL),
    ("c-", Modifiers::CTRL),
    ("shift+", Modifiers::SHIFT),
    ("s-", Modifiers::SHIFT),
    ("alt+", Modifiers::ALT),
    ("a-", Modifiers::ALT),
    ("m-", Modifiers::ALT),
    ("cmd+", Modifiers::META),
    ("d-", Modifiers::META),
];

fn parse_named(name: &str, leader: Key) -> Option<Key> {
    if name.eq_ignore_ascii_case("leader") {
        return Some(leader);
    }

    let mut mods = Modifiers::NONE;
    let mut rest = name;
    'prefixes: while rest.chars().count() > 1 {
        for (prefix, modifier) in MODIFIER_PREFIXES {
            let matches = rest
                .get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix));
            if matches {
                mods = mods | *modifier;
                rest = &rest[prefix.len()..];
                continue 'prefixes;
            }
        }
        break;
    }

    let mut chars = rest.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(char_with_mods(c, mods));
    }

    let code = parse_key_code(&rest.to_ascii_lowercase())?;
    Some(match code {
        KeyCode::Char(c) => char_with_mods(c, mods),
        code => Key::new(code, mods),
    })
}

/// Apply modifiers to a character the way Vim canonicalizes them
fn char_with_mods(c: char, mods: Modifiers) -> Key {
    if mods.shift() && c.is_ascii_alphabetic() {
        let mods = mods.without(Modifiers::SHIFT);
        let c = c.to_ascii_uppercase();
        return if mods.ctrl() {
            Key::new(KeyCode::Char(c.to_ascii_lowercase()), mods)
        } else {
            Key::new(KeyCode::Char(c), mods)
        };
    }
    if mods.ctrl() {
        return Key::new(KeyCode::Char(c.to_ascii_lowercase()), mods);
    }
    Key::new(KeyCode::Char(c), mods)
}

/// Parse a named key code from lowercase text
fn parse_key_code(key: &str) -> Option<KeyCode> {
    let code = match key {
        "esc" | "escape" => KeyCode::Escape,
        "cr" | "enter" | "return" => KeyCode::Enter,
        "tab" => KeyCode::Tab,
        "bs" | "backspace" => KeyCode::Backspace,
        "del" | "delete" => KeyCode::Delete,
        "space" => KeyCode::Char(' '),
        "lt" => KeyCode::Char('<'),
        "bar" => KeyCode::Char('|'),
        "bslash" => KeyCode::Char('\\'),

        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,

        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" => KeyCode::PageUp,
        "pagedown" => KeyCode::PageDown,
        "insert" | "ins" => KeyCode::Insert,

        _ => {
            let n: u8 = key.strip_prefix('f')?.parse().ok()?;
            if !(1..=24).contains(&n) {
                return None;
            }
            KeyCode::F(n)
        }
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_character() {
        assert_eq!(parse_key("j", DEFAULT_LEADER), Ok(Key::char('j')));
        assert_eq!(parse_key("J", DEFAULT_LEADER), Ok(Key::char('J')));
        assert_eq!(parse_key("<", DEFAULT_LEADER), Ok(Key::char('<')));
    }

    #[test]
    fn test_parse_named_keys() {
        assert_eq!(parse_key("<Esc>", DEFAULT_LEADER), Ok(Key::ESCAPE));
        assert_eq!(parse_key("escape", DEFAULT_LEADER), Ok(Key::ESCAPE));
        assert_eq!(parse_key("<cr>", DEFAULT_LEADER), Ok(Key::ENTER));
        assert_eq!(parse_key("<space>", DEFAULT_LEADER), Ok(Key::char(' ')));
        assert_eq!(
            parse_key("<F12>", DEFAULT_LEADER),
            Ok(Key::key(KeyCode::F(12)))
        );
    }

    #[test]
    fn test_parse_modifiers() {
        assert_eq!(parse_key("<C-w>", DEFAULT_LEADER), Ok(Key::ctrl('w')));
        assert_eq!(parse_key("<c-W>", DEFAULT_LEADER), Ok(Key::ctrl('w')));
        assert_eq!(parse_key("ctrl+w", DEFAULT_LEADER), Ok(Key::ctrl('w')));
        assert_eq!(parse_key("<S-a>", DEFAULT_LEADER), Ok(Key::char('A')));
        assert_eq!(
            parse_key("<S-Tab>", DEFAULT_LEADER),
            Ok(Key::new(KeyCode::Tab, Modifiers::SHIFT))
        );
        assert_eq!(
            parse_key("<A-x>", DEFAULT_LEADER),
            Ok(Key::new(KeyCode::Char('x'), Modifiers::ALT))
        );
    }

    #[test]
    fn test_parse_leader_substitution() {
        let leader = Key::char(' ');
        assert_eq!(parse_key("leader", leader), Ok(leader));
        assert_eq!(parse_key("<Leader>", leader), Ok(leader));
        assert_eq!(parse_leader("<space>"), Ok(leader));
    }

    #[test]
    fn test_parse_unknown_key() {
        assert!(matches!(
            parse_key("<nonsense>", DEFAULT_LEADER),
            Err(NotationError::UnknownKey(_))
        ));
        assert_eq!(parse_key("", DEFAULT_LEADER), Err(NotationError::Empty));
    }

    #[test]
    fn test_parse_sequence() {
        let keys = parse_sequence("<leader>ci<Esc>", Key::char(',')).unwrap();
        assert_eq!(
            keys,
            vec![Key::char(','), Key::char('c'), Key::char('i'), Key::ESCAPE]
        );

        let literal = parse_sequence("a<b", DEFAULT_LEADER).unwrap();
        assert_eq!(literal, Key::chars("a<b"));
    }
}
