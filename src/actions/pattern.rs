//! Key patterns for built-in actions
//!
//! A pattern is a list of tokens. Literal tokens must equal the typed key;
//! wildcard tokens consume keys by class (digits, characters, registers) or,
//! for `<range>`, a whole motion or text object.

use crate::keymap::{parse_sequence, Key, Mode, DEFAULT_LEADER};

use super::action::{Action, ExecutionStrategy, PatternKind};

/// One position in an action pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternToken {
    /// Exactly this key
    Key(Key),
    /// `<count-digit>`: one digit; `0` only while a count is being typed
    CountDigit,
    /// `<any-character>`: one key that produces text
    AnyCharacter,
    /// `<register-name>`: one valid register
    RegisterName,
    /// `<range>`: optional count digits, then a motion or text object
    Range,
}

impl PatternToken {
    /// Parse a pattern written in key notation, with the wildcard names
    /// `<count-digit>`, `<any-character>`, `<register-name>` and `<range>`
    pub fn parse_all(pattern: &str) -> Vec<PatternToken> {
        const WILDCARDS: &[(&str, PatternToken)] = &[
            ("<count-digit>", PatternToken::CountDigit),
            ("<any-character>", PatternToken::AnyCharacter),
            ("<register-name>", PatternToken::RegisterName),
            ("<range>", PatternToken::Range),
        ];

        let mut tokens = Vec::new();
        let mut literal_start = 0;
        let mut i = 0;
        while i < pattern.len() {
            let wildcard = WILDCARDS
                .iter()
                .find(|(name, _)| pattern[i..].starts_with(name));
            match wildcard {
                Some((name, token)) => {
                    push_literals(&mut tokens, &pattern[literal_start..i]);
                    tokens.push(*token);
                    i += name.len();
                    literal_start = i;
                }
                None => {
                    i += pattern[i..].chars().next().map_or(1, char::len_utf8);
                }
            }
        }
        push_literals(&mut tokens, &pattern[literal_start..]);
        tokens
    }

    pub fn is_wildcard(&self) -> bool {
        !matches!(self, PatternToken::Key(_))
    }
}

fn push_literals(tokens: &mut Vec<PatternToken>, literal: &str) {
    // Built-in patterns never use `<leader>`, so the default is irrelevant here
    if let Ok(keys) = parse_sequence(literal, DEFAULT_LEADER) {
        tokens.extend(keys.into_iter().map(PatternToken::Key));
    }
}

/// Whether `key` names a register (`"a`, `"0`, `"+`, ...)
pub fn is_register_name(key: &Key) -> bool {
    key.as_char().is_some_and(|c| {
        c.is_ascii_alphanumeric()
            || matches!(c, '"' | '-' | '*' | '+' | '_' | '/' | '.' | ':' | '%' | '#' | '=')
    })
}

/// A built-in key pattern and what it resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionPattern {
    pub keys: Vec<PatternToken>,
    pub modes: Vec<Mode>,
    pub action: Action,
    pub kind: PatternKind,
    pub strategy: ExecutionStrategy,
    /// Mode the session switches to after the action runs
    pub enters: Option<Mode>,
}

impl ActionPattern {
    /// A command pattern, active in normal mode, run once per cursor
    pub fn new(pattern: &str, action: Action) -> Self {
        Self {
            keys: PatternToken::parse_all(pattern),
            modes: vec![Mode::Normal],
            action,
            kind: PatternKind::Command,
            strategy: ExecutionStrategy::PerCursor,
            enters: None,
        }
    }

    pub fn modes(mut self, modes: &[Mode]) -> Self {
        self.modes = modes.to_vec();
        self
    }

    pub fn kind(mut self, kind: PatternKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn enters(mut self, mode: Mode) -> Self {
        self.enters = Some(mode);
        self
    }

    #[inline]
    pub fn applies_in(&self, mode: Mode) -> bool {
        self.modes.contains(&mode)
    }

    /// Whether the pattern is an operator waiting only for its `<range>`
    pub fn range_start(&self) -> Option<usize> {
        match self.keys.last() {
            Some(PatternToken::Range) => Some(self.keys.len() - 1),
            _ => None,
        }
    }
}
