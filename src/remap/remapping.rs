//! User remapping definitions

use std::fmt;

use crate::keymap::{display_keys, KeySequence};

/// One editor command invoked by a `commands` remapping
#[derive(Debug, Clone, PartialEq)]
pub struct CommandInvocation {
    pub command: String,
    pub args: serde_json::Value,
}

impl CommandInvocation {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: serde_json::Value::Null,
        }
    }

    pub fn with_args(mut self, args: serde_json::Value) -> Self {
        self.args = args;
        self
    }

    /// The command-line text when this is a `:` command (`":w"` → `"w"`)
    pub fn line_command(&self) -> Option<&str> {
        self.command.strip_prefix(':')
    }
}

impl fmt::Display for CommandInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command)
    }
}

/// What a remapping expands to: exactly one of keys or commands
#[derive(Debug, Clone, PartialEq)]
pub enum RemapAction {
    Keys(KeySequence),
    Commands(Vec<CommandInvocation>),
}

/// A user rule rewriting `before` into other keys or commands
#[derive(Debug, Clone, PartialEq)]
pub struct Remapping {
    /// Trigger keys, never empty
    pub before: KeySequence,
    pub action: RemapAction,
    /// Whether replayed keys may trigger further remappings
    pub recursive: bool,
    /// Don't show invoked commands on the status line
    pub silent: bool,
}

impl Remapping {
    pub fn keys(before: KeySequence, after: KeySequence, recursive: bool) -> Self {
        Self {
            before,
            action: RemapAction::Keys(after),
            recursive,
            silent: false,
        }
    }

    pub fn commands(
        before: KeySequence,
        commands: Vec<CommandInvocation>,
        recursive: bool,
    ) -> Self {
        Self {
            before,
            action: RemapAction::Commands(commands),
            recursive,
            silent: false,
        }
    }

    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    /// The `after` keys, if this remapping expands to keys
    pub fn after(&self) -> Option<&[crate::keymap::Key]> {
        match &self.action {
            RemapAction::Keys(keys) => Some(keys),
            RemapAction::Commands(_) => None,
        }
    }
}

impl fmt::Display for Remapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arrow = if self.recursive { "->" } else { "=>" };
        write!(f, "{} {} ", display_keys(&self.before), arrow)?;
        match &self.action {
            RemapAction::Keys(keys) => write!(f, "{}", display_keys(keys)),
            RemapAction::Commands(commands) => {
                let names: Vec<&str> = commands.iter().map(|c| c.command.as_str()).collect();
                write!(f, "[{}]", names.join(", "))
            }
        }
    }
}
