//! The boundary to the editor that actually changes text

use crate::actions::{Action, Captures};
use crate::keymap::{KeySequence, Mode};
use crate::remap::ActionError;

/// One call into the executor for a resolved built-in action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionInvocation {
    pub action: Action,
    /// Mode the action was typed in
    pub mode: Mode,
    /// Keys that produced the action (without count or register prefix)
    pub keys: KeySequence,
    /// Always at least 1
    pub count: usize,
    /// Whether the user typed a count
    pub has_count: bool,
    pub register: Option<char>,
    pub captures: Captures,
    /// Cursor index for per-cursor strategies
    pub cursor: Option<usize>,
}

/// Executes resolved actions and remapped commands
///
/// Implemented by the host editor. All methods are called from the
/// session's task, one at a time.
pub trait CommandExecutor: Send {
    fn execute_action(&mut self, invocation: &ActionInvocation) -> Result<(), ActionError>;

    /// Run an editor command by name, e.g. `editor.action.formatDocument`
    fn execute_named_command(
        &mut self,
        name: &str,
        args: &serde_json::Value,
    ) -> Result<(), ActionError>;

    /// Run a command-line command, without its leading `:`
    fn execute_line_command(&mut self, command: &str) -> Result<(), ActionError>;

    fn cursor_count(&self) -> usize {
        1
    }

    fn show_status(&mut self, _message: &str) {}
}
