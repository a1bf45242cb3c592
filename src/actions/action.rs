//! Built-in actions produced by the action matcher
//!
//! Actions are identities only. What they do to the text is up to the
//! [`CommandExecutor`](crate::executor::CommandExecutor); the matcher and
//! session only decide *which* action the keys mean and how often it runs.

use std::fmt;

/// All built-in actions that key patterns can resolve to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    // ========================================================================
    // Prefixes (only update recorded state)
    // ========================================================================
    /// A digit of the count prefix
    Count,
    /// `"x` register selection
    SelectRegister,

    // ========================================================================
    // Motions
    // ========================================================================
    MoveLeft,
    MoveDown,
    MoveUp,
    MoveRight,
    WordForward,
    WordBackward,
    WordEnd,
    LineStart,
    FirstNonBlank,
    LineEnd,
    DocumentStart,
    DocumentEnd,
    FindCharForward,
    FindCharBackward,
    TillCharForward,
    TillCharBackward,

    // ========================================================================
    // Text objects
    // ========================================================================
    InnerWord,
    AroundWord,
    InnerPair,
    AroundPair,

    // ========================================================================
    // Operators
    // ========================================================================
    Delete,
    Change,
    Yank,
    DeleteLine,
    ChangeLine,
    YankLine,
    DeleteSelection,
    ChangeSelection,
    YankSelection,

    // ========================================================================
    // Normal mode commands
    // ========================================================================
    DeleteChar,
    ReplaceChar,
    PutAfter,
    PutBefore,
    JoinLines,
    Undo,
    Redo,
    RepeatLastChange,
    InsertBefore,
    InsertLineStart,
    Append,
    AppendLineEnd,
    OpenLineBelow,
    OpenLineAbove,
    EnterVisual,
    EnterVisualLine,
    EnterVisualBlock,
    EnterCommandLine,
    /// `<Esc>`: leave the current mode or cancel the pending command
    Escape,

    // ========================================================================
    // Insert mode
    // ========================================================================
    InsertChar,
    DeleteCharBackward,
    DeleteWordBackward,
    InsertRegister,

    // ========================================================================
    // Command line
    // ========================================================================
    CommandLineChar,
    CommandLineBackspace,
    CommandLineExecute,
}

impl Action {
    /// Stable snake_case name, used in logs and by executors
    pub fn name(self) -> &'static str {
        match self {
            Action::Count => "count",
            Action::SelectRegister => "select_register",
            Action::MoveLeft => "move_left",
            Action::MoveDown => "move_down",
            Action::MoveUp => "move_up",
            Action::MoveRight => "move_right",
            Action::WordForward => "word_forward",
            Action::WordBackward => "word_backward",
            Action::WordEnd => "word_end",
            Action::LineStart => "line_start",
            Action::FirstNonBlank => "first_non_blank",
            Action::LineEnd => "line_end",
            Action::DocumentStart => "document_start",
            Action::DocumentEnd => "document_end",
            Action::FindCharForward => "find_char_forward",
            Action::FindCharBackward => "find_char_backward",
            Action::TillCharForward => "till_char_forward",
            Action::TillCharBackward => "till_char_backward",
            Action::InnerWord => "inner_word",
            Action::AroundWord => "around_word",
            Action::InnerPair => "inner_pair",
            Action::AroundPair => "around_pair",
            Action::Delete => "delete",
            Action::Change => "change",
            Action::Yank => "yank",
            Action::DeleteLine => "delete_line",
            Action::ChangeLine => "change_line",
            Action::YankLine => "yank_line",
            Action::DeleteSelection => "delete_selection",
            Action::ChangeSelection => "change_selection",
            Action::YankSelection => "yank_selection",
            Action::DeleteChar => "delete_char",
            Action::ReplaceChar => "replace_char",
            Action::PutAfter => "put_after",
            Action::PutBefore => "put_before",
            Action::JoinLines => "join_lines",
            Action::Undo => "undo",
            Action::Redo => "redo",
            Action::RepeatLastChange => "repeat_last_change",
            Action::InsertBefore => "insert_before",
            Action::InsertLineStart => "insert_line_start",
            Action::Append => "append",
            Action::AppendLineEnd => "append_line_end",
            Action::OpenLineBelow => "open_line_below",
            Action::OpenLineAbove => "open_line_above",
            Action::EnterVisual => "enter_visual",
            Action::EnterVisualLine => "enter_visual_line",
            Action::EnterVisualBlock => "enter_visual_block",
            Action::EnterCommandLine => "enter_command_line",
            Action::Escape => "escape",
            Action::InsertChar => "insert_char",
            Action::DeleteCharBackward => "delete_char_backward",
            Action::DeleteWordBackward => "delete_word_backward",
            Action::InsertRegister => "insert_register",
            Action::CommandLineChar => "command_line_char",
            Action::CommandLineBackspace => "command_line_backspace",
            Action::CommandLineExecute => "command_line_execute",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// What role a pattern plays in the command grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    /// Count digits and register selection: update recorded state, the
    /// command keeps going, and they do not count as a real edit
    Prefix,
    /// Usable on its own and inside an operator's `<range>`
    Motion,
    /// Usable inside an operator's `<range>` (and in visual mode)
    TextObject,
    /// Operator waiting for a `<range>`
    Operator,
    /// Everything else
    Command,
}

impl PatternKind {
    /// Whether running this kind of action counts as "using a character"
    /// for the remap depth counter
    pub fn is_real_action(self) -> bool {
        self != PatternKind::Prefix
    }

    pub fn is_range_target(self) -> bool {
        matches!(self, PatternKind::Motion | PatternKind::TextObject)
    }
}

/// How often the executor is invoked for a resolved action
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ExecutionStrategy {
    /// Once, regardless of cursors; the count is passed along
    RunOnce,
    /// Once per cursor; the count is passed along
    #[default]
    PerCursor,
    /// Once per cursor and count; each invocation carries a count of 1
    PerCursorTimesCount,
}
