//! Default Vim-flavoured action catalog

use crate::keymap::Mode;

use super::action::{Action, ExecutionStrategy, PatternKind};
use super::pattern::ActionPattern;

const NORMAL: &[Mode] = &[Mode::Normal];
const VISUAL: &[Mode] = &[Mode::Visual, Mode::VisualLine, Mode::VisualBlock];
const NORMAL_VISUAL: &[Mode] = &[
    Mode::Normal,
    Mode::Visual,
    Mode::VisualLine,
    Mode::VisualBlock,
];
const MOTION_MODES: &[Mode] = &[
    Mode::Normal,
    Mode::Visual,
    Mode::VisualLine,
    Mode::VisualBlock,
    Mode::OperatorPending,
];
const TEXT_OBJECT_MODES: &[Mode] = &[
    Mode::Visual,
    Mode::VisualLine,
    Mode::VisualBlock,
    Mode::OperatorPending,
];
const INSERT: &[Mode] = &[Mode::Insert];
const COMMAND_LINE: &[Mode] = &[Mode::CommandLine];

fn prefix(pattern: &str, action: Action) -> ActionPattern {
    ActionPattern::new(pattern, action)
        .modes(NORMAL_VISUAL)
        .kind(PatternKind::Prefix)
        .strategy(ExecutionStrategy::RunOnce)
}

fn motion(pattern: &str, action: Action) -> ActionPattern {
    ActionPattern::new(pattern, action)
        .modes(MOTION_MODES)
        .kind(PatternKind::Motion)
        .strategy(ExecutionStrategy::PerCursorTimesCount)
}

fn text_object(pattern: &str, action: Action) -> ActionPattern {
    ActionPattern::new(pattern, action)
        .modes(TEXT_OBJECT_MODES)
        .kind(PatternKind::TextObject)
}

fn operator(pattern: &str, action: Action) -> ActionPattern {
    ActionPattern::new(pattern, action)
        .modes(NORMAL)
        .kind(PatternKind::Operator)
}

fn command(pattern: &str, action: Action) -> ActionPattern {
    ActionPattern::new(pattern, action)
}

/// Built-in patterns, in priority order: when several patterns match the
/// same keys completely, the earlier one wins.
pub fn vim_patterns() -> Vec<ActionPattern> {
    use Action::*;

    vec![
        // Prefixes (`<count-digit>` must precede the `0` motion)
        prefix("<count-digit>", Count),
        prefix("\"<register-name>", SelectRegister),
        // Motions
        motion("h", MoveLeft),
        motion("<Left>", MoveLeft),
        motion("j", MoveDown),
        motion("<Down>", MoveDown),
        motion("k", MoveUp),
        motion("<Up>", MoveUp),
        motion("l", MoveRight),
        motion("<Right>", MoveRight),
        motion("w", WordForward),
        motion("b", WordBackward),
        motion("e", WordEnd),
        motion("0", LineStart),
        motion("^", FirstNonBlank),
        motion("$", LineEnd),
        motion("gg", DocumentStart).strategy(ExecutionStrategy::PerCursor),
        motion("G", DocumentEnd).strategy(ExecutionStrategy::PerCursor),
        motion("f<any-character>", FindCharForward),
        motion("F<any-character>", FindCharBackward),
        motion("t<any-character>", TillCharForward),
        motion("T<any-character>", TillCharBackward),
        // Text objects (`iw` before the generic pair form)
        text_object("iw", InnerWord),
        text_object("aw", AroundWord),
        text_object("i<any-character>", InnerPair),
        text_object("a<any-character>", AroundPair),
        // Operators
        operator("dd", DeleteLine),
        operator("cc", ChangeLine).enters(Mode::Insert),
        operator("yy", YankLine),
        operator("d<range>", Delete),
        operator("c<range>", Change).enters(Mode::Insert),
        operator("y<range>", Yank),
        // Visual mode operators
        command("d", DeleteSelection).modes(VISUAL).enters(Mode::Normal),
        command("x", DeleteSelection).modes(VISUAL).enters(Mode::Normal),
        command("c", ChangeSelection).modes(VISUAL).enters(Mode::Insert),
        command("y", YankSelection).modes(VISUAL).enters(Mode::Normal),
        command("<Esc>", Escape)
            .modes(VISUAL)
            .strategy(ExecutionStrategy::RunOnce)
            .enters(Mode::Normal),
        // Normal mode commands
        command("x", DeleteChar),
        command("r<any-character>", ReplaceChar),
        command("p", PutAfter),
        command("P", PutBefore),
        command("J", JoinLines),
        command("u", Undo).strategy(ExecutionStrategy::RunOnce),
        command("<C-r>", Redo).strategy(ExecutionStrategy::RunOnce),
        command(".", RepeatLastChange).strategy(ExecutionStrategy::RunOnce),
        command("i", InsertBefore).enters(Mode::Insert),
        command("I", InsertLineStart).enters(Mode::Insert),
        command("a", Append).enters(Mode::Insert),
        command("A", AppendLineEnd).enters(Mode::Insert),
        command("o", OpenLineBelow).enters(Mode::Insert),
        command("O", OpenLineAbove).enters(Mode::Insert),
        command("v", EnterVisual).enters(Mode::Visual),
        command("V", EnterVisualLine).enters(Mode::VisualLine),
        command("<C-v>", EnterVisualBlock).enters(Mode::VisualBlock),
        command(":", EnterCommandLine)
            .strategy(ExecutionStrategy::RunOnce)
            .enters(Mode::CommandLine),
        command("<Esc>", Escape).strategy(ExecutionStrategy::RunOnce),
        // Insert mode
        command("<Esc>", Escape)
            .modes(INSERT)
            .strategy(ExecutionStrategy::RunOnce)
            .enters(Mode::Normal),
        command("<BS>", DeleteCharBackward).modes(INSERT),
        command("<C-w>", DeleteWordBackward).modes(INSERT),
        command("<C-r><register-name>", InsertRegister).modes(INSERT),
        command("<any-character>", InsertChar).modes(INSERT),
        // Command line (`<CR>` is also a character, so it comes first)
        command("<Esc>", Escape)
            .modes(COMMAND_LINE)
            .strategy(ExecutionStrategy::RunOnce)
            .enters(Mode::Normal),
        command("<CR>", CommandLineExecute)
            .modes(COMMAND_LINE)
            .strategy(ExecutionStrategy::RunOnce)
            .enters(Mode::Normal),
        command("<BS>", CommandLineBackspace)
            .modes(COMMAND_LINE)
            .strategy(ExecutionStrategy::RunOnce),
        command("<any-character>", CommandLineChar)
            .modes(COMMAND_LINE)
            .strategy(ExecutionStrategy::RunOnce),
    ]
}
