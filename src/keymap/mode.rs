//! Editor modes and the remap families they belong to
//!
//! Remappings are declared per family (like Vim's `nmap`, `vmap`, `omap`,
//! `imap`, `cmap`), and every mode resolves to exactly one family.

use std::fmt;

use serde::Deserialize;

/// The modal state a session is in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Normal,
    Insert,
    Visual,
    VisualLine,
    VisualBlock,
    /// Pseudo mode: an operator is waiting for its range (`d` in `dw`)
    OperatorPending,
    CommandLine,
}

impl Mode {
    pub const ALL: [Mode; 7] = [
        Mode::Normal,
        Mode::Insert,
        Mode::Visual,
        Mode::VisualLine,
        Mode::VisualBlock,
        Mode::OperatorPending,
        Mode::CommandLine,
    ];

    pub fn is_visual(self) -> bool {
        matches!(self, Mode::Visual | Mode::VisualLine | Mode::VisualBlock)
    }

    /// Which remap family covers this mode
    pub fn map_mode(self) -> MapMode {
        match self {
            Mode::Normal => MapMode::Normal,
            Mode::Insert => MapMode::Insert,
            Mode::Visual | Mode::VisualLine | Mode::VisualBlock => MapMode::Visual,
            Mode::OperatorPending => MapMode::OperatorPending,
            Mode::CommandLine => MapMode::CommandLine,
        }
    }

    /// Parse a mode name as used on the command line (`normal`, `visual_line`, ...)
    pub fn from_name(name: &str) -> Option<Mode> {
        let mode = match name.to_ascii_lowercase().replace('-', "_").as_str() {
            "normal" | "n" => Mode::Normal,
            "insert" | "i" => Mode::Insert,
            "visual" | "v" => Mode::Visual,
            "visual_line" => Mode::VisualLine,
            "visual_block" => Mode::VisualBlock,
            "operator_pending" | "o" => Mode::OperatorPending,
            "command_line" | "c" => Mode::CommandLine,
            _ => return None,
        };
        Some(mode)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Normal => "NORMAL",
            Mode::Insert => "INSERT",
            Mode::Visual => "VISUAL",
            Mode::VisualLine => "VISUAL LINE",
            Mode::VisualBlock => "VISUAL BLOCK",
            Mode::OperatorPending => "OPERATOR PENDING",
            Mode::CommandLine => "COMMAND LINE",
        };
        write!(f, "{}", name)
    }
}

/// A remap family: one pair of recursive/non-recursive tables each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapMode {
    Normal,
    Insert,
    Visual,
    OperatorPending,
    CommandLine,
}

impl MapMode {
    pub const ALL: [MapMode; 5] = [
        MapMode::Normal,
        MapMode::Insert,
        MapMode::Visual,
        MapMode::OperatorPending,
        MapMode::CommandLine,
    ];

    /// Whether arbitrary keys may precede a remap trigger
    ///
    /// Insert mode allows `hello jj` to trigger `jj`; every other family only
    /// tolerates a count prefix.
    pub fn allows_preceding_keys(self) -> bool {
        self == MapMode::Insert
    }
}
