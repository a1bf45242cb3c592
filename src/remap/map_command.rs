//! `:map` family commands typed on the command line
//!
//! ```text
//! :nnoremap <silent> <leader>w :w<CR>
//!  │└──┬──┘ └──┬───┘ └───┬───┘ └──┬─┘
//!  │  kind   options    lhs      rhs
//!  mode prefix
//! ```
//!
//! Only `<silent>` changes anything. `<buffer>`, `<nowait>`, `<script>`,
//! `<expr>` and `<unique>` are accepted and ignored.

use crate::keymap::{parse_sequence, Key, KeySequence, MapMode, NotationError};

use super::error::ActionError;

const KINDS: [(&str, MapCommandKind); 4] = [
    ("mapclear", MapCommandKind::Mapclear),
    ("noremap", MapCommandKind::Noremap),
    ("unmap", MapCommandKind::Unmap),
    ("map", MapCommandKind::Map),
];

const IGNORED_OPTIONS: [&str; 5] = ["<buffer>", "<nowait>", "<script>", "<expr>", "<unique>"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapCommandKind {
    /// Add a recursive remapping, or list remappings when no rhs is given
    Map,
    /// Add a non-recursive remapping, or list like `Map`
    Noremap,
    Unmap,
    Mapclear,
}

/// A parsed `:map` family command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapCommand {
    pub kind: MapCommandKind,
    /// Families the command applies to
    pub modes: &'static [MapMode],
    /// Empty for `:mapclear` and for listing everything
    pub lhs: KeySequence,
    /// `None` lists remappings starting with `lhs`
    pub rhs: Option<KeySequence>,
    pub silent: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapCommandError {
    #[error("E474: Invalid argument")]
    InvalidArgument,
    #[error("E31: No such mapping")]
    NoSuchMapping,
    #[error("E474: Invalid argument: {0}")]
    Notation(#[from] NotationError),
}

impl From<MapCommandError> for ActionError {
    fn from(err: MapCommandError) -> Self {
        ActionError::new(err.to_string())
    }
}

/// Families a mode prefix stands for; `x` and `v` share the visual family
fn prefix_modes(prefix: &str) -> Option<&'static [MapMode]> {
    match prefix {
        "" => Some(&[MapMode::Normal, MapMode::Visual, MapMode::OperatorPending]),
        "n" => Some(&[MapMode::Normal]),
        "v" | "x" => Some(&[MapMode::Visual]),
        "o" => Some(&[MapMode::OperatorPending]),
        "i" => Some(&[MapMode::Insert]),
        "c" => Some(&[MapMode::CommandLine]),
        _ => None,
    }
}

fn command_name(name: &str) -> Option<(MapCommandKind, &'static [MapMode])> {
    KINDS.iter().find_map(|(suffix, kind)| {
        let prefix = name.strip_suffix(*suffix)?;
        prefix_modes(prefix).map(|modes| (*kind, modes))
    })
}

/// Parse a command line (with or without its leading `:`)
///
/// Returns `None` when the line is not a map command at all, so it can go
/// on to the editor.
pub fn parse_map_command(
    line: &str,
    leader: Key,
) -> Option<Result<MapCommand, MapCommandError>> {
    let line = line.trim_start();
    let line = line.strip_prefix(':').unwrap_or(line).trim_start();
    let (name, args) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let (kind, modes) = command_name(name)?;
    Some(parse_arguments(kind, modes, args, leader))
}

fn parse_arguments(
    kind: MapCommandKind,
    modes: &'static [MapMode],
    args: &str,
    leader: Key,
) -> Result<MapCommand, MapCommandError> {
    let mut rest = args.trim_start();
    let mut silent = false;
    loop {
        if let Some(after) = rest.strip_prefix("<silent>") {
            silent = true;
            rest = after.trim_start();
        } else if let Some(option) = IGNORED_OPTIONS.iter().find(|o| rest.starts_with(**o)) {
            rest = rest[option.len()..].trim_start();
        } else {
            break;
        }
    }

    let (lhs, rhs) = match rest.split_once(char::is_whitespace) {
        Some((lhs, rhs)) => (lhs, rhs.trim_start()),
        None => (rest, ""),
    };
    let lhs = parse_sequence(lhs, leader)?;
    let rhs = match rhs {
        "" => None,
        rhs => Some(parse_sequence(rhs, leader)?),
    };

    let invalid = match kind {
        MapCommandKind::Mapclear => !lhs.is_empty(),
        MapCommandKind::Unmap => lhs.is_empty() || rhs.is_some(),
        MapCommandKind::Map | MapCommandKind::Noremap => false,
    };
    if invalid {
        return Err(MapCommandError::InvalidArgument);
    }

    Ok(MapCommand {
        kind,
        modes,
        lhs,
        rhs,
        silent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::DEFAULT_LEADER;

    fn parse(line: &str) -> Option<Result<MapCommand, MapCommandError>> {
        parse_map_command(line, DEFAULT_LEADER)
    }

    #[test]
    fn test_mode_prefixes() {
        let motion: &[MapMode] = &[MapMode::Normal, MapMode::Visual, MapMode::OperatorPending];
        let cases: [(&str, MapCommandKind, &[MapMode]); 7] = [
            ("map", MapCommandKind::Map, motion),
            ("nnoremap", MapCommandKind::Noremap, &[MapMode::Normal]),
            ("xmap", MapCommandKind::Map, &[MapMode::Visual]),
            ("vnoremap", MapCommandKind::Noremap, &[MapMode::Visual]),
            ("omap", MapCommandKind::Map, &[MapMode::OperatorPending]),
            ("iunmap", MapCommandKind::Unmap, &[MapMode::Insert]),
            ("cmapclear", MapCommandKind::Mapclear, &[MapMode::CommandLine]),
        ];
        for (name, kind, modes) in cases {
            let line = match kind {
                MapCommandKind::Mapclear => name.to_string(),
                _ => format!("{} a", name),
            };
            let command = parse(&line).unwrap().unwrap();
            assert_eq!(command.kind, kind, "{}", name);
            assert_eq!(command.modes, modes, "{}", name);
        }
    }

    #[test]
    fn test_other_commands_are_not_map_commands() {
        assert_eq!(parse(":w"), None);
        assert_eq!(parse("s/a/b/"), None);
        assert_eq!(parse("qmap a b"), None);
        assert_eq!(parse("mapping a b"), None);
    }

    #[test]
    fn test_lhs_and_rhs_in_key_notation() {
        let command = parse(":nnoremap <leader>w  :w<CR>").unwrap().unwrap();
        assert_eq!(command.lhs, vec![DEFAULT_LEADER, Key::char('w')]);
        assert_eq!(command.rhs, Some(parse_sequence(":w<CR>", DEFAULT_LEADER).unwrap()));
        assert!(!command.silent);

        // everything after the lhs belongs to the rhs
        let command = parse("imap jk <Esc> A").unwrap().unwrap();
        assert_eq!(command.rhs, Some(parse_sequence("<Esc> A", DEFAULT_LEADER).unwrap()));
    }

    #[test]
    fn test_options() {
        let command = parse("nmap <buffer> <silent><nowait> Q gq").unwrap().unwrap();
        assert!(command.silent);
        assert_eq!(command.lhs, Key::chars("Q"));
        assert_eq!(command.rhs, Some(Key::chars("gq")));
    }

    #[test]
    fn test_listing_and_bad_arguments() {
        let command = parse("nmap").unwrap().unwrap();
        assert!(command.lhs.is_empty());
        assert_eq!(command.rhs, None);

        assert_eq!(parse("nunmap"), Some(Err(MapCommandError::InvalidArgument)));
        assert_eq!(parse("unmap a b"), Some(Err(MapCommandError::InvalidArgument)));
        assert_eq!(parse("mapclear a"), Some(Err(MapCommandError::InvalidArgument)));
    }
}
