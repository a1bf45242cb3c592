//! Remap configuration persistence
//!
//! Reads remappings from `~/.config/modal-keys/config.yaml`:
//!
//! ```yaml
//! leader: "<Space>"
//! timeout: 500
//! normal_mode_key_bindings:
//!   - before: ["<leader>", "w"]
//!     commands: [":w"]
//! insert_mode_key_bindings_non_recursive:
//!   - before: ["j", "j"]
//!     after: ["<Esc>"]
//! ```
//!
//! Entries are validated one by one: a broken entry is dropped with a
//! [`Diagnostic`] and the rest of the file still applies.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use serde_yaml::Value;

use crate::keymap::{
    display_keys, parse_key, parse_leader, Key, KeySequence, MapMode, NotationError,
    DEFAULT_LEADER,
};
use crate::remap::{
    CommandInvocation, RemapSettings, RemapTable, RemapTables, Remapper, Remapping,
    DEFAULT_MAX_MAP_DEPTH, DEFAULT_TIMEOUT,
};

/// Errors in the remap configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("remapping should be a mapping with 'before' and 'after' or 'commands'")]
    NotAMapping,
    #[error("'before' should be a non-empty string array")]
    InvalidBefore,
    #[error("'after' should be a string array")]
    InvalidAfter,
    #[error("{before} missing 'after' key or 'commands'")]
    MissingAction { before: String },
    #[error("{before} has both 'after' and 'commands'")]
    BothActions { before: String },
    #[error("invalid key '{key}': {source}")]
    InvalidKey {
        key: String,
        #[source]
        source: NotationError,
    },
    #[error("invalid command entry: {0}")]
    InvalidCommand(String),
    #[error("invalid leader '{leader}': {source}")]
    InvalidLeader {
        leader: String,
        #[source]
        source: NotationError,
    },
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Warning,
    Error,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticLevel::Warning => write!(f, "warning"),
            DiagnosticLevel::Error => write!(f, "error"),
        }
    }
}

/// A problem found while building the remap tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
}

impl Diagnostic {
    fn warning(message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagnosticLevel::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.level, self.message)
    }
}

/// Remap configuration that persists across sessions
#[derive(Debug, Clone, Deserialize)]
pub struct RemapConfig {
    /// Key substituted for `<leader>`
    #[serde(default = "default_leader")]
    pub leader: String,
    /// Milliseconds an ambiguous sequence waits for more keys
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_max_map_depth", alias = "maxmapdepth")]
    pub max_map_depth: usize,

    #[serde(default, alias = "normalModeKeyBindings")]
    pub normal_mode_key_bindings: Vec<Value>,
    #[serde(default, alias = "normalModeKeyBindingsNonRecursive")]
    pub normal_mode_key_bindings_non_recursive: Vec<Value>,
    #[serde(default, alias = "insertModeKeyBindings")]
    pub insert_mode_key_bindings: Vec<Value>,
    #[serde(default, alias = "insertModeKeyBindingsNonRecursive")]
    pub insert_mode_key_bindings_non_recursive: Vec<Value>,
    #[serde(default, alias = "visualModeKeyBindings")]
    pub visual_mode_key_bindings: Vec<Value>,
    #[serde(default, alias = "visualModeKeyBindingsNonRecursive")]
    pub visual_mode_key_bindings_non_recursive: Vec<Value>,
    #[serde(default, alias = "operatorPendingModeKeyBindings")]
    pub operator_pending_mode_key_bindings: Vec<Value>,
    #[serde(default, alias = "operatorPendingModeKeyBindingsNonRecursive")]
    pub operator_pending_mode_key_bindings_non_recursive: Vec<Value>,
    #[serde(default, alias = "commandLineModeKeyBindings")]
    pub command_line_mode_key_bindings: Vec<Value>,
    #[serde(default, alias = "commandLineModeKeyBindingsNonRecursive")]
    pub command_line_mode_key_bindings_non_recursive: Vec<Value>,
}

fn default_leader() -> String {
    DEFAULT_LEADER.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT.as_millis() as u64
}

fn default_max_map_depth() -> usize {
    DEFAULT_MAX_MAP_DEPTH
}

impl Default for RemapConfig {
    fn default() -> Self {
        Self {
            leader: default_leader(),
            timeout: default_timeout(),
            max_map_depth: default_max_map_depth(),
            normal_mode_key_bindings: Vec::new(),
            normal_mode_key_bindings_non_recursive: Vec::new(),
            insert_mode_key_bindings: Vec::new(),
            insert_mode_key_bindings_non_recursive: Vec::new(),
            visual_mode_key_bindings: Vec::new(),
            visual_mode_key_bindings_non_recursive: Vec::new(),
            operator_pending_mode_key_bindings: Vec::new(),
            operator_pending_mode_key_bindings_non_recursive: Vec::new(),
            command_line_mode_key_bindings: Vec::new(),
            command_line_mode_key_bindings_non_recursive: Vec::new(),
        }
    }
}

impl RemapConfig {
    /// Load config from disk, or return defaults if not found or broken
    pub fn load() -> Self {
        let Some(path) = crate::config_paths::config_file() else {
            tracing::debug!("No config directory available, using defaults");
            return Self::default();
        };

        if !path.exists() {
            tracing::debug!(
                "Config file not found at {}, using defaults",
                path.display()
            );
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => {
                tracing::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                tracing::warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Load config from `path`, failing on read or parse errors
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        // an empty file is a config with nothing set
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml)
    }

    pub fn settings(&self) -> RemapSettings {
        RemapSettings {
            timeout: Duration::from_millis(self.timeout),
            max_map_depth: self.max_map_depth.max(1),
            leader: self.leader_key().unwrap_or(DEFAULT_LEADER),
        }
    }

    /// The leader key, falling back to `\` when the configured one is invalid
    pub fn leader_key(&self) -> Result<Key, ConfigError> {
        parse_leader(&self.leader).map_err(|source| ConfigError::InvalidLeader {
            leader: self.leader.clone(),
            source,
        })
    }

    /// Every binding list with its family, recursive class and config name
    fn binding_lists(&self) -> [(MapMode, bool, &'static str, &[Value]); 10] {
        [
            (
                MapMode::Normal,
                true,
                "normal_mode_key_bindings",
                self.normal_mode_key_bindings.as_slice(),
            ),
            (
                MapMode::Normal,
                false,
                "normal_mode_key_bindings_non_recursive",
                self.normal_mode_key_bindings_non_recursive.as_slice(),
            ),
            (
                MapMode::Insert,
                true,
                "insert_mode_key_bindings",
                self.insert_mode_key_bindings.as_slice(),
            ),
            (
                MapMode::Insert,
                false,
                "insert_mode_key_bindings_non_recursive",
                self.insert_mode_key_bindings_non_recursive.as_slice(),
            ),
            (
                MapMode::Visual,
                true,
                "visual_mode_key_bindings",
                self.visual_mode_key_bindings.as_slice(),
            ),
            (
                MapMode::Visual,
                false,
                "visual_mode_key_bindings_non_recursive",
                self.visual_mode_key_bindings_non_recursive.as_slice(),
            ),
            (
                MapMode::OperatorPending,
                true,
                "operator_pending_mode_key_bindings",
                self.operator_pending_mode_key_bindings.as_slice(),
            ),
            (
                MapMode::OperatorPending,
                false,
                "operator_pending_mode_key_bindings_non_recursive",
                self.operator_pending_mode_key_bindings_non_recursive.as_slice(),
            ),
            (
                MapMode::CommandLine,
                true,
                "command_line_mode_key_bindings",
                self.command_line_mode_key_bindings.as_slice(),
            ),
            (
                MapMode::CommandLine,
                false,
                "command_line_mode_key_bindings_non_recursive",
                self.command_line_mode_key_bindings_non_recursive.as_slice(),
            ),
        ]
    }

    /// Validate every entry and build the remap tables
    ///
    /// Invalid entries are dropped with an error diagnostic. A duplicate
    /// `before` in one list keeps the last declaration; one declared in both
    /// classes of a family resolves to the recursive one. Both produce a
    /// warning.
    pub fn build_tables(&self) -> (RemapTables, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();
        let leader = self.leader_key().unwrap_or_else(|e| {
            diagnostics.push(Diagnostic::error(e.to_string()));
            DEFAULT_LEADER
        });

        let mut tables = RemapTables::new();
        let mut recursive_befores: HashMap<MapMode, HashSet<KeySequence>> = HashMap::new();

        for (mode, recursive, list_name, entries) in self.binding_lists() {
            let mut remappings = Vec::new();
            let mut seen = HashSet::new();

            for (index, entry) in entries.iter().enumerate() {
                match parse_remapping(entry, recursive, leader) {
                    Ok(remapping) => {
                        if !seen.insert(remapping.before.clone()) {
                            diagnostics.push(Diagnostic::warning(format!(
                                "{}[{}]: duplicate remapped key for {}, the last one wins",
                                list_name,
                                index,
                                display_keys(&remapping.before)
                            )));
                        }
                        remappings.push(remapping);
                    }
                    Err(e) => diagnostics.push(Diagnostic::error(format!(
                        "{}[{}]: {}",
                        list_name, index, e
                    ))),
                }
            }

            if recursive {
                recursive_befores.insert(mode, seen);
            } else if let Some(shadowing) = recursive_befores.get(&mode) {
                for before in seen.intersection(shadowing) {
                    diagnostics.push(Diagnostic::warning(format!(
                        "{}: {} is also mapped recursively, the recursive one wins",
                        list_name,
                        display_keys(before)
                    )));
                }
            }

            tables.insert(mode, recursive, RemapTable::new(remappings));
        }

        for diagnostic in &diagnostics {
            match diagnostic.level {
                DiagnosticLevel::Warning => tracing::warn!("remap config: {}", diagnostic.message),
                DiagnosticLevel::Error => tracing::error!("remap config: {}", diagnostic.message),
            }
        }
        tracing::debug!(remaps = tables.len(), "built remap tables");

        (tables, diagnostics)
    }

    /// A remapper for this config, with the diagnostics of building it
    pub fn remapper(&self) -> (Remapper, Vec<Diagnostic>) {
        let (tables, diagnostics) = self.build_tables();
        (Remapper::new(tables, self.settings()), diagnostics)
    }
}

fn parse_remapping(entry: &Value, recursive: bool, leader: Key) -> Result<Remapping, ConfigError> {
    let Value::Mapping(fields) = entry else {
        return Err(ConfigError::NotAMapping);
    };

    let before = match fields.get("before") {
        Some(value) => parse_keys(value, leader).ok_or(ConfigError::InvalidBefore)??,
        None => return Err(ConfigError::InvalidBefore),
    };
    if before.is_empty() {
        return Err(ConfigError::InvalidBefore);
    }

    let silent = fields
        .get("silent")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let after = fields.get("after").filter(|v| !v.is_null());
    let commands = fields.get("commands").filter(|v| !v.is_null());

    let remapping = match (after, commands) {
        (Some(_), Some(_)) => {
            return Err(ConfigError::BothActions {
                before: display_keys(&before),
            })
        }
        (None, None) => {
            return Err(ConfigError::MissingAction {
                before: display_keys(&before),
            })
        }
        (Some(after), None) => {
            let after = parse_keys(after, leader).ok_or(ConfigError::InvalidAfter)??;
            Remapping::keys(before, after, recursive)
        }
        (None, Some(commands)) => {
            Remapping::commands(before, parse_commands(commands)?, recursive)
        }
    };

    Ok(remapping.silent(silent))
}

/// `None` when `value` is not a string array
fn parse_keys(value: &Value, leader: Key) -> Option<Result<KeySequence, ConfigError>> {
    let items = value.as_sequence()?;
    let names: Option<Vec<&str>> = items.iter().map(Value::as_str).collect();
    let keys = names?
        .into_iter()
        .map(|name| {
            parse_key(name, leader).map_err(|source| ConfigError::InvalidKey {
                key: name.to_string(),
                source,
            })
        })
        .collect();
    Some(keys)
}

fn parse_commands(value: &Value) -> Result<Vec<CommandInvocation>, ConfigError> {
    let items = value
        .as_sequence()
        .ok_or_else(|| ConfigError::InvalidCommand("'commands' should be an array".to_string()))?;

    items.iter().map(parse_command).collect()
}

/// `":w"` or `{command: "editor.fold", args: {...}}`
fn parse_command(item: &Value) -> Result<CommandInvocation, ConfigError> {
    match item {
        Value::String(command) if !command.is_empty() => {
            Ok(CommandInvocation::new(command.as_str()))
        }
        Value::Mapping(fields) => {
            let command = fields
                .get("command")
                .and_then(Value::as_str)
                .filter(|c| !c.is_empty())
                .ok_or_else(|| ConfigError::InvalidCommand("missing 'command' name".to_string()))?;

            let args = match fields.get("args") {
                Some(args) => serde_json::to_value(args)
                    .map_err(|e| ConfigError::InvalidCommand(format!("{}: {}", command, e)))?,
                None => serde_json::Value::Null,
            };
            Ok(CommandInvocation::new(command).with_args(args))
        }
        other => Err(ConfigError::InvalidCommand(format!("{:?}", other))),
    }
}
