//! Configuration system tests
//!
//! Tests for config paths, loading remap config files, and sessions built
//! from them.

mod common;

use std::io::Write;

use common::{fire_timeout, keys, type_keys, RecordingExecutor, TestSession};
use modal_keys::actions::{Action, ActionMatcher};
use modal_keys::config::{ConfigError, RemapConfig};
use modal_keys::config_paths;
use modal_keys::keymap::{Key, MapMode, Mode};
use modal_keys::remap::ManualScheduler;
use modal_keys::session::Session;

fn write_config(yaml: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    file
}

fn session_from(config: &RemapConfig) -> (TestSession, ManualScheduler) {
    let (remapper, diagnostics) = config.remapper();
    assert!(
        diagnostics.iter().all(|d| !d.is_error()),
        "unexpected errors: {:?}",
        diagnostics
    );
    let scheduler = ManualScheduler::new();
    let session = Session::new(RecordingExecutor::new(), scheduler.clone())
        .with_remapper(remapper)
        .with_matcher(ActionMatcher::vim());
    (session, scheduler)
}

// ========================================================================
// Config Paths Tests
// ========================================================================

#[test]
fn test_config_dir_contains_app_name() {
    let Some(dir) = config_paths::config_dir() else {
        return;
    };
    assert!(dir.to_string_lossy().contains("modal-keys"));
}

#[test]
fn test_config_file_ends_with_yaml() {
    let Some(path) = config_paths::config_file() else {
        return;
    };
    assert!(path.to_string_lossy().ends_with("config.yaml"));
}

#[test]
fn test_logs_dir_is_subdir_of_config() {
    let (Some(config), Some(logs)) = (config_paths::config_dir(), config_paths::logs_dir()) else {
        return;
    };
    assert!(logs.starts_with(&config));
}

// ========================================================================
// Loading Tests
// ========================================================================

#[test]
fn test_load_from_missing_file_is_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");

    let err = RemapConfig::load_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
    assert!(err.to_string().contains("config.yaml"));
}

#[test]
fn test_load_from_broken_yaml_is_parse_error() {
    let file = write_config("timeout: [not, a, number\n");

    let err = RemapConfig::load_from(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn test_load_from_empty_file_gives_defaults() {
    let file = write_config("");

    let config = RemapConfig::load_from(file.path()).unwrap();
    assert_eq!(config.leader, "\\");
    assert!(config.build_tables().0.is_empty());
}

#[test]
fn test_load_from_reads_settings_and_bindings() {
    let file = write_config(
        r#"
leader: "<Space>"
timeout: 250
max_map_depth: 0
normal_mode_key_bindings:
  - before: ["<leader>", "w"]
    commands: [":w"]
insert_mode_key_bindings_non_recursive:
  - before: ["j", "j"]
    after: ["<Esc>"]
"#,
    );

    let config = RemapConfig::load_from(file.path()).unwrap();
    let settings = config.settings();
    assert_eq!(settings.timeout.as_millis(), 250);
    // a depth of zero would reject every recursive remap
    assert_eq!(settings.max_map_depth, 1);
    assert_eq!(settings.leader, Key::char(' '));

    let (tables, diagnostics) = config.build_tables();
    assert!(diagnostics.is_empty());
    assert_eq!(tables.len(), 2);
    assert!(tables
        .table(MapMode::Normal, true)
        .and_then(|t| t.get(&[Key::char(' '), Key::char('w')]))
        .is_some());
    assert!(tables.covers(MapMode::Insert));
    assert!(!tables.covers(MapMode::Visual));
}

#[test]
fn test_every_binding_list_is_read() {
    let mut yaml = String::new();
    for family in ["normal", "insert", "visual", "operator_pending", "command_line"] {
        for suffix in ["", "_non_recursive"] {
            yaml.push_str(&format!(
                "{}_mode_key_bindings{}:\n  - before: [\"Q\"]\n    after: [\"x\"]\n",
                family, suffix
            ));
        }
    }
    let config = RemapConfig::from_yaml(&yaml).unwrap();

    let (tables, diagnostics) = config.build_tables();
    // each family declares `Q` in both classes
    assert_eq!(diagnostics.len(), 5);
    assert!(diagnostics.iter().all(|d| !d.is_error()));
    for mode in [
        MapMode::Normal,
        MapMode::Insert,
        MapMode::Visual,
        MapMode::OperatorPending,
        MapMode::CommandLine,
    ] {
        assert!(tables.table(mode, true).is_some_and(|t| t.len() == 1));
        assert!(tables.table(mode, false).is_some_and(|t| t.len() == 1));
    }
}

// ========================================================================
// Sessions Built From Config
// ========================================================================

#[test]
fn test_map_command_uses_configured_leader() {
    let config = RemapConfig::from_yaml("leader: \"<Space>\"\n").unwrap();
    let (mut session, _) = session_from(&config);

    session.execute_line_command("nnoremap <leader>d dd").unwrap();
    type_keys(&mut session, "<Space>d");

    assert_eq!(session.executor().actions(), vec![Action::DeleteLine]);
}

#[test]
fn test_configured_leader_command_runs() {
    let config = RemapConfig::from_yaml(
        r#"
leader: "<Space>"
normal_mode_key_bindings:
  - before: ["<leader>", "w"]
    commands: [":w"]
"#,
    )
    .unwrap();
    let (mut session, _) = session_from(&config);

    type_keys(&mut session, "<Space>w");

    assert_eq!(session.executor().commands(), vec![":w"]);
    assert!(session.pending_keys().is_empty());
}

#[test]
fn test_configured_insert_escape() {
    let config = RemapConfig::from_yaml(
        r#"
insertModeKeyBindingsNonRecursive:
  - before: ["j", "j"]
    after: ["<Esc>"]
"#,
    )
    .unwrap();
    let (session, _) = session_from(&config);
    let mut session = session.with_mode(Mode::Insert);

    type_keys(&mut session, "ajj");

    assert_eq!(
        session.executor().actions(),
        vec![Action::InsertChar, Action::Escape]
    );
    assert_eq!(session.mode(), Mode::Normal);
}

#[test]
fn test_configured_timeout_resolves_ambiguity() {
    let config = RemapConfig::from_yaml(
        r#"
timeout: 100
normal_mode_key_bindings_non_recursive:
  - before: ["d", "w", "w"]
    after: ["d", "d"]
"#,
    )
    .unwrap();
    let (mut session, scheduler) = session_from(&config);

    type_keys(&mut session, "dw");
    assert!(session.executor().log.is_empty());
    assert_eq!(session.pending_keys(), keys("dw").as_slice());
    assert_eq!(scheduler.delay().map(|d| d.as_millis()), Some(100));

    assert!(fire_timeout(&mut session, &scheduler));
    assert_eq!(session.executor().actions(), vec![Action::Delete]);
    assert!(session.pending_keys().is_empty());
}
