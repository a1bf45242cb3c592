//! Shared test helpers for integration tests
//!
//! Note: Functions may appear unused because each test file compiles separately.

#![allow(dead_code)]

use std::sync::Arc;

use modal_keys::actions::{Action, ActionMatcher};
use modal_keys::executor::{ActionInvocation, CommandExecutor};
use modal_keys::keymap::{parse_sequence, Key, KeySequence, MapMode, Mode, DEFAULT_LEADER};
use modal_keys::remap::{
    ActionError, ManualScheduler, RemapSettings, RemapTable, RemapTables, Remapper, Remapping,
    StopSignal,
};
use modal_keys::session::Session;

/// Everything the session asked the executor to do, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Executed {
    Action(ActionInvocation),
    Command(String),
    Line(String),
}

/// Executor that records calls instead of editing text
#[derive(Default)]
pub struct RecordingExecutor {
    pub log: Vec<Executed>,
    pub statuses: Vec<String>,
    pub cursors: usize,
    /// Actions that fail with this message
    pub failing: Vec<(Action, String)>,
    /// An action that succeeds this many more times, then fails
    pub fail_after: Option<(Action, usize, String)>,
    /// Request a stop on this signal whenever the action runs
    pub stop_on: Option<(Action, Arc<StopSignal>)>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self {
            cursors: 1,
            ..Self::default()
        }
    }

    pub fn failing(mut self, action: Action, message: &str) -> Self {
        self.failing.push((action, message.to_string()));
        self
    }

    pub fn failing_after(mut self, action: Action, times: usize, message: &str) -> Self {
        self.fail_after = Some((action, times, message.to_string()));
        self
    }

    /// Names of the executed actions
    pub fn actions(&self) -> Vec<Action> {
        self.invocations().iter().map(|i| i.action).collect()
    }

    pub fn invocations(&self) -> Vec<&ActionInvocation> {
        self.log
            .iter()
            .filter_map(|e| match e {
                Executed::Action(invocation) => Some(invocation),
                _ => None,
            })
            .collect()
    }

    pub fn commands(&self) -> Vec<&str> {
        self.log
            .iter()
            .filter_map(|e| match e {
                Executed::Command(name) => Some(name.as_str()),
                Executed::Line(line) => Some(line.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl CommandExecutor for RecordingExecutor {
    fn execute_action(&mut self, invocation: &ActionInvocation) -> Result<(), ActionError> {
        if let Some((_, message)) = self.failing.iter().find(|(a, _)| *a == invocation.action) {
            return Err(ActionError::new(message.clone()));
        }
        if let Some((action, left, message)) = &mut self.fail_after {
            if *action == invocation.action {
                if *left == 0 {
                    return Err(ActionError::new(message.clone()));
                }
                *left -= 1;
            }
        }
        self.log.push(Executed::Action(invocation.clone()));
        if let Some((action, stop)) = &self.stop_on {
            if *action == invocation.action {
                stop.request_stop();
            }
        }
        Ok(())
    }

    fn execute_named_command(
        &mut self,
        name: &str,
        _args: &serde_json::Value,
    ) -> Result<(), ActionError> {
        self.log.push(Executed::Command(name.to_string()));
        Ok(())
    }

    fn execute_line_command(&mut self, command: &str) -> Result<(), ActionError> {
        self.log.push(Executed::Line(format!(":{}", command)));
        Ok(())
    }

    fn cursor_count(&self) -> usize {
        self.cursors
    }

    fn show_status(&mut self, message: &str) {
        self.statuses.push(message.to_string());
    }
}

pub type TestSession = Session<RecordingExecutor, ManualScheduler>;

/// Keys in Vim notation
pub fn keys(notation: &str) -> KeySequence {
    parse_sequence(notation, DEFAULT_LEADER).unwrap()
}

/// `before -> after`, recursive or not
pub fn remap(before: &str, after: &str, recursive: bool) -> Remapping {
    Remapping::keys(keys(before), keys(after), recursive)
}

/// Builds remap tables family by family
#[derive(Default)]
pub struct TablesBuilder {
    entries: Vec<(MapMode, Remapping)>,
}

impl TablesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(mut self, mode: MapMode, before: &str, after: &str) -> Self {
        self.entries.push((mode, remap(before, after, true)));
        self
    }

    pub fn noremap(mut self, mode: MapMode, before: &str, after: &str) -> Self {
        self.entries.push((mode, remap(before, after, false)));
        self
    }

    pub fn remapping(mut self, mode: MapMode, remapping: Remapping) -> Self {
        self.entries.push((mode, remapping));
        self
    }

    pub fn build(self) -> RemapTables {
        let mut tables = RemapTables::new();
        for mode in MapMode::ALL {
            for recursive in [true, false] {
                let remappings: Vec<Remapping> = self
                    .entries
                    .iter()
                    .filter(|(m, r)| *m == mode && r.recursive == recursive)
                    .map(|(_, r)| r.clone())
                    .collect();
                if !remappings.is_empty() {
                    tables.insert(mode, recursive, RemapTable::new(remappings));
                }
            }
        }
        tables
    }
}

/// A session over the default catalog; the returned scheduler shares the
/// session's timers
pub fn session(tables: RemapTables) -> (TestSession, ManualScheduler) {
    session_with(tables, RemapSettings::default(), ActionMatcher::vim())
}

pub fn session_with(
    tables: RemapTables,
    settings: RemapSettings,
    matcher: ActionMatcher,
) -> (TestSession, ManualScheduler) {
    let scheduler = ManualScheduler::new();
    let session = Session::new(RecordingExecutor::new(), scheduler.clone())
        .with_remapper(Remapper::new(tables, settings))
        .with_matcher(matcher);
    (session, scheduler)
}

/// Type keys in Vim notation
pub fn type_keys(session: &mut TestSession, notation: &str) {
    session.handle_multiple_key_events(&keys(notation));
}

/// Fire the live timer and hand its keys to the session
pub fn fire_timeout(session: &mut TestSession, scheduler: &ManualScheduler) -> bool {
    match scheduler.fire() {
        Some(keys) => {
            session.handle_timeout(keys);
            true
        }
        None => false,
    }
}

pub fn char_key(c: char) -> Key {
    Key::char(c)
}

pub fn insert_mode(session: TestSession) -> TestSession {
    session.with_mode(Mode::Insert)
}
