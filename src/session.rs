//! Per-session key handling
//!
//! A [`Session`] owns everything that changes while keys are typed: the
//! current mode, the keys of the command being typed, the pending
//! resolution and the remap bookkeeping. Each key runs through
//!
//! ```text
//! force stop? → record → Remapper::send_key → ActionMatcher::classify → CommandExecutor
//! ```
//!
//! Keys a remapping expands to are scheduled on a [`ReplayStack`] and fed
//! back through the same pipeline from the root of the chain, so nesting
//! costs heap instead of call stack and only the map depth bounds it.
//!
//! `:map` family commands, whether typed on the command line or run by a
//! remapping, edit the session's remap tables instead of reaching the
//! executor.

use std::sync::Arc;
use std::time::Duration;

use crate::actions::{Action, ActionMatch, ActionMatcher, Classification, ExecutionStrategy};
use crate::executor::{ActionInvocation, CommandExecutor};
use crate::keymap::{display_keys, Key, KeySequence, MapMode, Mode};
use crate::remap::{
    parse_map_command, ActionError, Boundary, CommandInvocation, MapCommand, MapCommandError,
    MapCommandKind, Outcome, PendingResolution, RemapError, RemapExecutionState, RemapHost,
    RemapTables, Remapper, Remapping, Replay, ReplayKind, ReplayStack, Scheduler, Step,
    StopSignal,
};

/// What has been typed of the current command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedState {
    /// Every key of the command, count and register prefix included
    pub command_keys: KeySequence,
    /// Keys of the action being matched
    pub action_keys: KeySequence,
    /// Typed count, 0 when none
    pub count: usize,
    pub register: Option<char>,
    /// Index into `command_keys` where an operator's range starts
    pub operator_start: Option<usize>,
    /// Cleared while buffered keys are redispatched, so the first of them
    /// cannot start buffering again
    pub allow_potential_remap_on_first_key: bool,
}

impl Default for RecordedState {
    fn default() -> Self {
        Self {
            command_keys: Vec::new(),
            action_keys: Vec::new(),
            count: 0,
            register: None,
            operator_start: None,
            allow_potential_remap_on_first_key: true,
        }
    }
}

impl RecordedState {
    fn push(&mut self, key: Key) {
        self.command_keys.push(key);
        self.action_keys.push(key);
    }

    fn push_count_digit(&mut self, digit: u32) {
        self.count = self
            .count
            .saturating_mul(10)
            .saturating_add(digit as usize);
    }

    /// Drop the last `n` keys of the command
    fn forget(&mut self, n: usize) {
        let n = n.min(self.command_keys.len());
        self.command_keys.truncate(self.command_keys.len() - n);

        let from_action = n.min(self.action_keys.len());
        self.action_keys.truncate(self.action_keys.len() - from_action);
        if n > from_action {
            // forgot keys of an already applied count or register prefix
            self.count = 0;
            self.register = None;
        }

        if self
            .operator_start
            .is_some_and(|start| start > self.command_keys.len())
        {
            self.operator_start = None;
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Key handling state of one editor session
pub struct Session<E, S> {
    executor: E,
    scheduler: S,
    matcher: Arc<ActionMatcher>,
    remapper: Arc<Remapper>,
    mode: Mode,
    recorded: RecordedState,
    pending: PendingResolution,
    remap_state: RemapExecutionState,
    replays: ReplayStack,
    /// Text typed on the command line so far
    command_line: String,
}

impl<E: CommandExecutor, S: Scheduler> Session<E, S> {
    /// A session with the default action catalog and no remappings
    pub fn new(executor: E, scheduler: S) -> Self {
        Self {
            executor,
            scheduler,
            matcher: Arc::new(ActionMatcher::vim()),
            remapper: Arc::new(Remapper::default()),
            mode: Mode::Normal,
            recorded: RecordedState::default(),
            pending: PendingResolution::default(),
            remap_state: RemapExecutionState::default(),
            replays: ReplayStack::new(),
            command_line: String::new(),
        }
    }

    pub fn with_remapper(mut self, remapper: Remapper) -> Self {
        self.remapper = Arc::new(remapper);
        self
    }

    pub fn with_matcher(mut self, matcher: ActionMatcher) -> Self {
        self.matcher = Arc::new(matcher);
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Share the force-stop signal with whoever delivers keys
    pub fn with_stop_signal(mut self, stop: Arc<StopSignal>) -> Self {
        self.remap_state = RemapExecutionState::new(stop);
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn executor_mut(&mut self) -> &mut E {
        &mut self.executor
    }

    pub fn recorded(&self) -> &RecordedState {
        &self.recorded
    }

    /// Keys waiting for disambiguation
    pub fn pending_keys(&self) -> &[Key] {
        &self.pending.keys
    }

    pub fn stop_signal(&self) -> &Arc<StopSignal> {
        self.remap_state.stop_signal()
    }

    pub fn remapper(&self) -> &Remapper {
        &self.remapper
    }

    // ========================================================================
    // Entry points
    // ========================================================================

    /// Handle one typed key
    ///
    /// Returns whether the remap layer took the key. Errors are reported on
    /// the status line and never escape.
    pub fn handle_key_event(&mut self, key: Key) -> bool {
        if key.is_timeout_finished() {
            let mut keys = self.pending.keys.clone();
            keys.push(key);
            self.handle_timeout(keys);
            return true;
        }

        let result = self.dispatch(key);
        let by_remap = matches!(result, Ok(true));
        let result = result.and_then(|_| self.drain_replays());
        self.finish_chain(result);
        by_remap
    }

    /// Handle typed keys one after another
    pub fn handle_multiple_key_events(&mut self, keys: &[Key]) -> bool {
        keys.iter()
            .fold(false, |handled, key| self.handle_key_event(*key) || handled)
    }

    /// A timer armed for `keys` (ending in `<TimeoutFinished>`) has fired
    ///
    /// Ignored when the keys are no longer what is buffered.
    pub fn handle_timeout(&mut self, keys: KeySequence) {
        let buffered = match keys.split_last() {
            Some((last, rest)) if last.is_timeout_finished() => rest,
            _ => &keys[..],
        };
        if !self.pending.is_current(buffered) {
            tracing::debug!(keys = %display_keys(buffered), "ignoring stale timeout");
            return;
        }

        let result = if self.pending.has_potential_remap {
            let mut timer_keys = buffered.to_vec();
            timer_keys.push(Key::TIMEOUT_FINISHED);
            let remapper = Arc::clone(&self.remapper);
            remapper.send_key(&timer_keys, self).map(drop)
        } else if let Some(found) = self.pending.ambiguous_action.take() {
            self.cancel_timer();
            self.pending.clear();
            self.run_ambiguous_action(found)
        } else {
            Ok(())
        };
        let result = result.and_then(|()| self.drain_replays());
        self.finish_chain(result);
    }

    /// Swap in new remap tables, dropping anything buffered
    pub fn reload(&mut self, tables: RemapTables) {
        let settings = self.remapper.settings();
        self.cancel_timer();
        self.pending.clear();
        self.recorded.reset();
        self.remapper = Arc::new(Remapper::new(tables, settings));
        tracing::info!(remaps = self.remapper.tables().len(), "reloaded remap tables");
    }

    /// Run a command-line command, with or without its leading `:`
    ///
    /// `:map`, `:noremap`, `:unmap` and `:mapclear` in all their mode
    /// variants edit this session's remap tables. Anything else goes to the
    /// executor.
    pub fn execute_line_command(&mut self, line: &str) -> Result<(), ActionError> {
        let leader = self.remapper.settings().leader;
        match parse_map_command(line, leader) {
            Some(command) => Ok(self.apply_map_command(command?)?),
            None => {
                let line = line.trim_start();
                let line = line.strip_prefix(':').unwrap_or(line);
                self.executor.execute_line_command(line)
            }
        }
    }

    // ========================================================================
    // Pipeline
    // ========================================================================

    /// Mode remaps resolve in
    fn effective_mode(&self) -> Mode {
        if self.recorded.operator_start.is_some() {
            Mode::OperatorPending
        } else {
            self.mode
        }
    }

    /// Keys offered to the remapper: the command, or the range of a
    /// pending operator
    fn remap_keys(&self) -> &[Key] {
        let keys = &self.recorded.command_keys;
        let start = self.recorded.operator_start.unwrap_or(0).min(keys.len());
        &keys[start..]
    }

    /// Handle one key; returns whether the remap layer took it
    fn dispatch(&mut self, key: Key) -> Result<bool, RemapError> {
        self.recorded.push(key);

        if !self.remap_state.non_recursive {
            let keys = self.remap_keys().to_vec();
            let remapper = Arc::clone(&self.remapper);
            if remapper.send_key(&keys, self)? {
                return Ok(true);
            }
        }

        self.run_matcher()?;
        Ok(false)
    }

    /// Run scheduled replays until none are left
    ///
    /// A force stop is checked before every key. A failure unwinds to the
    /// innermost frame that absorbs it, or ends the chain when none does.
    fn drain_replays(&mut self) -> Result<Outcome, RemapError> {
        while let Some(step) = self.replays.step() {
            match step {
                Step::Key {
                    key,
                    kind,
                    reopens_buffering,
                } => {
                    if self.remap_state.stop_signal().is_stop_requested() {
                        tracing::debug!(waiting = self.replays.len(), "expansion stopped by user");
                        self.replays.clear();
                        return Ok(Outcome::Aborted);
                    }
                    self.remap_state.non_recursive = kind == ReplayKind::NoRemap;
                    if reopens_buffering {
                        self.recorded.allow_potential_remap_on_first_key = true;
                    }
                    if let Err(err) = self.dispatch(key) {
                        if !self.replays.unwind(&err) {
                            return Err(err);
                        }
                        tracing::warn!(error = %err, "replayed keys failed inside a remap");
                        self.executor.show_status(&err.to_string());
                        self.recorded.reset();
                        self.remap_state.map_depth = 0;
                    }
                }
                Step::Finished(Boundary::Recursive { remapping, .. }) => {
                    // keys still buffered came from this expansion
                    if self.pending.has_potential_remap && self.pending.timeout_carry.is_none() {
                        self.pending.timeout_carry = Some(remapping);
                    }
                }
                Step::Finished(_) => {}
            }
        }
        Ok(Outcome::Done)
    }

    fn run_matcher(&mut self) -> Result<(), RemapError> {
        let classification =
            self.matcher
                .classify(self.mode, &self.recorded.action_keys, self.recorded.count);

        match classification {
            Classification::Complete(found) => {
                if self.pending.ambiguous_action.is_some() {
                    self.cancel_timer();
                    self.pending.clear();
                }
                self.run_action(found)
            }
            Classification::Ambiguous(found) => {
                tracing::debug!(action = %found.action, "ambiguous action, waiting");
                self.pending.ambiguous_action = Some(found);
                self.buffer_action_keys();
                Ok(())
            }
            Classification::Potential => {
                if self.pending.ambiguous_action.is_some() {
                    self.buffer_action_keys();
                }
                if self.recorded.operator_start.is_none()
                    && self
                        .matcher
                        .operator_prefix(self.mode, &self.recorded.action_keys)
                {
                    self.recorded.operator_start = Some(self.recorded.command_keys.len());
                }
                Ok(())
            }
            Classification::NoMatch => {
                if let Some(found) = self.pending.ambiguous_action.take() {
                    self.cancel_timer();
                    self.pending.clear();
                    return self.run_ambiguous_action(found);
                }
                tracing::debug!(
                    mode = %self.mode,
                    keys = %display_keys(&self.recorded.action_keys),
                    "no action matches"
                );
                self.recorded.reset();
                Ok(())
            }
        }
    }

    /// Buffer the current keys behind the timer while an ambiguous action waits
    fn buffer_action_keys(&mut self) {
        self.pending.keys = self.remap_keys().to_vec();
        let mut timer_keys = self.pending.keys.clone();
        timer_keys.push(Key::TIMEOUT_FINISHED);
        let timeout = self.remapper.settings().timeout;
        self.arm_timer(timeout, timer_keys);
    }

    /// Run the shorter reading of ambiguous keys, then whatever followed it
    fn run_ambiguous_action(&mut self, found: ActionMatch) -> Result<(), RemapError> {
        let rest = self
            .recorded
            .action_keys
            .get(found.keys.len()..)
            .map(<[Key]>::to_vec)
            .unwrap_or_default();
        self.recorded.forget(rest.len());
        self.run_action(found)?;

        if !rest.is_empty() {
            let kind = if self.remap_state.non_recursive {
                ReplayKind::NoRemap
            } else {
                ReplayKind::Remap
            };
            self.replays.schedule(vec![Replay::new(&rest, kind)]);
        }
        Ok(())
    }

    fn run_action(&mut self, found: ActionMatch) -> Result<(), RemapError> {
        match found.action {
            Action::Count => {
                if let Some(digit) = found.captures.digit {
                    self.recorded.push_count_digit(digit);
                }
                self.recorded.action_keys.clear();
                return Ok(());
            }
            Action::SelectRegister => {
                self.recorded.register = found.captures.register;
                self.recorded.action_keys.clear();
                return Ok(());
            }
            _ => {}
        }

        // a real action ends any remap cycle
        self.remap_state.map_depth = 0;

        if let Some(line) = self.track_command_line(&found) {
            self.recorded.reset();
            if let Some(mode) = found.enters {
                self.set_mode(mode);
            }
            return Ok(self.execute_line_command(&line)?);
        }

        let invocation = ActionInvocation {
            action: found.action,
            mode: self.mode,
            keys: found.keys,
            count: self.recorded.count.max(1),
            has_count: self.recorded.count > 0,
            register: self.recorded.register,
            captures: found.captures,
            cursor: None,
        };
        tracing::debug!(action = %invocation.action, count = invocation.count, "running action");

        let result = self.invoke(found.strategy, invocation);
        self.recorded.reset();
        result?;

        if let Some(mode) = found.enters {
            self.set_mode(mode);
        }
        Ok(())
    }

    /// Follow the text typed on the command line
    ///
    /// Returns the line when it is executed and is a map command, which the
    /// session runs itself.
    fn track_command_line(&mut self, found: &ActionMatch) -> Option<String> {
        match found.action {
            Action::EnterCommandLine => self.command_line.clear(),
            Action::CommandLineChar => {
                if let Some(c) = found.captures.character.and_then(|k| k.as_char()) {
                    self.command_line.push(c);
                }
            }
            Action::CommandLineBackspace => {
                self.command_line.pop();
            }
            Action::CommandLineExecute => {
                let line = std::mem::take(&mut self.command_line);
                let leader = self.remapper.settings().leader;
                if parse_map_command(&line, leader).is_some() {
                    return Some(line);
                }
            }
            _ => {}
        }
        None
    }

    fn apply_map_command(&mut self, command: MapCommand) -> Result<(), MapCommandError> {
        let MapCommand {
            kind,
            modes,
            lhs,
            rhs,
            silent,
        } = command;

        let tables = match (kind, rhs) {
            (MapCommandKind::Map | MapCommandKind::Noremap, None) => {
                self.list_remappings(modes, &lhs);
                return Ok(());
            }
            (MapCommandKind::Map | MapCommandKind::Noremap, Some(rhs)) => {
                let recursive = kind == MapCommandKind::Map;
                let remapping = Remapping::keys(lhs, rhs, recursive).silent(silent);
                tracing::info!(remap = %remapping, "map command");
                self.remapper.tables().with_remapping(modes, &remapping)
            }
            (MapCommandKind::Unmap, _) => self
                .remapper
                .tables()
                .without(modes, &lhs)
                .ok_or(MapCommandError::NoSuchMapping)?,
            (MapCommandKind::Mapclear, _) => self.remapper.tables().cleared(modes),
        };

        // whatever is buffered was resolved against the old tables
        self.cancel_timer();
        self.pending.clear();
        self.remapper = Arc::new(self.remapper.with_tables(tables));
        tracing::debug!(remaps = self.remapper.tables().len(), "remap tables edited");
        Ok(())
    }

    /// Show remappings of these families starting with `prefix`
    fn list_remappings(&mut self, modes: &[MapMode], prefix: &[Key]) {
        let remapper = Arc::clone(&self.remapper);
        let mut shown = 0;
        for &mode in modes {
            for remapping in remapper.tables().listing(mode, prefix) {
                self.executor
                    .show_status(&format!("{} {}", map_mode_prefix(mode), remapping));
                shown += 1;
            }
        }
        if shown == 0 {
            self.executor.show_status("No mapping found");
        }
    }

    fn invoke(
        &mut self,
        strategy: ExecutionStrategy,
        mut invocation: ActionInvocation,
    ) -> Result<(), ActionError> {
        let cursors = self.executor.cursor_count().max(1);
        match strategy {
            ExecutionStrategy::RunOnce => self.executor.execute_action(&invocation),
            ExecutionStrategy::PerCursor => {
                for cursor in 0..cursors {
                    invocation.cursor = Some(cursor);
                    self.executor.execute_action(&invocation)?;
                }
                Ok(())
            }
            ExecutionStrategy::PerCursorTimesCount => {
                let times = invocation.count;
                invocation.count = 1;
                for cursor in 0..cursors {
                    invocation.cursor = Some(cursor);
                    for _ in 0..times {
                        self.executor.execute_action(&invocation)?;
                    }
                }
                Ok(())
            }
        }
    }

    fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            tracing::debug!(from = %self.mode, to = %mode, "mode change");
            self.mode = mode;
        }
    }

    /// End of a root chain: report failures and reset per-chain state
    fn finish_chain(&mut self, result: Result<Outcome, RemapError>) {
        self.replays.clear();
        match result {
            Ok(Outcome::Done) => {}
            Ok(Outcome::Aborted) => {
                self.cancel_timer();
                self.pending.clear();
                self.recorded.reset();
            }
            Err(err) => {
                tracing::warn!(error = %err, "key handling failed");
                self.executor.show_status(&err.to_string());
                self.cancel_timer();
                self.pending.clear();
                self.recorded.reset();
            }
        }
        self.remap_state.finish_chain();
    }
}

impl<E: CommandExecutor, S: Scheduler> RemapHost for Session<E, S> {
    fn mode(&self) -> Mode {
        self.effective_mode()
    }

    fn take_count(&mut self) -> usize {
        std::mem::take(&mut self.recorded.count)
    }

    fn pending(&mut self) -> &mut PendingResolution {
        &mut self.pending
    }

    fn state(&mut self) -> &mut RemapExecutionState {
        &mut self.remap_state
    }

    fn allow_potential_remap_on_first_key(&self) -> bool {
        self.recorded.allow_potential_remap_on_first_key
    }

    fn set_allow_potential_remap_on_first_key(&mut self, allow: bool) {
        self.recorded.allow_potential_remap_on_first_key = allow;
    }

    fn arm_timer(&mut self, delay: Duration, keys: KeySequence) {
        self.pending.arm_timer(&mut self.scheduler, delay, keys);
    }

    fn cancel_timer(&mut self) {
        self.pending.cancel_timer(&mut self.scheduler);
    }

    fn forget_keys(&mut self, n: usize) {
        self.recorded.forget(n);
    }

    fn reset_command(&mut self) {
        self.recorded.reset();
    }

    fn schedule(&mut self, runs: Vec<Replay>) {
        self.replays.schedule(runs);
    }

    fn run_command(&mut self, command: &CommandInvocation) -> Result<(), ActionError> {
        tracing::debug!(command = %command, "running remapped command");
        match command.line_command() {
            Some(line) => self.execute_line_command(line),
            None => self
                .executor
                .execute_named_command(&command.command, &command.args),
        }
    }

    fn report(&mut self, message: &str) {
        self.executor.show_status(message);
    }
}

/// Mode column of a `:map` listing
fn map_mode_prefix(mode: MapMode) -> &'static str {
    match mode {
        MapMode::Normal => "n",
        MapMode::Insert => "i",
        MapMode::Visual => "v",
        MapMode::OperatorPending => "o",
        MapMode::CommandLine => "c",
    }
}
