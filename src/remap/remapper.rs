//! The remapper: resolves typed keys against the remap tables
//!
//! ```text
//! keys → strip <TimeoutFinished> → candidate (longest suffix) + potential (strict prefix)
//!      → break buffered resolution | buffer and arm timer | expand candidate | decline
//! ```
//!
//! The remapper owns no per-session state. Everything mutable lives in the
//! [`RemapHost`] (the session), which the remapper drives through a narrow
//! interface so the same tables can serve many sessions. Expansions are
//! handed back to the host as [`Replay`] frames rather than run in place.

use std::sync::Arc;
use std::time::Duration;

use crate::keymap::{display_keys, Key, KeySequence, Mode, DEFAULT_LEADER};

use super::error::{ActionError, RemapError};
use super::pending::PendingResolution;
use super::remapping::{CommandInvocation, RemapAction, Remapping};
use super::replay::{Boundary, Replay, ReplayKind};
use super::state::RemapExecutionState;
use super::table::{RemapMatch, RemapTables};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);
pub const DEFAULT_MAX_MAP_DEPTH: usize = 1000;

/// Settings that apply to every remap table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemapSettings {
    /// How long an ambiguous sequence waits for more keys
    pub timeout: Duration,
    /// Expansions allowed since the last real action
    pub max_map_depth: usize,
    /// What `<leader>` stands for in map commands
    pub leader: Key,
}

impl Default for RemapSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_map_depth: DEFAULT_MAX_MAP_DEPTH,
            leader: DEFAULT_LEADER,
        }
    }
}

/// The session side of remapping
pub trait RemapHost {
    /// Mode remaps are resolved in (operator pending while an operator waits)
    fn mode(&self) -> Mode;

    /// Consume the typed count, leaving none behind
    fn take_count(&mut self) -> usize;

    fn pending(&mut self) -> &mut PendingResolution;

    fn state(&mut self) -> &mut RemapExecutionState;

    fn allow_potential_remap_on_first_key(&self) -> bool;

    fn set_allow_potential_remap_on_first_key(&mut self, allow: bool);

    /// (Re)arm the single timer that redelivers `keys`
    fn arm_timer(&mut self, delay: Duration, keys: KeySequence);

    fn cancel_timer(&mut self);

    /// Drop the last `n` keys of the command being typed
    fn forget_keys(&mut self, n: usize);

    /// Drop the whole command being typed
    fn reset_command(&mut self);

    /// Queue keys to go back through the pipeline after the current key
    ///
    /// `runs` go in the order given, ahead of anything queued before.
    fn schedule(&mut self, runs: Vec<Replay>);

    fn run_command(&mut self, command: &CommandInvocation) -> Result<(), ActionError>;

    /// Show a message on the status line
    fn report(&mut self, message: &str);
}

/// Resolves keys against immutable remap tables
#[derive(Debug, Clone, Default)]
pub struct Remapper {
    tables: RemapTables,
    settings: RemapSettings,
}

impl Remapper {
    pub fn new(tables: RemapTables, settings: RemapSettings) -> Self {
        Self { tables, settings }
    }

    pub fn tables(&self) -> &RemapTables {
        &self.tables
    }

    pub fn settings(&self) -> RemapSettings {
        self.settings
    }

    /// The same settings over other tables
    pub fn with_tables(&self, tables: RemapTables) -> Self {
        Self::new(tables, self.settings)
    }

    /// Offer the keys of the command being typed to the remap layer
    ///
    /// Returns whether a remapping took them; when none did they should go
    /// to the action matcher. A trailing `<TimeoutFinished>` forces a
    /// decision. Expansions are scheduled on the host, never run here.
    pub fn send_key<H: RemapHost + ?Sized>(
        &self,
        keys: &[Key],
        host: &mut H,
    ) -> Result<bool, RemapError> {
        let map_mode = host.mode().map_mode();
        if !self.tables.covers(map_mode) {
            return Ok(false);
        }

        let (keys, allow_buffering) = match keys.split_last() {
            Some((last, rest)) if last.is_timeout_finished() => (rest, false),
            _ => (keys, true),
        };

        let candidate = self.tables.find_candidate(map_mode, keys);
        let is_potential = self.tables.is_potential(map_mode, keys);

        if candidate.is_none()
            && host.pending().has_potential_remap
            && (!is_potential || !allow_buffering)
        {
            self.resolve_break(keys, host)?;
            return Ok(true);
        }

        if is_potential && allow_buffering && host.allow_potential_remap_on_first_key() {
            tracing::debug!(keys = %display_keys(keys), "buffering potential remap");
            let pending = host.pending();
            pending.has_potential_remap = true;
            if candidate.is_some() {
                pending.ambiguous_remap = candidate;
            }
            pending.keys = keys.to_vec();

            let mut timer_keys = keys.to_vec();
            timer_keys.push(Key::TIMEOUT_FINISHED);
            host.arm_timer(self.settings.timeout, timer_keys);
            return Ok(true);
        }

        match candidate {
            Some(found) => {
                host.cancel_timer();
                host.pending().clear();
                self.execute(found, keys, host)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// The buffered keys can no longer grow into a remapping
    fn resolve_break<H: RemapHost + ?Sized>(
        &self,
        keys: &[Key],
        host: &mut H,
    ) -> Result<(), RemapError> {
        host.cancel_timer();
        let pending = std::mem::take(host.pending());

        if let Some(found) = pending.ambiguous_remap.filter(|f| f.end() <= keys.len()) {
            tracing::debug!(remap = %found.remapping, "resolving ambiguous remap");
            return self.execute(found, keys, host);
        }

        tracing::debug!(keys = %display_keys(keys), "redispatching buffered keys");
        host.forget_keys(keys.len());
        host.set_allow_potential_remap_on_first_key(false);

        if pending.timeout_carry.is_some() {
            // keys left over from a recursive expansion, then the user's own
            let (buffered, rest) = keys.split_at(pending.keys.len().min(keys.len()));
            let expanding = host.state().stop_signal().enter_recursive();
            let mut runs = vec![
                Replay::new(buffered, ReplayKind::Remap).bounded(Boundary::carried(expanding)),
            ];
            if !rest.is_empty() {
                runs.push(Replay::new(rest, ReplayKind::Remap).reopening_buffering());
            }
            host.schedule(runs);
            return Ok(());
        }

        host.schedule(vec![Replay::new(keys, ReplayKind::Remap)]);
        Ok(())
    }

    /// Expand a matched remapping; keys after its `before` are redispatched
    fn execute<H: RemapHost + ?Sized>(
        &self,
        found: RemapMatch,
        keys: &[Key],
        host: &mut H,
    ) -> Result<(), RemapError> {
        let remapping = found.remapping;
        let leftover = &keys[found.start + remapping.before.len()..];
        host.forget_keys(keys.len() - found.start);

        let depth = {
            let state = host.state();
            state.map_depth += 1;
            state.map_depth
        };
        if depth >= self.settings.max_map_depth {
            tracing::warn!(depth, remap = %remapping, "remap expansion too deep");
            return Err(RemapError::RecursiveMapping);
        }
        tracing::debug!(depth, remap = %remapping, "expanding remap");

        let mut runs = match &remapping.action {
            RemapAction::Keys(after) if remapping.recursive => {
                expand_recursive(&remapping, after, host)
            }
            RemapAction::Keys(after) => {
                vec![Replay::new(after, ReplayKind::NoRemap).bounded(Boundary::NonRecursive)]
            }
            RemapAction::Commands(commands) => {
                run_commands(&remapping, commands, host)?;
                Vec::new()
            }
        };

        if !leftover.is_empty() {
            runs.push(Replay::new(leftover, ReplayKind::Remap));
        }
        host.schedule(runs);
        Ok(())
    }
}

fn expand_recursive<H: RemapHost + ?Sized>(
    remapping: &Arc<Remapping>,
    after: &[Key],
    host: &mut H,
) -> Vec<Replay> {
    let expanding = host.state().stop_signal().enter_recursive();
    let boundary = Boundary::recursive(Arc::clone(remapping), expanding);

    // `ab -> abcd` must not re-trigger itself on its own leading `ab`
    match after.strip_prefix(remapping.before.as_slice()) {
        Some(rest) => vec![
            Replay::new(&remapping.before, ReplayKind::NoRemap),
            Replay::new(rest, ReplayKind::Remap).bounded(boundary),
        ],
        None => vec![Replay::new(after, ReplayKind::Remap).bounded(boundary)],
    }
}

fn run_commands<H: RemapHost + ?Sized>(
    remapping: &Remapping,
    commands: &[CommandInvocation],
    host: &mut H,
) -> Result<(), RemapError> {
    let count = host.take_count().max(1);
    host.reset_command();

    for _ in 0..count {
        for command in commands {
            if let Err(err) = host.run_command(command) {
                if remapping.recursive {
                    return Err(err.into());
                }
                tracing::warn!(command = %command, error = %err, "remapped command failed");
                host.report(err.message());
                return Ok(());
            }
        }
    }

    if !remapping.silent {
        let shown: Vec<&str> = commands.iter().map(|c| c.command.as_str()).collect();
        host.report(&shown.join(" | "));
    }
    Ok(())
}
