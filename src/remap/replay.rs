//! Work-list of keys waiting to go back through the pipeline
//!
//! Expanding a remapping never re-enters the pipeline. The remapper
//! schedules [`Replay`] frames on the session's [`ReplayStack`] and the
//! session drains them at the root of the chain, so nested expansions live
//! on the heap and only the map depth limits them.
//!
//! ```text
//! Q → jQ        [j Q]▸Recursive
//! j runs        [Q]▸Recursive
//! Q → jQ        [ ]▸Recursive  [j Q]▸Recursive
//! ```

use std::sync::Arc;

use crate::keymap::{Key, KeySequence};

use super::error::RemapError;
use super::remapping::Remapping;
use super::state::ExpansionGuard;

/// How replayed keys are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayKind {
    /// Keys may trigger remappings
    Remap,
    /// Keys go straight to the action matcher
    NoRemap,
}

/// What ends with a frame
#[derive(Debug, Default)]
pub enum Boundary {
    /// The keys just continue whatever scheduled them
    #[default]
    None,
    /// Expansion of a recursive remapping, live for force stops until it ends
    Recursive {
        remapping: Arc<Remapping>,
        _expanding: ExpansionGuard,
    },
    /// Expansion of a non-recursive remapping: one atomic step, so action
    /// errors end here
    NonRecursive,
    /// Buffered keys of a recursive expansion, redispatched after the user
    /// broke the buffering. Any failure ends here so the user's own keys
    /// still run.
    Carried { _expanding: ExpansionGuard },
}

impl Boundary {
    pub fn recursive(remapping: Arc<Remapping>, expanding: ExpansionGuard) -> Self {
        Boundary::Recursive {
            remapping,
            _expanding: expanding,
        }
    }

    pub fn carried(expanding: ExpansionGuard) -> Self {
        Boundary::Carried {
            _expanding: expanding,
        }
    }

    /// Whether an error raised inside the frame stops here
    pub fn absorbs(&self, err: &RemapError) -> bool {
        match self {
            Boundary::NonRecursive => matches!(err, RemapError::Action(_)),
            Boundary::Carried { .. } => true,
            Boundary::None | Boundary::Recursive { .. } => false,
        }
    }
}

/// Keys scheduled for replay
#[derive(Debug)]
pub struct Replay {
    keys: KeySequence,
    next: usize,
    kind: ReplayKind,
    boundary: Boundary,
    /// Let the first key start buffering again
    reopens_buffering: bool,
}

impl Replay {
    pub fn new(keys: &[Key], kind: ReplayKind) -> Self {
        Self {
            keys: keys.to_vec(),
            next: 0,
            kind,
            boundary: Boundary::None,
            reopens_buffering: false,
        }
    }

    pub fn bounded(mut self, boundary: Boundary) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn reopening_buffering(mut self) -> Self {
        self.reopens_buffering = true;
        self
    }

    /// Keys not yet replayed
    pub fn keys(&self) -> &[Key] {
        &self.keys[self.next..]
    }

    pub fn kind(&self) -> ReplayKind {
        self.kind
    }

    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }
}

/// The next thing to do with scheduled replays
#[derive(Debug)]
pub enum Step {
    Key {
        key: Key,
        kind: ReplayKind,
        reopens_buffering: bool,
    },
    /// A frame ran out of keys
    Finished(Boundary),
}

/// Frames waiting to run, innermost last
#[derive(Debug, Default)]
pub struct ReplayStack {
    frames: Vec<Replay>,
}

impl ReplayStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `runs` in the order given, ahead of everything already waiting
    pub fn schedule(&mut self, runs: Vec<Replay>) {
        self.frames.extend(runs.into_iter().rev());
    }

    pub fn step(&mut self) -> Option<Step> {
        let frame = self.frames.last_mut()?;
        match frame.keys.get(frame.next).copied() {
            Some(key) => {
                frame.next += 1;
                Some(Step::Key {
                    key,
                    kind: frame.kind,
                    reopens_buffering: std::mem::take(&mut frame.reopens_buffering),
                })
            }
            None => self.frames.pop().map(|frame| Step::Finished(frame.boundary)),
        }
    }

    /// Drop frames up to and including the innermost one that absorbs `err`
    ///
    /// Returns false when nothing absorbs it, leaving the stack empty.
    pub fn unwind(&mut self, err: &RemapError) -> bool {
        while let Some(frame) = self.frames.pop() {
            if frame.boundary.absorbs(err) {
                return true;
            }
        }
        false
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames waiting, finished or not
    pub fn len(&self) -> usize {
        self.frames.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remap::error::ActionError;
    use crate::remap::state::StopSignal;

    fn drain_keys(stack: &mut ReplayStack) -> String {
        let mut typed = String::new();
        while let Some(step) = stack.step() {
            if let Step::Key { key, .. } = step {
                typed.push_str(&key.to_string());
            }
        }
        typed
    }

    fn action_error() -> RemapError {
        ActionError::new("E20: no such line").into()
    }

    #[test]
    fn test_runs_keep_their_order_ahead_of_older_frames() {
        let mut stack = ReplayStack::new();
        stack.schedule(vec![Replay::new(&Key::chars("xyz"), ReplayKind::Remap)]);
        assert!(matches!(stack.step(), Some(Step::Key { .. })));

        stack.schedule(vec![
            Replay::new(&Key::chars("ab"), ReplayKind::NoRemap),
            Replay::new(&Key::chars("c"), ReplayKind::Remap),
        ]);
        assert_eq!(drain_keys(&mut stack), "abcyz");
        assert!(stack.is_empty());
    }

    #[test]
    fn test_step_reports_kind_and_reopened_buffering_once() {
        let mut stack = ReplayStack::new();
        stack.schedule(vec![
            Replay::new(&Key::chars("jk"), ReplayKind::NoRemap).reopening_buffering(),
        ]);

        match stack.step() {
            Some(Step::Key {
                kind,
                reopens_buffering,
                ..
            }) => {
                assert_eq!(kind, ReplayKind::NoRemap);
                assert!(reopens_buffering);
            }
            other => panic!("expected a key, got {:?}", other),
        }
        assert!(matches!(
            stack.step(),
            Some(Step::Key {
                reopens_buffering: false,
                ..
            })
        ));
        assert!(matches!(stack.step(), Some(Step::Finished(Boundary::None))));
        assert!(stack.step().is_none());
    }

    #[test]
    fn test_finished_frames_release_their_expansion() {
        let stop = StopSignal::new();
        let remapping = Arc::new(Remapping::keys(Key::chars("Q"), Key::chars("j"), true));
        let mut stack = ReplayStack::new();
        stack.schedule(vec![Replay::new(&Key::chars("j"), ReplayKind::Remap)
            .bounded(Boundary::recursive(remapping, stop.enter_recursive()))]);

        stack.step();
        assert!(stop.is_expanding());
        let finished = stack.step();
        assert!(matches!(finished, Some(Step::Finished(Boundary::Recursive { .. }))));
        drop(finished);
        assert!(!stop.is_expanding());
    }

    #[test]
    fn test_action_error_stops_at_non_recursive_boundary() {
        let mut stack = ReplayStack::new();
        stack.schedule(vec![
            Replay::new(&Key::chars("Gj"), ReplayKind::NoRemap).bounded(Boundary::NonRecursive),
            Replay::new(&Key::chars("x"), ReplayKind::Remap),
        ]);
        stack.step();

        assert!(stack.unwind(&action_error()));
        assert_eq!(drain_keys(&mut stack), "x");
    }

    #[test]
    fn test_depth_error_passes_non_recursive_boundary() {
        let mut stack = ReplayStack::new();
        stack.schedule(vec![
            Replay::new(&Key::chars("a"), ReplayKind::NoRemap).bounded(Boundary::NonRecursive),
        ]);

        assert!(!stack.unwind(&RemapError::RecursiveMapping));
        assert!(stack.is_empty());
    }

    #[test]
    fn test_carried_keys_absorb_every_error() {
        let stop = StopSignal::new();
        let mut stack = ReplayStack::new();
        stack.schedule(vec![
            Replay::new(&Key::chars("jfill"), ReplayKind::Remap)
                .bounded(Boundary::carried(stop.enter_recursive())),
            Replay::new(&Key::chars("x"), ReplayKind::Remap).reopening_buffering(),
        ]);
        stack.step();
        // a nested recursive expansion fails inside the carried keys
        let remapping = Arc::new(Remapping::keys(Key::chars("f"), Key::chars("G"), true));
        stack.schedule(vec![Replay::new(&Key::chars("G"), ReplayKind::Remap)
            .bounded(Boundary::recursive(remapping, stop.enter_recursive()))]);

        assert!(stack.unwind(&RemapError::RecursiveMapping));
        assert!(!stop.is_expanding());
        assert_eq!(stack.len(), 1);
        assert_eq!(drain_keys(&mut stack), "x");
    }

    #[test]
    fn test_recursive_boundary_lets_errors_through() {
        let stop = StopSignal::new();
        let remapping = Arc::new(Remapping::keys(Key::chars("x"), Key::chars("Gj"), true));
        let mut stack = ReplayStack::new();
        stack.schedule(vec![
            Replay::new(&Key::chars("Gj"), ReplayKind::Remap)
                .bounded(Boundary::recursive(remapping, stop.enter_recursive())),
            Replay::new(&Key::chars("k"), ReplayKind::Remap),
        ]);
        stack.step();

        assert!(!stack.unwind(&action_error()));
        assert!(stack.is_empty());
        assert!(!stop.is_expanding());
    }
}
