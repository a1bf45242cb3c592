//! Buffered keys waiting for disambiguation, and the timer that ends the wait

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::actions::ActionMatch;
use crate::keymap::{Key, KeySequence};

use super::remapping::Remapping;
use super::table::RemapMatch;

/// Handle of an armed timer
pub type TimerId = u64;

/// Delivers `keys` back to the session once `delay` has passed
///
/// Implementations must not call back synchronously from [`Scheduler::arm`];
/// the fired keys are handed to `Session::handle_timeout` later.
pub trait Scheduler: Send {
    fn arm(&mut self, delay: Duration, keys: KeySequence) -> TimerId;
    fn cancel(&mut self, id: TimerId);
}

/// Per-session resolution state while keys are buffered
#[derive(Debug, Default)]
pub struct PendingResolution {
    /// The buffered keys
    pub keys: KeySequence,
    /// The buffered keys are a strict prefix of some remapping
    pub has_potential_remap: bool,
    /// A remapping that already matched completely but could still grow
    pub ambiguous_remap: Option<RemapMatch>,
    /// A built-in action that already matched completely but could still grow
    pub ambiguous_action: Option<ActionMatch>,
    /// Recursive remapping whose replay left the buffer behind
    pub timeout_carry: Option<Arc<Remapping>>,
    timer: Option<TimerId>,
}

impl PendingResolution {
    /// Arm the single timer, cancelling any previous one first
    pub fn arm_timer(&mut self, scheduler: &mut dyn Scheduler, delay: Duration, keys: KeySequence) {
        self.cancel_timer(scheduler);
        self.timer = Some(scheduler.arm(delay, keys));
    }

    pub fn cancel_timer(&mut self, scheduler: &mut dyn Scheduler) {
        if let Some(id) = self.timer.take() {
            scheduler.cancel(id);
        }
    }

    pub fn is_timer_armed(&self) -> bool {
        self.timer.is_some()
    }

    /// Whether nothing is buffered
    pub fn is_idle(&self) -> bool {
        !self.has_potential_remap && self.ambiguous_action.is_none() && self.keys.is_empty()
    }

    /// Whether `keys` (without the timeout sentinel) is what is buffered now
    pub fn is_current(&self, keys: &[Key]) -> bool {
        self.is_timer_armed() && self.keys == keys
    }

    /// Drop all buffered state; the timer must have been cancelled
    pub fn clear(&mut self) {
        debug_assert!(self.timer.is_none(), "clearing with a live timer");
        *self = Self::default();
    }
}

/// A scheduler driven by hand, for tests and deterministic replays
///
/// Clones share the same timers, so a test can keep one clone and give the
/// other to the session.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    inner: Arc<Mutex<ManualTimers>>,
}

#[derive(Debug, Default)]
struct ManualTimers {
    next_id: TimerId,
    armed: Vec<(TimerId, Duration, KeySequence)>,
    total_armed: usize,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live timers
    pub fn armed(&self) -> usize {
        self.inner.lock().armed.len()
    }

    /// Number of timers ever armed
    pub fn total_armed(&self) -> usize {
        self.inner.lock().total_armed
    }

    /// Delay of the live timer, if any
    pub fn delay(&self) -> Option<Duration> {
        self.inner.lock().armed.last().map(|(_, delay, _)| *delay)
    }

    /// Fire the oldest live timer, returning the keys it delivers
    pub fn fire(&self) -> Option<KeySequence> {
        let mut timers = self.inner.lock();
        if timers.armed.is_empty() {
            return None;
        }
        let (_, _, keys) = timers.armed.remove(0);
        Some(keys)
    }
}

impl Scheduler for ManualScheduler {
    fn arm(&mut self, delay: Duration, keys: KeySequence) -> TimerId {
        let mut timers = self.inner.lock();
        timers.next_id += 1;
        timers.total_armed += 1;
        let id = timers.next_id;
        timers.armed.push((id, delay, keys));
        id
    }

    fn cancel(&mut self, id: TimerId) {
        self.inner.lock().armed.retain(|(armed, _, _)| *armed != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arming_replaces_previous_timer() {
        let mut scheduler = ManualScheduler::new();
        let mut pending = PendingResolution::default();

        pending.arm_timer(&mut scheduler, Duration::from_millis(10), Key::chars("w"));
        pending.arm_timer(&mut scheduler, Duration::from_millis(10), Key::chars("ww"));

        assert_eq!(scheduler.armed(), 1);
        assert_eq!(scheduler.total_armed(), 2);
        assert_eq!(scheduler.fire(), Some(Key::chars("ww")));
        assert_eq!(scheduler.fire(), None);
    }

    #[test]
    fn test_cancel_clears_timer() {
        let mut scheduler = ManualScheduler::new();
        let mut pending = PendingResolution::default();

        pending.keys = Key::chars("g");
        pending.arm_timer(&mut scheduler, Duration::from_millis(10), Key::chars("g"));
        assert!(pending.is_current(&Key::chars("g")));

        pending.cancel_timer(&mut scheduler);
        assert!(!pending.is_timer_armed());
        assert!(!pending.is_current(&Key::chars("g")));
        assert_eq!(scheduler.armed(), 0);

        pending.clear();
        assert!(pending.is_idle());
    }
}
