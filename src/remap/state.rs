//! Per-session remap execution state and the force-stop signal

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Cooperative cancellation of recursive expansions
///
/// Shared between the session and whoever delivers keys to it, so a stop
/// can be requested while the session is busy replaying.
#[derive(Debug, Default)]
pub struct StopSignal {
    requested: AtomicBool,
    recursive_expansions: AtomicUsize,
}

impl StopSignal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Request a stop if a recursive expansion is running
    ///
    /// Returns whether the request was taken.
    pub fn request_stop(&self) -> bool {
        if self.is_expanding() {
            self.requested.store(true, Ordering::SeqCst);
            true
        } else {
            false
        }
    }

    pub fn is_stop_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.requested.store(false, Ordering::SeqCst);
    }

    pub fn is_expanding(&self) -> bool {
        self.recursive_expansions.load(Ordering::SeqCst) > 0
    }

    /// Mark a recursive expansion as live until the guard drops
    pub fn enter_recursive(self: &Arc<Self>) -> ExpansionGuard {
        self.recursive_expansions.fetch_add(1, Ordering::SeqCst);
        ExpansionGuard(Arc::clone(self))
    }
}

/// Keeps a recursive expansion marked as live
#[derive(Debug)]
pub struct ExpansionGuard(Arc<StopSignal>);

impl Drop for ExpansionGuard {
    fn drop(&mut self) {
        self.0.recursive_expansions.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Remap bookkeeping for one root chain
#[derive(Debug)]
pub struct RemapExecutionState {
    /// Nested expansions since the last real action
    pub map_depth: usize,
    /// A non-recursive replay is running, so remaps are not matched
    pub non_recursive: bool,
    stop: Arc<StopSignal>,
}

impl Default for RemapExecutionState {
    fn default() -> Self {
        Self::new(StopSignal::new())
    }
}

impl RemapExecutionState {
    pub fn new(stop: Arc<StopSignal>) -> Self {
        Self {
            map_depth: 0,
            non_recursive: false,
            stop,
        }
    }

    pub fn stop_signal(&self) -> &Arc<StopSignal> {
        &self.stop
    }

    /// Reset at the end of a root chain
    pub fn finish_chain(&mut self) {
        self.map_depth = 0;
        self.non_recursive = false;
        self.stop.clear();
    }
}
