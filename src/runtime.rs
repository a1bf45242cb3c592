//! Sessions on a tokio task queue
//!
//! A [`SessionHandle`] is what a host holds: keys sent through it are
//! queued on the session's own queue name, so they are handled strictly in
//! order, and remap timeouts fire by queueing a continuation on that same
//! name. The stop signal is the one thing set outside the queue.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::executor::CommandExecutor;
use crate::keymap::{display_keys, Key, KeySequence};
use crate::remap::{RemapTables, Scheduler, StopSignal, TimerId};
use crate::session::Session;
use crate::task_queue::TaskQueue;

type FireFn = Arc<dyn Fn(KeySequence) + Send + Sync>;

/// Scheduler backed by `tokio::time::sleep`
///
/// Holds at most one live timer; arming again aborts the previous one.
pub struct TokioScheduler {
    handle: Handle,
    fire: FireFn,
    next_id: TimerId,
    live: Option<(TimerId, JoinHandle<()>)>,
}

impl TokioScheduler {
    /// `fire` receives the timer keys once the delay has passed
    pub fn new(handle: Handle, fire: impl Fn(KeySequence) + Send + Sync + 'static) -> Self {
        Self {
            handle,
            fire: Arc::new(fire),
            next_id: 0,
            live: None,
        }
    }
}

impl Scheduler for TokioScheduler {
    fn arm(&mut self, delay: Duration, keys: KeySequence) -> TimerId {
        if let Some((_, previous)) = self.live.take() {
            previous.abort();
        }
        self.next_id += 1;
        let id = self.next_id;

        let fire = Arc::clone(&self.fire);
        let task = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            (*fire)(keys);
        });
        self.live = Some((id, task));
        id
    }

    fn cancel(&mut self, id: TimerId) {
        if self.live.as_ref().is_some_and(|(live, _)| *live == id) {
            if let Some((_, task)) = self.live.take() {
                task.abort();
            }
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        if let Some((_, task)) = self.live.take() {
            task.abort();
        }
    }
}

type SharedSession<E> = Arc<Mutex<Session<E, TokioScheduler>>>;

/// A session driven through a named task queue
pub struct SessionHandle<E> {
    session: SharedSession<E>,
    queue: TaskQueue,
    queue_name: String,
    stop: Arc<StopSignal>,
}

impl<E> Clone for SessionHandle<E> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            queue: self.queue.clone(),
            queue_name: self.queue_name.clone(),
            stop: Arc::clone(&self.stop),
        }
    }
}

impl<E: CommandExecutor + 'static> SessionHandle<E> {
    /// Build a session on `queue`, under its own `queue_name`
    ///
    /// `build` gets the session's timer scheduler and returns the
    /// configured session.
    pub fn spawn(
        queue: TaskQueue,
        queue_name: impl Into<String>,
        build: impl FnOnce(TokioScheduler) -> Session<E, TokioScheduler>,
    ) -> Self {
        let queue_name = queue_name.into();
        let stop = StopSignal::new();

        let session = Arc::new_cyclic(|weak: &Weak<Mutex<Session<E, TokioScheduler>>>| {
            let weak = weak.clone();
            let timer_queue = queue.clone();
            let timer_name = queue_name.clone();
            let scheduler = TokioScheduler::new(queue.handle().clone(), move |keys| {
                tracing::trace!(keys = %display_keys(&keys), "remap timeout fired");
                let weak = weak.clone();
                timer_queue.enqueue_on(&timer_name, false, move || async move {
                    if let Some(session) = weak.upgrade() {
                        session.lock().handle_timeout(keys);
                    }
                    Ok(())
                });
            });
            Mutex::new(build(scheduler).with_stop_signal(Arc::clone(&stop)))
        });

        Self {
            session,
            queue,
            queue_name,
            stop,
        }
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    /// Queue a typed key
    ///
    /// `<C-c>` and `<Esc>` also stop a running recursive expansion right
    /// away, before they reach the queue.
    pub fn send_key(&self, key: Key) {
        if (key == Key::ctrl('c') || key == Key::ESCAPE) && self.stop.request_stop() {
            tracing::debug!(key = %key, "force stop requested");
        }

        let session = Arc::clone(&self.session);
        self.queue.enqueue_on(&self.queue_name, false, move || async move {
            session.lock().handle_key_event(key);
            Ok(())
        });
    }

    pub fn send_keys(&self, keys: &[Key]) {
        for &key in keys {
            self.send_key(key);
        }
    }

    /// Queue a table swap; keys queued before it still see the old tables
    pub fn reload(&self, tables: RemapTables) {
        let session = Arc::clone(&self.session);
        self.queue.enqueue_on(&self.queue_name, true, move || async move {
            session.lock().reload(tables);
            Ok(())
        });
    }

    /// Wait until every queued key (and fired timeout) is handled
    pub async fn wait_idle(&self) {
        self.queue.wait_idle(&self.queue_name).await;
    }

    /// Inspect or drive the session directly
    ///
    /// Must not be called from inside a task on this session's queue.
    pub fn with_session<R>(&self, f: impl FnOnce(&mut Session<E, TokioScheduler>) -> R) -> R {
        f(&mut self.session.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_armed_timer_fires_once() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let mut scheduler = TokioScheduler::new(Handle::current(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        scheduler.arm(Duration::from_millis(5), Key::chars("a"));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rearm_and_cancel_abort_pending_timers() {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&fired);
        let mut scheduler = TokioScheduler::new(Handle::current(), move |keys| {
            log.lock().push(display_keys(&keys));
        });

        let first = scheduler.arm(Duration::from_millis(20), Key::chars("a"));
        let second = scheduler.arm(Duration::from_millis(20), Key::chars("ab"));
        // stale id leaves the live timer alone
        scheduler.cancel(first);
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(*fired.lock(), vec!["ab"]);

        let third = scheduler.arm(Duration::from_millis(20), Key::chars("x"));
        assert_ne!(second, third);
        scheduler.cancel(third);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(*fired.lock(), vec!["ab"]);
    }
}
