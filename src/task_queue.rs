//! Named task queues that serialize asynchronous work
//!
//! Tasks sharing a queue name run strictly one after another: task N+1
//! starts only after task N has settled (finished, failed or panicked).
//! Different names progress independently on the tokio runtime.
//!
//! ```text
//! enqueue("session-1", A) ─┐
//! enqueue("session-1", B) ─┼→ lane "session-1": A → B   (one run loop)
//! enqueue("timers", C)    ──→ lane "timers":    C       (concurrent)
//! ```

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Context as _;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::Notify;

/// Queue used when no name is given
pub const DEFAULT_QUEUE: &str = "default";

type BoxTask = Box<dyn FnOnce() -> BoxFuture<'static, anyhow::Result<()>> + Send>;

struct QueuedTask {
    id: u64,
    run: Option<BoxTask>,
    high_priority: bool,
    /// Claimed by the run loop; nothing may be queued ahead of it
    running: bool,
}

/// A queue name with a live run loop. Lanes exist only while non-empty.
#[derive(Default)]
struct Lane {
    tasks: VecDeque<QueuedTask>,
}

struct Inner {
    lanes: Mutex<HashMap<String, Lane>>,
    idle: Notify,
    next_id: AtomicU64,
    handle: Handle,
}

/// Serializes tasks per queue name
#[derive(Clone)]
pub struct TaskQueue {
    inner: Arc<Inner>,
}

impl TaskQueue {
    /// A queue that spawns its run loops on `handle`
    pub fn new(handle: Handle) -> Self {
        Self {
            inner: Arc::new(Inner {
                lanes: Mutex::new(HashMap::new()),
                idle: Notify::new(),
                next_id: AtomicU64::new(0),
                handle,
            }),
        }
    }

    /// A queue on the runtime we are currently running in
    pub fn from_current() -> anyhow::Result<Self> {
        let handle = Handle::try_current().context("task queue needs a tokio runtime")?;
        Ok(Self::new(handle))
    }

    pub fn handle(&self) -> &Handle {
        &self.inner.handle
    }

    /// Queue a normal-priority task on the default queue
    pub fn enqueue<F, Fut>(&self, task: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.enqueue_on(DEFAULT_QUEUE, false, task);
    }

    /// Queue a task on `queue_name`
    ///
    /// High-priority tasks go right after the last queued high-priority
    /// task, ahead of normal ones, but never ahead of the running task.
    /// Starts a run loop when the name is idle.
    pub fn enqueue_on<F, Fut>(&self, queue_name: &str, high_priority: bool, task: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let run: BoxTask = Box::new(move || task().boxed());
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        let start_loop = {
            let mut lanes = self.inner.lanes.lock();
            let lane = lanes.entry(queue_name.to_string()).or_default();
            let idle = lane.tasks.is_empty();
            let queued = QueuedTask {
                id,
                run: Some(run),
                high_priority,
                running: idle,
            };

            if high_priority {
                let at = lane
                    .tasks
                    .iter()
                    .position(|t| !t.running && !t.high_priority)
                    .unwrap_or(lane.tasks.len());
                lane.tasks.insert(at, queued);
            } else {
                lane.tasks.push_back(queued);
            }
            idle
        };

        tracing::trace!(queue = queue_name, task = id, high_priority, "task queued");

        if start_loop {
            let inner = Arc::clone(&self.inner);
            let name = queue_name.to_string();
            self.inner.handle.spawn(run_lane(inner, name));
        }
    }

    /// Whether a run loop is live for `queue_name`
    pub fn is_active(&self, queue_name: &str) -> bool {
        self.inner.lanes.lock().contains_key(queue_name)
    }

    /// Tasks queued on `queue_name`, the running one included
    pub fn len(&self, queue_name: &str) -> usize {
        self.inner
            .lanes
            .lock()
            .get(queue_name)
            .map_or(0, |lane| lane.tasks.len())
    }

    pub fn is_empty(&self, queue_name: &str) -> bool {
        self.len(queue_name) == 0
    }

    /// Wait until `queue_name` has no queued or running tasks
    pub async fn wait_idle(&self, queue_name: &str) {
        loop {
            let mut notified = std::pin::pin!(self.inner.idle.notified());
            notified.as_mut().enable();
            if !self.is_active(queue_name) {
                return;
            }
            notified.await;
        }
    }
}

/// Run loop of one lane: run the head, settle it, repeat until empty
async fn run_lane(inner: Arc<Inner>, name: String) {
    loop {
        let next = {
            let mut lanes = inner.lanes.lock();
            lanes
                .get_mut(&name)
                .and_then(|lane| lane.tasks.front_mut())
                .map(|head| (head.id, head.run.take()))
        };

        if let Some((id, Some(run))) = next {
            let settled = AssertUnwindSafe(async move { run().await })
                .catch_unwind()
                .await;
            match settled {
                Ok(Ok(())) => tracing::trace!(queue = %name, task = id, "task done"),
                Ok(Err(err)) => {
                    tracing::error!(queue = %name, task = id, error = ?err, "queued task failed")
                }
                Err(_) => tracing::error!(queue = %name, task = id, "queued task panicked"),
            }
        }

        let more = {
            let mut lanes = inner.lanes.lock();
            let more = lanes.get_mut(&name).is_some_and(|lane| {
                lane.tasks.pop_front();
                match lane.tasks.front_mut() {
                    Some(head) => {
                        head.running = true;
                        true
                    }
                    None => false,
                }
            });
            if !more {
                lanes.remove(&name);
            }
            more
        };

        if !more {
            inner.idle.notify_waiters();
            return;
        }
    }
}
