//! Detached background tasks.
//!
//! Work that must not delay a response (prefetch rounds, write-backs after an
//! origin fetch) is handed to a [`TaskSpawner`] instead of `tokio::spawn`.
//! Every task runs inside an error boundary that swallows panics, so a
//! detached task can never take the process down.
//!
//! - [`TokioSpawner`]: production spawner tracking tasks for shutdown
//! - [`ManualSpawner`]: queues tasks until a test runs them explicitly

use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error};

use crate::cache::BoxFuture;

/// A detached task.
pub type DetachedTask = BoxFuture<'static, ()>;

/// Runs detached tasks.
pub trait TaskSpawner: Send + Sync {
    /// Start `task` in the background.
    ///
    /// Returns `false` if the spawner no longer accepts tasks; the task is
    /// dropped in that case.
    fn spawn(&self, name: &'static str, task: DetachedTask) -> bool;

    /// Token cancelled when the spawner shuts down.
    ///
    /// Long waits inside tasks should select on it.
    fn cancellation(&self) -> CancellationToken;
}

/// Wrap a task so that a panic is logged and discarded.
pub fn error_boundary(name: &'static str, task: DetachedTask) -> DetachedTask {
    Box::pin(async move {
        if AssertUnwindSafe(task).catch_unwind().await.is_err() {
            error!(task = name, "Detached task panicked");
        }
    })
}

/// Tokio-backed spawner.
///
/// Tasks are tracked so that [`TokioSpawner::shutdown`] can cancel and await
/// them.
#[derive(Debug, Clone, Default)]
pub struct TokioSpawner {
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl TokioSpawner {
    /// Create a spawner. Must be used from within a tokio runtime.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks still running.
    pub fn active(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until every task spawned so far has finished, without cancelling.
    ///
    /// New tasks are accepted again afterwards.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Stop accepting tasks, cancel running ones, and wait for them to end.
    pub async fn shutdown(&self) {
        self.tracker.close();
        self.cancel.cancel();
        self.tracker.wait().await;
        debug!("Detached tasks stopped");
    }
}

impl TaskSpawner for TokioSpawner {
    fn spawn(&self, name: &'static str, task: DetachedTask) -> bool {
        if self.cancel.is_cancelled() {
            debug!(task = name, "Spawner shut down, task dropped");
            return false;
        }
        self.tracker.spawn(error_boundary(name, task));
        true
    }

    fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// Spawner that queues tasks until [`ManualSpawner::run_all`] is awaited.
///
/// Lets tests decide exactly when background work happens.
#[derive(Default)]
pub struct ManualSpawner {
    queue: Mutex<VecDeque<(&'static str, DetachedTask)>>,
    cancel: CancellationToken,
}

impl ManualSpawner {
    /// Create a spawner with an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued tasks.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Names of queued tasks, oldest first.
    pub fn pending_names(&self) -> Vec<&'static str> {
        self.queue.lock().iter().map(|(name, _)| *name).collect()
    }

    /// Run queued tasks one at a time until the queue is empty, including
    /// tasks queued while running. Returns how many ran.
    pub async fn run_all(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.queue.lock().pop_front();
            let Some((name, task)) = next else {
                return ran;
            };
            error_boundary(name, task).await;
            ran += 1;
        }
    }

    /// Drop queued tasks without running them.
    pub fn discard(&self) -> usize {
        let mut queue = self.queue.lock();
        let count = queue.len();
        queue.clear();
        count
    }

    /// Cancel the token handed to tasks.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl TaskSpawner for ManualSpawner {
    fn spawn(&self, name: &'static str, task: DetachedTask) -> bool {
        self.queue.lock().push_back((name, task));
        true
    }

    fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }
}
