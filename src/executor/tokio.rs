//! Tokio-backed executor

use super::{Executor, Job};
use tokio::runtime::Handle;

/// Runs jobs on Tokio's blocking thread pool.
///
/// Producers passed to [`Cell::spawn_on`](crate::Cell::spawn_on) are plain
/// closures that may block, so they go to `spawn_blocking` rather than the
/// async worker threads.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: Handle,
}

impl TokioExecutor {
    /// Use the runtime behind `handle`.
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime the caller is running inside, if any.
    pub fn try_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl Executor for TokioExecutor {
    fn execute(&self, job: Job) {
        // detached; the job completes its own promise
        drop(self.handle.spawn_blocking(job));
    }
}
