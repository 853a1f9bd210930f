//! Where cell-completing computations run
//!
//! Choose an executor and hand it to [`Cell::spawn_on`](crate::Cell::spawn_on):
//! - [`Immediate`]: run on the calling thread
//! - [`ThreadPerTask`]: one named OS thread per job
//! - `WorkerPool`: fixed set of threads fed by a crossbeam channel (feature `worker-pool`)
//! - `TokioExecutor`: Tokio's blocking pool (feature `tokio-executor`)

#[cfg(feature = "worker-pool")]
pub mod pool;
#[cfg(feature = "tokio-executor")]
pub mod tokio;

#[cfg(feature = "worker-pool")]
pub use self::pool::{PoolConfig, WorkerPool};
#[cfg(feature = "tokio-executor")]
pub use self::tokio::TokioExecutor;

use log::warn;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;

/// A unit of work handed to an [`Executor`]
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs jobs, possibly on other threads.
pub trait Executor: Send + Sync {
    /// Schedule `job` to run exactly once.
    fn execute(&self, job: Job);
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn execute(&self, job: Job) {
        (**self).execute(job)
    }
}

impl<E: Executor + ?Sized> Executor for &E {
    fn execute(&self, job: Job) {
        (**self).execute(job)
    }
}

/// Runs every job inline on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate;

impl Executor for Immediate {
    fn execute(&self, job: Job) {
        job()
    }
}

/// Spawns a fresh named OS thread for every job.
#[derive(Debug, Clone)]
pub struct ThreadPerTask {
    name: String,
}

impl ThreadPerTask {
    /// Thread name used by [`ThreadPerTask::default`]
    pub const DEFAULT_NAME: &'static str = "cyrup-promise-task";

    /// Name spawned threads `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for ThreadPerTask {
    fn default() -> Self {
        Self::named(Self::DEFAULT_NAME)
    }
}

impl Executor for ThreadPerTask {
    fn execute(&self, job: Job) {
        // shared so the job survives a failed spawn and can still run inline
        let slot = Arc::new(Mutex::new(Some(job)));
        let theirs = Arc::clone(&slot);
        let spawned = thread::Builder::new().name(self.name.clone()).spawn(move || {
            let job = theirs.lock().take();
            if let Some(job) = job {
                job();
            }
        });
        if let Err(err) = spawned {
            warn!("failed to spawn '{}' thread ({err}); running job inline", self.name);
            let job = slot.lock().take();
            if let Some(job) = job {
                job();
            }
        }
    }
}
