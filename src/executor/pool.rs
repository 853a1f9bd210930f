//! Fixed-size worker pool fed by a crossbeam channel

use super::{Executor, Job};
use crate::error::Error;
use crossbeam::channel::{self, Receiver, Sender};
use log::{debug, warn};
use std::io;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

/// Sizing and naming for a [`WorkerPool`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of worker threads; zero is treated as one
    pub threads: usize,
    /// Name given to every worker thread
    pub thread_name: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            threads: thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(4),
            thread_name: "cyrup-promise-worker".to_string(),
        }
    }
}

/// A fixed set of OS threads pulling jobs off one shared queue.
///
/// Dropping the pool closes the queue, lets the workers finish what was
/// already submitted and joins them. A panicking job is logged and the worker
/// keeps serving.
#[derive(Debug)]
pub struct WorkerPool {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start a pool as described by `config`.
    pub fn new(config: PoolConfig) -> io::Result<Self> {
        let threads = config.threads.max(1);
        let (sender, receiver) = channel::unbounded::<Job>();
        let mut pool = Self {
            sender: Some(sender),
            workers: Vec::with_capacity(threads),
        };
        for index in 0..threads {
            let receiver = receiver.clone();
            let worker = thread::Builder::new()
                .name(config.thread_name.clone())
                .spawn(move || work(index, receiver))?;
            pool.workers.push(worker);
        }
        debug!("worker pool '{}' started with {threads} thread(s)", config.thread_name);
        Ok(pool)
    }

    /// Start a pool of `threads` workers with default naming.
    pub fn with_threads(threads: usize) -> io::Result<Self> {
        Self::new(PoolConfig {
            threads,
            ..PoolConfig::default()
        })
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.workers.len()
    }

    /// Stop accepting jobs, drain the queue and join every worker.
    pub fn shutdown(self) {
        drop(self)
    }
}

fn work(index: usize, jobs: Receiver<Job>) {
    for job in jobs.iter() {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
            warn!("worker {index} job panicked: {}", Error::from_panic(payload));
        }
    }
}

impl Executor for WorkerPool {
    fn execute(&self, job: Job) {
        let Some(sender) = &self.sender else {
            warn!("worker pool is shut down; dropping job");
            return;
        };
        if sender.send(job).is_err() {
            warn!("worker pool has no live workers; dropping job");
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.sender.take();
        let current = thread::current().id();
        for worker in self.workers.drain(..) {
            // the last handle may be dropped by a job on one of our own workers
            if worker.thread().id() == current {
                continue;
            }
            if worker.join().is_err() {
                warn!("worker thread exited with a panic");
            }
        }
        debug!("worker pool shut down");
    }
}
