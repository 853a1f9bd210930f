//! # Cyrup Promise
//!
//! Write-once cells, the promises that complete them, combinators built on top,
//! and a blocking bounded queue for producer/consumer work.
//!
//! ## Features
//!
//! - `async` - `.await` any [`Cell`] through [`CellFuture`]
//! - `worker-pool` - a fixed-size [`WorkerPool`](executor::WorkerPool) executor backed by crossbeam
//! - `tokio-executor` - run computations on Tokio's blocking pool
//!
//! ## Example
//!
//! ```rust
//! use cyrup_promise::{channel, race_first, CellExt, CellState, Error};
//!
//! let (fast, a) = channel::<u32>();
//! let (_slow, b) = channel::<u32>();
//! let winner = race_first(&a, &b).filter(|v| *v > 20);
//!
//! fast.try_success(10);
//! assert_eq!(winner.poll(), CellState::Failed(Error::PredicateNotSatisfied));
//! ```
//!
//! ### Producer / consumer
//!
//! ```rust
//! use cyrup_promise::{BoundedQueue, WakeStrategy};
//!
//! let queue = BoundedQueue::with_strategy(3, WakeStrategy::Broadcast)?;
//! queue.put("job")?;
//! assert_eq!(queue.take()?, "job");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod error;
pub mod executor;
pub mod promise;
pub mod queue;

pub use error::{Error, PutError, QueueError, Result, TakeError};
pub use executor::{Executor, Immediate, Job, ThreadPerTask};
pub use promise::{
    channel, first_completed_of, in_completion_order, join_all, race_first, race_last,
    retry_until, sequence, sequence_running, Cell, CellExt, CellState, Promise,
};
pub use queue::{BoundedQueue, WakeStrategy};

#[cfg(feature = "async")]
pub use promise::CellFuture;

#[cfg(feature = "worker-pool")]
pub use executor::{PoolConfig, WorkerPool};

#[cfg(feature = "tokio-executor")]
pub use executor::TokioExecutor;
