//! Error types for cells, promises and bounded queues.
//!
//! Failures stored inside a [`Cell`](crate::Cell) are values: every reader of a
//! failed cell receives a clone of the same [`Error`], so the cause is shared
//! behind an `Arc` rather than boxed.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for cell outcomes
pub type Result<T> = std::result::Result<T, Error>;

/// Cause carried by [`Error::Computation`]
pub type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Failure outcome of a cell, or of a blocking wait on one
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// The producer function returned an error
    #[error("computation failed: {0}")]
    Computation(#[source] Cause),

    /// The producer function or a transformation closure panicked
    #[error("computation panicked: {0}")]
    Panicked(String),

    /// A successful value was rejected by `filter`
    #[error("predicate not satisfied")]
    PredicateNotSatisfied,

    /// The deadline of a blocking wait elapsed before completion
    #[error("timed out after {0:?} waiting for completion")]
    Timeout(Duration),
}

impl Error {
    /// Wrap any error as a computation failure.
    pub fn computation<E>(cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Computation(Arc::new(cause))
    }

    /// Build a failure from a panic payload caught with `catch_unwind`.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panicked(message)
    }

    /// Returns true for the error produced by a timed-out wait.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Computation(a), Self::Computation(b)) => {
                Arc::ptr_eq(a, b) || a.to_string() == b.to_string()
            }
            (Self::Panicked(a), Self::Panicked(b)) => a == b,
            (Self::PredicateNotSatisfied, Self::PredicateNotSatisfied) => true,
            (Self::Timeout(a), Self::Timeout(b)) => a == b,
            _ => false,
        }
    }
}

/// Construction errors for [`BoundedQueue`](crate::BoundedQueue)
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// A bounded queue needs room for at least one item
    #[error("queue capacity must be at least 1")]
    ZeroCapacity,
}

/// A rejected insertion; the item is handed back to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PutError<T> {
    /// `try_put` found no free slot
    #[error("queue is full")]
    Full(T),

    /// The queue was closed before the item could be inserted
    #[error("queue is closed")]
    Closed(T),

    /// `put_timeout` gave up waiting for a free slot
    #[error("timed out waiting for a free slot")]
    Timeout(T),
}

impl<T> PutError<T> {
    /// Recover the item that was not inserted.
    pub fn into_inner(self) -> T {
        match self {
            Self::Full(item) | Self::Closed(item) | Self::Timeout(item) => item,
        }
    }
}

/// A removal that produced no item
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TakeError {
    /// `try_take` found the queue empty
    #[error("queue is empty")]
    Empty,

    /// The queue is closed and fully drained
    #[error("queue is closed")]
    Closed,

    /// `take_timeout` gave up waiting for an item
    #[error("timed out waiting for an item")]
    Timeout,
}
