//! Snapshot of a cell's state
//!
//! `CellState` is what [`Cell::poll`](super::Cell::poll) hands back: a plain
//! owned value that can be matched on without holding any lock.

use crate::error::{Error, Result};

/// The observable state of a [`Cell`](super::Cell) at one instant.
///
/// A cell moves from `Pending` to exactly one of the terminal variants and
/// never leaves it again.
#[derive(Debug, Clone, PartialEq)]
pub enum CellState<T> {
    /// No outcome decided yet
    Pending,
    /// Completed with a value
    Succeeded(T),
    /// Completed with a failure
    Failed(Error),
}

impl<T> CellState<T> {
    /// Returns true while the cell has no outcome.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns true if the cell completed with a value.
    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    /// Returns true if the cell completed with a failure.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Consumes the snapshot and returns the outcome, if any.
    pub fn into_result(self) -> Option<Result<T>> {
        match self {
            Self::Pending => None,
            Self::Succeeded(value) => Some(Ok(value)),
            Self::Failed(error) => Some(Err(error)),
        }
    }

    /// Returns a reference to the value or error, if any.
    pub fn as_ref(&self) -> CellState<&T> {
        match self {
            Self::Pending => CellState::Pending,
            Self::Succeeded(value) => CellState::Succeeded(value),
            Self::Failed(error) => CellState::Failed(error.clone()),
        }
    }
}

impl<T> From<Result<T>> for CellState<T> {
    fn from(outcome: Result<T>) -> Self {
        match outcome {
            Ok(value) => Self::Succeeded(value),
            Err(error) => Self::Failed(error),
        }
    }
}
