//! `.await` support for cells
//!
//! A [`CellFuture`] registers one continuation on its cell that wakes the most
//! recently registered task waker, so a cell can be awaited from any runtime.

use super::cell::Cell;
use crate::error::Result;
use futures::task::AtomicWaker;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Future resolving to the outcome of a [`Cell`].
///
/// This wraps a cell and implements `Future` to provide a concrete return
/// type instead of a boxed future.
#[must_use = "futures do nothing unless polled"]
pub struct CellFuture<T> {
    cell: Cell<T>,
    waker: Arc<AtomicWaker>,
    subscribed: bool,
}

impl<T> CellFuture<T> {
    /// Create a future over `cell`.
    pub fn new(cell: Cell<T>) -> Self {
        Self {
            cell,
            waker: Arc::new(AtomicWaker::new()),
            subscribed: false,
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Future for CellFuture<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        // register before checking so a completion in between still wakes us
        this.waker.register(cx.waker());
        if !this.subscribed {
            this.subscribed = true;
            let waker = Arc::clone(&this.waker);
            this.cell.on_complete(move |_| waker.wake());
        }
        match this.cell.value() {
            Some(outcome) => Poll::Ready(outcome),
            None => Poll::Pending,
        }
    }
}

impl<T: Clone + Send + Sync + 'static> IntoFuture for Cell<T> {
    type Output = Result<T>;
    type IntoFuture = CellFuture<T>;

    fn into_future(self) -> Self::IntoFuture {
        CellFuture::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::promise::cell::channel;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn test_ready_cell_resolves_immediately() {
        let outcome = tokio_test::block_on(Cell::successful(3).into_future());
        assert_eq!(outcome, Ok(3));
    }

    #[test]
    fn test_pending_then_woken() {
        let (promise, cell) = channel::<u8>();
        let mut task = tokio_test::task::spawn(CellFuture::new(cell));
        tokio_test::assert_pending!(task.poll());
        promise.try_failure(Error::PredicateNotSatisfied);
        assert!(task.is_woken());
        tokio_test::assert_ready_eq!(task.poll(), Err(Error::PredicateNotSatisfied));
    }

    #[tokio::test]
    async fn test_await_across_threads() {
        let (promise, cell) = channel();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            promise.try_success("late");
        });
        assert_eq!(cell.await, Ok("late"));
    }
}
