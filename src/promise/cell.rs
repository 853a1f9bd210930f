//! Write-once cells and the promises that complete them
//!
//! A [`Cell`] is a shared, read-many view of an outcome that is decided exactly
//! once. The [`Promise`] paired with it is the only way to decide that outcome.
//! Both are cheap reference-counted handles over the same slot.

use crate::error::{Error, Result};
use crate::executor::{Executor, ThreadPerTask};
use log::{trace, warn};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::state::CellState;

type Continuation<T> = Box<dyn FnOnce(&Result<T>) + Send + 'static>;

enum Slot<T> {
    Pending(Vec<Continuation<T>>),
    Done(Arc<Result<T>>),
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    done: Condvar,
}

impl<T> Shared<T> {
    fn new(slot: Slot<T>) -> Arc<Self> {
        Arc::new(Self {
            slot: Mutex::new(slot),
            done: Condvar::new(),
        })
    }

    /// The single pending -> done transition. Continuations run after the lock
    /// is released, on the calling thread.
    fn complete(&self, outcome: Result<T>) -> bool {
        let (outcome, waiting) = {
            let mut slot = self.slot.lock();
            let waiting = match &mut *slot {
                Slot::Done(_) => return false,
                Slot::Pending(waiting) => std::mem::take(waiting),
            };
            let outcome = Arc::new(outcome);
            *slot = Slot::Done(Arc::clone(&outcome));
            (outcome, waiting)
        };
        self.done.notify_all();

        trace!(
            "cell completed ({}), running {} continuation(s)",
            if outcome.is_ok() { "success" } else { "failure" },
            waiting.len()
        );
        for continuation in waiting {
            run_continuation(continuation, &outcome);
        }
        true
    }

    fn outcome(&self) -> Option<Arc<Result<T>>> {
        match &*self.slot.lock() {
            Slot::Pending(_) => None,
            Slot::Done(outcome) => Some(Arc::clone(outcome)),
        }
    }

    /// Queue `f` if still pending; otherwise hand it back with the outcome
    /// so the caller decides where it runs.
    fn register_or_outcome<F>(&self, f: F) -> std::result::Result<(), (F, Arc<Result<T>>)>
    where
        F: FnOnce(&Result<T>) + Send + 'static,
    {
        let mut slot = self.slot.lock();
        match &mut *slot {
            Slot::Pending(waiting) => {
                waiting.push(Box::new(f));
                Ok(())
            }
            Slot::Done(outcome) => Err((f, Arc::clone(outcome))),
        }
    }

    fn wait(&self) -> Arc<Result<T>> {
        let mut slot = self.slot.lock();
        loop {
            if let Slot::Done(outcome) = &*slot {
                return Arc::clone(outcome);
            }
            self.done.wait(&mut slot);
        }
    }

    fn wait_until(&self, deadline: Instant) -> Option<Arc<Result<T>>> {
        let mut slot = self.slot.lock();
        loop {
            if let Slot::Done(outcome) = &*slot {
                return Some(Arc::clone(outcome));
            }
            if self.done.wait_until(&mut slot, deadline).timed_out() {
                return match &*slot {
                    Slot::Done(outcome) => Some(Arc::clone(outcome)),
                    Slot::Pending(_) => None,
                };
            }
        }
    }
}

fn run_continuation<T, F>(f: F, outcome: &Result<T>)
where
    F: FnOnce(&Result<T>),
{
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| f(outcome))) {
        warn!("cell continuation panicked: {}", Error::from_panic(payload));
    }
}

/// Run a user closure, turning a panic into [`Error::Panicked`].
pub(crate) fn guarded<R>(f: impl FnOnce() -> R) -> Result<R> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(Error::from_panic)
}

/// Create a pending [`Cell`] together with the [`Promise`] that completes it.
pub fn channel<T>() -> (Promise<T>, Cell<T>) {
    let shared = Shared::new(Slot::Pending(Vec::new()));
    (
        Promise {
            shared: Arc::clone(&shared),
        },
        Cell { shared },
    )
}

//────────────────────────────────────────────────────────────────────────────
// Cell – read side
//────────────────────────────────────────────────────────────────────────────

/// A single-assignment container for an eventual success or failure.
///
/// Cloning a `Cell` yields another reader of the same slot. Readers never
/// change the outcome; only the paired [`Promise`] can.
///
/// ### Examples
/// ```rust
/// use cyrup_promise::{channel, CellState};
///
/// let (promise, cell) = channel::<u32>();
/// assert_eq!(cell.poll(), CellState::Pending);
/// assert!(promise.try_success(7));
/// assert!(!promise.try_success(8));
/// assert_eq!(cell.poll(), CellState::Succeeded(7));
/// ```
pub struct Cell<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Cell<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Cell<T> {
    /// A cell that is already complete with `outcome`.
    pub fn from_result(outcome: Result<T>) -> Self {
        Self {
            shared: Shared::new(Slot::Done(Arc::new(outcome))),
        }
    }

    /// A cell that already succeeded with `value`.
    pub fn successful(value: T) -> Self {
        Self::from_result(Ok(value))
    }

    /// A cell that already failed with `error`.
    pub fn failed(error: Error) -> Self {
        Self::from_result(Err(error))
    }

    /// Returns true once an outcome has been decided.
    pub fn is_completed(&self) -> bool {
        self.shared.outcome().is_some()
    }

    /// Register a continuation that runs exactly once with the outcome.
    ///
    /// If the cell is still pending the continuation runs later on the thread
    /// that completes it; otherwise it runs right away on the calling thread.
    /// A panicking continuation is logged and does not affect other continuations.
    pub fn on_complete<F>(&self, f: F)
    where
        F: FnOnce(&Result<T>) + Send + 'static,
    {
        if let Err((f, outcome)) = self.shared.register_or_outcome(f) {
            run_continuation(f, &outcome);
        }
    }

    /// Register a continuation for the success case only.
    pub fn on_success<F>(&self, f: F)
    where
        F: FnOnce(&T) + Send + 'static,
    {
        self.on_complete(move |outcome| {
            if let Ok(value) = outcome {
                f(value);
            }
        });
    }

    /// Register a continuation for the failure case only.
    pub fn on_failure<F>(&self, f: F)
    where
        F: FnOnce(&Error) + Send + 'static,
    {
        self.on_complete(move |outcome| {
            if let Err(error) = outcome {
                f(error);
            }
        });
    }

    pub(crate) fn register_or_outcome<F>(
        &self,
        f: F,
    ) -> std::result::Result<(), (F, Arc<Result<T>>)>
    where
        F: FnOnce(&Result<T>) + Send + 'static,
    {
        self.shared.register_or_outcome(f)
    }
}

impl<T: Clone> Cell<T> {
    /// Non-blocking snapshot of the current state.
    pub fn poll(&self) -> CellState<T> {
        match self.shared.outcome() {
            None => CellState::Pending,
            Some(outcome) => CellState::from((*outcome).clone()),
        }
    }

    /// The outcome, if decided.
    pub fn value(&self) -> Option<Result<T>> {
        self.shared.outcome().map(|outcome| (*outcome).clone())
    }

    /// Block the calling thread until the cell completes.
    pub fn wait(&self) -> Result<T> {
        (*self.shared.wait()).clone()
    }

    /// Block the calling thread until the cell completes or `timeout` elapses.
    ///
    /// Returns [`Error::Timeout`] if the deadline passes first; otherwise the
    /// terminal value or the original failure.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<T> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.wait();
        };
        match self.shared.wait_until(deadline) {
            Some(outcome) => (*outcome).clone(),
            None => Err(Error::Timeout(timeout)),
        }
    }
}

impl<T: Send + Sync + 'static> Cell<T> {
    /// Run `f` on a dedicated thread and complete the cell with its result.
    pub fn spawn<F>(f: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        Self::spawn_on(&ThreadPerTask::default(), f)
    }

    /// Run a fallible `f` on a dedicated thread.
    pub fn spawn_fallible<F, E>(f: F) -> Self
    where
        F: FnOnce() -> std::result::Result<T, E> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::spawn_fallible_on(&ThreadPerTask::default(), f)
    }

    /// Run `f` on `executor` and complete the cell with its result.
    ///
    /// A panic inside `f` completes the cell with [`Error::Panicked`].
    pub fn spawn_on<X, F>(executor: &X, f: F) -> Self
    where
        X: Executor + ?Sized,
        F: FnOnce() -> T + Send + 'static,
    {
        Self::spawn_fallible_on(executor, move || Ok::<T, std::convert::Infallible>(f()))
    }

    /// Run a fallible `f` on `executor`. `Err(e)` completes the cell with
    /// [`Error::Computation`].
    pub fn spawn_fallible_on<X, F, E>(executor: &X, f: F) -> Self
    where
        X: Executor + ?Sized,
        F: FnOnce() -> std::result::Result<T, E> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        let (promise, cell) = channel();
        executor.execute(Box::new(move || {
            let outcome = match guarded(f) {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(cause)) => Err(Error::computation(cause)),
                Err(panicked) => Err(panicked),
            };
            promise.try_complete(outcome);
        }));
        cell
    }
}

impl<T: fmt::Debug> fmt::Debug for Cell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.shared.outcome() {
            None => f.debug_tuple("Cell").field(&"pending").finish(),
            Some(outcome) => f.debug_tuple("Cell").field(&*outcome).finish(),
        }
    }
}

//────────────────────────────────────────────────────────────────────────────
// Promise – write side
//────────────────────────────────────────────────────────────────────────────

/// The write handle of a [`Cell`].
///
/// Every `try_*` call races for the one allowed transition. Exactly one call
/// across all clones returns `true`; the rest are no-ops returning `false`.
pub struct Promise<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Promise<T> {
    /// Try to complete with `outcome`. Returns whether this call won.
    pub fn try_complete(&self, outcome: Result<T>) -> bool {
        self.shared.complete(outcome)
    }

    /// Try to complete successfully with `value`.
    pub fn try_success(&self, value: T) -> bool {
        self.try_complete(Ok(value))
    }

    /// Try to complete with the failure `error`.
    pub fn try_failure(&self, error: Error) -> bool {
        self.try_complete(Err(error))
    }

    /// Returns true once the paired cell has an outcome.
    pub fn is_completed(&self) -> bool {
        self.shared.outcome().is_some()
    }

    /// Another reader of the cell this promise completes.
    pub fn cell(&self) -> Cell<T> {
        Cell {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Promise<T> {
    /// Forward the outcome of `other` into this promise once it completes.
    ///
    /// Uses try semantics: if this promise is already complete by then, the
    /// forwarded outcome is dropped.
    pub fn complete_with(&self, other: &Cell<T>) {
        let promise = self.clone();
        other.on_complete(move |outcome| {
            promise.try_complete(outcome.clone());
        });
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("completed", &self.is_completed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Immediate;
    use pretty_assertions::assert_eq;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_channel_starts_pending() {
        let (promise, cell) = channel::<i32>();
        assert_eq!(cell.poll(), CellState::Pending);
        assert!(!cell.is_completed());
        assert!(!promise.is_completed());
        assert_eq!(cell.value(), None);
    }

    #[test]
    fn test_second_completion_is_a_noop() {
        let (promise, cell) = channel();
        assert!(promise.try_success(1));
        assert!(!promise.try_success(2));
        assert!(!promise.try_failure(Error::PredicateNotSatisfied));
        assert_eq!(cell.poll(), CellState::Succeeded(1));
    }

    #[test]
    fn test_failure_is_read_back_unchanged() {
        let (promise, cell) = channel::<i32>();
        let cause = Error::computation(io::Error::new(io::ErrorKind::Other, "nope"));
        assert!(promise.try_failure(cause.clone()));
        assert_eq!(cell.poll(), CellState::Failed(cause.clone()));
        assert_eq!(cell.wait(), Err(cause));
    }

    #[test]
    fn test_continuation_registered_before_completion() {
        let (promise, cell) = channel();
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        cell.on_complete(move |outcome| *sink.lock() = Some(outcome.clone()));
        assert_eq!(*seen.lock(), None);
        promise.try_success("done");
        assert_eq!(*seen.lock(), Some(Ok("done")));
    }

    #[test]
    fn test_continuation_registered_after_completion_runs_inline() {
        let cell = Cell::successful(5);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        cell.on_success(move |v| {
            assert_eq!(*v, 5);
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_every_continuation_runs_once() {
        let (promise, cell) = channel();
        let calls = Arc::new(AtomicUsize::new(0));
        for _ in 0..10 {
            let counter = Arc::clone(&calls);
            cell.on_complete(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        promise.try_success(());
        promise.try_success(());
        assert_eq!(calls.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_panicking_continuation_does_not_stop_others() {
        let (promise, cell) = channel();
        let calls = Arc::new(AtomicUsize::new(0));
        cell.on_complete(|_: &Result<i32>| panic!("continuation blew up"));
        let counter = Arc::clone(&calls);
        cell.on_complete(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(promise.try_success(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // the slot is still usable after the panic
        assert_eq!(cell.poll(), CellState::Succeeded(1));
    }

    #[test]
    fn test_on_failure_skips_success() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        Cell::successful(1).on_failure(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = Arc::clone(&hits);
        Cell::<i32>::failed(Error::PredicateNotSatisfied).on_failure(move |e| {
            assert_eq!(*e, Error::PredicateNotSatisfied);
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_wait_timeout_expires() {
        let (_promise, cell) = channel::<i32>();
        let timeout = Duration::from_millis(20);
        assert_eq!(cell.wait_timeout(timeout), Err(Error::Timeout(timeout)));
    }

    #[test]
    fn test_wait_wakes_on_completion_from_another_thread() {
        let (promise, cell) = channel();
        let writer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            promise.try_success(99)
        });
        assert_eq!(cell.wait_timeout(Duration::from_secs(5)), Ok(99));
        assert!(writer.join().unwrap());
    }

    #[test]
    fn test_spawn_on_converts_errors_and_panics() {
        let ok = Cell::spawn_on(&Immediate, || 3);
        assert_eq!(ok.poll(), CellState::Succeeded(3));

        let failed = Cell::<i32>::spawn_fallible_on(&Immediate, || {
            Err(io::Error::new(io::ErrorKind::Other, "bad input"))
        });
        assert!(matches!(failed.poll(), CellState::Failed(Error::Computation(_))));

        let panicked = Cell::<i32>::spawn_on(&Immediate, || panic!("worker died"));
        assert_eq!(
            panicked.poll(),
            CellState::Failed(Error::Panicked("worker died".to_string()))
        );
    }

    #[test]
    fn test_spawn_on_thread() {
        let cell = Cell::spawn(|| thread::current().name().map(str::to_string));
        let name = cell.wait_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(name.as_deref(), Some(ThreadPerTask::DEFAULT_NAME));
    }

    #[test]
    fn test_complete_with_forwards() {
        let (source_promise, source) = channel();
        let (promise, cell) = channel();
        promise.complete_with(&source);
        assert!(!cell.is_completed());
        source_promise.try_success(11);
        assert_eq!(cell.poll(), CellState::Succeeded(11));
    }

    #[test]
    fn test_promise_cell_shares_slot() {
        let (promise, cell) = channel();
        let other = promise.cell();
        promise.try_success('x');
        assert_eq!(cell.value(), Some(Ok('x')));
        assert_eq!(other.value(), Some(Ok('x')));
    }

    #[test]
    fn test_debug_output() {
        let (promise, cell) = channel::<u8>();
        assert_eq!(format!("{cell:?}"), "Cell(\"pending\")");
        assert_eq!(format!("{promise:?}"), "Promise { completed: false }");
        promise.try_success(1);
        assert_eq!(format!("{cell:?}"), "Cell(Ok(1))");
    }
}
