//! Combinators built purely from [`Cell`] and [`Promise`]
//!
//! None of these block. Each one creates fresh promises, registers
//! continuations on its inputs and lets the try-complete race of the promise
//! decide the result.

use super::cell::{channel, guarded, Cell, Promise};
use super::cell_ext::CellExt;
use crate::error::Result;
use log::trace;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Completes with whichever of `a` and `b` completes first, success or failure.
///
/// Both inputs race for one shared promise; the slower one is dropped.
pub fn race_first<T>(a: &Cell<T>, b: &Cell<T>) -> Cell<T>
where
    T: Clone + Send + Sync + 'static,
{
    let (promise, cell) = channel();
    for source in [a, b] {
        let promise = promise.clone();
        source.on_complete(move |outcome| {
            promise.try_complete(outcome.clone());
        });
    }
    cell
}

/// Completes with whichever of `a` and `b` completes second.
///
/// An intermediate promise records which input arrived first. The input that
/// loses that race is by construction the last one, and it alone writes the
/// result.
pub fn race_last<T>(a: &Cell<T>, b: &Cell<T>) -> Cell<T>
where
    T: Clone + Send + Sync + 'static,
{
    let (first, _) = channel::<()>();
    let (last, cell) = channel();
    for source in [a, b] {
        let (first, last) = (first.clone(), last.clone());
        source.on_complete(move |outcome| {
            if !first.try_success(()) {
                last.try_complete(outcome.clone());
            }
        });
    }
    cell
}

/// Runs `second` only after `first` succeeded and follows the cell it returns.
///
/// If `first` fails, the failure propagates and `second` is never invoked.
pub fn sequence<T, U, F>(first: &Cell<T>, second: F) -> Cell<U>
where
    T: Clone + Send + Sync + 'static,
    U: Clone + Send + Sync + 'static,
    F: FnOnce() -> Cell<U> + Send + 'static,
{
    first.flat_map(move |_| second())
}

/// Observes `second` only after `first` succeeded.
///
/// `second` is already running; only the observation is ordered. Use
/// [`sequence`] to defer the work itself.
pub fn sequence_running<T, U>(first: &Cell<T>, second: &Cell<U>) -> Cell<U>
where
    T: Clone + Send + Sync + 'static,
    U: Clone + Send + Sync + 'static,
{
    let second = second.clone();
    first.flat_map(move |_| second)
}

/// Calls `action` for a fresh cell until one succeeds with a value accepted
/// by `predicate`.
///
/// Failed attempts, rejected values and panics in either closure all lead to
/// another attempt. There is no upper bound; wrap the action to add one.
pub fn retry_until<T, A, P>(action: A, predicate: P) -> Cell<T>
where
    T: Clone + Send + Sync + 'static,
    A: FnMut() -> Cell<T> + Send + 'static,
    P: Fn(&T) -> bool + Send + Sync + 'static,
{
    let (promise, cell) = channel();
    Arc::new(Retry {
        action: Mutex::new(action),
        predicate,
        promise,
        attempts: AtomicU64::new(0),
    })
    .drive();
    cell
}

struct Retry<T, A, P> {
    action: Mutex<A>,
    predicate: P,
    promise: Promise<T>,
    attempts: AtomicU64,
}

impl<T, A, P> Retry<T, A, P>
where
    T: Clone + Send + Sync + 'static,
    A: FnMut() -> Cell<T> + Send + 'static,
    P: Fn(&T) -> bool + Send + Sync + 'static,
{
    /// Attempts that are already complete are settled in this loop; only a
    /// pending attempt parks the retry on a continuation, which re-enters
    /// `drive` from the completing thread.
    fn drive(self: Arc<Self>) {
        loop {
            let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
            let cell = match guarded(|| (&mut *self.action.lock())()) {
                Ok(cell) => cell,
                Err(panicked) => {
                    trace!("retry attempt {attempt} panicked: {panicked}");
                    continue;
                }
            };

            let this = Arc::clone(&self);
            let parked = cell.register_or_outcome(move |outcome| {
                if !this.accept(attempt, outcome) {
                    this.drive();
                }
            });
            match parked {
                Ok(()) => return,
                Err((_, outcome)) => {
                    if self.accept(attempt, &outcome) {
                        return;
                    }
                }
            }
        }
    }

    fn accept(&self, attempt: u64, outcome: &Result<T>) -> bool {
        match outcome {
            Ok(value) => match guarded(|| (self.predicate)(value)) {
                Ok(true) => {
                    trace!("retry accepted attempt {attempt}");
                    self.promise.try_success(value.clone());
                    true
                }
                Ok(false) => false,
                Err(panicked) => {
                    trace!("retry predicate panicked on attempt {attempt}: {panicked}");
                    false
                }
            },
            Err(error) => {
                trace!("retry attempt {attempt} failed: {error}");
                false
            }
        }
    }
}

/// Completes with the first of `cells` to complete. An empty input yields a
/// cell that never completes.
pub fn first_completed_of<T, I>(cells: I) -> Cell<T>
where
    T: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = Cell<T>>,
{
    let (promise, cell) = channel();
    for source in cells {
        let promise = promise.clone();
        source.on_complete(move |outcome| {
            promise.try_complete(outcome.clone());
        });
    }
    cell
}

/// Reorders `cells` by completion: the i-th returned cell completes with the
/// outcome of the i-th input to complete.
pub fn in_completion_order<T, I>(cells: I) -> Vec<Cell<T>>
where
    T: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = Cell<T>>,
{
    let cells: Vec<Cell<T>> = cells.into_iter().collect();
    let (promises, ordered): (Vec<Promise<T>>, Vec<Cell<T>>) =
        (0..cells.len()).map(|_| channel()).unzip();
    let promises = Arc::new(promises);
    let next = Arc::new(AtomicUsize::new(0));

    for source in &cells {
        let (promises, next) = (Arc::clone(&promises), Arc::clone(&next));
        source.on_complete(move |outcome| {
            let position = next.fetch_add(1, Ordering::AcqRel);
            if let Some(promise) = promises.get(position) {
                promise.try_complete(outcome.clone());
            }
        });
    }
    ordered
}

struct Joined<T> {
    values: Vec<Option<T>>,
    remaining: usize,
}

/// Succeeds with every value in input order once all of `cells` succeed, or
/// fails with the first failure to arrive.
pub fn join_all<T, I>(cells: I) -> Cell<Vec<T>>
where
    T: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = Cell<T>>,
{
    let cells: Vec<Cell<T>> = cells.into_iter().collect();
    if cells.is_empty() {
        return Cell::successful(Vec::new());
    }

    let (promise, cell) = channel();
    let joined = Arc::new(Mutex::new(Joined {
        values: vec![None; cells.len()],
        remaining: cells.len(),
    }));

    for (index, source) in cells.iter().enumerate() {
        let (promise, joined) = (promise.clone(), Arc::clone(&joined));
        source.on_complete(move |outcome| match outcome {
            Ok(value) => {
                let finished = {
                    let mut joined = joined.lock();
                    if let Some(slot) = joined.values.get_mut(index) {
                        *slot = Some(value.clone());
                    }
                    joined.remaining -= 1;
                    if joined.remaining == 0 {
                        Some(std::mem::take(&mut joined.values))
                    } else {
                        None
                    }
                };
                if let Some(values) = finished {
                    promise.try_success(values.into_iter().flatten().collect());
                }
            }
            Err(error) => {
                promise.try_failure(error.clone());
            }
        });
    }
    cell
}
