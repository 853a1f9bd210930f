//! Extension traits for composing cells

use super::cell::{channel, guarded, Cell};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;

//────────────────────────────────────────────────────────────────────────────
// CellExt – fluent ops for Cell<T>
//────────────────────────────────────────────────────────────────────────────

/// Derived operations on a [`Cell`].
///
/// Every operation returns a new cell without blocking. Failures of the source
/// pass through untouched unless the operation exists to handle them. A closure
/// that panics completes the derived cell with [`Error::Panicked`].
pub trait CellExt<T>: Sized {
    /// Maps the success value to a new value.
    fn map<U>(&self, f: impl FnOnce(T) -> U + Send + 'static) -> Cell<U>
    where
        U: Send + Sync + 'static;

    /// Maps the success value to another cell and follows it.
    fn flat_map<U>(&self, f: impl FnOnce(T) -> Cell<U> + Send + 'static) -> Cell<U>
    where
        U: Clone + Send + Sync + 'static;

    /// Maps the success value with a fallible function.
    fn and_then<U>(&self, f: impl FnOnce(T) -> Result<U> + Send + 'static) -> Cell<U>
    where
        U: Send + Sync + 'static;

    /// Maps the whole outcome, success or failure.
    fn transform<U>(&self, f: impl FnOnce(Result<T>) -> Result<U> + Send + 'static) -> Cell<U>
    where
        U: Send + Sync + 'static;

    /// Keeps a success only if `predicate` holds; otherwise fails with
    /// [`Error::PredicateNotSatisfied`].
    fn filter(&self, predicate: impl FnOnce(&T) -> bool + Send + 'static) -> Cell<T>;

    /// Turns a failure into a success using `f`.
    fn recover(&self, f: impl FnOnce(Error) -> T + Send + 'static) -> Cell<T>;

    /// Turns a failure into the outcome of the cell returned by `f`.
    fn recover_with(&self, f: impl FnOnce(Error) -> Cell<T> + Send + 'static) -> Cell<T>;

    /// On failure, follows `alternative`. If that fails too, the original
    /// error is kept.
    fn fallback_to(&self, alternative: &Cell<T>) -> Cell<T>;

    /// Observes the outcome and passes it through unchanged.
    fn inspect(&self, f: impl FnOnce(&Result<T>) + Send + 'static) -> Cell<T>;

    /// Pairs two successes; the first failure to arrive wins.
    fn zip<U>(&self, other: &Cell<U>) -> Cell<(T, U)>
    where
        U: Clone + Send + Sync + 'static;
}

impl<T: Clone + Send + Sync + 'static> CellExt<T> for Cell<T> {
    fn map<U>(&self, f: impl FnOnce(T) -> U + Send + 'static) -> Cell<U>
    where
        U: Send + Sync + 'static,
    {
        self.transform(move |outcome| outcome.map(f))
    }

    fn flat_map<U>(&self, f: impl FnOnce(T) -> Cell<U> + Send + 'static) -> Cell<U>
    where
        U: Clone + Send + Sync + 'static,
    {
        let (promise, cell) = channel();
        self.on_complete(move |outcome| match outcome {
            Ok(value) => {
                let value = value.clone();
                match guarded(move || f(value)) {
                    Ok(next) => promise.complete_with(&next),
                    Err(panicked) => {
                        promise.try_failure(panicked);
                    }
                }
            }
            Err(error) => {
                promise.try_failure(error.clone());
            }
        });
        cell
    }

    fn and_then<U>(&self, f: impl FnOnce(T) -> Result<U> + Send + 'static) -> Cell<U>
    where
        U: Send + Sync + 'static,
    {
        self.transform(move |outcome| outcome.and_then(f))
    }

    fn transform<U>(&self, f: impl FnOnce(Result<T>) -> Result<U> + Send + 'static) -> Cell<U>
    where
        U: Send + Sync + 'static,
    {
        let (promise, cell) = channel();
        self.on_complete(move |outcome| {
            let outcome = outcome.clone();
            promise.try_complete(guarded(move || f(outcome)).and_then(|next| next));
        });
        cell
    }

    fn filter(&self, predicate: impl FnOnce(&T) -> bool + Send + 'static) -> Cell<T> {
        self.transform(move |outcome| {
            outcome.and_then(|value| {
                if predicate(&value) {
                    Ok(value)
                } else {
                    Err(Error::PredicateNotSatisfied)
                }
            })
        })
    }

    fn recover(&self, f: impl FnOnce(Error) -> T + Send + 'static) -> Cell<T> {
        self.transform(move |outcome| outcome.or_else(|error| Ok(f(error))))
    }

    fn recover_with(&self, f: impl FnOnce(Error) -> Cell<T> + Send + 'static) -> Cell<T> {
        let (promise, cell) = channel();
        self.on_complete(move |outcome| match outcome {
            Ok(value) => {
                promise.try_success(value.clone());
            }
            Err(error) => {
                let error = error.clone();
                match guarded(move || f(error)) {
                    Ok(next) => promise.complete_with(&next),
                    Err(panicked) => {
                        promise.try_failure(panicked);
                    }
                }
            }
        });
        cell
    }

    fn fallback_to(&self, alternative: &Cell<T>) -> Cell<T> {
        let (promise, cell) = channel();
        let alternative = alternative.clone();
        self.on_complete(move |outcome| match outcome {
            Ok(value) => {
                promise.try_success(value.clone());
            }
            Err(original) => {
                let original = original.clone();
                alternative.on_complete(move |fallback| {
                    let outcome = match fallback {
                        Ok(value) => Ok(value.clone()),
                        Err(_) => Err(original),
                    };
                    promise.try_complete(outcome);
                });
            }
        });
        cell
    }

    fn inspect(&self, f: impl FnOnce(&Result<T>) + Send + 'static) -> Cell<T> {
        self.transform(move |outcome| {
            f(&outcome);
            outcome
        })
    }

    fn zip<U>(&self, other: &Cell<U>) -> Cell<(T, U)>
    where
        U: Clone + Send + Sync + 'static,
    {
        let (promise, cell) = channel();
        let pair: Arc<Mutex<(Option<T>, Option<U>)>> = Arc::new(Mutex::new((None, None)));

        let (left_promise, left_pair) = (promise.clone(), Arc::clone(&pair));
        self.on_complete(move |outcome| match outcome {
            Ok(left) => {
                let ready = {
                    let mut guard = left_pair.lock();
                    guard.0 = Some(left.clone());
                    take_pair(&mut guard)
                };
                if let Some(both) = ready {
                    left_promise.try_success(both);
                }
            }
            Err(error) => {
                left_promise.try_failure(error.clone());
            }
        });

        other.on_complete(move |outcome| match outcome {
            Ok(right) => {
                let ready = {
                    let mut guard = pair.lock();
                    guard.1 = Some(right.clone());
                    take_pair(&mut guard)
                };
                if let Some(both) = ready {
                    promise.try_success(both);
                }
            }
            Err(error) => {
                promise.try_failure(error.clone());
            }
        });
        cell
    }
}

fn take_pair<T, U>(pair: &mut (Option<T>, Option<U>)) -> Option<(T, U)> {
    if pair.0.is_some() && pair.1.is_some() {
        Some((pair.0.take()?, pair.1.take()?))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::promise::CellState;
    use pretty_assertions::assert_eq;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn boom(message: &str) -> Error {
        Error::computation(io::Error::new(io::ErrorKind::Other, message.to_string()))
    }

    #[test]
    fn test_filter_rejects_and_accepts() {
        assert_eq!(
            Cell::successful(10).filter(|v| *v > 20).poll(),
            CellState::Failed(Error::PredicateNotSatisfied)
        );
        assert_eq!(
            Cell::successful(30).filter(|v| *v > 20).poll(),
            CellState::Succeeded(30)
        );
    }

    #[test]
    fn test_filter_passes_failure_through() {
        let failed = Cell::<i32>::failed(boom("upstream"));
        assert_eq!(failed.filter(|_| true).poll(), CellState::Failed(boom("upstream")));
    }

    #[test]
    fn test_map_waits_for_source() {
        let (promise, source) = channel();
        let doubled = source.map(|v: i32| v * 2);
        assert!(doubled.poll().is_pending());
        promise.try_success(21);
        assert_eq!(doubled.poll(), CellState::Succeeded(42));
    }

    #[test]
    fn test_map_skips_closure_on_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mapped = Cell::<i32>::failed(boom("x")).map(move |v| {
            counter.fetch_add(1, Ordering::SeqCst);
            v
        });
        assert_eq!(mapped.poll(), CellState::Failed(boom("x")));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_map_panic_becomes_failure() {
        let mapped = Cell::successful(1).map(|_: i32| -> i32 { panic!("bad map") });
        assert_eq!(
            mapped.poll(),
            CellState::Failed(Error::Panicked("bad map".to_string()))
        );
    }

    #[test]
    fn test_flat_map_follows_inner_cell() {
        let (inner_promise, inner) = channel();
        let chained = Cell::successful(2).flat_map(move |v: i32| inner.map(move |w: i32| v + w));
        assert!(chained.poll().is_pending());
        inner_promise.try_success(40);
        assert_eq!(chained.poll(), CellState::Succeeded(42));
    }

    #[test]
    fn test_and_then_failure() {
        let cell = Cell::successful(3).and_then(|_: i32| -> Result<i32> { Err(boom("rejected")) });
        assert_eq!(cell.poll(), CellState::Failed(boom("rejected")));
    }

    #[test]
    fn test_transform_sees_failures() {
        let cell = Cell::<i32>::failed(boom("x")).transform(|outcome| match outcome {
            Ok(v) => Ok(v.to_string()),
            Err(e) => Ok(format!("handled: {e}")),
        });
        assert_eq!(
            cell.poll(),
            CellState::Succeeded("handled: computation failed: x".to_string())
        );
    }

    #[test]
    fn test_recover() {
        let recovered = Cell::<i32>::failed(boom("x")).recover(|_| -1);
        assert_eq!(recovered.poll(), CellState::Succeeded(-1));
        let untouched = Cell::successful(5).recover(|_| -1);
        assert_eq!(untouched.poll(), CellState::Succeeded(5));
    }

    #[test]
    fn test_recover_with() {
        let recovered = Cell::<i32>::failed(boom("x")).recover_with(|_| Cell::successful(9));
        assert_eq!(recovered.poll(), CellState::Succeeded(9));

        let still_failed =
            Cell::<i32>::failed(boom("x")).recover_with(|_| Cell::failed(boom("y")));
        assert_eq!(still_failed.poll(), CellState::Failed(boom("y")));
    }

    #[test]
    fn test_fallback_to_surfaces_original_error() {
        let primary = Cell::<i32>::failed(boom("primary"));
        let both_failed = primary.fallback_to(&Cell::failed(boom("secondary")));
        assert_eq!(both_failed.poll(), CellState::Failed(boom("primary")));

        let rescued = primary.fallback_to(&Cell::successful(7));
        assert_eq!(rescued.poll(), CellState::Succeeded(7));

        let untouched = Cell::successful(1).fallback_to(&Cell::successful(7));
        assert_eq!(untouched.poll(), CellState::Succeeded(1));
    }

    #[test]
    fn test_fallback_to_waits_for_alternative() {
        let (alt_promise, alternative) = channel();
        let cell = Cell::<i32>::failed(boom("primary")).fallback_to(&alternative);
        assert!(cell.poll().is_pending());
        alt_promise.try_failure(boom("secondary"));
        assert_eq!(cell.poll(), CellState::Failed(boom("primary")));
    }

    #[test]
    fn test_inspect_passes_through() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let cell = Cell::successful(4).inspect(move |outcome| {
            if let Ok(v) = outcome {
                counter.store(*v, Ordering::SeqCst);
            }
        });
        assert_eq!(cell.poll(), CellState::Succeeded(4));
        assert_eq!(seen.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_zip() {
        let (left_promise, left) = channel();
        let (right_promise, right) = channel();
        let zipped = left.zip(&right);
        right_promise.try_success("b");
        assert!(zipped.poll().is_pending());
        left_promise.try_success(1);
        assert_eq!(zipped.poll(), CellState::Succeeded((1, "b")));
    }

    #[test]
    fn test_zip_fails_fast() {
        let (_left_promise, left) = channel::<i32>();
        let zipped = left.zip(&Cell::<i32>::failed(boom("right")));
        assert_eq!(zipped.poll(), CellState::Failed(boom("right")));
    }
}
