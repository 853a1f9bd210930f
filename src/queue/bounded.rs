//! Fixed-capacity blocking FIFO

use super::strategy::{Signals, WakeStrategy};
use crate::error::{PutError, QueueError, TakeError};
use log::{debug, trace};
use parking_lot::{Mutex, MutexGuard};
use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// A fixed-capacity FIFO shared by producers and consumers.
///
/// All operations check and mutate under one lock. Blocking calls wait in a
/// loop on the negated precondition, so a wakeup that finds the condition
/// false again (another thread got there first, or a spurious wakeup) simply
/// waits again.
///
/// ### Examples
/// ```rust
/// use cyrup_promise::BoundedQueue;
/// use std::sync::Arc;
/// use std::thread;
///
/// let queue = Arc::new(BoundedQueue::with_capacity(1)?);
/// let producer = {
///     let queue = Arc::clone(&queue);
///     thread::spawn(move || (0..3).for_each(|i| queue.put(i).unwrap()))
/// };
/// let taken: Vec<i32> = (0..3).map(|_| queue.take().unwrap()).collect();
/// producer.join().unwrap();
/// assert_eq!(taken, vec![0, 1, 2]);
/// # Ok::<(), cyrup_promise::QueueError>(())
/// ```
pub struct BoundedQueue<T> {
    capacity: usize,
    state: Mutex<State<T>>,
    signals: Signals,
}

impl<T> BoundedQueue<T> {
    /// Create a queue holding at most `capacity` items, using targeted wakeups.
    pub fn with_capacity(capacity: usize) -> Result<Self, QueueError> {
        Self::with_strategy(capacity, WakeStrategy::default())
    }

    /// Create a queue holding at most `capacity` items with the given wakeup strategy.
    pub fn with_strategy(capacity: usize, strategy: WakeStrategy) -> Result<Self, QueueError> {
        if capacity == 0 {
            return Err(QueueError::ZeroCapacity);
        }
        Ok(Self {
            capacity,
            state: Mutex::new(State {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            signals: Signals::new(strategy),
        })
    }

    /// Insert `item`, blocking while the queue is full.
    pub fn put(&self, item: T) -> Result<(), PutError<T>> {
        self.put_until(item, None)
    }

    /// Insert `item`, blocking for at most `timeout` while the queue is full.
    pub fn put_timeout(&self, item: T, timeout: Duration) -> Result<(), PutError<T>> {
        self.put_until(item, Instant::now().checked_add(timeout))
    }

    /// Insert `item` only if there is room right now.
    pub fn try_put(&self, item: T) -> Result<(), PutError<T>> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(PutError::Closed(item));
        }
        if state.items.len() == self.capacity {
            return Err(PutError::Full(item));
        }
        self.push(state, item);
        Ok(())
    }

    /// Remove the head item, blocking while the queue is empty.
    ///
    /// Once the queue is closed, remaining items are still handed out; after
    /// that every call fails with [`TakeError::Closed`].
    pub fn take(&self) -> Result<T, TakeError> {
        self.take_until(None)
    }

    /// Remove the head item, blocking for at most `timeout` while the queue is empty.
    pub fn take_timeout(&self, timeout: Duration) -> Result<T, TakeError> {
        self.take_until(Instant::now().checked_add(timeout))
    }

    /// Remove the head item only if one is available right now.
    pub fn try_take(&self) -> Result<T, TakeError> {
        let state = self.state.lock();
        if state.items.is_empty() {
            return Err(if state.closed {
                TakeError::Closed
            } else {
                TakeError::Empty
            });
        }
        self.pop(state)
    }

    /// Refuse further insertions and wake every waiter. Returns false if the
    /// queue was already closed.
    pub fn close(&self) -> bool {
        let remaining = {
            let mut state = self.state.lock();
            if state.closed {
                return false;
            }
            state.closed = true;
            state.items.len()
        };
        self.signals.wake_all();
        debug!("bounded queue closed with {remaining} item(s) left");
        true
    }

    /// Returns true once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Number of items currently queued.
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Returns true if no items are queued.
    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    /// Returns true if every slot is taken.
    pub fn is_full(&self) -> bool {
        self.state.lock().items.len() == self.capacity
    }

    /// Maximum number of queued items.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The wakeup strategy this queue was built with.
    pub fn strategy(&self) -> WakeStrategy {
        self.signals.strategy()
    }

    fn put_until(&self, item: T, deadline: Option<Instant>) -> Result<(), PutError<T>> {
        let mut state = self.state.lock();
        while state.items.len() == self.capacity && !state.closed {
            let timed_out = match deadline {
                None => {
                    self.signals.space().wait(&mut state);
                    false
                }
                Some(deadline) => self
                    .signals
                    .space()
                    .wait_until(&mut state, deadline)
                    .timed_out(),
            };
            if timed_out && state.items.len() == self.capacity && !state.closed {
                return Err(PutError::Timeout(item));
            }
        }
        if state.closed {
            return Err(PutError::Closed(item));
        }
        self.push(state, item);
        Ok(())
    }

    fn take_until(&self, deadline: Option<Instant>) -> Result<T, TakeError> {
        let mut state = self.state.lock();
        while state.items.is_empty() && !state.closed {
            let timed_out = match deadline {
                None => {
                    self.signals.items().wait(&mut state);
                    false
                }
                Some(deadline) => self
                    .signals
                    .items()
                    .wait_until(&mut state, deadline)
                    .timed_out(),
            };
            if timed_out && state.items.is_empty() && !state.closed {
                return Err(TakeError::Timeout);
            }
        }
        self.pop(state)
    }

    fn push(&self, mut state: MutexGuard<'_, State<T>>, item: T) {
        state.items.push_back(item);
        debug_assert!(state.items.len() <= self.capacity);
        let len = state.items.len();
        drop(state);
        trace!("put: {len}/{} queued", self.capacity);
        self.signals.wake_consumer();
    }

    fn pop(&self, mut state: MutexGuard<'_, State<T>>) -> Result<T, TakeError> {
        let item = state.items.pop_front().ok_or(TakeError::Closed)?;
        let len = state.items.len();
        drop(state);
        trace!("take: {len}/{} queued", self.capacity);
        self.signals.wake_producer();
        Ok(item)
    }
}

impl<T> fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("BoundedQueue")
            .field("capacity", &self.capacity)
            .field("len", &state.items.len())
            .field("closed", &state.closed)
            .field("strategy", &self.signals.strategy())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(
            BoundedQueue::<u8>::with_capacity(0).unwrap_err(),
            QueueError::ZeroCapacity
        );
    }

    #[test]
    fn test_fifo_within_capacity() {
        let queue = BoundedQueue::with_capacity(3).unwrap();
        for i in 0..3 {
            queue.put(i).unwrap();
        }
        assert!(queue.is_full());
        assert_eq!(queue.try_put(9), Err(PutError::Full(9)));
        assert_eq!(
            (0..3).map(|_| queue.take().unwrap()).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert!(queue.is_empty());
        assert_eq!(queue.try_take(), Err(TakeError::Empty));
    }

    #[test]
    fn test_timeouts() {
        let queue = BoundedQueue::with_capacity(1).unwrap();
        assert_eq!(
            queue.take_timeout(Duration::from_millis(10)),
            Err(TakeError::Timeout)
        );
        queue.put("a").unwrap();
        assert_eq!(
            queue.put_timeout("b", Duration::from_millis(10)),
            Err(PutError::Timeout("b"))
        );
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_close_drains_then_fails() {
        let queue = BoundedQueue::with_capacity(2).unwrap();
        queue.put(1).unwrap();
        assert!(queue.close());
        assert!(!queue.close());
        assert_eq!(queue.put(2), Err(PutError::Closed(2)));
        assert_eq!(queue.try_put(3), Err(PutError::Closed(3)));
        assert_eq!(queue.take(), Ok(1));
        assert_eq!(queue.take(), Err(TakeError::Closed));
        assert_eq!(queue.try_take(), Err(TakeError::Closed));
    }

    #[test]
    fn test_close_wakes_blocked_consumer() {
        let queue = Arc::new(BoundedQueue::<u8>::with_capacity(1).unwrap());
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.take())
        };
        thread::sleep(Duration::from_millis(20));
        queue.close();
        assert_eq!(consumer.join().unwrap(), Err(TakeError::Closed));
    }

    #[test]
    fn test_close_wakes_blocked_producer() {
        let queue = Arc::new(BoundedQueue::with_strategy(1, WakeStrategy::Broadcast).unwrap());
        queue.put(0).unwrap();
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.put(1))
        };
        thread::sleep(Duration::from_millis(20));
        queue.close();
        assert_eq!(producer.join().unwrap(), Err(PutError::Closed(1)));
    }

    #[test]
    fn test_blocked_put_resumes_after_take() {
        let queue = Arc::new(BoundedQueue::with_capacity(1).unwrap());
        queue.put(1).unwrap();
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.put(2))
        };
        thread::sleep(Duration::from_millis(20));
        assert_eq!(queue.take(), Ok(1));
        producer.join().unwrap().unwrap();
        assert_eq!(queue.take(), Ok(2));
    }

    #[test]
    fn test_debug_output() {
        let queue = BoundedQueue::with_capacity(2).unwrap();
        queue.put('x').unwrap();
        assert_eq!(
            format!("{queue:?}"),
            "BoundedQueue { capacity: 2, len: 1, closed: false, strategy: Targeted }"
        );
    }
}
