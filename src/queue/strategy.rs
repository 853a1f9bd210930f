//! How a bounded queue wakes its waiters

use parking_lot::Condvar;

/// Wakeup discipline of a [`BoundedQueue`](super::BoundedQueue).
///
/// Both are correct for any number of producers and consumers; they differ in
/// how many threads a single state change wakes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WakeStrategy {
    /// Producers and consumers wait on separate condition variables. A put
    /// wakes one consumer and a take wakes one producer, since only that class
    /// can make progress from the change.
    #[default]
    Targeted,
    /// Everyone waits on one condition variable and every change wakes all of
    /// them; each rechecks its own condition.
    Broadcast,
}

pub(super) enum Signals {
    Targeted { not_full: Condvar, not_empty: Condvar },
    Broadcast { changed: Condvar },
}

impl Signals {
    pub(super) fn new(strategy: WakeStrategy) -> Self {
        match strategy {
            WakeStrategy::Targeted => Self::Targeted {
                not_full: Condvar::new(),
                not_empty: Condvar::new(),
            },
            WakeStrategy::Broadcast => Self::Broadcast {
                changed: Condvar::new(),
            },
        }
    }

    pub(super) fn strategy(&self) -> WakeStrategy {
        match self {
            Self::Targeted { .. } => WakeStrategy::Targeted,
            Self::Broadcast { .. } => WakeStrategy::Broadcast,
        }
    }

    /// Where producers wait for a free slot.
    pub(super) fn space(&self) -> &Condvar {
        match self {
            Self::Targeted { not_full, .. } => not_full,
            Self::Broadcast { changed } => changed,
        }
    }

    /// Where consumers wait for an item.
    pub(super) fn items(&self) -> &Condvar {
        match self {
            Self::Targeted { not_empty, .. } => not_empty,
            Self::Broadcast { changed } => changed,
        }
    }

    pub(super) fn wake_consumer(&self) {
        match self {
            Self::Targeted { not_empty, .. } => {
                not_empty.notify_one();
            }
            Self::Broadcast { changed } => {
                changed.notify_all();
            }
        }
    }

    pub(super) fn wake_producer(&self) {
        match self {
            Self::Targeted { not_full, .. } => {
                not_full.notify_one();
            }
            Self::Broadcast { changed } => {
                changed.notify_all();
            }
        }
    }

    pub(super) fn wake_all(&self) {
        match self {
            Self::Targeted {
                not_full,
                not_empty,
            } => {
                not_full.notify_all();
                not_empty.notify_all();
            }
            Self::Broadcast { changed } => {
                changed.notify_all();
            }
        }
    }
}
