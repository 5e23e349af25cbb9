//! Lock-free turn counter used by the busy-wait coordinator.

use std::sync::atomic::{AtomicU64, Ordering};

/// The counter value of the very first turn of every run.
pub(crate) const FIRST_TURN: u64 = 1;

/// Monotonically increasing turn counter shared by all workers of one busy-wait run.
///
/// Only the worker holding the turn ever increments the counter, so a plain load followed by
/// a separate increment is race-free. Spinning readers observe each new value as soon as the
/// store becomes visible to their processor.
#[derive(Debug)]
pub(crate) struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub(crate) const fn new() -> Self {
        Self {
            value: AtomicU64::new(FIRST_TURN),
        }
    }

    pub(crate) fn get(&self) -> u64 {
        // Acquire pairs with the Release in increment(), so the next turn holder sees every
        // write the previous turn holder made before handing over the turn.
        self.value.load(Ordering::Acquire)
    }

    pub(crate) fn increment(&self) {
        self.value.fetch_add(1, Ordering::Release);
    }
}
