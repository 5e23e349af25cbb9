//! Tracks which coordinator, if any, is running the callback on the current thread.

use std::cell::Cell;
use std::ptr;

thread_local! {
    // Address of the coordinator whose callback is executing on this thread, zero if none.
    // Coordinators use it to recognize a cancellation requested by their own callback, which
    // must not wait for the callback to return.
    static DISPATCHING: Cell<usize> = const { Cell::new(0) };
}

/// Marks the current thread as running the callback of `owner` until dropped.
///
/// The previous marker is restored on drop, including when the callback unwinds.
#[derive(Debug)]
pub(crate) struct DispatchScope {
    previous: usize,
}

impl DispatchScope {
    pub(crate) fn enter<T>(owner: &T) -> Self {
        Self {
            previous: DISPATCHING.replace(owner_key(owner)),
        }
    }
}

impl Drop for DispatchScope {
    fn drop(&mut self) {
        DISPATCHING.set(self.previous);
    }
}

/// Whether the current thread is inside the callback dispatched by `owner`.
pub(crate) fn is_dispatching<T>(owner: &T) -> bool {
    DISPATCHING.get() == owner_key(owner)
}

fn owner_key<T>(owner: &T) -> usize {
    ptr::from_ref(owner).addr()
}
