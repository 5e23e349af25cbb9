//! Cooperative cancellation shared by all workers of one run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Marker returned by cancellation-aware operations once the run has been cancelled.
///
/// Workers react to it by unwinding their loop. It never leaves the worker thread.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Cancelled;

/// Signals workers of one run that they must stop.
///
/// Besides the flag itself, the token owns the condition variable that interrupts workers
/// sleeping through their post-turn delay, so a cancelled run never waits out a long delay.
#[derive(Debug, Default)]
pub(crate) struct CancellationToken {
    cancelled: AtomicBool,

    // Sleepers wait on this pair. The mutex protects no data, it only orders the flag store in
    // cancel() against the flag check a sleeper performs right before it starts waiting.
    sleep_lock: Mutex<()>,
    sleep_wake: Condvar,
}

impl CancellationToken {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        // Acquire pairs with the Release in cancel().
        self.cancelled.load(Ordering::Acquire)
    }

    /// Returns `Err(Cancelled)` if the run has been cancelled, for use with `?`.
    pub(crate) fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    #[cfg_attr(test, mutants::skip)] // Removing this causes timeouts (workers never stop).
    pub(crate) fn cancel(&self) {
        let _guard = self.sleep_lock.lock();

        self.cancelled.store(true, Ordering::Release);
        self.sleep_wake.notify_all();
    }

    /// Sleeps for `duration` unless the run is cancelled first.
    ///
    /// Returns `Err(Cancelled)` as soon as cancellation is observed, whether it happened before
    /// or during the sleep.
    pub(crate) fn sleep(&self, duration: Duration) -> Result<(), Cancelled> {
        if duration.is_zero() {
            return self.check();
        }

        let deadline = Instant::now().checked_add(duration);
        let mut guard = self.sleep_lock.lock();

        loop {
            self.check()?;

            match deadline {
                Some(deadline) => {
                    if self.sleep_wake.wait_until(&mut guard, deadline).timed_out() {
                        return self.check();
                    }
                }
                // The delay is too long to be represented as an instant, so only
                // cancellation can end it.
                None => self.sleep_wake.wait(&mut guard),
            }
        }
    }
}
