//! Countdown of live workers that lets a closer wait for all of them to exit.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Counts the workers of a run that have not exited yet.
#[derive(Debug)]
pub(crate) struct ExitLatch {
    remaining: Mutex<usize>,
    exited: Condvar,
}

impl ExitLatch {
    pub(crate) fn new(worker_count: usize) -> Self {
        Self {
            remaining: Mutex::new(worker_count),
            exited: Condvar::new(),
        }
    }

    /// Creates the notice a single worker carries for its whole lifetime.
    pub(crate) fn notice(self: &Arc<Self>) -> ExitNotice {
        ExitNotice {
            latch: Arc::clone(self),
        }
    }

    pub(crate) fn is_released(&self) -> bool {
        *self.remaining.lock() == 0
    }

    /// Waits up to `timeout` for every worker to exit. Returns whether all of them did.
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> bool {
        // An unrepresentable deadline is as good as no deadline.
        let deadline = Instant::now().checked_add(timeout);

        let mut remaining = self.remaining.lock();

        while *remaining > 0 {
            match deadline {
                Some(deadline) => {
                    if self.exited.wait_until(&mut remaining, deadline).timed_out() {
                        return *remaining == 0;
                    }
                }
                None => self.exited.wait(&mut remaining),
            }
        }

        true
    }

    #[cfg_attr(test, mutants::skip)] // Removing this causes timeouts (waiters never wake).
    fn count_down(&self) {
        let mut remaining = self.remaining.lock();
        *remaining = remaining.saturating_sub(1);

        if *remaining == 0 {
            self.exited.notify_all();
        }
    }
}

/// Counts its worker out of the latch when dropped, including when the worker unwinds.
#[derive(Debug)]
pub(crate) struct ExitNotice {
    latch: Arc<ExitLatch>,
}

impl Drop for ExitNotice {
    fn drop(&mut self) {
        self.latch.count_down();
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::thread;

    use testing::with_watchdog;

    use super::*;

    #[test]
    fn empty_latch_is_released() {
        let latch = ExitLatch::new(0);

        assert!(latch.is_released());
        assert!(latch.wait_timeout(Duration::ZERO));
    }

    #[test]
    fn released_after_every_notice_is_dropped() {
        let latch = Arc::new(ExitLatch::new(2));
        let first = latch.notice();
        let second = latch.notice();

        drop(first);
        assert!(!latch.is_released());
        assert!(!latch.wait_timeout(Duration::from_millis(10)));

        drop(second);
        assert!(latch.is_released());
        assert!(latch.wait_timeout(Duration::ZERO));
    }

    #[cfg_attr(miri, ignore)]
    #[test]
    fn wait_returns_when_last_worker_exits() {
        with_watchdog(|| {
            let latch = Arc::new(ExitLatch::new(3));

            let workers = (0..3)
                .map(|_| {
                    let notice = latch.notice();

                    thread::spawn(move || {
                        thread::sleep(Duration::from_millis(10));
                        drop(notice);
                    })
                })
                .collect::<Vec<_>>();

            assert!(latch.wait_timeout(Duration::MAX));

            for worker in workers {
                worker.join().unwrap();
            }
        });
    }

    #[cfg_attr(miri, ignore)]
    #[test]
    fn unwinding_worker_counts_down() {
        with_watchdog(|| {
            let latch = Arc::new(ExitLatch::new(1));
            let notice = latch.notice();

            let worker = thread::spawn(move || {
                let _notice = notice;
                panic!("callback failed");
            });

            assert!(latch.wait_timeout(Duration::from_secs(5)));
            assert!(worker.join().is_err());
        });
    }
}
