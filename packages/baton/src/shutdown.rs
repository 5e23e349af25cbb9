//! Handles of the workers of a closed run.

use std::panic;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::ExitLatch;

/// The workers of a run that has been closed through [`Pool::close()`][crate::Pool::close].
///
/// Closing a pool only requests cancellation. This value lets the caller observe or await the
/// actual exit of the worker threads. Dropping it detaches the threads, which still exit on
/// their own.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
///
/// use baton::Pool;
///
/// let pool = Pool::new(2).unwrap();
/// pool.start(|_, _| {}, Duration::from_millis(10)).unwrap();
///
/// let shutdown = pool.close();
/// assert!(shutdown.wait_timeout(Duration::from_secs(5)));
/// ```
#[derive(Debug)]
pub struct Shutdown {
    workers: Vec<JoinHandle<()>>,
    exits: Arc<ExitLatch>,
}

impl Shutdown {
    pub(crate) fn new(workers: Vec<JoinHandle<()>>, exits: Arc<ExitLatch>) -> Self {
        Self { workers, exits }
    }

    pub(crate) fn empty() -> Self {
        Self::new(Vec::new(), Arc::new(ExitLatch::new(0)))
    }

    /// Returns the number of worker threads that belonged to the closed run.
    ///
    /// This is zero if the pool was not running when it was closed.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Returns whether every worker of the closed run has finished, i.e. left its turn loop
    /// and will never call the callback again.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.exits.is_released()
    }

    /// Waits up to `timeout` for every worker of the closed run to finish.
    ///
    /// Returns whether all workers finished in time. Must not be called from inside the
    /// callback, whose worker cannot finish while the callback is waiting.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.exits.wait_timeout(timeout)
    }

    /// Blocks until every worker thread has exited.
    ///
    /// A worker that is in the middle of the callback exits once the callback returns. Must
    /// not be called from inside the callback.
    ///
    /// # Panics
    ///
    /// If the callback panicked on any worker, the first such panic is resumed on the calling
    /// thread after all workers have been joined.
    pub fn join(self) {
        let mut first_panic = None;

        for worker in self.workers {
            if let Err(payload) = worker.join() {
                first_panic = first_panic.or(Some(payload));
            }
        }

        if let Some(payload) = first_panic {
            panic::resume_unwind(payload);
        }
    }
}
