#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(coverage_nightly, coverage(off))] // This is all test code, no need to test it.

//! Private helpers for tests, examples and benchmarks in the baton workspace.

use std::sync::{Arc, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Runs a test with a timeout to prevent infinite hangs.
///
/// Turn-taking bugs tend to show up as deadlocks (a worker that is never woken), so every
/// test that starts a pool runs inside this wrapper. If the test takes longer than the
/// timeout, the test fails instead of hanging the test run.
///
/// The timeout is 10 seconds under normal conditions and 60 seconds under Miri, where thread
/// synchronization primitives are significantly slower.
///
/// When the `MUTATION_TESTING` environment variable is set to "1", the watchdog is disabled
/// and the test function is executed directly, so that mutation testing can detect hanging
/// mutations through its own timeout.
///
/// # Panics
///
/// Panics if the test exceeds the timeout (when not in mutation testing mode), or re-raises
/// the panic of the test itself.
///
/// # Example
///
/// ```rust
/// use testing::with_watchdog;
///
/// with_watchdog(|| {
///     assert_eq!(2 + 2, 4);
/// });
/// ```
pub fn with_watchdog<F, R>(test_fn: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    if std::env::var("MUTATION_TESTING").as_deref() == Ok("1") {
        return test_fn();
    }

    let (tx, rx) = mpsc::channel();

    let test_handle = thread::spawn(move || {
        let result = test_fn();
        // If this fails, the receiver has already timed out.
        drop(tx.send(result));
    });

    let timeout = if cfg!(miri) {
        Duration::from_secs(60)
    } else {
        Duration::from_secs(10)
    };

    match rx.recv_timeout(timeout) {
        Ok(result) => {
            test_handle.join().expect("test thread should not panic after sending a result");
            result
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            panic!("test exceeded {timeout:?} timeout, probably a lost turn handoff");
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => match test_handle.join() {
            Ok(()) => panic!("test thread disconnected unexpectedly"),
            Err(e) => std::panic::resume_unwind(e),
        },
    }
}

/// Records the `(identity, counter)` pairs a pool passes to its callback.
///
/// Tests hand [`TurnRecorder::callback()`] to a pool and then block in
/// [`TurnRecorder::wait_for()`] until enough turns have been taken.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
///
/// use testing::TurnRecorder;
///
/// let recorder = TurnRecorder::new();
/// let callback = recorder.callback();
///
/// callback(1, 1);
/// callback(2, 2);
///
/// assert_eq!(
///     recorder.wait_for(2, Duration::from_secs(1)),
///     vec![(1, 1), (2, 2)]
/// );
/// ```
#[derive(Debug, Default)]
pub struct TurnRecorder {
    turns: Mutex<Vec<(u32, u64)>>,
    recorded: Condvar,
}

impl TurnRecorder {
    /// Creates an empty recorder, ready to be shared with pool workers.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Appends one turn to the record.
    pub fn record(&self, identity: u32, counter: u64) {
        self.turns.lock().push((identity, counter));
        self.recorded.notify_all();
    }

    /// Returns a pool callback that records every turn into this recorder.
    #[must_use]
    pub fn callback(self: &Arc<Self>) -> impl Fn(u32, u64) + Send + Sync + 'static + use<> {
        let recorder = Arc::clone(self);

        move |identity, counter| recorder.record(identity, counter)
    }

    /// Blocks until at least `count` turns have been recorded and returns the first `count`.
    ///
    /// # Panics
    ///
    /// Panics if fewer than `count` turns have been recorded when `timeout` elapses.
    #[must_use]
    pub fn wait_for(&self, count: usize, timeout: Duration) -> Vec<(u32, u64)> {
        let deadline = Instant::now()
            .checked_add(timeout)
            .expect("test timeout must be representable as an instant");

        let mut turns = self.turns.lock();

        while turns.len() < count {
            assert!(
                !self.recorded.wait_until(&mut turns, deadline).timed_out() || turns.len() >= count,
                "only {} of {count} turns were recorded within {timeout:?}",
                turns.len()
            );
        }

        turns.iter().take(count).copied().collect()
    }

    /// Returns every turn recorded so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(u32, u64)> {
        self.turns.lock().clone()
    }

    /// Returns the number of turns recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.lock().len()
    }

    /// Returns whether no turn has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.lock().is_empty()
    }
}

/// Asserts that `turns` is the exact round-robin sequence a pool of `worker_count` workers
/// produces from its first turn: counters `1, 2, 3, ...` with identity `i` holding every
/// counter `c` where `c mod worker_count == i mod worker_count`.
///
/// # Panics
///
/// Panics with a description of the first deviating turn.
pub fn assert_round_robin(turns: &[(u32, u64)], worker_count: u32) {
    for (expected_counter, &(identity, counter)) in (1_u64..).zip(turns) {
        assert_eq!(
            counter, expected_counter,
            "turn sequence skipped or repeated a counter value: {turns:?}"
        );

        let expected_identity = u32::try_from((expected_counter - 1) % u64::from(worker_count))
            .expect("remainder is below worker_count")
            + 1;

        assert_eq!(
            identity, expected_identity,
            "counter {counter} was taken by worker {identity} instead of {expected_identity}: {turns:?}"
        );
    }
}
