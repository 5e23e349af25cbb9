//! Pool management and lifecycle.

use std::any::type_name;
#[cfg(test)]
use std::cell::Cell;
use std::fmt;
use std::io;
use std::num::NonZero;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use new_zealand::nz;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::{Coordinator, Error, ExitLatch, Result, Shutdown, StartGate, TurnMode, WorkerCount};

const DEFAULT_WORKER_COUNT: NonZero<u32> = nz!(1_u32);
const DEFAULT_THREAD_NAME_PREFIX: &str = "baton";

#[cfg(test)]
thread_local! {
    // Identity of the worker whose spawn fails when a run is started from this thread.
    static FAILING_SPAWN: Cell<Option<u32>> = const { Cell::new(None) };
}

/// The live part of a started pool.
struct Run {
    coordinator: Arc<dyn Coordinator>,
    workers: Vec<JoinHandle<()>>,
    exits: Arc<ExitLatch>,
}

impl fmt::Debug for Run {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("coordinator", &self.coordinator)
            .field("worker_count", &self.workers.len())
            .field("exits", &self.exits)
            .finish()
    }
}

/// A fixed-size pool of worker threads that take turns executing a callback in strict
/// round-robin order.
///
/// Workers are numbered `1..=worker_count`. A shared counter starts at 1 on every run. The
/// worker whose number leaves the same remainder as the counter when divided by the worker
/// count holds the turn: it calls the callback with its number and the counter value, waits
/// for the configured delay and then increments the counter, passing the turn on.
///
/// # Lifecycle
///
/// A pool is idle after construction. [`start()`][Self::start],
/// [`start_busy()`][Self::start_busy] or [`start_with()`][Self::start_with] spawn the workers
/// and [`close()`][Self::close] cancels them, after which the pool can be started again. Each
/// run gets a fresh counter, so turns from an earlier run never leak into a later one.
///
/// Dropping the pool closes it without waiting for the workers to exit.
///
/// # Callback
///
/// The callback must not panic. A panic unwinds the worker thread that ran the callback and
/// the remaining workers of the run wait for a turn that never comes. The panic can be
/// observed through [`Shutdown::join()`] after closing the pool.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
///
/// use baton::Pool;
///
/// let pool = Pool::new(3).unwrap();
///
/// pool.start(
///     |identity, counter| println!("worker {identity} took turn {counter}"),
///     Duration::from_millis(1),
/// )
/// .unwrap();
///
/// // ... let the workers take a few turns ...
///
/// pool.close();
/// ```
#[derive(Debug)]
pub struct Pool {
    worker_count: WorkerCount,
    thread_name_prefix: String,
    run: Mutex<Option<Run>>,
}

impl Pool {
    /// Creates an idle pool with `worker_count` workers and default settings.
    ///
    /// Use [`Pool::builder()`] for custom configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidWorkerCount`] if `worker_count` is zero or does not fit in a
    /// `u32`. No thread is spawned in that case.
    pub fn new(worker_count: usize) -> Result<Self> {
        Ok(Self::with_worker_count(WorkerCount::try_from(worker_count)?))
    }

    /// Creates an idle pool with an already validated number of workers.
    #[must_use]
    pub fn with_worker_count(worker_count: WorkerCount) -> Self {
        Self::builder().worker_count(worker_count).build()
    }

    /// Creates a builder for configuring the pool.
    #[must_use]
    pub fn builder() -> PoolBuilder {
        PoolBuilder::new()
    }

    /// Returns the number of workers every run of this pool spawns.
    #[must_use]
    pub fn worker_count(&self) -> WorkerCount {
        self.worker_count
    }

    /// Returns whether a run is active, i.e. the pool has been started and not closed since.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.run.lock().is_some()
    }

    /// Returns the mode of the active run, if any.
    #[must_use]
    pub fn mode(&self) -> Option<TurnMode> {
        self.run.lock().as_ref().map(|run| run.coordinator.mode())
    }

    /// Starts a run in which workers park between turns ([`TurnMode::Blocking`]).
    ///
    /// # Errors
    ///
    /// See [`start_with()`][Self::start_with].
    pub fn start<F>(&self, callback: F, delay: Duration) -> Result<()>
    where
        F: Fn(u32, u64) + Send + Sync + 'static,
    {
        self.start_with(TurnMode::Blocking, callback, delay)
    }

    /// Starts a run in which workers spin between turns ([`TurnMode::Busy`]).
    ///
    /// Every worker keeps a processor busy for the whole run.
    ///
    /// # Errors
    ///
    /// See [`start_with()`][Self::start_with].
    pub fn start_busy<F>(&self, callback: F, delay: Duration) -> Result<()>
    where
        F: Fn(u32, u64) + Send + Sync + 'static,
    {
        self.start_with(TurnMode::Busy, callback, delay)
    }

    /// Starts a run with the given turn-passing mode.
    ///
    /// Spawns one thread per worker. The workers only begin taking turns once every one of
    /// them has been spawned. After each call to `callback` the calling worker waits for
    /// `delay` before passing the turn on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyRunning`] if the pool has not been closed since it was last
    /// started. The active run is not affected.
    ///
    /// Returns [`Error::Spawn`] if a worker thread cannot be created. The workers spawned so
    /// far are cancelled and the pool stays idle.
    pub fn start_with<F>(&self, mode: TurnMode, callback: F, delay: Duration) -> Result<()>
    where
        F: Fn(u32, u64) + Send + Sync + 'static,
    {
        let mut run = self.run.lock();

        if run.is_some() {
            return Err(Error::AlreadyRunning {
                worker_count: self.worker_count.get(),
            });
        }

        let worker_count = self.worker_count.as_non_zero();
        let coordinator = mode.coordinator(worker_count, Arc::new(callback), delay);
        let gate = Arc::new(StartGate::new());
        let exits = Arc::new(ExitLatch::new(worker_count.get() as usize));

        let mut workers = Vec::with_capacity(worker_count.get() as usize);

        for identity in 1..=worker_count.get() {
            let coordinator_clone = Arc::clone(&coordinator);
            let gate_clone = Arc::clone(&gate);
            let exit_notice = exits.notice();

            let spawned = spawn_worker(&self.thread_name_prefix, identity, move || {
                let _exit_notice = exit_notice;
                worker_entrypoint(&*coordinator_clone, &gate_clone, identity);
            });

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(error) => {
                    warn!(identity, %mode, %error, "failed to spawn worker thread, abandoning run");

                    coordinator.cancel();
                    gate.open();

                    return Err(Error::Spawn(error));
                }
            }
        }

        gate.open();
        debug!(worker_count = worker_count.get(), %mode, "pool started");

        *run = Some(Run {
            coordinator,
            workers,
            exits,
        });

        Ok(())
    }

    /// Cancels the active run and forgets its workers.
    ///
    /// No callback invocation begins after this returns. Workers sleeping through their
    /// post-turn delay or waiting for their turn are woken and exit promptly. A worker in the
    /// middle of the callback exits once the callback returns.
    ///
    /// This does not wait for the worker threads to exit. Use the returned [`Shutdown`] for
    /// that, or drop it to let the threads finish on their own. The pool can be started again
    /// as soon as this returns.
    ///
    /// Calling this on a pool that is not running does nothing.
    ///
    /// This may be called from inside the callback, in either mode. The calling worker then
    /// finishes its turn without passing it on and exits. Waiting on the returned
    /// [`Shutdown`] from inside the callback never completes, because the calling worker is
    /// one of the workers it waits for.
    pub fn close(&self) -> Shutdown {
        let Some(run) = self.run.lock().take() else {
            return Shutdown::empty();
        };

        run.coordinator.cancel();

        debug!(
            worker_count = self.worker_count.get(),
            mode = %run.coordinator.mode(),
            "pool closed"
        );

        Shutdown::new(run.workers, run.exits)
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        // The workers exit on their own once cancelled, so there is no need to wait for them.
        drop(self.close());
    }
}

fn spawn_worker<F>(thread_name_prefix: &str, identity: u32, f: F) -> io::Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    #[cfg(test)]
    if FAILING_SPAWN.get() == Some(identity) {
        return Err(io::Error::other("worker spawn failure requested by test"));
    }

    thread::Builder::new()
        .name(format!("{thread_name_prefix}-w{identity}"))
        .spawn(f)
}

fn worker_entrypoint(coordinator: &dyn Coordinator, gate: &StartGate, identity: u32) {
    gate.wait();

    let mode = coordinator.mode();
    debug!(identity, %mode, "worker thread started");

    // The turn loop only ever ends through cancellation.
    let Err(_cancelled) = coordinator.take_turns(identity);

    debug!(identity, %mode, "worker thread exiting");
}

/// Builder for configuring a [`Pool`].
#[derive(Debug)]
pub struct PoolBuilder {
    worker_count: WorkerCount,
    thread_name_prefix: String,
}

impl PoolBuilder {
    fn new() -> Self {
        Self {
            worker_count: WorkerCount::from(DEFAULT_WORKER_COUNT),
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_owned(),
        }
    }

    /// Sets the number of workers.
    ///
    /// Default is 1.
    #[must_use]
    pub fn worker_count(mut self, count: impl Into<WorkerCount>) -> Self {
        self.worker_count = count.into();
        self
    }

    /// Sets the prefix of the worker thread names. Worker threads are named
    /// `{prefix}-w{identity}`.
    ///
    /// Default is `baton`.
    #[must_use]
    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Builds an idle pool with the configured settings.
    #[must_use]
    pub fn build(self) -> Pool {
        Pool {
            worker_count: self.worker_count,
            thread_name_prefix: self.thread_name_prefix,
            run: Mutex::new(None),
        }
    }
}
