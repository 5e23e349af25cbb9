//! The seam between the pool lifecycle and the turn-passing strategies.

use std::convert::Infallible;
use std::fmt;
use std::num::NonZero;
use std::sync::Arc;
use std::time::Duration;

use crate::{BlockingCoordinator, BusyCoordinator, Cancelled};

/// The action every worker runs on its turn, called with `(identity, counter)`.
pub(crate) type TurnCallback = Arc<dyn Fn(u32, u64) + Send + Sync>;

/// How the workers of a [`Pool`][crate::Pool] wait for their turn.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum TurnMode {
    /// Workers spin on the shared counter until their turn arrives.
    ///
    /// Every waiting worker keeps a processor busy. This is only reasonable for small pools
    /// with fast callbacks and short delays.
    Busy,

    /// Workers park on a per-worker condition variable and are woken by their predecessor.
    ///
    /// The post-turn delay is spent holding the shared turn lock, so one full round takes at
    /// least `worker_count * delay`.
    Blocking,
}

impl TurnMode {
    pub(crate) fn coordinator(
        self,
        worker_count: NonZero<u32>,
        callback: TurnCallback,
        delay: Duration,
    ) -> Arc<dyn Coordinator> {
        match self {
            Self::Busy => Arc::new(BusyCoordinator::new(worker_count, callback, delay)),
            Self::Blocking => Arc::new(BlockingCoordinator::new(worker_count, callback, delay)),
        }
    }
}

impl fmt::Display for TurnMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => f.write_str("busy"),
            Self::Blocking => f.write_str("blocking"),
        }
    }
}

/// Shared state and per-worker loop of one run.
///
/// A fresh coordinator is created for every run, so nothing (counter, locks, cancellation)
/// carries over from a previous run of the same pool.
pub(crate) trait Coordinator: fmt::Debug + Send + Sync {
    fn mode(&self) -> TurnMode;

    /// Takes turns as the worker with `identity` until the run is cancelled.
    fn take_turns(&self, identity: u32) -> Result<Infallible, Cancelled>;

    /// Stops every worker of the run.
    ///
    /// Workers sleeping or parked are woken and exit. A worker in the middle of the callback
    /// exits once the callback returns.
    fn cancel(&self);
}
