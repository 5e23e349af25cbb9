//! Turn passing through a shared lock and one condition variable per worker.

use std::any::type_name;
use std::convert::Infallible;
use std::fmt;
use std::iter;
use std::num::NonZero;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::trace;

use crate::{
    CancellationToken, Cancelled, Coordinator, DispatchScope, FIRST_TURN, TurnCallback, TurnMode,
    is_dispatching, is_turn, parking_slot, wake_slot,
};

#[derive(Debug)]
struct TurnState {
    counter: u64,
}

/// Hands the turn from worker to worker with targeted wake-ups.
///
/// The worker with identity `t` parks on slot `t - 1`. After completing its turn it wakes only
/// the slot of its successor, so a handoff never disturbs the other parked workers.
///
/// The callback and the post-turn delay both run while the turn lock is held, which
/// serializes all callback invocations of the run.
pub(crate) struct BlockingCoordinator {
    worker_count: NonZero<u32>,
    delay: Duration,
    callback: TurnCallback,
    token: CancellationToken,
    state: Mutex<TurnState>,
    slots: Box<[Condvar]>,
}

impl BlockingCoordinator {
    pub(crate) fn new(worker_count: NonZero<u32>, callback: TurnCallback, delay: Duration) -> Self {
        let slots = iter::repeat_with(Condvar::new)
            .take(worker_count.get() as usize)
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            worker_count,
            delay,
            callback,
            token: CancellationToken::new(),
            state: Mutex::new(TurnState {
                counter: FIRST_TURN,
            }),
            slots,
        }
    }

    #[allow(
        clippy::indexing_slicing,
        reason = "there is one slot per identity and identities never exceed worker_count"
    )]
    fn slot(&self, index: usize) -> &Condvar {
        &self.slots[index]
    }

    fn wake_all(&self) {
        for slot in &self.slots {
            slot.notify_all();
        }
    }
}

impl fmt::Debug for BlockingCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("worker_count", &self.worker_count)
            .field("delay", &self.delay)
            .field("token", &self.token)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Coordinator for BlockingCoordinator {
    fn mode(&self) -> TurnMode {
        TurnMode::Blocking
    }

    fn take_turns(&self, identity: u32) -> Result<Infallible, Cancelled> {
        let own_slot = self.slot(parking_slot(identity));
        let successor_slot = self.slot(wake_slot(identity, self.worker_count));

        loop {
            let mut state = self.state.lock();

            // Every early return below drops the guard, so a cancelled worker never keeps
            // the turn lock from the others.
            self.token.check()?;

            // Re-checked after every wake-up, spurious or not.
            while !is_turn(identity, state.counter, self.worker_count) {
                own_slot.wait(&mut state);
                self.token.check()?;
            }

            let counter = state.counter;

            {
                let _scope = DispatchScope::enter(self);
                (self.callback)(identity, counter);
            }

            self.token.sleep(self.delay)?;

            state.counter = counter.wrapping_add(1);
            trace!(identity, counter, "blocking turn completed");

            successor_slot.notify_one();
        }
    }

    #[cfg_attr(test, mutants::skip)] // Removing this causes timeouts (workers never stop).
    fn cancel(&self) {
        // Wakes the turn holder if it is sleeping through its delay.
        self.token.cancel();

        // Parked workers check the token while holding the turn lock before they park, so
        // notifying under the same lock guarantees that none of them misses the wake-up. When
        // called from our own callback, this thread already holds the turn lock.
        let _state = (!is_dispatching(self)).then(|| self.state.lock());

        self.wake_all();
    }
}
