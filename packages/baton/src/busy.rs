//! Turn passing by spinning on a shared atomic counter.

use std::any::type_name;
use std::convert::Infallible;
use std::fmt;
use std::hint;
use std::num::NonZero;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::trace;

use crate::{
    CancellationToken, Cancelled, Coordinator, Counter, DispatchScope, TurnCallback, TurnMode,
    is_dispatching, is_turn,
};

pub(crate) struct BusyCoordinator {
    worker_count: NonZero<u32>,
    delay: Duration,
    callback: TurnCallback,
    counter: Counter,
    token: CancellationToken,

    // Held by the turn holder around its cancellation check and callback. Only the turn
    // holder ever takes it while the run is active, so it is uncontended until cancel() uses
    // it to wait out an in-flight callback.
    dispatch: Mutex<()>,
}

impl BusyCoordinator {
    pub(crate) fn new(worker_count: NonZero<u32>, callback: TurnCallback, delay: Duration) -> Self {
        Self {
            worker_count,
            delay,
            callback,
            counter: Counter::new(),
            token: CancellationToken::new(),
            dispatch: Mutex::new(()),
        }
    }
}

impl fmt::Debug for BusyCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("worker_count", &self.worker_count)
            .field("delay", &self.delay)
            .field("counter", &self.counter)
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

impl Coordinator for BusyCoordinator {
    fn mode(&self) -> TurnMode {
        TurnMode::Busy
    }

    fn take_turns(&self, identity: u32) -> Result<Infallible, Cancelled> {
        loop {
            self.token.check()?;

            let counter = self.counter.get();

            if !is_turn(identity, counter, self.worker_count) {
                hint::spin_loop();
                continue;
            }

            {
                let _dispatch = self.dispatch.lock();

                self.token.check()?;

                let _scope = DispatchScope::enter(self);
                (self.callback)(identity, counter);
            }

            // A cancelled sleep exits without incrementing, so the turn is never handed over
            // twice and the next worker never sees a counter from a run that is shutting down.
            self.token.sleep(self.delay)?;

            self.counter.increment();
            trace!(identity, counter, "busy turn completed");
        }
    }

    #[cfg_attr(test, mutants::skip)] // Removing this causes timeouts (workers never stop).
    fn cancel(&self) {
        self.token.cancel();

        // Called from our own callback, which already holds the dispatch lock. The caller is
        // the only turn holder and sees the token cancelled before its next callback.
        if is_dispatching(self) {
            return;
        }

        // Once the lock is ours, any callback that saw the token uncancelled has returned and
        // every later turn holder will see the token cancelled.
        let _dispatch = self.dispatch.lock();
    }
}
