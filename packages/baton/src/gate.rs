//! One-shot gate that holds freshly spawned workers until the whole pool exists.

use parking_lot::{Condvar, Mutex};

/// Workers block on the gate until the pool has spawned every one of them.
///
/// Opening is permanent. The gate is also opened when spawning fails part of the way through,
/// so that the workers which did start can observe cancellation and exit.
#[derive(Debug, Default)]
pub(crate) struct StartGate {
    open: Mutex<bool>,
    opened: Condvar,
}

impl StartGate {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[cfg_attr(test, mutants::skip)] // Removing this causes timeouts (workers never start).
    pub(crate) fn open(&self) {
        let mut open = self.open.lock();
        *open = true;

        self.opened.notify_all();
    }

    pub(crate) fn wait(&self) {
        let mut open = self.open.lock();

        while !*open {
            self.opened.wait(&mut open);
        }
    }
}
