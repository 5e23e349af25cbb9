//! Worker pool whose threads take turns executing an action in strict round-robin order.
//!
//! A [`Pool`] of `N` workers shares one counter that starts at 1. Worker `k` (numbered from 1)
//! holds the turn when `k mod N == counter mod N`. On its turn the worker calls the callback
//! with its number and the counter value, waits for a fixed delay and then increments the
//! counter, which hands the turn to worker `k mod N + 1`.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use std::thread;
//! use std::time::Duration;
//!
//! use baton::Pool;
//!
//! let turns = Arc::new(Mutex::new(Vec::new()));
//!
//! let pool = Pool::new(3).unwrap();
//! pool.start(
//!     {
//!         let turns = Arc::clone(&turns);
//!         move |identity, counter| turns.lock().unwrap().push((identity, counter))
//!     },
//!     Duration::from_millis(1),
//! )
//! .unwrap();
//!
//! while turns.lock().unwrap().len() < 6 {
//!     thread::sleep(Duration::from_millis(1));
//! }
//!
//! pool.close().join();
//!
//! let turns = turns.lock().unwrap();
//! assert_eq!(
//!     turns[..6],
//!     [(1, 1), (2, 2), (3, 3), (1, 4), (2, 5), (3, 6)]
//! );
//! ```
//!
//! # Turn-passing modes
//!
//! - [`TurnMode::Blocking`] ([`Pool::start()`]): workers park on their own condition variable
//!   and the worker finishing a turn wakes exactly its successor. The callback and the
//!   post-turn delay run under a shared lock, so callback invocations never overlap.
//! - [`TurnMode::Busy`] ([`Pool::start_busy()`]): workers spin on an atomic counter. Simple
//!   and responsive, but every worker occupies a processor for the whole run.
//!
//! # Shutdown behavior
//!
//! [`Pool::close()`] (also called when the pool is dropped) cancels the run: no callback
//! invocation begins after it returns and workers sleeping through their delay or waiting
//! for their turn exit promptly. It does not wait for the threads to exit; the returned
//! [`Shutdown`] can be used for that. A callback may close its own pool; its worker then
//! exits once the callback returns.
//!
//! # Panics
//!
//! The callback must not panic. A panic unwinds the worker that ran the callback and is not
//! caught by the pool, leaving the remaining workers waiting for a turn that never comes.

mod blocking;
mod busy;
mod cancel;
mod coordinator;
mod counter;
mod dispatch;
mod error;
mod gate;
mod latch;
mod pool;
mod shutdown;
mod turn;
mod worker_count;

pub(crate) use blocking::*;
pub(crate) use busy::*;
pub(crate) use cancel::*;
pub use coordinator::TurnMode;
pub(crate) use coordinator::{Coordinator, TurnCallback};
pub(crate) use counter::*;
pub(crate) use dispatch::*;
pub use error::*;
pub(crate) use gate::*;
pub(crate) use latch::*;
pub use pool::*;
pub use shutdown::*;
pub use turn::is_turn;
pub(crate) use turn::{parking_slot, wake_slot};
pub use worker_count::*;
