use std::io;

use thiserror::Error;

/// Errors that can occur when creating or starting a [`Pool`][crate::Pool].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The requested number of workers was zero, negative or larger than the pool supports.
    #[error("invalid worker count {requested}: a pool needs at least one and at most u32::MAX workers")]
    InvalidWorkerCount {
        /// The worker count that was requested by the caller.
        requested: i128,
    },

    /// The pool already has a run in progress. Call [`Pool::close()`][crate::Pool::close]
    /// before starting a new one.
    #[error("pool with {worker_count} workers is already running; close it before starting again")]
    AlreadyRunning {
        /// The number of workers in the run that is still active.
        worker_count: u32,
    },

    /// The operating system refused to create a worker thread.
    #[error("failed to spawn worker thread")]
    Spawn(#[source] io::Error),
}

/// A specialized `Result` type for pool operations, returning the crate's [`Error`] type as
/// the error value.
pub type Result<T> = std::result::Result<T, Error>;
