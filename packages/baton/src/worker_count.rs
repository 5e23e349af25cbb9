//! Validated pool size.

use std::fmt;
use std::num::NonZero;

use crate::{Error, Result};

/// The number of workers in a [`Pool`][crate::Pool], guaranteed to be at least one.
///
/// Use the `TryFrom` conversions to validate sizes that come from untrusted or signed input.
///
/// # Example
///
/// ```rust
/// use baton::WorkerCount;
///
/// let count = WorkerCount::try_from(4_usize).unwrap();
/// assert_eq!(count.get(), 4);
///
/// assert!(WorkerCount::try_from(0_usize).is_err());
/// assert!(WorkerCount::try_from(-1_i64).is_err());
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct WorkerCount(NonZero<u32>);

impl WorkerCount {
    /// Returns the number of workers as a plain integer.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Returns the number of workers as a non-zero integer.
    #[must_use]
    pub const fn as_non_zero(self) -> NonZero<u32> {
        self.0
    }

    fn from_wide(requested: i128) -> Result<Self> {
        u32::try_from(requested)
            .ok()
            .and_then(NonZero::new)
            .map(Self)
            .ok_or(Error::InvalidWorkerCount { requested })
    }
}

impl From<NonZero<u32>> for WorkerCount {
    fn from(value: NonZero<u32>) -> Self {
        Self(value)
    }
}

impl TryFrom<usize> for WorkerCount {
    type Error = Error;

    fn try_from(value: usize) -> Result<Self> {
        // usize is at most 64 bits wide on every supported target, so this never saturates.
        Self::from_wide(i128::try_from(value).unwrap_or(i128::MAX))
    }
}

impl TryFrom<i64> for WorkerCount {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        Self::from_wide(i128::from(value))
    }
}

impl fmt::Display for WorkerCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
