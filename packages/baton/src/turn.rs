//! Turn assignment arithmetic shared by both coordination modes.

use std::num::NonZero;

/// Returns whether the worker with `identity` holds the turn for `counter` in a pool of
/// `worker_count` workers.
///
/// Identities start at 1. The worker holds the turn when its identity and the counter leave
/// the same remainder when divided by the worker count, so for any counter value exactly one
/// identity in `1..=worker_count` holds the turn.
///
/// # Example
///
/// ```rust
/// use baton::is_turn;
/// use new_zealand::nz;
///
/// assert!(is_turn(1, 1, nz!(3)));
/// assert!(is_turn(3, 6, nz!(3)));
/// assert!(!is_turn(2, 6, nz!(3)));
/// ```
#[must_use]
pub fn is_turn(identity: u32, counter: u64, worker_count: NonZero<u32>) -> bool {
    let modulus = NonZero::<u64>::from(worker_count);

    u64::from(identity) % modulus == counter % modulus
}

/// The identity that takes over after `identity` completes its turn.
#[allow(
    clippy::arithmetic_side_effects,
    reason = "remainder is below worker_count, which fits in u32, so adding one cannot overflow"
)]
pub(crate) fn next_identity(identity: u32, worker_count: NonZero<u32>) -> u32 {
    identity % worker_count + 1
}

/// The wait-slot a worker parks on while waiting for its own turn.
#[allow(
    clippy::arithmetic_side_effects,
    reason = "identities start at 1, so subtracting one cannot underflow"
)]
pub(crate) fn parking_slot(identity: u32) -> usize {
    debug_assert!(identity >= 1, "worker identities start at 1");

    (identity - 1) as usize
}

/// The wait-slot the worker with `identity` signals after completing its turn.
///
/// This is the parking slot of [`next_identity`].
pub(crate) fn wake_slot(identity: u32, worker_count: NonZero<u32>) -> usize {
    parking_slot(next_identity(identity, worker_count))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use new_zealand::nz;

    use super::*;

    #[test]
    fn exactly_one_identity_holds_each_turn() {
        let worker_count = nz!(5_u32);

        for counter in 1..=50_u64 {
            let holders = (1..=worker_count.get())
                .filter(|identity| is_turn(*identity, counter, worker_count))
                .count();

            assert_eq!(holders, 1, "counter {counter} has {holders} turn holders");
        }
    }

    #[test]
    fn turns_cycle_through_identities() {
        let worker_count = nz!(3_u32);

        let holders = (1..=7_u64)
            .map(|counter| {
                (1..=worker_count.get())
                    .find(|identity| is_turn(*identity, counter, worker_count))
                    .unwrap()
            })
            .collect::<Vec<_>>();

        assert_eq!(holders, vec![1, 2, 3, 1, 2, 3, 1]);
    }

    #[test]
    fn single_worker_always_holds_turn() {
        for counter in 1..=10_u64 {
            assert!(is_turn(1, counter, nz!(1_u32)));
        }
    }

    #[test]
    fn next_identity_wraps_to_first() {
        let worker_count = nz!(4_u32);

        assert_eq!(next_identity(1, worker_count), 2);
        assert_eq!(next_identity(3, worker_count), 4);
        assert_eq!(next_identity(4, worker_count), 1);
        assert_eq!(next_identity(1, nz!(1_u32)), 1);
    }

    #[test]
    fn slots_are_zero_based() {
        let worker_count = nz!(4_u32);

        assert_eq!(parking_slot(1), 0);
        assert_eq!(parking_slot(4), 3);
        assert_eq!(wake_slot(1, worker_count), 1);
        assert_eq!(wake_slot(4, worker_count), 0);
    }

    #[test]
    fn next_identity_holds_next_turn() {
        let worker_count = nz!(6_u32);

        for counter in 1..=24_u64 {
            let holder = (1..=worker_count.get())
                .find(|identity| is_turn(*identity, counter, worker_count))
                .unwrap();

            assert!(is_turn(
                next_identity(holder, worker_count),
                counter + 1,
                worker_count
            ));
        }
    }
}
