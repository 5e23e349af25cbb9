//! Starting, closing and restarting pools with real worker threads.
//!
//! These tests are ignored under Miri because Miri is too slow for pools with real delays.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use baton::{Error, Pool, TurnMode, WorkerCount};
use testing::{TurnRecorder, assert_round_robin, with_watchdog};

const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

#[test]
fn invalid_sizes_are_rejected_before_spawning() {
    assert!(matches!(
        Pool::new(0),
        Err(Error::InvalidWorkerCount { requested: 0 })
    ));

    assert!(matches!(
        WorkerCount::try_from(-1_i64),
        Err(Error::InvalidWorkerCount { requested: -1 })
    ));
}

#[cfg_attr(miri, ignore)]
#[test]
fn close_then_restart_succeeds() {
    with_watchdog(|| {
        let pool = Pool::new(3).unwrap();

        for mode in [TurnMode::Busy, TurnMode::Blocking, TurnMode::Busy] {
            let recorder = TurnRecorder::new();

            pool.start_with(mode, recorder.callback(), Duration::ZERO)
                .unwrap();
            assert!(pool.is_running());

            let turns = recorder.wait_for(6, WAIT_TIMEOUT);

            let shutdown = pool.close();
            assert!(!pool.is_running());
            assert_eq!(shutdown.worker_count(), 3);

            // Every run starts counting from the beginning.
            assert_round_robin(&turns, 3);
        }
    });
}

#[cfg_attr(miri, ignore)]
#[test]
fn second_start_fails_and_first_run_continues() {
    with_watchdog(|| {
        let recorder = TurnRecorder::new();
        let intruder = TurnRecorder::new();
        let pool = Pool::new(2).unwrap();

        pool.start(recorder.callback(), Duration::ZERO).unwrap();

        let result = pool.start_busy(intruder.callback(), Duration::ZERO);
        assert!(matches!(
            result,
            Err(Error::AlreadyRunning { worker_count: 2 })
        ));

        let result = pool.start(intruder.callback(), Duration::ZERO);
        assert!(matches!(result, Err(Error::AlreadyRunning { .. })));

        assert_eq!(pool.mode(), Some(TurnMode::Blocking));

        let turns = recorder.wait_for(10, WAIT_TIMEOUT);
        pool.close().join();

        assert_round_robin(&turns, 2);
        assert!(intruder.is_empty());
    });
}

#[cfg_attr(miri, ignore)]
#[test]
fn blocking_close_mid_cycle_stops_all_workers() {
    with_watchdog(|| {
        let recorder = TurnRecorder::new();
        let pool = Pool::new(4).unwrap();

        pool.start(recorder.callback(), Duration::from_millis(100))
            .unwrap();
        _ = recorder.wait_for(2, WAIT_TIMEOUT);

        let shutdown = pool.close();
        let recorded_at_close = recorder.len();

        assert!(shutdown.wait_timeout(Duration::from_secs(1)));
        assert!(shutdown.is_complete());

        thread::sleep(Duration::from_millis(250));
        assert_eq!(recorder.len(), recorded_at_close);
        assert_round_robin(&recorder.snapshot(), 4);
    });
}

#[cfg_attr(miri, ignore)]
#[test]
fn busy_close_interrupts_long_delay() {
    with_watchdog(|| {
        let recorder = TurnRecorder::new();
        let pool = Pool::new(3).unwrap();

        pool.start_busy(recorder.callback(), Duration::from_secs(3600))
            .unwrap();
        _ = recorder.wait_for(1, WAIT_TIMEOUT);

        let shutdown = pool.close();

        assert!(shutdown.wait_timeout(Duration::from_secs(1)));
        assert_eq!(recorder.snapshot(), vec![(1, 1)]);
    });
}

fn close_from_callback_stops_run(mode: TurnMode) {
    let recorder = TurnRecorder::new();
    let pool = Arc::new(Pool::new(2).unwrap());

    pool.start_with(
        mode,
        {
            let record = recorder.callback();
            let pool = Arc::clone(&pool);

            move |identity, counter| {
                record(identity, counter);

                if counter == 3 {
                    drop(pool.close());
                }
            }
        },
        Duration::ZERO,
    )
    .unwrap();

    _ = recorder.wait_for(3, WAIT_TIMEOUT);

    let started = Instant::now();
    while pool.is_running() {
        assert!(started.elapsed() < WAIT_TIMEOUT, "pool still running");
        thread::sleep(Duration::from_millis(1));
    }

    thread::sleep(Duration::from_millis(50));
    assert_eq!(recorder.snapshot(), vec![(1, 1), (2, 2), (1, 3)]);
}

#[cfg_attr(miri, ignore)]
#[test]
fn busy_close_from_callback_stops_run() {
    with_watchdog(|| close_from_callback_stops_run(TurnMode::Busy));
}

#[cfg_attr(miri, ignore)]
#[test]
fn blocking_close_from_callback_stops_run() {
    with_watchdog(|| close_from_callback_stops_run(TurnMode::Blocking));
}

#[cfg_attr(miri, ignore)]
#[test]
fn close_twice_is_harmless() {
    with_watchdog(|| {
        let pool = Pool::new(2).unwrap();

        pool.start(|_, _| {}, Duration::from_millis(1)).unwrap();

        let first = pool.close();
        let second = pool.close();

        assert_eq!(first.worker_count(), 2);
        assert_eq!(second.worker_count(), 0);

        first.join();
        second.join();
    });
}

#[cfg_attr(miri, ignore)]
#[test]
fn dropping_pool_stops_turns() {
    with_watchdog(|| {
        let recorder = TurnRecorder::new();

        {
            let pool = Pool::new(2).unwrap();
            pool.start_busy(recorder.callback(), Duration::from_millis(1))
                .unwrap();
            _ = recorder.wait_for(4, WAIT_TIMEOUT);
        }

        let recorded_at_drop = recorder.len();
        thread::sleep(Duration::from_millis(50));

        assert_eq!(recorder.len(), recorded_at_drop);
    });
}

#[cfg_attr(miri, ignore)]
#[test]
#[should_panic]
fn callback_panic_surfaces_on_join() {
    with_watchdog(|| {
        let recorder = TurnRecorder::new();
        let pool = Pool::new(2).unwrap();

        pool.start(
            {
                let record = recorder.callback();

                move |identity, counter| {
                    record(identity, counter);
                    assert!(counter < 3, "callback failed on turn {counter}");
                }
            },
            Duration::ZERO,
        )
        .unwrap();

        _ = recorder.wait_for(3, WAIT_TIMEOUT);

        pool.close().join();
    });
}
