//! Demonstrates both turn-passing modes by printing every turn to the console.
//!
//! A 3-worker busy pool runs for about 30 ms with a 1 ms delay between turns, then a 4-worker
//! blocking pool runs for about 12 seconds with a 1 second delay between turns. Each pool is
//! closed when it goes out of scope.

use std::thread;
use std::time::Duration;

use baton::Pool;

fn print_turn(identity: u32, counter: u64) {
    println!("Thread {identity}  output: {counter}");
}

fn main() -> Result<(), baton::Error> {
    // Keep the run short when executed as part of automated testing.
    let testing = std::env::var("IS_TESTING").is_ok();
    let (blocking_delay, blocking_runtime) = if testing {
        (Duration::from_millis(10), Duration::from_millis(120))
    } else {
        (Duration::from_secs(1), Duration::from_secs(12))
    };

    {
        let pool = Pool::new(3)?;
        pool.start_busy(print_turn, Duration::from_millis(1))?;
        thread::sleep(Duration::from_millis(30));
    }

    println!();

    {
        let pool = Pool::new(4)?;
        pool.start(print_turn, blocking_delay)?;
        thread::sleep(blocking_runtime);
    }

    Ok(())
}
