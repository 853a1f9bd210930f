//! Races two slow computations and retries a flaky one.
//!
//! Run with `RUST_LOG=trace cargo run --example race` to see cell traffic.

use cyrup_promise::{race_first, race_last, retry_until, Cell, CellExt};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn after(millis: u64, label: &'static str) -> Cell<&'static str> {
    Cell::spawn(move || {
        thread::sleep(Duration::from_millis(millis));
        label
    })
}

fn main() -> Result<(), cyrup_promise::Error> {
    env_logger::init();

    let tortoise = after(200, "tortoise");
    let hare = after(20, "hare");
    println!("first: {}", race_first(&tortoise, &hare).wait()?);
    println!("last:  {}", race_last(&tortoise, &hare).wait()?);

    let attempts = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&attempts);
    let lucky = retry_until(
        move || {
            let roll = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Cell::spawn(move || roll * 3 % 7)
        },
        |roll| *roll == 6,
    )
    .map(|roll| format!("rolled {roll}"));
    println!("{} after {} attempt(s)", lucky.wait()?, attempts.load(Ordering::SeqCst));
    Ok(())
}
