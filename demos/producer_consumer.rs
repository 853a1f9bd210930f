//! Three producers and three consumers sharing a three-slot queue.
//!
//! Pass `broadcast` as the first argument to use notify-all wakeups.

use cyrup_promise::{BoundedQueue, TakeError, WakeStrategy};
use std::sync::Arc;
use std::thread;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let strategy = match std::env::args().nth(1).as_deref() {
        Some("broadcast") => WakeStrategy::Broadcast,
        _ => WakeStrategy::Targeted,
    };
    let queue = Arc::new(BoundedQueue::with_strategy(3, strategy)?);

    let producers: Vec<_> = (0..3)
        .map(|id| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for n in 0..10 {
                    if queue.put(id * 100 + n).is_err() {
                        break;
                    }
                }
            })
        })
        .collect();
    let consumers: Vec<_> = (0..3)
        .map(|id| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let mut count = 0;
                while let Ok(item) = queue.take() {
                    println!("consumer {id} took {item}");
                    count += 1;
                }
                count
            })
        })
        .collect();

    for producer in producers {
        producer.join().map_err(|_| "producer panicked")?;
    }
    queue.close();
    let mut total = 0;
    for consumer in consumers {
        total += consumer.join().map_err(|_| "consumer panicked")?;
    }
    println!("{strategy:?}: {total} items handed off");
    assert_eq!(queue.try_take(), Err(TakeError::Closed));
    Ok(())
}
