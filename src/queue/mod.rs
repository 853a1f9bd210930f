//! Blocking bounded queue for producer/consumer sessions

pub mod bounded;
pub mod strategy;

pub use bounded::BoundedQueue;
pub use strategy::WakeStrategy;
