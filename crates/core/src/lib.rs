#![forbid(unsafe_code)]

pub mod model;
pub mod optimistic;
pub mod progress;
pub mod time;

pub use time::Clock;
