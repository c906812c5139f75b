//! Time-related abstractions.
//!
//! `Instant` is monotonic and is what position samples are stamped with.
//! `interval` drives the position reporter; reporters set
//! [`MissedTickBehavior::Delay`] so a stalled host does not receive a burst of
//! catch-up samples.
//!
//! # Examples
//!
//! ```rust
//! use core_async::time::{sleep, Duration, Instant};
//!
//! async fn example() {
//!     let start = Instant::now();
//!     sleep(Duration::from_millis(5)).await;
//!     assert!(start.elapsed() >= Duration::from_millis(5));
//! }
//! ```

pub use tokio::time::{interval, sleep, timeout, Interval, MissedTickBehavior, Sleep, Timeout};

pub use std::time::{Duration, Instant};
