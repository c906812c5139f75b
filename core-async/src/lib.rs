//! Async runtime facade for the AV player engine.
//!
//! Engine crates (`core-playback`, `core-metadata`, `core-runtime`) depend on
//! this crate instead of Tokio directly, so the executor can be swapped in one
//! place. The engine itself exposes a synchronous, MediaPlayer-style API; the
//! runtime only backs the work it runs off the caller's thread:
//!
//! - the prepare worker (`task::spawn_blocking` on a captured [`runtime::Handle`])
//! - the position reporter (`task::spawn` + `time::interval`)
//! - the serial event dispatcher (`sync::mpsc`)
//!
//! # Modules
//!
//! - `runtime`: runtime handles and `block_on`
//! - `task`: task spawning
//! - `time`: timers and intervals
//! - `sync`: channels and cancellation
//!
//! # Examples
//!
//! ```rust
//! use core_async::task;
//! use core_async::time::{sleep, Duration};
//!
//! async fn example() {
//!     let handle = task::spawn(async {
//!         sleep(Duration::from_millis(10)).await;
//!         42
//!     });
//!     assert_eq!(handle.await.unwrap(), 42);
//! }
//! ```

// Re-export the async entry-point/test macros so downstream crates never need
// direct Tokio dependencies.
pub use core_async_macros::{main, test};

pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

pub use task::spawn;

/// Waits on several branches and runs the first that completes.
pub use tokio::select;

pub use time::{sleep, Duration, Instant};
