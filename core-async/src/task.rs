//! Task spawning.
//!
//! - `spawn`: async work on the current runtime (position reporter, dispatcher)
//! - `spawn_on`: async work on an explicit runtime handle
//! - `spawn_blocking_on`: blocking native calls (prepare, metadata probes) on
//!   the runtime's blocking pool
//!
//! # Examples
//!
//! ```rust
//! use core_async::task;
//!
//! async fn example() {
//!     let handle = task::spawn_blocking(|| 100);
//!     assert_eq!(handle.await.unwrap(), 100);
//! }
//! ```

use crate::runtime::Handle;

pub use tokio::task::{spawn_blocking, yield_now, JoinError, JoinHandle};

/// Spawns a new asynchronous task on the current Tokio runtime.
///
/// # Panics
///
/// Panics when called outside a runtime context; use [`spawn_on`] from plain
/// threads.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::task::spawn(future)
}

/// Spawns an asynchronous task on the runtime behind `handle`.
pub fn spawn_on<F>(handle: &Handle, future: F) -> JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    handle.spawn(future)
}

/// Runs a blocking closure on the blocking pool of the runtime behind `handle`.
pub fn spawn_blocking_on<F, R>(handle: &Handle, f: F) -> JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    handle.spawn_blocking(f)
}

/// Result type for task operations.
pub type Result<T> = std::result::Result<T, JoinError>;
