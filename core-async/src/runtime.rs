//! Runtime utilities that abstract over the underlying async executor.
//!
//! The player captures a [`Handle`] when it is constructed and uses it from
//! plain threads (host UI thread, prepare worker) to schedule work, so callers
//! never need to be inside an async context themselves.

pub use tokio::runtime::{Builder, Handle, Runtime, RuntimeFlavor};

/// Runs the provided future to completion on a fresh multi-threaded runtime.
///
/// Two worker threads are enough for the engine's background tasks to make
/// progress while the future blocks one of them on a session lock.
pub fn block_on<F>(future: F) -> F::Output
where
    F: std::future::Future,
{
    Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("core_async::runtime::block_on: failed to build Tokio runtime")
        .block_on(future)
}

/// Returns the handle of the runtime the caller is running on, if any.
pub fn current() -> Option<Handle> {
    Handle::try_current().ok()
}
