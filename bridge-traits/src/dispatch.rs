//! Listener delivery context.
//!
//! Hosts decide which thread listener callbacks run on (the UI thread on
//! Android, the main queue on Apple platforms). The engine hands every
//! notification to an [`EventDispatcher`] as a boxed job and never invokes
//! listeners while holding its session lock.

/// A single listener notification, ready to run.
pub type DispatchJob = Box<dyn FnOnce() + Send + 'static>;

/// Runs notification jobs on the host's chosen context.
///
/// Implementations must run jobs in submission order. Dropping a job without
/// running it is allowed only after the dispatcher has been shut down.
#[cfg_attr(test, mockall::automock)]
pub trait EventDispatcher: Send + Sync {
    fn dispatch(&self, job: DispatchJob);
}

/// Runs every job immediately on the calling thread.
///
/// Suitable for tests and for hosts that marshal callbacks themselves.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDispatcher;

impl EventDispatcher for InlineDispatcher {
    fn dispatch(&self, job: DispatchJob) {
        job();
    }
}
