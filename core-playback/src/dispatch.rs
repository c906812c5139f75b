//! Serial event dispatcher.

use bridge_traits::dispatch::{DispatchJob, EventDispatcher};
use core_async::runtime::Handle;
use core_async::sync::mpsc;
use tracing::{debug, trace};

/// Runs listener jobs one at a time, in order, on a dedicated runtime task.
///
/// This is the in-process stand-in for posting to a UI thread's message
/// queue: listeners never run on the thread that produced the event, and
/// never run concurrently with each other. Jobs should not block for long;
/// they hold up every later notification.
///
/// Dropping the dispatcher lets the task drain what is already queued and
/// exit.
#[derive(Debug)]
pub struct SerialDispatcher {
    jobs: mpsc::UnboundedSender<DispatchJob>,
}

impl SerialDispatcher {
    pub fn new(runtime: &Handle) -> Self {
        let (jobs, mut queue) = mpsc::unbounded_channel::<DispatchJob>();
        runtime.spawn(async move {
            while let Some(job) = queue.recv().await {
                job();
            }
            debug!("Serial dispatcher drained");
        });
        Self { jobs }
    }
}

impl EventDispatcher for SerialDispatcher {
    fn dispatch(&self, job: DispatchJob) {
        if self.jobs.send(job).is_err() {
            trace!("Serial dispatcher closed; dropping job");
        }
    }
}
