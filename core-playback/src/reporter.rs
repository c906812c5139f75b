//! Position reporter.
//!
//! A background task that ticks while the session is `Started` and asks its
//! [`PositionSource`] to publish a sample. It holds only a weak reference to
//! the source; once the session is gone the task exits on its next wake-up.
//!
//! The task has three modes driven from the session:
//! - *Suspended*: parked on a watch channel, no ticks
//! - *Active*: ticking at the configured interval
//! - *Shut down*: cancelled, never ticks again

use std::sync::Weak;

use core_async::runtime::Handle;
use core_async::sync::{watch, CancellationToken};
use core_async::time::{self, Duration, Instant, MissedTickBehavior};
use serde::Serialize;
use tracing::{debug, instrument, trace};

/// One published position report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PositionSample {
    /// Never negative.
    pub current_ms: i64,
    /// Never negative; 0 when the duration is unknown.
    pub duration_ms: i64,
    /// `false` when the native layer reported an unknown (negative) duration,
    /// which is distinct from a zero-length stream.
    pub duration_known: bool,
    /// Monotonic time the sample was taken.
    #[serde(skip)]
    pub sampled_at: Instant,
}

impl PositionSample {
    /// Build a sample from raw native values, clamping negatives to 0.
    pub fn clamped(position_ms: i64, duration_ms: i64, sampled_at: Instant) -> Self {
        Self {
            current_ms: position_ms.max(0),
            duration_ms: duration_ms.max(0),
            duration_known: duration_ms >= 0,
            sampled_at,
        }
    }
}

/// Something that can publish a sample when the reporter ticks.
pub trait PositionSource: Send + Sync + 'static {
    fn on_tick(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Suspended,
    Active,
}

/// Handle to the reporter task.
#[derive(Debug)]
pub struct PositionReporter {
    mode: watch::Sender<Mode>,
    cancel: CancellationToken,
}

impl PositionReporter {
    /// Spawn a suspended reporter on `runtime`.
    pub fn spawn(runtime: &Handle, period: Duration, source: Weak<dyn PositionSource>) -> Self {
        let (mode, mode_rx) = watch::channel(Mode::Suspended);
        let cancel = CancellationToken::new();
        runtime.spawn(run(period, source, mode_rx, cancel.clone()));
        Self { mode, cancel }
    }

    /// Start ticking. The first sample is published immediately.
    pub fn activate(&self) {
        self.set_mode(Mode::Active);
    }

    /// Stop ticking but keep the task alive.
    pub fn suspend(&self) {
        self.set_mode(Mode::Suspended);
    }

    pub fn is_active(&self) -> bool {
        *self.mode.borrow() == Mode::Active && !self.cancel.is_cancelled()
    }

    /// Stop the task for good.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    fn set_mode(&self, mode: Mode) {
        self.mode.send_if_modified(|current| {
            if *current == mode {
                false
            } else {
                *current = mode;
                true
            }
        });
    }
}

impl Drop for PositionReporter {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[instrument(name = "position_reporter", skip_all, fields(period_ms = period.as_millis() as u64))]
async fn run(
    period: Duration,
    source: Weak<dyn PositionSource>,
    mut mode: watch::Receiver<Mode>,
    cancel: CancellationToken,
) {
    debug!("Reporter started");

    'outer: loop {
        while *mode.borrow_and_update() != Mode::Active {
            core_async::select! {
                _ = cancel.cancelled() => break 'outer,
                changed = mode.changed() => {
                    if changed.is_err() {
                        break 'outer;
                    }
                }
            }
        }

        trace!("Reporter active");
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            core_async::select! {
                biased;
                _ = cancel.cancelled() => break 'outer,
                changed = mode.changed() => {
                    if changed.is_err() {
                        break 'outer;
                    }
                    if *mode.borrow_and_update() != Mode::Active {
                        trace!("Reporter suspended");
                        continue 'outer;
                    }
                }
                _ = ticker.tick() => {
                    let Some(source) = source.upgrade() else {
                        break 'outer;
                    };
                    source.on_tick();
                }
            }
        }
    }

    debug!("Reporter stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct CountingSource {
        ticks: AtomicUsize,
    }

    impl PositionSource for CountingSource {
        fn on_tick(&self) {
            self.ticks.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn reporter_for(source: &Arc<CountingSource>) -> PositionReporter {
        let handle = core_async::runtime::current().unwrap();
        let source: Arc<dyn PositionSource> = source.clone();
        PositionReporter::spawn(&handle, Duration::from_millis(20), Arc::downgrade(&source))
    }

    #[test]
    fn negative_values_are_clamped() {
        let sample = PositionSample::clamped(-5, -1, Instant::now());
        assert_eq!(sample.current_ms, 0);
        assert_eq!(sample.duration_ms, 0);
        assert!(!sample.duration_known);

        let sample = PositionSample::clamped(1_500, 120_000, Instant::now());
        assert_eq!(sample.current_ms, 1_500);
        assert!(sample.duration_known);
    }

    #[core_async::test]
    async fn suspended_reporter_does_not_tick() {
        let source = Arc::new(CountingSource::default());
        let reporter = reporter_for(&source);

        time::sleep(Duration::from_millis(80)).await;
        assert_eq!(source.ticks.load(Ordering::SeqCst), 0);
        assert!(!reporter.is_active());
    }

    #[core_async::test]
    async fn active_reporter_ticks_until_suspended() {
        let source = Arc::new(CountingSource::default());
        let reporter = reporter_for(&source);

        reporter.activate();
        time::sleep(Duration::from_millis(110)).await;
        reporter.suspend();
        time::sleep(Duration::from_millis(30)).await;

        let ticks = source.ticks.load(Ordering::SeqCst);
        assert!(ticks >= 3, "expected several ticks, got {}", ticks);

        time::sleep(Duration::from_millis(80)).await;
        assert_eq!(source.ticks.load(Ordering::SeqCst), ticks);
    }

    #[core_async::test]
    async fn shutdown_stops_an_active_reporter() {
        let source = Arc::new(CountingSource::default());
        let reporter = reporter_for(&source);

        reporter.activate();
        time::sleep(Duration::from_millis(50)).await;
        reporter.shutdown();
        time::sleep(Duration::from_millis(30)).await;
        let ticks = source.ticks.load(Ordering::SeqCst);

        time::sleep(Duration::from_millis(80)).await;
        assert_eq!(source.ticks.load(Ordering::SeqCst), ticks);
        assert!(!reporter.is_active());
    }

    #[core_async::test]
    async fn dropped_source_ends_the_task() {
        let source = Arc::new(CountingSource::default());
        let reporter = reporter_for(&source);
        drop(source);

        reporter.activate();
        time::sleep(Duration::from_millis(50)).await;
        // Nothing to assert beyond not panicking: the weak upgrade fails and
        // the task exits.
        reporter.shutdown();
    }
}
