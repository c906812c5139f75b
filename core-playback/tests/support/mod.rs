//! Scriptable native player used by the integration tests.
//!
//! Every handle records its calls into a shared [`Probe`] and flags any call
//! made after `release()`.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

use bridge_traits::display::{DisplaySurface, SurfaceId};
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::native::{
    DataSource, NativeEvent, NativeEventSink, NativePlayer, NativePlayerFactory, OptionCategory,
    OptionValue,
};
use core_async::time::{sleep, timeout, Duration};
use core_runtime::events::{PlayerEvent, Receiver, RecvError};
use parking_lot::{Condvar, Mutex};

pub const CLIP_DURATION_MS: i64 = 120_000;

/// Blocks `prepare()` until opened.
#[derive(Default)]
pub struct Gate {
    open: Mutex<bool>,
    opened: Condvar,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn open(&self) {
        *self.open.lock() = true;
        self.opened.notify_all();
    }

    fn wait(&self) {
        let mut open = self.open.lock();
        while !*open {
            self.opened.wait(&mut open);
        }
    }
}

/// How every handle opened by a [`FakeFactory`] behaves.
#[derive(Clone)]
pub struct Behavior {
    pub duration_ms: i64,
    pub width: i32,
    pub height: i32,
    pub rotation: i32,
    pub open_fails: bool,
    pub prepare_error: Option<(i32, i32)>,
    pub prepare_gate: Option<Arc<Gate>>,
    pub prepare_panics: bool,
    pub rejected_option: Option<String>,
    pub resumes_after_stop: bool,
    pub auto_seek_complete: bool,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            duration_ms: CLIP_DURATION_MS,
            width: 1920,
            height: 1080,
            rotation: 0,
            open_fails: false,
            prepare_error: None,
            prepare_gate: None,
            prepare_panics: false,
            rejected_option: None,
            resumes_after_stop: false,
            auto_seek_complete: true,
        }
    }
}

/// What the fake handles saw.
#[derive(Default)]
pub struct Probe {
    pub calls: Mutex<Vec<String>>,
    pub options: Mutex<Vec<(OptionCategory, String, OptionValue)>>,
    pub displays: Mutex<Vec<Option<SurfaceId>>>,
    pub sinks: Mutex<Vec<Arc<dyn NativeEventSink>>>,
    pub sources: Mutex<Vec<String>>,
    pub opened: AtomicUsize,
    pub frees: AtomicUsize,
    pub used_after_free: AtomicBool,
    pub position_ms: AtomicI64,
}

impl Probe {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == call).count()
    }

    pub fn frees(&self) -> usize {
        self.frees.load(Ordering::SeqCst)
    }

    pub fn used_after_free(&self) -> bool {
        self.used_after_free.load(Ordering::SeqCst)
    }

    /// Post `event` from the most recently opened handle.
    pub fn emit(&self, event: NativeEvent) {
        let sink = self.sinks.lock().last().cloned();
        if let Some(sink) = sink {
            sink.post(event);
        }
    }

    /// Post `event` from the handle opened `index`-th.
    pub fn emit_from(&self, index: usize, event: NativeEvent) {
        let sink = self.sinks.lock().get(index).cloned();
        if let Some(sink) = sink {
            sink.post(event);
        }
    }

    pub fn set_position(&self, position_ms: i64) {
        self.position_ms.store(position_ms, Ordering::SeqCst);
    }
}

pub struct FakeFactory {
    pub behavior: Behavior,
    pub probe: Arc<Probe>,
}

impl FakeFactory {
    pub fn new(behavior: Behavior) -> (Arc<Self>, Arc<Probe>) {
        let probe = Arc::new(Probe::default());
        let factory = Arc::new(Self {
            behavior,
            probe: Arc::clone(&probe),
        });
        (factory, probe)
    }
}

impl NativePlayerFactory for FakeFactory {
    fn open(
        &self,
        source: &DataSource,
        events: Arc<dyn NativeEventSink>,
    ) -> BridgeResult<Box<dyn NativePlayer>> {
        self.probe.sources.lock().push(source.uri().to_string());
        if self.behavior.open_fails {
            return Err(BridgeError::NotAvailable("no decoder for input".into()));
        }
        self.probe.opened.fetch_add(1, Ordering::SeqCst);
        self.probe.sinks.lock().push(Arc::clone(&events));
        Ok(Box::new(FakeNative {
            behavior: self.behavior.clone(),
            probe: Arc::clone(&self.probe),
            events,
            released: false,
        }))
    }
}

struct FakeNative {
    behavior: Behavior,
    probe: Arc<Probe>,
    events: Arc<dyn NativeEventSink>,
    released: bool,
}

impl FakeNative {
    fn record(&self, call: &str) {
        if self.released {
            self.probe.used_after_free.store(true, Ordering::SeqCst);
        }
        self.probe.calls.lock().push(call.to_string());
    }
}

impl NativePlayer for FakeNative {
    fn set_option(&mut self, category: OptionCategory, key: &str, value: &OptionValue) -> BridgeResult<()> {
        self.record("set_option");
        if self.behavior.rejected_option.as_deref() == Some(key) {
            return Err(BridgeError::InvalidOperation(format!("unknown option {}", key)));
        }
        self.probe
            .options
            .lock()
            .push((category, key.to_string(), value.clone()));
        Ok(())
    }

    fn prepare(&mut self) -> BridgeResult<()> {
        self.record("prepare");
        if let Some(gate) = &self.behavior.prepare_gate {
            gate.wait();
        }
        if self.behavior.prepare_panics {
            panic!("decoder crashed during prepare");
        }
        match self.behavior.prepare_error {
            Some((code, extra)) => Err(BridgeError::native(code, extra)),
            None => Ok(()),
        }
    }

    fn start(&mut self) -> BridgeResult<()> {
        self.record("start");
        Ok(())
    }

    fn pause(&mut self) -> BridgeResult<()> {
        self.record("pause");
        Ok(())
    }

    fn resume(&mut self) -> BridgeResult<()> {
        self.record("resume");
        Ok(())
    }

    fn stop(&mut self) -> BridgeResult<()> {
        self.record("stop");
        Ok(())
    }

    fn seek_to(&mut self, position_ms: i64) -> BridgeResult<()> {
        self.record(&format!("seek_to:{}", position_ms));
        self.probe.set_position(position_ms);
        if self.behavior.auto_seek_complete {
            self.events.post(NativeEvent::SeekComplete);
        }
        Ok(())
    }

    fn current_position(&self) -> i64 {
        if self.released {
            self.probe.used_after_free.store(true, Ordering::SeqCst);
        }
        self.probe.position_ms.load(Ordering::SeqCst)
    }

    fn duration(&self) -> i64 {
        if self.released {
            self.probe.used_after_free.store(true, Ordering::SeqCst);
        }
        self.behavior.duration_ms
    }

    fn video_width(&self) -> i32 {
        self.behavior.width
    }

    fn video_height(&self) -> i32 {
        self.behavior.height
    }

    fn rotation(&self) -> i32 {
        self.behavior.rotation
    }

    fn set_display(&mut self, surface: Option<Arc<dyn DisplaySurface>>) -> BridgeResult<()> {
        self.record("set_display");
        self.probe.displays.lock().push(surface.map(|s| s.id()));
        Ok(())
    }

    fn can_resume_after_stop(&self) -> bool {
        self.behavior.resumes_after_stop
    }

    fn release(&mut self) {
        if self.released {
            self.probe.used_after_free.store(true, Ordering::SeqCst);
        }
        self.released = true;
        self.probe.frees.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct TestSurface {
    pub id: u64,
}

impl DisplaySurface for TestSurface {
    fn id(&self) -> SurfaceId {
        SurfaceId(self.id)
    }
}

/// Wait up to two seconds for an event matching `matches`.
pub async fn wait_for<F>(events: &mut Receiver<PlayerEvent>, mut matches: F) -> PlayerEvent
where
    F: FnMut(&PlayerEvent) -> bool,
{
    let found = timeout(Duration::from_secs(2), async {
        loop {
            match events.recv().await {
                Ok(event) if matches(&event) => return event,
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => panic!("event bus closed"),
            }
        }
    })
    .await;
    found.expect("timed out waiting for player event")
}

/// Poll `condition` for up to two seconds.
pub async fn eventually<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if condition() {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within two seconds");
}

/// Drain everything already queued on `events`.
pub fn drain(events: &mut Receiver<PlayerEvent>) -> Vec<PlayerEvent> {
    let mut seen = Vec::new();
    loop {
        match events.try_recv() {
            Ok(event) => seen.push(event),
            Err(core_async::sync::broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => return seen,
        }
    }
}
