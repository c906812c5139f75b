//! # Media Player
//!
//! The playback state machine. A [`MediaPlayer`] owns one session: one data
//! source, at most one native handle, the option store, the surface binding,
//! the listener slots and the position reporter.
//!
//! ## Threads
//!
//! - The caller's thread runs every public method. Apart from `prepare()`,
//!   methods never block on I/O; `release()` and `reset()` wait only for an
//!   in-flight prepare.
//! - `prepare_async()` moves native open/option/prepare work to the runtime's
//!   blocking pool; `prepare()` does the same work on the caller's thread.
//! - The position reporter and the native event pump are runtime tasks.
//!
//! All native calls go through the session lock except the prepare worker's,
//! which owns its native handle exclusively until it hands it back. Listener
//! notifications are queued on the dispatcher only after the lock is dropped.
//!
//! ## Teardown
//!
//! `release()` marks the session `Released` before touching native
//! resources, clears the listener slots (waiting out a delivery in progress),
//! waits for the prepare worker, then frees the native handle exactly once.
//! A prepare worker that finishes after the session was released frees its
//! own handle and reports nothing.
//!
//! ## Example
//!
//! ```ignore
//! let player = MediaPlayer::new(Arc::new(FfmpegFactory::default()))?;
//! player.set_option(OptionCategory::Player, "vcodec", "h264_mediacodec")?;
//! player.set_data_source("/sdcard/Movies/clip.mp4")?;
//! player.set_on_prepared(|| tracing::info!("ready"));
//! player.prepare_async()?;
//! ```

use std::sync::{Arc, Weak};

use bridge_traits::dispatch::{EventDispatcher, InlineDispatcher};
use bridge_traits::display::DisplaySurface;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::native::{
    error_codes, DataSource, NativeEvent, NativeEventSink, NativePlayer, NativePlayerFactory,
    OptionCategory, OptionValue, TimedText,
};
use core_async::runtime::{self, Handle};
use core_async::sync::{mpsc, CancellationToken};
use core_async::time::Instant;
use core_runtime::config::{NegativePositionPolicy, PlayerConfig, StoppedRestartPolicy};
use core_runtime::events::{EventBus, PlayerEvent, Receiver, SessionId};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info, info_span, instrument, trace, warn};
use uuid::Uuid;

use crate::error::{PlayerError, Result};
use crate::listeners::{Epochs, ListenerRegistry, Notification};
use crate::options::{apply_all, OptionEntry, OptionStore};
use crate::reporter::{PositionReporter, PositionSample, PositionSource};
use crate::state::{check, Operation, PlayerState};
use crate::surface::SurfaceBinder;
use crate::video::{normalize_rotation, VideoGeometry};

/// Looping, volume, mute, rate and pitch. Kept on the session so they survive
/// into the next native handle.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PlaybackSettings {
    looping: bool,
    left_volume: f32,
    right_volume: f32,
    muted: bool,
    rate: f32,
    pitch: f32,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            looping: false,
            left_volume: 1.0,
            right_volume: 1.0,
            muted: false,
            rate: 1.0,
            pitch: 1.0,
        }
    }
}

impl PlaybackSettings {
    fn apply(&self, native: &mut dyn NativePlayer) {
        let results = [
            ("looping", native.set_looping(self.looping)),
            ("volume", native.set_volume(self.left_volume, self.right_volume)),
            ("mute", native.set_mute(self.muted)),
            ("rate", native.set_rate(self.rate)),
            ("pitch", native.set_pitch(self.pitch)),
        ];
        for (setting, result) in results {
            if let Err(error) = result {
                warn!(setting, error = %error, "Native rejected playback setting");
            }
        }
    }
}

/// A native seek in flight plus at most one follow-up target.
#[derive(Debug, Default, Clone, Copy)]
struct SeekState {
    pending: Option<i64>,
    queued: Option<i64>,
}

struct Session {
    state: PlayerState,
    source: Option<DataSource>,
    native: Option<Box<dyn NativePlayer>>,
    options: OptionStore,
    surface: SurfaceBinder,
    settings: PlaybackSettings,
    seek: SeekState,
    geometry: VideoGeometry,
    /// Set by the first successful `start()`; options are refused afterwards.
    playback_started: bool,
    /// A prepare worker owns a native handle outside the session.
    worker_active: bool,
    /// `release()` has freed everything.
    torn_down: bool,
}

impl Session {
    fn new() -> Self {
        Self {
            state: PlayerState::Idle,
            source: None,
            native: None,
            options: OptionStore::new(),
            surface: SurfaceBinder::new(),
            settings: PlaybackSettings::default(),
            seek: SeekState::default(),
            geometry: VideoGeometry::default(),
            playback_started: false,
            worker_active: false,
            torn_down: false,
        }
    }

    fn invalid(&self, operation: Operation) -> PlayerError {
        invalid(operation, self.state)
    }

    fn prepared_native(&mut self, operation: Operation) -> Result<&mut dyn NativePlayer> {
        let state = self.state;
        match self.native.as_deref_mut() {
            Some(native) if state.is_prepared() => Ok(native),
            _ => Err(invalid(operation, state)),
        }
    }
}

fn invalid(operation: Operation, state: PlayerState) -> PlayerError {
    PlayerError::InvalidState {
        operation: operation.name(),
        state,
    }
}

/// Routes native events into the session's event pump. Tagged with the
/// generation that opened the native handle so events from a handle that was
/// reset away are dropped.
struct EventRouter {
    generation: u64,
    events: mpsc::UnboundedSender<(u64, NativeEvent)>,
}

impl NativeEventSink for EventRouter {
    fn post(&self, event: NativeEvent) {
        if let Err(mpsc::error::SendError((_, event))) = self.events.send((self.generation, event)) {
            trace!(?event, "Event pump gone; dropping native event");
        }
    }
}

/// How a prepare reports its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PrepareMode {
    /// Through the prepared or error listener.
    Async,
    /// Failures are returned to the caller; success still notifies.
    Blocking,
}

/// Owns the session's `worker_active` flag for one prepare. If the prepare
/// never reaches `finish_prepare` (the job was dropped by a shutting-down
/// runtime, or the native layer panicked) the flag is cleared on drop so
/// teardown does not wait forever.
struct PrepareWorker {
    inner: Arc<PlayerInner>,
    finished: bool,
}

impl PrepareWorker {
    fn run(mut self, source: DataSource, generation: u64, mode: PrepareMode) -> Result<()> {
        let (native, result) = self.inner.open_and_prepare(&source, generation);
        self.finished = true;
        self.inner.finish_prepare(generation, native, result, mode)
    }
}

impl Drop for PrepareWorker {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!(session = %self.inner.id, "Prepare worker abandoned");
        let mut session = self.inner.session.lock();
        session.worker_active = false;
        self.inner.worker_done.notify_all();
    }
}

struct PlayerInner {
    id: SessionId,
    config: PlayerConfig,
    factory: Arc<dyn NativePlayerFactory>,
    runtime: Handle,
    session: Mutex<Session>,
    /// Signalled when a prepare worker finishes and when teardown completes.
    worker_done: Condvar,
    epochs: Arc<Epochs>,
    listeners: ListenerRegistry,
    bus: Arc<EventBus>,
    reporter: PositionReporter,
    native_events: mpsc::UnboundedSender<(u64, NativeEvent)>,
    pump_cancel: CancellationToken,
}

/// Builder for [`MediaPlayer`].
pub struct MediaPlayerBuilder {
    factory: Arc<dyn NativePlayerFactory>,
    config: PlayerConfig,
    dispatcher: Option<Arc<dyn EventDispatcher>>,
    runtime: Option<Handle>,
}

impl MediaPlayerBuilder {
    pub fn config(mut self, config: PlayerConfig) -> Self {
        self.config = config;
        self
    }

    /// Context listener callbacks run on. Defaults to [`InlineDispatcher`].
    pub fn dispatcher(mut self, dispatcher: Arc<dyn EventDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Runtime for background work. Defaults to the runtime the builder is
    /// called from.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    pub fn build(self) -> Result<MediaPlayer> {
        self.config.validate()?;
        let runtime = self
            .runtime
            .or_else(runtime::current)
            .ok_or(PlayerError::RuntimeUnavailable)?;
        let dispatcher = self
            .dispatcher
            .unwrap_or_else(|| Arc::new(InlineDispatcher));

        let id = Uuid::new_v4();
        let config = self.config;
        let factory = self.factory;
        let epochs = Arc::new(Epochs::default());
        let bus = Arc::new(EventBus::new(config.event_buffer));
        let listeners = ListenerRegistry::new(id, dispatcher, Arc::clone(&epochs), Arc::clone(&bus));

        let inner = Arc::new_cyclic(|weak: &Weak<PlayerInner>| {
            let source: Weak<dyn PositionSource> = weak.clone();
            let reporter = PositionReporter::spawn(&runtime, config.position_interval, source);

            let (native_events, pump_rx) = mpsc::unbounded_channel();
            let pump_cancel = CancellationToken::new();
            spawn_event_pump(&runtime, weak.clone(), pump_rx, pump_cancel.clone());

            PlayerInner {
                id,
                config,
                factory,
                runtime: runtime.clone(),
                session: Mutex::new(Session::new()),
                worker_done: Condvar::new(),
                epochs,
                listeners,
                bus,
                reporter,
                native_events,
                pump_cancel,
            }
        });

        debug!(session = %id, "Player created");
        Ok(MediaPlayer { inner })
    }
}

/// One playback session. Dropping the player releases it.
pub struct MediaPlayer {
    inner: Arc<PlayerInner>,
}

impl MediaPlayer {
    /// Player with default configuration on the current runtime.
    pub fn new(factory: Arc<dyn NativePlayerFactory>) -> Result<Self> {
        Self::builder(factory).build()
    }

    pub fn builder(factory: Arc<dyn NativePlayerFactory>) -> MediaPlayerBuilder {
        MediaPlayerBuilder {
            factory,
            config: PlayerConfig::default(),
            dispatcher: None,
            runtime: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.inner.id
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.inner.config
    }

    pub fn state(&self) -> PlayerState {
        self.inner.session.lock().state
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    pub fn set_data_source(&self, source: impl Into<DataSource>) -> Result<()> {
        let source = source.into();
        let mut session = self.inner.session.lock();
        check(Operation::SetDataSource, session.state)?;
        if source.uri().trim().is_empty() {
            return Err(PlayerError::InvalidArgument(
                "data source URI is empty".to_string(),
            ));
        }

        debug!(
            session = %self.inner.id,
            source = %source.redacted(),
            headers = source.headers().len(),
            "Data source set"
        );
        session.source = Some(source);
        self.inner.set_state(&mut session, PlayerState::Initialized);
        Ok(())
    }

    /// Queue or apply a native option. Refused once playback has started.
    pub fn set_option(
        &self,
        category: OptionCategory,
        key: &str,
        value: impl Into<OptionValue>,
    ) -> Result<()> {
        if key.trim().is_empty() {
            return Err(PlayerError::InvalidArgument("option key is empty".to_string()));
        }

        let mut session = self.inner.session.lock();
        check(Operation::SetOption, session.state)?;
        if session.playback_started {
            return Err(session.invalid(Operation::SetOption));
        }

        session
            .options
            .push(OptionEntry::new(category, key, value.into()));

        let Session {
            state,
            native,
            options,
            ..
        } = &mut *session;
        if let (true, Some(native)) = (state.is_prepared(), native.as_deref_mut()) {
            apply_all(native, &options.take_pending());
        }
        Ok(())
    }

    /// Source read from an open file descriptor, starting at `offset` for
    /// `length` bytes (0 reads to the end).
    pub fn set_data_source_fd(&self, fd: i32, offset: i64, length: i64) -> Result<()> {
        let source = DataSource::from_fd(fd, offset, length)
            .map_err(|e| PlayerError::InvalidArgument(e.to_string()))?;
        self.set_data_source(source)
    }

    /// Begin preparation off the caller's thread. The outcome arrives through
    /// the prepared or error listener.
    #[instrument(skip(self), fields(session = %self.inner.id))]
    pub fn prepare_async(&self) -> Result<()> {
        let (worker, source, generation) = self.begin_prepare(Operation::PrepareAsync)?;
        core_async::task::spawn_blocking_on(&self.inner.runtime, move || {
            if let Err(error) = worker.run(source, generation, PrepareMode::Async) {
                debug!(error = %error, "Asynchronous prepare finished without a session");
            }
        });
        Ok(())
    }

    /// Prepare on the calling thread, blocking until the native layer is
    /// ready. A failure is returned here and leaves the session in `Error`;
    /// the error listener is not called. Success still notifies the prepared
    /// listener.
    #[instrument(skip(self), fields(session = %self.inner.id))]
    pub fn prepare(&self) -> Result<()> {
        let (worker, source, generation) = self.begin_prepare(Operation::Prepare)?;
        worker.run(source, generation, PrepareMode::Blocking)
    }

    fn begin_prepare(&self, operation: Operation) -> Result<(PrepareWorker, DataSource, u64)> {
        let mut session = self.inner.session.lock();
        check(operation, session.state)?;
        let source = session
            .source
            .clone()
            .ok_or_else(|| session.invalid(operation))?;

        let generation = self.inner.epochs.generation();
        session.worker_active = true;
        self.inner.set_state(&mut session, PlayerState::Preparing);
        drop(session);

        let worker = PrepareWorker {
            inner: Arc::clone(&self.inner),
            finished: false,
        };
        Ok((worker, source, generation))
    }

    pub fn start(&self) -> Result<()> {
        let mut session = self.inner.session.lock();
        check(Operation::Start, session.state)?;
        let from = session.state;
        if from == PlayerState::Started {
            return Ok(());
        }

        let policy = self.inner.config.resume_from_stopped;
        let Session {
            native, surface, ..
        } = &mut *session;
        let Some(native) = native.as_deref_mut() else {
            return Err(invalid(Operation::Start, from));
        };

        if from == PlayerState::Stopped {
            let allowed = match policy {
                StoppedRestartPolicy::Reject => false,
                StoppedRestartPolicy::NativeCapability => native.can_resume_after_stop(),
            };
            if !allowed {
                debug!(session = %self.inner.id, ?policy, "Restart from Stopped refused");
                return Err(invalid(Operation::Start, from));
            }
        }

        if from == PlayerState::Paused {
            native.resume()?;
        } else {
            native.start()?;
        }
        surface.reconcile(native);

        session.playback_started = true;
        self.inner.set_state(&mut session, PlayerState::Started);
        info!(session = %self.inner.id, from = %from, "Playback started");
        Ok(())
    }

    pub fn pause(&self) -> Result<()> {
        let mut session = self.inner.session.lock();
        check(Operation::Pause, session.state)?;
        if session.state == PlayerState::Paused {
            return Ok(());
        }
        session.prepared_native(Operation::Pause)?.pause()?;
        self.inner.set_state(&mut session, PlayerState::Paused);
        Ok(())
    }

    /// Continue after `pause()`; same contract as [`MediaPlayer::start`].
    pub fn resume(&self) -> Result<()> {
        self.start()
    }

    pub fn stop(&self) -> Result<()> {
        let mut session = self.inner.session.lock();
        check(Operation::Stop, session.state)?;
        if session.state == PlayerState::Stopped {
            return Ok(());
        }
        session.prepared_native(Operation::Stop)?.stop()?;
        session.seek.queued = None;
        self.inner.set_state(&mut session, PlayerState::Stopped);
        Ok(())
    }

    /// Seek to `position_ms`, clamped into `[0, duration]`.
    ///
    /// While a seek is in flight, a request for the same target does nothing
    /// and a different target is issued once the current one completes.
    pub fn seek_to(&self, position_ms: i64) -> Result<()> {
        let mut session = self.inner.session.lock();
        check(Operation::SeekTo, session.state)?;

        let seek = session.seek;
        let duration = session.prepared_native(Operation::SeekTo)?.duration();
        let target = if duration >= 0 {
            position_ms.clamp(0, duration)
        } else {
            position_ms.max(0)
        };

        match seek.pending {
            Some(pending) if pending == target => {
                session.seek.queued = None;
            }
            Some(_) => {
                trace!(session = %self.inner.id, target, "Seek in flight; queueing");
                session.seek.queued = Some(target);
            }
            None => {
                session.prepared_native(Operation::SeekTo)?.seek_to(target)?;
                session.seek.pending = Some(target);
                debug!(session = %self.inner.id, target, "Seek issued");
            }
        }
        Ok(())
    }

    /// Return to `Idle`, freeing the native handle. Listeners, options,
    /// playback settings and the surface binding are kept.
    #[instrument(skip(self), fields(session = %self.inner.id))]
    pub fn reset(&self) -> Result<()> {
        let mut session = self.inner.session.lock();
        check(Operation::Reset, session.state)?;

        self.inner.epochs.next_generation();
        while session.worker_active {
            self.inner.worker_done.wait(&mut session);
        }
        if session.state == PlayerState::Released {
            return Err(PlayerError::Released);
        }

        let mut native = session.native.take();
        if let Some(native) = native.as_deref_mut() {
            session.surface.detach_for_teardown(native);
        }
        session.source = None;
        session.seek = SeekState::default();
        session.geometry = VideoGeometry::default();
        session.playback_started = false;
        session.options.rewind();
        self.inner.set_state(&mut session, PlayerState::Idle);
        drop(session);

        if let Some(mut native) = native {
            native.release();
        }
        info!("Player reset");
        Ok(())
    }

    /// Tear the session down. Safe to call any number of times from any
    /// thread, including from a listener; returns once native resources are
    /// freed. A listener calling it while another thread is already releasing
    /// returns at once; that thread finishes teardown after the listener
    /// returns.
    pub fn release(&self) {
        self.inner.release();
    }

    // ------------------------------------------------------------------
    // Display and playback settings
    // ------------------------------------------------------------------

    /// Bind (`Some`) or detach (`None`) the render target.
    pub fn set_display(&self, surface: Option<Arc<dyn DisplaySurface>>) -> Result<()> {
        let mut session = self.inner.session.lock();
        check(Operation::SetDisplay, session.state)?;

        let Session {
            state,
            native,
            surface: binder,
            ..
        } = &mut *session;
        match surface {
            Some(surface) => {
                let native = if state.is_prepared() {
                    native.as_deref_mut().map(|n| n as &mut dyn NativePlayer)
                } else {
                    None
                };
                binder.bind(&surface, native);
            }
            None => binder.unbind(native.as_deref_mut().map(|n| n as &mut dyn NativePlayer)),
        }
        Ok(())
    }

    pub fn set_looping(&self, looping: bool) -> Result<()> {
        self.adjust(
            |settings| settings.looping = looping,
            |native| native.set_looping(looping),
        )
    }

    pub fn is_looping(&self) -> bool {
        self.inner.session.lock().settings.looping
    }

    /// Per-channel gain, each in `0.0..=1.0`.
    pub fn set_volume(&self, left: f32, right: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&left) || !(0.0..=1.0).contains(&right) {
            return Err(PlayerError::InvalidArgument(format!(
                "volume must be within 0.0..=1.0, got ({}, {})",
                left, right
            )));
        }
        self.adjust(
            |settings| {
                settings.left_volume = left;
                settings.right_volume = right;
            },
            |native| native.set_volume(left, right),
        )
    }

    pub fn set_mute(&self, muted: bool) -> Result<()> {
        self.adjust(
            |settings| settings.muted = muted,
            |native| native.set_mute(muted),
        )
    }

    pub fn is_muted(&self) -> bool {
        self.inner.session.lock().settings.muted
    }

    /// Playback speed multiplier, must be positive.
    pub fn set_rate(&self, rate: f32) -> Result<()> {
        positive("rate", rate)?;
        self.adjust(|settings| settings.rate = rate, |native| native.set_rate(rate))
    }

    /// Pitch multiplier, must be positive.
    pub fn set_pitch(&self, pitch: f32) -> Result<()> {
        positive("pitch", pitch)?;
        self.adjust(
            |settings| settings.pitch = pitch,
            |native| native.set_pitch(pitch),
        )
    }

    fn adjust(
        &self,
        store: impl FnOnce(&mut PlaybackSettings),
        apply: impl FnOnce(&mut dyn NativePlayer) -> BridgeResult<()>,
    ) -> Result<()> {
        let mut session = self.inner.session.lock();
        check(Operation::AdjustPlayback, session.state)?;
        store(&mut session.settings);
        if session.state.is_prepared() {
            if let Some(native) = session.native.as_deref_mut() {
                apply(native)?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn is_playing(&self) -> bool {
        self.state() == PlayerState::Started
    }

    /// Position in milliseconds; 0 before `Prepared`. While a seek is in
    /// flight this is the seek target. Otherwise the native value is returned
    /// as reported.
    pub fn current_position(&self) -> i64 {
        let session = self.inner.session.lock();
        if !session.state.is_prepared() {
            return 0;
        }
        if let Some(target) = session.seek.pending {
            return target;
        }
        session
            .native
            .as_ref()
            .map_or(0, |native| native.current_position())
    }

    /// Duration in milliseconds; -1 before `Prepared` or when unknown.
    pub fn duration(&self) -> i64 {
        let session = self.inner.session.lock();
        if !session.state.is_prepared() {
            return -1;
        }
        match session.native.as_ref().map(|native| native.duration()) {
            Some(duration) if duration >= 0 => duration,
            _ => -1,
        }
    }

    pub fn video_width(&self) -> i32 {
        self.video_geometry().width
    }

    pub fn video_height(&self) -> i32 {
        self.video_geometry().height
    }

    /// Rotation in degrees (0, 90, 180 or 270). Swap width and height for
    /// layout when `rotation() % 180 != 0`.
    pub fn rotation(&self) -> i32 {
        self.video_geometry().rotation
    }

    /// Decoded size and rotation; all zero before `Prepared`.
    pub fn video_geometry(&self) -> VideoGeometry {
        let session = self.inner.session.lock();
        if session.state.is_prepared() {
            session.geometry
        } else {
            VideoGeometry::default()
        }
    }

    // ------------------------------------------------------------------
    // Listeners
    // ------------------------------------------------------------------

    pub fn set_on_prepared<F>(&self, listener: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.listeners.set_on_prepared(listener);
    }

    pub fn set_on_error<F>(&self, listener: F)
    where
        F: Fn(i32, i32) + Send + Sync + 'static,
    {
        self.inner.listeners.set_on_error(listener);
    }

    pub fn set_on_completion<F>(&self, listener: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.listeners.set_on_completion(listener);
    }

    pub fn set_on_current_position<F>(&self, listener: F)
    where
        F: Fn(&PositionSample) + Send + Sync + 'static,
    {
        self.inner.listeners.set_on_current_position(listener);
    }

    pub fn set_on_seek_complete<F>(&self, listener: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.listeners.set_on_seek_complete(listener);
    }

    pub fn set_on_video_size_changed<F>(&self, listener: F)
    where
        F: Fn(i32, i32) + Send + Sync + 'static,
    {
        self.inner.listeners.set_on_video_size_changed(listener);
    }

    pub fn set_on_info<F>(&self, listener: F)
    where
        F: Fn(i32, i32) + Send + Sync + 'static,
    {
        self.inner.listeners.set_on_info(listener);
    }

    /// Network buffering progress, `0..=100`.
    pub fn set_on_buffering_update<F>(&self, listener: F)
    where
        F: Fn(i32) + Send + Sync + 'static,
    {
        self.inner.listeners.set_on_buffering_update(listener);
    }

    /// Subtitle cues; an empty cue clears the one on screen.
    pub fn set_on_timed_text<F>(&self, listener: F)
    where
        F: Fn(&TimedText) + Send + Sync + 'static,
    {
        self.inner.listeners.set_on_timed_text(listener);
    }

    /// Broadcast mirror of the listener notifications, in the same order.
    pub fn subscribe(&self) -> Receiver<PlayerEvent> {
        self.inner.bus.subscribe()
    }
}

impl Drop for MediaPlayer {
    fn drop(&mut self) {
        self.inner.release();
    }
}

impl std::fmt::Debug for MediaPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaPlayer")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .finish()
    }
}

fn positive(name: &str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PlayerError::InvalidArgument(format!(
            "{} must be a positive number, got {}",
            name, value
        )))
    }
}

impl PlayerInner {
    fn set_state(&self, session: &mut Session, to: PlayerState) {
        let from = session.state;
        if from == to {
            return;
        }
        session.state = to;
        debug!(session = %self.id, from = %from, to = %to, "State changed");

        if to == PlayerState::Started {
            self.reporter.activate();
        } else if from == PlayerState::Started {
            self.epochs.next_segment();
            self.reporter.suspend();
        }
    }

    fn open_and_prepare(
        &self,
        source: &DataSource,
        generation: u64,
    ) -> (Option<Box<dyn NativePlayer>>, BridgeResult<()>) {
        let span = info_span!(
            "prepare",
            session = %self.id,
            worker = %self.config.prepare_thread_name,
            source = %source.redacted()
        );
        let _entered = span.enter();

        let sink: Arc<dyn NativeEventSink> = Arc::new(EventRouter {
            generation,
            events: self.native_events.clone(),
        });
        let mut native = match self.factory.open(source, sink) {
            Ok(native) => native,
            Err(error) => return (None, Err(error)),
        };

        let queued = self.session.lock().options.take_pending();
        let accepted = apply_all(native.as_mut(), &queued);
        debug!(options = queued.len(), accepted, "Options applied before prepare");

        let result = native.prepare();
        (Some(native), result)
    }

    fn finish_prepare(
        &self,
        generation: u64,
        native: Option<Box<dyn NativePlayer>>,
        result: BridgeResult<()>,
        mode: PrepareMode,
    ) -> Result<()> {
        let mut session = self.session.lock();

        if self.epochs.generation() != generation || session.state == PlayerState::Released {
            debug!("Session torn down during prepare; discarding native handle");
            if let Some(mut native) = native {
                native.release();
            }
            session.worker_active = false;
            self.worker_done.notify_all();
            return Err(match session.state {
                PlayerState::Released => PlayerError::Released,
                state => invalid(Operation::Prepare, state),
            });
        }

        let mut outcome = Ok(());

        let notification = match (result, native) {
            (Ok(()), Some(mut native)) if session.state == PlayerState::Preparing => {
                let late = session.options.take_pending();
                apply_all(native.as_mut(), &late);
                session.settings.apply(native.as_mut());
                session.surface.attach(native.as_mut());
                session.geometry = VideoGeometry::new(
                    native.video_width(),
                    native.video_height(),
                    native.rotation(),
                );
                info!(
                    duration_ms = native.duration(),
                    width = session.geometry.width,
                    height = session.geometry.height,
                    rotation = session.geometry.rotation,
                    "Prepared"
                );
                session.native = Some(native);
                self.set_state(&mut session, PlayerState::Prepared);
                Some(Notification::Prepared)
            }
            (Ok(()), native) => {
                // An asynchronous native error already moved the session on.
                session.native = native;
                if mode == PrepareMode::Blocking {
                    outcome = Err(session.invalid(Operation::Prepare));
                }
                None
            }
            (Err(error), native) => {
                session.native = native;
                if session.state == PlayerState::Preparing {
                    let (code, extra) = error.code_pair();
                    warn!(code, extra, error = %error, "Prepare failed");
                    self.set_state(&mut session, PlayerState::Error);
                    match mode {
                        PrepareMode::Async => Some(Notification::Error { code, extra }),
                        PrepareMode::Blocking => {
                            outcome = Err(PlayerError::from(error));
                            None
                        }
                    }
                } else {
                    outcome = Err(session.invalid(Operation::Prepare));
                    None
                }
            }
        };

        let stamp = self.epochs.stamp();
        session.worker_active = false;
        self.worker_done.notify_all();
        drop(session);

        if let Some(notification) = notification {
            self.listeners.deliver(notification, stamp);
        }
        outcome
    }

    fn handle_native_event(&self, generation: u64, event: NativeEvent) {
        let mut session = self.session.lock();
        if session.state == PlayerState::Released || generation != self.epochs.generation() {
            trace!(?event, "Dropping native event from a torn-down handle");
            return;
        }

        let notification = match event {
            NativeEvent::Completed => {
                if session.state == PlayerState::Started {
                    session.seek = SeekState::default();
                    self.set_state(&mut session, PlayerState::Completed);
                    info!(session = %self.id, "Playback completed");
                    Some(Notification::Completion)
                } else {
                    debug!(session = %self.id, state = %session.state, "Ignoring completion");
                    None
                }
            }
            NativeEvent::Error { code, extra } => match session.state {
                PlayerState::Idle | PlayerState::Initialized | PlayerState::Error => {
                    debug!(session = %self.id, code, extra, "Ignoring native error");
                    None
                }
                _ => {
                    error!(session = %self.id, code, extra, "Native playback error");
                    session.seek = SeekState::default();
                    self.set_state(&mut session, PlayerState::Error);
                    Some(Notification::Error { code, extra })
                }
            },
            NativeEvent::SeekComplete => self.complete_seek(&mut session),
            NativeEvent::VideoSizeChanged { width, height } => {
                session.geometry = VideoGeometry::new(width, height, session.geometry.rotation);
                debug!(session = %self.id, width, height, "Video size changed");
                Some(Notification::VideoSizeChanged { width, height })
            }
            NativeEvent::RotationChanged { degrees } => {
                session.geometry.rotation = normalize_rotation(degrees);
                debug!(session = %self.id, degrees, "Rotation changed");
                None
            }
            NativeEvent::BufferingStart => Some(Notification::Info {
                what: error_codes::INFO_BUFFERING_START,
                extra: 0,
            }),
            NativeEvent::BufferingEnd => Some(Notification::Info {
                what: error_codes::INFO_BUFFERING_END,
                extra: 0,
            }),
            NativeEvent::BufferingUpdate { percent } => {
                trace!(session = %self.id, percent, "Buffering");
                Some(Notification::BufferingUpdate {
                    percent: percent.clamp(0, 100),
                })
            }
            NativeEvent::TimedText(cue) => {
                trace!(session = %self.id, clear = cue.is_clear(), "Timed text");
                Some(Notification::TimedText(cue))
            }
        };

        let stamp = self.epochs.stamp();
        drop(session);
        if let Some(notification) = notification {
            self.listeners.deliver(notification, stamp);
        }
    }

    fn complete_seek(&self, session: &mut Session) -> Option<Notification> {
        session.seek.pending = None;
        if let Some(next) = session.seek.queued.take() {
            let issued = session
                .prepared_native(Operation::SeekTo)
                .and_then(|native| native.seek_to(next).map_err(PlayerError::from));
            match issued {
                Ok(()) => {
                    debug!(session = %self.id, target = next, "Issued queued seek");
                    session.seek.pending = Some(next);
                    return None;
                }
                Err(error) => warn!(session = %self.id, error = %error, "Queued seek dropped"),
            }
        }
        Some(Notification::SeekComplete)
    }

    fn release(&self) {
        let native = {
            let mut session = self.session.lock();
            if session.state == PlayerState::Released {
                // A listener releasing its player while another thread tears
                // it down: that thread is waiting for this callback to return.
                if !session.torn_down && self.listeners.is_delivering_here() {
                    debug!(session = %self.id, "Release already in progress");
                    return;
                }
                while !session.torn_down {
                    self.worker_done.wait(&mut session);
                }
                return;
            }

            let mut native = session.native.take();
            if let Some(native) = native.as_deref_mut() {
                session.surface.detach_for_teardown(native);
            }
            session.surface = SurfaceBinder::new();
            self.epochs.next_generation();
            self.set_state(&mut session, PlayerState::Released);
            native
        };

        self.reporter.shutdown();
        self.listeners.clear();

        {
            let mut session = self.session.lock();
            while session.worker_active {
                self.worker_done.wait(&mut session);
            }
        }

        if let Some(mut native) = native {
            native.release();
        }
        self.pump_cancel.cancel();
        let _ = self.bus.emit(PlayerEvent::Released { session: self.id });

        let mut session = self.session.lock();
        session.torn_down = true;
        self.worker_done.notify_all();
        drop(session);
        info!(session = %self.id, "Player released");
    }
}

impl PositionSource for PlayerInner {
    fn on_tick(&self) {
        let (sample, stamp) = {
            let mut session = self.session.lock();
            if session.state != PlayerState::Started {
                return;
            }
            let Session {
                native,
                surface,
                seek,
                ..
            } = &mut *session;
            let Some(native) = native.as_deref_mut() else {
                return;
            };
            surface.reconcile(native);

            let position = seek
                .pending
                .unwrap_or_else(|| native.current_position());
            if position < 0 && self.config.negative_position == NegativePositionPolicy::Skip {
                trace!(session = %self.id, position, "Skipping negative position sample");
                return;
            }
            let sample = PositionSample::clamped(position, native.duration(), Instant::now());
            (sample, self.epochs.sample_stamp())
        };

        self.listeners.deliver(Notification::Position(sample), stamp);
    }
}

fn spawn_event_pump(
    runtime: &Handle,
    inner: Weak<PlayerInner>,
    mut events: mpsc::UnboundedReceiver<(u64, NativeEvent)>,
    cancel: CancellationToken,
) {
    runtime.spawn(async move {
        loop {
            core_async::select! {
                _ = cancel.cancelled() => break,
                next = events.recv() => {
                    let Some((generation, event)) = next else {
                        break;
                    };
                    let Some(inner) = inner.upgrade() else {
                        break;
                    };
                    inner.handle_native_event(generation, event);
                }
            }
        }
        trace!("Native event pump stopped");
    });
}
