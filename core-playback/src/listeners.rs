//! Listener registry.
//!
//! One slot per event category; registering again replaces the previous
//! listener. Every notification is handed to the host's
//! [`EventDispatcher`] as a job. The job decides at *delivery* time whether
//! the notification is still current:
//!
//! - nothing is delivered once the registry has been cleared by `release()`
//! - notifications from before a `reset()` are dropped
//! - a position sample is dropped once the session has left the playback
//!   segment it was taken in (paused, stopped, completed, failed)
//!
//! Listeners run without the registry lock held, so a callback may register
//! listeners, query the player or release it. Each running callback is
//! recorded against its thread; `clear()` waits for callbacks on other
//! threads to return, so when it returns no listener is running elsewhere and
//! none will start again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use bridge_traits::dispatch::EventDispatcher;
use bridge_traits::native::TimedText;
use core_runtime::events::{EventBus, PlayerEvent, SessionId};
use parking_lot::{Condvar, Mutex};
use tracing::trace;

use crate::reporter::PositionSample;

pub type PreparedListener = Arc<dyn Fn() + Send + Sync>;
pub type ErrorListener = Arc<dyn Fn(i32, i32) + Send + Sync>;
pub type CompletionListener = Arc<dyn Fn() + Send + Sync>;
pub type PositionListener = Arc<dyn Fn(&PositionSample) + Send + Sync>;
pub type SeekCompleteListener = Arc<dyn Fn() + Send + Sync>;
pub type VideoSizeListener = Arc<dyn Fn(i32, i32) + Send + Sync>;
pub type InfoListener = Arc<dyn Fn(i32, i32) + Send + Sync>;
pub type BufferingListener = Arc<dyn Fn(i32) + Send + Sync>;
pub type TimedTextListener = Arc<dyn Fn(&TimedText) + Send + Sync>;

/// Validity counters shared between the session and the registry.
///
/// Both are only advanced while the session lock is held.
#[derive(Debug, Default)]
pub struct Epochs {
    generation: AtomicU64,
    segment: AtomicU64,
}

impl Epochs {
    /// Stamp for a session-level notification.
    pub fn stamp(&self) -> Stamp {
        Stamp {
            generation: self.generation.load(Ordering::SeqCst),
            segment: None,
        }
    }

    /// Stamp for a position sample taken in the current segment.
    pub fn sample_stamp(&self) -> Stamp {
        Stamp {
            generation: self.generation.load(Ordering::SeqCst),
            segment: Some(self.segment.load(Ordering::SeqCst)),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Invalidate everything issued so far (reset, release).
    pub fn next_generation(&self) -> u64 {
        self.segment.fetch_add(1, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Invalidate outstanding position samples (playback left `Started`).
    pub fn next_segment(&self) {
        self.segment.fetch_add(1, Ordering::SeqCst);
    }

    fn is_current(&self, stamp: Stamp) -> bool {
        if stamp.generation != self.generation.load(Ordering::SeqCst) {
            return false;
        }
        match stamp.segment {
            Some(segment) => segment == self.segment.load(Ordering::SeqCst),
            None => true,
        }
    }
}

/// Validity stamp captured when a notification is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stamp {
    generation: u64,
    segment: Option<u64>,
}

/// What the session tells its listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Prepared,
    Error { code: i32, extra: i32 },
    Completion,
    Position(PositionSample),
    SeekComplete,
    VideoSizeChanged { width: i32, height: i32 },
    Info { what: i32, extra: i32 },
    BufferingUpdate { percent: i32 },
    TimedText(TimedText),
}

impl Notification {
    fn to_event(&self, session: SessionId) -> PlayerEvent {
        match self {
            Notification::Prepared => PlayerEvent::Prepared { session },
            Notification::Error { code, extra } => PlayerEvent::Error {
                session,
                code: *code,
                extra: *extra,
            },
            Notification::Completion => PlayerEvent::Completed { session },
            Notification::Position(sample) => PlayerEvent::Position {
                session,
                current_ms: sample.current_ms,
                duration_ms: sample.duration_ms,
                duration_known: sample.duration_known,
            },
            Notification::SeekComplete => PlayerEvent::SeekComplete { session },
            Notification::VideoSizeChanged { width, height } => PlayerEvent::VideoSizeChanged {
                session,
                width: *width,
                height: *height,
            },
            Notification::Info { what, extra } => PlayerEvent::Info {
                session,
                what: *what,
                extra: *extra,
            },
            Notification::BufferingUpdate { percent } => PlayerEvent::BufferingUpdate {
                session,
                percent: *percent,
            },
            Notification::TimedText(cue) => PlayerEvent::TimedText {
                session,
                cue: cue.clone(),
            },
        }
    }
}

#[derive(Default)]
struct Slots {
    prepared: Option<PreparedListener>,
    error: Option<ErrorListener>,
    completion: Option<CompletionListener>,
    position: Option<PositionListener>,
    seek_complete: Option<SeekCompleteListener>,
    video_size: Option<VideoSizeListener>,
    info: Option<InfoListener>,
    buffering: Option<BufferingListener>,
    timed_text: Option<TimedTextListener>,
}

/// A listener cloned out of its slot, ready to call without the lock.
enum Callback {
    Unit(Arc<dyn Fn() + Send + Sync>),
    Pair(Arc<dyn Fn(i32, i32) + Send + Sync>, i32, i32),
    Percent(BufferingListener, i32),
    Position(PositionListener, PositionSample),
    TimedText(TimedTextListener, TimedText),
}

impl Callback {
    fn invoke(self) {
        match self {
            Callback::Unit(listener) => listener(),
            Callback::Pair(listener, a, b) => listener(a, b),
            Callback::Percent(listener, percent) => listener(percent),
            Callback::Position(listener, sample) => listener(&sample),
            Callback::TimedText(listener, cue) => listener(&cue),
        }
    }
}

impl Slots {
    fn callback_for(&self, notification: &Notification) -> Option<Callback> {
        match notification {
            Notification::Prepared => self.prepared.clone().map(Callback::Unit),
            Notification::Error { code, extra } => {
                self.error.clone().map(|l| Callback::Pair(l, *code, *extra))
            }
            Notification::Completion => self.completion.clone().map(Callback::Unit),
            Notification::Position(sample) => self
                .position
                .clone()
                .map(|l| Callback::Position(l, *sample)),
            Notification::SeekComplete => self.seek_complete.clone().map(Callback::Unit),
            Notification::VideoSizeChanged { width, height } => self
                .video_size
                .clone()
                .map(|l| Callback::Pair(l, *width, *height)),
            Notification::Info { what, extra } => {
                self.info.clone().map(|l| Callback::Pair(l, *what, *extra))
            }
            Notification::BufferingUpdate { percent } => self
                .buffering
                .clone()
                .map(|l| Callback::Percent(l, *percent)),
            Notification::TimedText(cue) => self
                .timed_text
                .clone()
                .map(|l| Callback::TimedText(l, cue.clone())),
        }
    }
}

#[derive(Default)]
struct RegistryState {
    released: bool,
    slots: Slots,
    /// One entry per callback currently running, by thread.
    delivering: Vec<ThreadId>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<RegistryState>,
    /// Signalled whenever a callback returns.
    idle: Condvar,
}

/// Removes its thread's `delivering` entry when the callback returns or
/// unwinds.
struct InFlight<'a> {
    shared: &'a Shared,
    thread: ThreadId,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        if let Some(at) = state.delivering.iter().position(|t| *t == self.thread) {
            state.delivering.swap_remove(at);
        }
        self.shared.idle.notify_all();
    }
}

pub struct ListenerRegistry {
    session: SessionId,
    shared: Arc<Shared>,
    dispatcher: Arc<dyn EventDispatcher>,
    epochs: Arc<Epochs>,
    bus: Arc<EventBus>,
}

macro_rules! slot_setter {
    ($(#[$doc:meta])* $name:ident, $slot:ident, $ty:ty, ($($arg:ident: $arg_ty:ty),*)) => {
        $(#[$doc])*
        pub fn $name<F>(&self, listener: F)
        where
            F: Fn($($arg_ty),*) + Send + Sync + 'static,
        {
            let listener: $ty = Arc::new(listener);
            self.update(|slots| slots.$slot.replace(listener));
        }
    };
}

impl ListenerRegistry {
    pub fn new(
        session: SessionId,
        dispatcher: Arc<dyn EventDispatcher>,
        epochs: Arc<Epochs>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            session,
            shared: Arc::new(Shared::default()),
            dispatcher,
            epochs,
            bus,
        }
    }

    slot_setter!(set_on_prepared, prepared, PreparedListener, ());
    slot_setter!(
        /// `(code, extra)` of an asynchronous native failure.
        set_on_error, error, ErrorListener, (code: i32, extra: i32)
    );
    slot_setter!(set_on_completion, completion, CompletionListener, ());
    slot_setter!(
        set_on_current_position, position, PositionListener, (sample: &PositionSample)
    );
    slot_setter!(set_on_seek_complete, seek_complete, SeekCompleteListener, ());
    slot_setter!(
        /// Decoded `(width, height)`; apply the rotation contract before layout.
        set_on_video_size_changed, video_size, VideoSizeListener, (width: i32, height: i32)
    );
    slot_setter!(
        /// `(what, extra)` informational reports such as buffering start/end.
        set_on_info, info, InfoListener, (what: i32, extra: i32)
    );
    slot_setter!(
        /// Network buffering progress, `0..=100`.
        set_on_buffering_update, buffering, BufferingListener, (percent: i32)
    );
    slot_setter!(set_on_timed_text, timed_text, TimedTextListener, (cue: &TimedText));

    /// Swap a slot. The replaced listener is dropped after the lock is
    /// released, since its captures may own the player.
    fn update<T>(&self, apply: impl FnOnce(&mut Slots) -> Option<T>) {
        let old = {
            let mut state = self.shared.state.lock();
            if state.released {
                return;
            }
            apply(&mut state.slots)
        };
        drop(old);
    }

    /// Queue `notification` on the dispatcher.
    pub fn deliver(&self, notification: Notification, stamp: Stamp) {
        let shared = Arc::clone(&self.shared);
        let epochs = Arc::clone(&self.epochs);
        let bus = Arc::clone(&self.bus);
        let session = self.session;

        self.dispatcher.dispatch(Box::new(move || {
            let thread = thread::current().id();
            let callback = {
                let mut state = shared.state.lock();
                if state.released || !epochs.is_current(stamp) {
                    trace!(?notification, "Dropping stale notification");
                    return;
                }
                state.delivering.push(thread);
                state.slots.callback_for(&notification)
            };
            let _in_flight = InFlight {
                shared: &shared,
                thread,
            };

            // No subscribers is not an error.
            let _ = bus.emit(notification.to_event(session));
            if let Some(callback) = callback {
                callback.invoke();
            }
        }));
    }

    /// Drop every listener and refuse further delivery. Blocks until
    /// callbacks running on other threads have returned; a callback on the
    /// calling thread (a listener releasing its own player) is not waited for.
    pub fn clear(&self) {
        let old = {
            let mut state = self.shared.state.lock();
            state.released = true;
            let old = std::mem::take(&mut state.slots);
            let me = thread::current().id();
            while state.delivering.iter().any(|t| *t != me) {
                self.shared.idle.wait(&mut state);
            }
            old
        };
        // Listener captures are dropped outside the lock.
        drop(old);
    }

    pub fn is_cleared(&self) -> bool {
        self.shared.state.lock().released
    }

    /// Whether the calling thread is inside one of this registry's callbacks.
    pub fn is_delivering_here(&self) -> bool {
        let me = thread::current().id();
        self.shared.state.lock().delivering.contains(&me)
    }
}
