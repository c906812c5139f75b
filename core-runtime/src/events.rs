//! # Event Bus System
//!
//! Broadcast mirror of player listener callbacks, built on
//! `tokio::sync::broadcast` (through `core_async::sync`).
//!
//! ## Overview
//!
//! Listener slots deliver one callback per category to one host closure.
//! Components that only want to observe a session (analytics, a playlist
//! controller, tests) subscribe to the [`EventBus`] instead. The engine emits
//! onto the bus at the same point it dispatches the listener callback, so
//! every subscriber sees events in listener order.
//!
//! ```text
//! ┌──────────────┐   dispatch   ┌────────────────┐
//! │ MediaPlayer  ├─────────────>│ listener slots │
//! │   session    │              └────────────────┘
//! │              │     emit     ┌───────────┐   subscribe   ┌────────────┐
//! │              ├─────────────>│ EventBus  ├──────────────>│ Subscriber │
//! └──────────────┘              └───────────┘               └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::events::{EventBus, PlayerEvent, RecvError};
//!
//! let bus = EventBus::new(64);
//! let mut stream = bus.subscribe();
//!
//! core_async::spawn(async move {
//!     loop {
//!         match stream.recv().await {
//!             Ok(PlayerEvent::Completed { session }) => tracing::info!(%session, "done"),
//!             Ok(_) => {}
//!             Err(RecvError::Lagged(n)) => tracing::warn!(missed = n, "subscriber lagged"),
//!             Err(RecvError::Closed) => break,
//!         }
//!     }
//! });
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events (position
//!   samples are the usual culprit). Non-fatal.
//! - **`RecvError::Closed`**: the session was dropped.

use bridge_traits::native::TimedText;
use core_async::sync::broadcast;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub use core_async::sync::broadcast::error::{RecvError, SendError};
pub use core_async::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 64;

/// Identifier attached to every event and log line of one playback session.
pub type SessionId = Uuid;

/// Everything a player session reports to observers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlayerEvent {
    /// Preparation finished; the session accepts `start()`.
    Prepared { session: SessionId },
    /// Native or preparation failure.
    Error {
        session: SessionId,
        code: i32,
        extra: i32,
    },
    /// End of stream reached.
    Completed { session: SessionId },
    /// Periodic position sample while playing.
    Position {
        session: SessionId,
        current_ms: i64,
        duration_ms: i64,
        /// `false` when the native layer did not know the duration and
        /// `duration_ms` was clamped.
        duration_known: bool,
    },
    /// A seek finished and the position is settled.
    SeekComplete { session: SessionId },
    /// Decoded picture dimensions changed.
    VideoSizeChanged {
        session: SessionId,
        width: i32,
        height: i32,
    },
    /// Informational native report (buffering start/end, ...).
    Info {
        session: SessionId,
        what: i32,
        extra: i32,
    },
    /// Network buffering progress in percent.
    BufferingUpdate { session: SessionId, percent: i32 },
    /// Subtitle cue to show, or clear when empty.
    TimedText { session: SessionId, cue: TimedText },
    /// Session torn down; no further events follow.
    Released { session: SessionId },
}

impl PlayerEvent {
    pub fn session(&self) -> SessionId {
        match self {
            PlayerEvent::Prepared { session }
            | PlayerEvent::Error { session, .. }
            | PlayerEvent::Completed { session }
            | PlayerEvent::Position { session, .. }
            | PlayerEvent::SeekComplete { session }
            | PlayerEvent::VideoSizeChanged { session, .. }
            | PlayerEvent::Info { session, .. }
            | PlayerEvent::BufferingUpdate { session, .. }
            | PlayerEvent::TimedText { session, .. }
            | PlayerEvent::Released { session } => *session,
        }
    }

    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &'static str {
        match self {
            PlayerEvent::Prepared { .. } => "Playback prepared",
            PlayerEvent::Error { .. } => "Playback error",
            PlayerEvent::Completed { .. } => "Playback completed",
            PlayerEvent::Position { .. } => "Position update",
            PlayerEvent::SeekComplete { .. } => "Seek completed",
            PlayerEvent::VideoSizeChanged { .. } => "Video size changed",
            PlayerEvent::Info { .. } => "Playback info",
            PlayerEvent::BufferingUpdate { .. } => "Buffering progress",
            PlayerEvent::TimedText { .. } => "Timed text",
            PlayerEvent::Released { .. } => "Session released",
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            PlayerEvent::Error { .. } => EventSeverity::Error,
            PlayerEvent::Prepared { .. }
            | PlayerEvent::Completed { .. }
            | PlayerEvent::Released { .. } => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Broadcast channel carrying [`PlayerEvent`]s.
pub struct EventBus {
    sender: broadcast::Sender<PlayerEvent>,
}

impl EventBus {
    /// Creates a bus whose subscribers lag after `capacity` unread events.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// when nobody is subscribed.
    pub fn emit(&self, event: PlayerEvent) -> Result<usize, SendError<PlayerEvent>> {
        self.sender.send(event)
    }

    /// Each call creates an independent receiver of all future events. Past
    /// events are not replayed.
    pub fn subscribe(&self) -> Receiver<PlayerEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

type EventFilter = Box<dyn Fn(&PlayerEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional filter.
///
/// ```ignore
/// let errors = EventStream::new(bus.subscribe())
///     .filter(|event| event.severity() >= EventSeverity::Error);
/// ```
pub struct EventStream {
    receiver: Receiver<PlayerEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<PlayerEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&PlayerEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Only events of one session.
    pub fn for_session(self, session: SessionId) -> Self {
        self.filter(move |event| event.session() == session)
    }

    fn accepts(&self, event: &PlayerEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    pub async fn recv(&mut self) -> Result<PlayerEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking receive; `None` when nothing is queued.
    pub fn try_recv(&mut self) -> Option<Result<PlayerEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SessionId {
        Uuid::new_v4()
    }

    #[test]
    fn test_emit_without_subscribers_fails() {
        let bus = EventBus::new(4);
        let result = bus.emit(PlayerEvent::Prepared { session: session() });
        assert!(result.is_err());
    }

    #[core_async::test]
    async fn test_subscribers_receive_in_order() {
        let bus = EventBus::new(8);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        let id = session();

        bus.emit(PlayerEvent::Prepared { session: id }).unwrap();
        bus.emit(PlayerEvent::Completed { session: id }).unwrap();

        for rx in [&mut first, &mut second] {
            assert_eq!(rx.recv().await.unwrap(), PlayerEvent::Prepared { session: id });
            assert_eq!(rx.recv().await.unwrap(), PlayerEvent::Completed { session: id });
        }
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[core_async::test]
    async fn test_stream_filters_by_session() {
        let bus = EventBus::new(8);
        let wanted = session();
        let other = session();
        let mut stream = EventStream::new(bus.subscribe()).for_session(wanted);

        bus.emit(PlayerEvent::Prepared { session: other }).unwrap();
        bus.emit(PlayerEvent::Completed { session: wanted }).unwrap();

        assert_eq!(
            stream.recv().await.unwrap(),
            PlayerEvent::Completed { session: wanted }
        );
        assert!(stream.try_recv().is_none());
    }

    #[core_async::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();
        let id = session();

        for i in 0..5 {
            bus.emit(PlayerEvent::Position {
                session: id,
                current_ms: i * 100,
                duration_ms: 1_000,
                duration_known: true,
            })
            .unwrap();
        }

        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_severity_and_description() {
        let id = session();
        let error = PlayerEvent::Error {
            session: id,
            code: 1,
            extra: -1004,
        };
        assert_eq!(error.severity(), EventSeverity::Error);
        assert_eq!(error.description(), "Playback error");
        assert_eq!(
            PlayerEvent::SeekComplete { session: id }.severity(),
            EventSeverity::Debug
        );
        assert_eq!(error.session(), id);
    }

    #[test]
    fn test_event_serialization() {
        let event = PlayerEvent::VideoSizeChanged {
            session: Uuid::nil(),
            width: 640,
            height: 360,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"VideoSizeChanged\""));
        let back: PlayerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
