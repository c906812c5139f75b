//! Native playback seam.
//!
//! These traits describe the decode/render layer that sits underneath the
//! player engine (an FFmpeg/MediaCodec pipeline on Android, a platform media
//! framework elsewhere). The engine never decodes anything itself; it owns
//! exactly one [`NativePlayer`] per session and drives it through this
//! contract.
//!
//! ## Threading
//!
//! A [`NativePlayer`] is `Send` but not `Sync`: the engine serializes every
//! call through a single per-session lock and may move the handle to its
//! prepare worker. Implementations must not assume calls arrive on any
//! particular thread.
//!
//! Asynchronous conditions (completion, playback-time errors, seek
//! completion, video size changes) are reported back through the
//! [`NativeEventSink`] handed to [`NativePlayerFactory::open`]. The sink may be
//! called from any thread, including from inside a `NativePlayer` method.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::display::DisplaySurface;
use crate::error::{BridgeError, Result};

/// URI scheme of descriptor-backed sources, as understood by FFmpeg's `pipe`
/// protocol.
const PIPE_SCHEME: &str = "pipe:";

/// Error and info codes exchanged with the native layer.
///
/// Values follow the Android `MediaPlayer` conventions the hosts already
/// understand.
pub mod error_codes {
    /// Unspecified native failure.
    pub const UNKNOWN: i32 = 1;
    /// The native media server died; the session must be released.
    pub const SERVER_DIED: i32 = 100;
    /// File or network I/O failure (extra detail).
    pub const IO: i32 = -1004;
    /// Bitstream is not conforming to the coding standard (extra detail).
    pub const MALFORMED: i32 = -1007;
    /// Bitstream is conforming but the feature is unsupported (extra detail).
    pub const UNSUPPORTED: i32 = -1010;
    /// An operation took too long (extra detail).
    pub const TIMED_OUT: i32 = -110;

    /// Info: playback paused internally to buffer more data.
    pub const INFO_BUFFERING_START: i32 = 701;
    /// Info: playback resumed after buffering.
    pub const INFO_BUFFERING_END: i32 = 702;
}

/// Option category understood by the native layer.
///
/// Numeric identifiers match the option tables of FFmpeg-based players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionCategory {
    /// Demuxer/format options (e.g. `probesize`).
    Format,
    /// Codec options (e.g. `skip_loop_filter`).
    Codec,
    /// Scaler options.
    Sws,
    /// Player options (e.g. `vcodec`, `framedrop`).
    Player,
    /// Resampler options.
    Swr,
}

impl OptionCategory {
    /// Numeric identifier used by the native option table.
    pub fn id(self) -> i32 {
        match self {
            OptionCategory::Format => 1,
            OptionCategory::Codec => 2,
            OptionCategory::Sws => 3,
            OptionCategory::Player => 4,
            OptionCategory::Swr => 5,
        }
    }

    /// Inverse of [`OptionCategory::id`].
    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            1 => Some(OptionCategory::Format),
            2 => Some(OptionCategory::Codec),
            3 => Some(OptionCategory::Sws),
            4 => Some(OptionCategory::Player),
            5 => Some(OptionCategory::Swr),
            _ => None,
        }
    }
}

/// Value of a native option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionValue {
    Text(String),
    Int(i64),
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Text(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Int(value)
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Text(text) => f.write_str(text),
            OptionValue::Int(value) => write!(f, "{}", value),
        }
    }
}

/// Window of a descriptor-backed source. A zero `length` reads to the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteRange {
    pub offset: i64,
    pub length: i64,
}

/// Opaque media location plus optional request headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    uri: String,
    headers: Vec<(String, String)>,
    byte_range: Option<ByteRange>,
}

impl DataSource {
    /// Create a data source from a path or URI.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            headers: Vec::new(),
            byte_range: None,
        }
    }

    /// Source read from an open file descriptor starting at `offset`.
    ///
    /// The descriptor is not duplicated; the host keeps it open until the
    /// session is reset or released.
    pub fn from_fd(fd: i32, offset: i64, length: i64) -> Result<Self> {
        if fd < 0 || offset < 0 || length < 0 {
            return Err(BridgeError::InvalidOperation(format!(
                "invalid descriptor source (fd={}, offset={}, length={})",
                fd, offset, length
            )));
        }
        Ok(Self {
            uri: format!("{}{}", PIPE_SCHEME, fd),
            headers: Vec::new(),
            byte_range: Some(ByteRange { offset, length }),
        })
    }

    /// Descriptor of a source built with [`DataSource::from_fd`].
    pub fn fd(&self) -> Option<i32> {
        self.byte_range?;
        self.uri.strip_prefix(PIPE_SCHEME)?.parse().ok()
    }

    pub fn byte_range(&self) -> Option<ByteRange> {
        self.byte_range
    }

    /// Attach a request header (kept in insertion order).
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Returns `true` when the URI carries a network scheme.
    pub fn is_remote(&self) -> bool {
        let lower = self.uri.to_ascii_lowercase();
        ["http://", "https://", "rtmp://", "rtsp://", "mms://", "mmsh://"]
            .iter()
            .any(|scheme| lower.starts_with(scheme))
    }

    /// Headers serialized as a `Key: Value\r\n` block, or `None` when empty.
    pub fn header_block(&self) -> Option<String> {
        if self.headers.is_empty() {
            return None;
        }
        Some(
            self.headers
                .iter()
                .map(|(key, value)| format!("{}: {}\r\n", key, value))
                .collect(),
        )
    }

    /// Form of the URI that is safe to log: query strings and user info are
    /// dropped from remote URIs, local paths are reduced to their file name.
    pub fn redacted(&self) -> String {
        if self.is_remote() {
            let without_query = self.uri.split(['?', '#']).next().unwrap_or_default();
            match without_query.split_once("://") {
                Some((scheme, rest)) => {
                    let host_and_path = rest.rsplit_once('@').map(|(_, tail)| tail).unwrap_or(rest);
                    format!("{}://{}", scheme, host_and_path)
                }
                None => without_query.to_string(),
            }
        } else {
            self.uri
                .rsplit(['/', '\\'])
                .next()
                .unwrap_or(&self.uri)
                .to_string()
        }
    }
}

impl From<&str> for DataSource {
    fn from(uri: &str) -> Self {
        DataSource::new(uri)
    }
}

impl From<String> for DataSource {
    fn from(uri: String) -> Self {
        DataSource::new(uri)
    }
}

/// Pixel rectangle a subtitle cue is drawn into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

/// One timed-text cue. An empty cue (`text == None`) clears the previous one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedText {
    pub text: Option<String>,
    pub bounds: Option<TextBounds>,
}

impl TimedText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            bounds: None,
        }
    }

    pub fn with_bounds(mut self, bounds: TextBounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn is_clear(&self) -> bool {
        self.text.as_deref().map_or(true, str::is_empty)
    }
}

/// Asynchronous condition reported by the native layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeEvent {
    /// End of stream reached while playing.
    Completed,
    /// Decode/render failure during playback.
    Error { code: i32, extra: i32 },
    /// A previously issued seek finished.
    SeekComplete,
    /// Decoded picture dimensions changed.
    VideoSizeChanged { width: i32, height: i32 },
    /// Stream rotation metadata changed (degrees).
    RotationChanged { degrees: i32 },
    /// Playback stalled to buffer.
    BufferingStart,
    /// Playback resumed after buffering.
    BufferingEnd,
    /// Network buffering progress in percent.
    BufferingUpdate { percent: i32 },
    /// Subtitle cue to show (or clear) now.
    TimedText(TimedText),
}

/// Receiver for [`NativeEvent`]s. Provided by the engine.
pub trait NativeEventSink: Send + Sync {
    fn post(&self, event: NativeEvent);
}

/// Exclusive handle to one native decode/render session.
///
/// Returned by [`NativePlayerFactory::open`]; the engine calls
/// [`NativePlayer::release`] exactly once before dropping it and issues no
/// further calls afterwards.
pub trait NativePlayer: Send {
    /// Apply a `(category, key, value)` option.
    fn set_option(&mut self, category: OptionCategory, key: &str, value: &OptionValue) -> Result<()>;

    /// Open the input, probe streams and set up decoders. May block on I/O.
    fn prepare(&mut self) -> Result<()>;

    /// Begin decode/render from the prepared, stopped or completed position.
    fn start(&mut self) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    /// Continue after [`NativePlayer::pause`].
    fn resume(&mut self) -> Result<()> {
        self.start()
    }

    fn stop(&mut self) -> Result<()>;

    /// Request an asynchronous seek; completion is signalled with
    /// [`NativeEvent::SeekComplete`].
    fn seek_to(&mut self, position_ms: i64) -> Result<()>;

    /// Current position in milliseconds. May be negative when unknown.
    fn current_position(&self) -> i64;

    /// Stream duration in milliseconds. May be negative when unknown.
    fn duration(&self) -> i64;

    fn video_width(&self) -> i32;

    fn video_height(&self) -> i32;

    /// Rotation metadata of the video stream in degrees.
    fn rotation(&self) -> i32 {
        0
    }

    /// Bind (`Some`) or detach (`None`) the render target.
    fn set_display(&mut self, surface: Option<Arc<dyn DisplaySurface>>) -> Result<()>;

    fn set_looping(&mut self, _looping: bool) -> Result<()> {
        Ok(())
    }

    fn set_volume(&mut self, _left: f32, _right: f32) -> Result<()> {
        Ok(())
    }

    fn set_mute(&mut self, _mute: bool) -> Result<()> {
        Ok(())
    }

    fn set_rate(&mut self, _rate: f32) -> Result<()> {
        Ok(())
    }

    fn set_pitch(&mut self, _pitch: f32) -> Result<()> {
        Ok(())
    }

    /// Whether `start()` after `stop()` resumes without a new prepare.
    fn can_resume_after_stop(&self) -> bool {
        false
    }

    /// Free decoder, renderer and demuxer resources.
    fn release(&mut self);
}

/// Creates native sessions for data sources.
pub trait NativePlayerFactory: Send + Sync {
    /// Allocate a native session for `source`. Must not block on I/O; heavy
    /// work belongs in [`NativePlayer::prepare`].
    fn open(
        &self,
        source: &DataSource,
        events: Arc<dyn NativeEventSink>,
    ) -> Result<Box<dyn NativePlayer>>;
}
