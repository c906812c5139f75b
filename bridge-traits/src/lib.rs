//! # Host and Native Bridge Traits
//!
//! Seams between the player engine and everything it does not implement
//! itself.
//!
//! ## Traits
//!
//! ### Native layer
//! - [`NativePlayerFactory`](native::NativePlayerFactory) / [`NativePlayer`](native::NativePlayer) -
//!   one exclusive decode/render session per data source
//! - [`NativeEventSink`](native::NativeEventSink) - asynchronous completion, error and seek reports
//! - [`RetrieverFactory`](metadata::RetrieverFactory) / [`NativeRetriever`](metadata::NativeRetriever) -
//!   blocking cover-art and tag probing, independent of playback
//!
//! ### Host integration
//! - [`DisplaySurface`](display::DisplaySurface) - render target owned by the host UI
//! - [`EventDispatcher`](dispatch::EventDispatcher) - the context listener callbacks run on
//! - [`LoggerSink`](logging::LoggerSink) - forward structured logs to host logging
//!
//! ## Error Handling
//!
//! Every seam reports failures as [`BridgeError`](error::BridgeError). Native
//! decode failures carry the `(code, extra)` pair the engine hands to error
//! listeners; see [`native::error_codes`].
//!
//! ## Thread Safety
//!
//! Factories, sinks, surfaces and dispatchers are `Send + Sync`. Native
//! handles are only `Send`: the engine serializes access to them.
//!
//! ## Example
//!
//! ```ignore
//! use bridge_traits::native::{DataSource, NativeEventSink, NativePlayer, NativePlayerFactory};
//! use bridge_traits::error::Result;
//! use std::sync::Arc;
//!
//! struct FfmpegFactory;
//!
//! impl NativePlayerFactory for FfmpegFactory {
//!     fn open(
//!         &self,
//!         source: &DataSource,
//!         events: Arc<dyn NativeEventSink>,
//!     ) -> Result<Box<dyn NativePlayer>> {
//!         Ok(Box::new(FfmpegPlayer::new(source.uri(), source.header_block(), events)))
//!     }
//! }
//! ```

pub mod dispatch;
pub mod display;
pub mod error;
pub mod logging;
pub mod metadata;
pub mod native;

pub use error::BridgeError;

pub use dispatch::{DispatchJob, EventDispatcher, InlineDispatcher};
pub use display::{DisplaySurface, SurfaceId};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use metadata::{FrameOption, NativeRetriever, RetrieverFactory};
pub use native::{
    ByteRange, DataSource, NativeEvent, NativeEventSink, NativePlayer, NativePlayerFactory,
    OptionCategory, OptionValue, TextBounds, TimedText,
};
