//! Metadata Retriever
//!
//! Blocking accessor for cover art and key/value metadata of one source. It
//! opens its own native handle through a [`RetrieverFactory`] and shares
//! nothing with a playback session, so probing a file never contends with a
//! player preparing the same file.
//!
//! Every query may block on I/O or decoding. Run them off latency-sensitive
//! threads, or hand the whole probe to a runtime with
//! [`MetadataRetriever::probe_in_background`].
//!
//! ## Usage
//!
//! ```ignore
//! let mut retriever = MetadataRetriever::new(factory);
//! retriever.set_data_source("/sdcard/Music/track.flac")?;
//! if let Some(cover) = retriever.embedded_picture()? {
//!     show_cover(&cover);
//! }
//! let title = retriever.extract_metadata(keys::TITLE)?;
//! retriever.release();
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use bridge_traits::metadata::{keys, FrameOption, NativeRetriever, RetrieverFactory};
use bridge_traits::native::DataSource;
use bytes::Bytes;
use core_async::runtime::Handle;
use tracing::{debug, instrument, warn};

use crate::error::{MetadataError, Result};

/// URI scheme of in-memory sources, which have no file for a second handle
/// to open.
const MEMORY_SCHEME: &str = "mem://";

/// Snapshot of what a source carries: the embedded picture plus every
/// key/value pair the backend read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaMetadata {
    pub picture: Option<Bytes>,
    pub entries: BTreeMap<String, String>,
}

impl MediaMetadata {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.get(keys::TITLE)
    }

    pub fn artist(&self) -> Option<&str> {
        self.get(keys::ARTIST)
    }

    pub fn album(&self) -> Option<&str> {
        self.get(keys::ALBUM)
    }

    /// Duration in milliseconds, when the backend reported a parseable one.
    pub fn duration_ms(&self) -> Option<i64> {
        self.get(keys::DURATION)?.trim().parse().ok()
    }

    pub fn has_video(&self) -> bool {
        matches!(self.get(keys::HAS_VIDEO), Some("yes") | Some("true") | Some("1"))
    }

    pub fn is_empty(&self) -> bool {
        self.picture.is_none() && self.entries.is_empty()
    }
}

pub struct MetadataRetriever {
    factory: Arc<dyn RetrieverFactory>,
    handle: Option<Box<dyn NativeRetriever>>,
    released: bool,
}

impl MetadataRetriever {
    pub fn new(factory: Arc<dyn RetrieverFactory>) -> Self {
        Self {
            factory,
            handle: None,
            released: false,
        }
    }

    /// Open a native handle for `source`, replacing any previous one.
    pub fn set_data_source(&mut self, source: impl Into<DataSource>) -> Result<()> {
        if self.released {
            return Err(MetadataError::Released);
        }
        let source = source.into();
        let uri = source.uri().trim();
        if uri.is_empty() {
            return Err(MetadataError::InvalidSource("empty URI".to_string()));
        }
        if uri.starts_with(MEMORY_SCHEME) {
            return Err(MetadataError::InvalidSource(format!(
                "in-memory sources cannot be probed: {}",
                source.redacted()
            )));
        }

        self.close_handle();
        let handle = self.factory.open(&source)?;
        debug!(source = %source.redacted(), "Retriever opened");
        self.handle = Some(handle);
        Ok(())
    }

    /// Raw bytes of the embedded cover, or `None` when there is none or it
    /// cannot be read.
    pub fn embedded_picture(&mut self) -> Result<Option<Bytes>> {
        let handle = self.handle()?;
        match handle.embedded_picture() {
            Ok(picture) => Ok(picture.filter(|p| !p.is_empty()).map(Bytes::from)),
            Err(error) => {
                warn!(error = %error, "Embedded picture extraction failed");
                Ok(None)
            }
        }
    }

    /// Every key/value pair, or `None` when extraction fails.
    pub fn metadata(&mut self) -> Result<Option<BTreeMap<String, String>>> {
        let handle = self.handle()?;
        match handle.metadata() {
            Ok(entries) => Ok(Some(entries)),
            Err(error) => {
                warn!(error = %error, "Metadata extraction failed");
                Ok(None)
            }
        }
    }

    /// Value for a single key.
    pub fn extract_metadata(&mut self, key: &str) -> Result<Option<String>> {
        let handle = self.handle()?;
        handle
            .extract_metadata(key)
            .map_err(|e| MetadataError::ExtractionFailed(format!("{}: {}", key, e)))
    }

    /// Encoded still frame near `time_us`, when the backend decodes video.
    pub fn frame_at_time(&mut self, time_us: i64, option: FrameOption) -> Result<Option<Bytes>> {
        if time_us < 0 {
            return Err(MetadataError::InvalidSource(format!(
                "negative frame time {}us",
                time_us
            )));
        }
        let handle = self.handle()?;
        let frame = handle
            .frame_at_time(time_us, option)
            .map_err(|e| MetadataError::ExtractionFailed(e.to_string()))?;
        Ok(frame.map(Bytes::from))
    }

    /// Picture and entries in one pass. `None` when neither could be read.
    pub fn snapshot(&mut self) -> Result<Option<MediaMetadata>> {
        let picture = self.embedded_picture()?;
        let entries = self.metadata()?;
        if picture.is_none() && entries.is_none() {
            return Ok(None);
        }
        Ok(Some(MediaMetadata {
            picture,
            entries: entries.unwrap_or_default(),
        }))
    }

    /// Free the native handle. Safe to call more than once.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.close_handle();
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Run a full probe of `source` on `runtime`'s blocking pool.
    #[instrument(skip_all, fields(source = %source.redacted()))]
    pub async fn probe_in_background(
        runtime: &Handle,
        factory: Arc<dyn RetrieverFactory>,
        source: DataSource,
    ) -> Result<Option<MediaMetadata>> {
        let task = core_async::task::spawn_blocking_on(runtime, move || {
            let mut retriever = MetadataRetriever::new(factory);
            retriever.set_data_source(source)?;
            let snapshot = retriever.snapshot();
            retriever.release();
            snapshot
        });

        task.await
            .map_err(|e| MetadataError::ExtractionFailed(format!("probe task failed: {}", e)))?
    }

    fn handle(&mut self) -> Result<&mut Box<dyn NativeRetriever>> {
        if self.released {
            return Err(MetadataError::Released);
        }
        self.handle.as_mut().ok_or(MetadataError::NotInitialized)
    }

    fn close_handle(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.release();
            debug!("Retriever closed");
        }
    }
}

impl Drop for MetadataRetriever {
    fn drop(&mut self) {
        self.release();
    }
}
