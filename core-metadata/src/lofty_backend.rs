//! Local audio file retriever backed by `lofty`.
//!
//! Reads ID3v2, Vorbis Comments, MP4 and FLAC tags plus stream properties.
//! Audio only: `frame_at_time` always returns `None`.
//!
//! The file is parsed on the first query and the result kept until release.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::metadata::{keys, NativeRetriever, RetrieverFactory};
use bridge_traits::native::DataSource;
use lofty::config::ParseOptions;
use lofty::file::{AudioFile, FileType, TaggedFileExt};
use lofty::picture::PictureType;
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, Tag};
use tracing::{debug, warn};

const FILE_SCHEME: &str = "file://";

/// Opens [`LoftyRetriever`]s for local paths and `file://` URIs.
#[derive(Debug)]
pub struct LoftyRetrieverFactory {
    parse_options: ParseOptions,
}

impl LoftyRetrieverFactory {
    pub fn new() -> Self {
        Self {
            parse_options: ParseOptions::new(),
        }
    }

    pub fn with_options(parse_options: ParseOptions) -> Self {
        Self { parse_options }
    }
}

impl Default for LoftyRetrieverFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl RetrieverFactory for LoftyRetrieverFactory {
    fn open(&self, source: &DataSource) -> BridgeResult<Box<dyn NativeRetriever>> {
        if source.is_remote() {
            return Err(BridgeError::NotAvailable(format!(
                "lofty reads local files only: {}",
                source.redacted()
            )));
        }

        let uri = source.uri();
        let path = PathBuf::from(uri.strip_prefix(FILE_SCHEME).unwrap_or(uri));
        if !path.is_file() {
            return Err(BridgeError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            )));
        }

        Ok(Box::new(LoftyRetriever {
            path,
            parse_options: self.parse_options,
            parsed: None,
        }))
    }
}

#[derive(Debug, Clone)]
struct Parsed {
    entries: BTreeMap<String, String>,
    picture: Option<Vec<u8>>,
}

pub struct LoftyRetriever {
    path: PathBuf,
    parse_options: ParseOptions,
    parsed: Option<Parsed>,
}

impl LoftyRetriever {
    fn parsed(&mut self) -> BridgeResult<&Parsed> {
        if self.parsed.is_none() {
            self.parsed = Some(parse(&self.path, self.parse_options)?);
        }
        self.parsed
            .as_ref()
            .ok_or_else(|| BridgeError::OperationFailed("metadata unavailable".to_string()))
    }
}

impl NativeRetriever for LoftyRetriever {
    fn embedded_picture(&mut self) -> BridgeResult<Option<Vec<u8>>> {
        Ok(self.parsed()?.picture.clone())
    }

    fn metadata(&mut self) -> BridgeResult<BTreeMap<String, String>> {
        Ok(self.parsed()?.entries.clone())
    }

    fn extract_metadata(&mut self, key: &str) -> BridgeResult<Option<String>> {
        Ok(self.parsed()?.entries.get(key).cloned())
    }

    fn release(&mut self) {
        self.parsed = None;
    }
}

fn parse(path: &Path, parse_options: ParseOptions) -> BridgeResult<Parsed> {
    debug!(path = %path.display(), "Reading tags");

    let data = std::fs::read(path)?;
    let tagged_file = Probe::new(std::io::Cursor::new(&data))
        .options(parse_options)
        .guess_file_type()?
        .read()
        .map_err(|e| BridgeError::OperationFailed(format!("Failed to parse file: {}", e)))?;

    let properties = tagged_file.properties();
    let mut entries = BTreeMap::new();
    let mut put = |key: &str, value: String| {
        if !value.is_empty() {
            entries.insert(key.to_string(), value);
        }
    };

    put(keys::DURATION, properties.duration().as_millis().to_string());
    if let Some(bitrate) = properties.overall_bitrate().or(properties.audio_bitrate()) {
        put(keys::BITRATE, bitrate.to_string());
    }
    if let Some(sample_rate) = properties.sample_rate() {
        put(keys::SAMPLE_RATE, sample_rate.to_string());
    }
    if let Some(channels) = properties.channels() {
        put(keys::CHANNELS, channels.to_string());
    }
    put(keys::MIME_TYPE, file_type_to_mime_type(tagged_file.file_type()).to_string());
    put(keys::HAS_AUDIO, "yes".to_string());

    let tag = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag());
    let picture = match tag {
        Some(tag) => {
            read_tag(tag, &mut put);
            front_cover(tag)
        }
        None => {
            warn!(path = %path.display(), "No tags found");
            None
        }
    };

    Ok(Parsed { entries, picture })
}

fn read_tag(tag: &Tag, put: &mut impl FnMut(&str, String)) {
    if let Some(title) = tag.title() {
        put(keys::TITLE, normalize_text(&title));
    }
    if let Some(artist) = tag.artist() {
        put(keys::ARTIST, normalize_text(&artist));
    }
    if let Some(album) = tag.album() {
        put(keys::ALBUM, normalize_text(&album));
    }
    if let Some(album_artist) = tag.get_string(&ItemKey::AlbumArtist) {
        put(keys::ALBUM_ARTIST, normalize_text(album_artist));
    }
    if let Some(genre) = tag.genre() {
        put(keys::GENRE, normalize_text(&genre));
    }
    if let Some(year) = tag.year() {
        put(keys::DATE, year.to_string());
    }
    if let Some(track) = tag.track() {
        put(keys::TRACK, numbered(track, tag.track_total()));
    }
    if let Some(disc) = tag.disk() {
        put(keys::DISC, numbered(disc, tag.disk_total()));
    }
    if let Some(composer) = tag.get_string(&ItemKey::Composer) {
        put(keys::COMPOSER, normalize_text(composer));
    }
    if let Some(comment) = tag.comment() {
        put(keys::COMMENT, normalize_text(&comment));
    }
}

/// Front cover if tagged as such, otherwise the first non-empty picture.
fn front_cover(tag: &Tag) -> Option<Vec<u8>> {
    let pictures = tag.pictures();
    pictures
        .iter()
        .find(|p| p.pic_type() == PictureType::CoverFront && !p.data().is_empty())
        .or_else(|| pictures.iter().find(|p| !p.data().is_empty()))
        .map(|p| p.data().to_vec())
}

/// `"3/12"` style numbering.
fn numbered(number: u32, total: Option<u32>) -> String {
    match total {
        Some(total) => format!("{}/{}", number, total),
        None => number.to_string(),
    }
}

/// Collapse whitespace runs and drop control characters.
fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .filter(|c| !c.is_control())
        .collect()
}

fn file_type_to_mime_type(file_type: FileType) -> &'static str {
    match file_type {
        FileType::Aac => "audio/aac",
        FileType::Aiff => "audio/aiff",
        FileType::Ape => "audio/ape",
        FileType::Flac => "audio/flac",
        FileType::Mpeg => "audio/mpeg",
        FileType::Mp4 => "audio/mp4",
        FileType::Mpc => "audio/musepack",
        FileType::Opus => "audio/opus",
        FileType::Vorbis => "audio/vorbis",
        FileType::Speex => "audio/speex",
        FileType::Wav => "audio/wav",
        FileType::WavPack => "audio/wavpack",
        _ => "application/octet-stream",
    }
}
