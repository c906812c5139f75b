//! Tests for the lofty-backed retriever against a generated WAV file.

#![cfg(feature = "lofty-backend")]

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use core_metadata::{keys, LoftyRetrieverFactory, MetadataError, MetadataRetriever};

/// One second of 8 kHz mono 16-bit silence.
fn write_silent_wav(name: &str) -> PathBuf {
    let sample_rate: u32 = 8_000;
    let channels: u16 = 1;
    let bits: u16 = 16;
    let data_len: u32 = sample_rate * u32::from(channels) * u32::from(bits / 8);
    let byte_rate = sample_rate * u32::from(channels) * u32::from(bits / 8);

    let mut wav = Vec::with_capacity(44 + data_len as usize);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&channels.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&(channels * bits / 8).to_le_bytes());
    wav.extend_from_slice(&bits.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.resize(44 + data_len as usize, 0);

    let path = std::env::temp_dir().join(format!("core-metadata-{}-{}.wav", std::process::id(), name));
    fs::write(&path, wav).unwrap();
    path
}

#[test]
fn reads_stream_properties_from_untagged_wav() {
    let path = write_silent_wav("properties");
    let mut retriever = MetadataRetriever::new(Arc::new(LoftyRetrieverFactory::new()));
    retriever
        .set_data_source(format!("file://{}", path.display()))
        .unwrap();

    let entries = retriever.metadata().unwrap().unwrap();
    let _ = fs::remove_file(&path);

    assert_eq!(entries.get(keys::SAMPLE_RATE).map(String::as_str), Some("8000"));
    assert_eq!(entries.get(keys::CHANNELS).map(String::as_str), Some("1"));
    assert_eq!(entries.get(keys::MIME_TYPE).map(String::as_str), Some("audio/wav"));
    assert_eq!(entries.get(keys::TITLE), None);
    assert_eq!(retriever.embedded_picture().unwrap(), None);
}

#[test]
fn garbage_file_yields_no_metadata() {
    let path = std::env::temp_dir().join(format!("core-metadata-{}-garbage.mp3", std::process::id()));
    fs::write(&path, b"This is not a valid audio file").unwrap();

    let mut retriever = MetadataRetriever::new(Arc::new(LoftyRetrieverFactory::new()));
    retriever.set_data_source(path.display().to_string()).unwrap();
    let entries = retriever.metadata().unwrap();
    let _ = fs::remove_file(&path);

    assert_eq!(entries, None);
}

#[test]
fn missing_file_fails_on_open() {
    let mut retriever = MetadataRetriever::new(Arc::new(LoftyRetrieverFactory::new()));
    let result = retriever.set_data_source("/definitely/not/here.flac");
    assert!(matches!(result, Err(MetadataError::Bridge(_))));
}
