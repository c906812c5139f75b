//! Integration tests for logging system

use async_trait::async_trait;
use bridge_traits::error::Result as SinkResult;
use bridge_traits::logging::{LogEntry, LogLevel, LoggerSink};
use core_runtime::logging::{init_logging, strip_path, LogFormat, LoggingConfig};
use core_runtime::Error;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct CollectingSink {
    entries: Mutex<Vec<LogEntry>>,
}

#[async_trait]
impl LoggerSink for CollectingSink {
    async fn log(&self, entry: LogEntry) -> SinkResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Debug
    }
}

// The global subscriber can be installed once per process, so every
// assertion that depends on it lives in this single test.
#[test]
fn test_init_logging_forwards_engine_events_once() {
    let sink = Arc::new(CollectingSink::default());
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_logger_sink(sink.clone());

    init_logging(config).unwrap();

    tracing::debug!(target: "core_playback::player", state = "Prepared", "state changed");
    tracing::debug!(target: "hyper::client", "dependency noise");
    tracing::trace!(target: "core_playback::player", "below sink level");

    {
        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "state changed");
        assert_eq!(entries[0].tag(), "player");
        assert_eq!(
            entries[0].fields.get("state").map(String::as_str),
            Some("Prepared")
        );
    }

    let second = init_logging(LoggingConfig::default());
    assert!(matches!(second, Err(Error::Config(_))));
}

#[test]
fn test_format_selection() {
    #[cfg(debug_assertions)]
    assert_eq!(LoggingConfig::default().format, LogFormat::Pretty);

    #[cfg(not(debug_assertions))]
    assert_eq!(LoggingConfig::default().format, LogFormat::Compact);
}

#[test]
fn test_path_stripping() {
    assert_eq!(strip_path("/storage/emulated/0/DCIM/clip.mp4"), "clip.mp4");
    assert_eq!(strip_path("D:\\media\\clip.mkv"), "clip.mkv");
    assert_eq!(strip_path(""), "");
}
