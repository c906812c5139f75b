//! Integration tests for the metadata retriever
//!
//! The native handle and its factory are mocked; these tests cover source
//! validation, failure handling, handle lifetime and background probing.

use std::collections::BTreeMap;
use std::sync::Arc;

use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::metadata::{FrameOption, NativeRetriever, RetrieverFactory};
use bridge_traits::native::DataSource;
use core_metadata::{keys, MetadataError, MetadataRetriever};
use mockall::mock;

mock! {
    pub Handle {}

    impl NativeRetriever for Handle {
        fn embedded_picture(&mut self) -> BridgeResult<Option<Vec<u8>>>;
        fn metadata(&mut self) -> BridgeResult<BTreeMap<String, String>>;
        fn release(&mut self);
    }
}

mock! {
    pub Factory {}

    impl RetrieverFactory for Factory {
        fn open(&self, source: &DataSource) -> BridgeResult<Box<dyn NativeRetriever>>;
    }
}

fn track_entries() -> BTreeMap<String, String> {
    let mut entries = BTreeMap::new();
    entries.insert(keys::TITLE.to_string(), "Intro".to_string());
    entries.insert(keys::ARTIST.to_string(), "The xx".to_string());
    entries.insert(keys::DURATION.to_string(), "128000".to_string());
    entries
}

/// Handle that answers every query and expects exactly one release.
fn healthy_handle() -> MockHandle {
    let mut handle = MockHandle::new();
    handle
        .expect_embedded_picture()
        .returning(|| Ok(Some(vec![0xFF, 0xD8, 0xFF, 0xE0])));
    handle.expect_metadata().returning(|| Ok(track_entries()));
    handle.expect_release().times(1).return_const(());
    handle
}

fn factory_for(handle: MockHandle) -> Arc<dyn RetrieverFactory> {
    let mut factory = MockFactory::new();
    factory
        .expect_open()
        .times(1)
        .return_once(move |_| Ok(Box::new(handle) as Box<dyn NativeRetriever>));
    Arc::new(factory)
}

#[test]
fn empty_and_in_memory_sources_are_rejected() {
    let mut factory = MockFactory::new();
    factory.expect_open().times(0);
    let mut retriever = MetadataRetriever::new(Arc::new(factory));

    assert!(matches!(
        retriever.set_data_source(""),
        Err(MetadataError::InvalidSource(_))
    ));
    assert!(matches!(
        retriever.set_data_source("mem://buffer/42"),
        Err(MetadataError::InvalidSource(_))
    ));
}

#[test]
fn queries_before_a_source_are_not_initialized() {
    let mut retriever = MetadataRetriever::new(Arc::new(MockFactory::new()));
    assert!(matches!(
        retriever.embedded_picture(),
        Err(MetadataError::NotInitialized)
    ));
    assert!(matches!(retriever.metadata(), Err(MetadataError::NotInitialized)));
}

#[test]
fn reads_picture_and_entries() {
    let mut retriever = MetadataRetriever::new(factory_for(healthy_handle()));
    retriever.set_data_source("/sdcard/Music/intro.flac").unwrap();

    let picture = retriever.embedded_picture().unwrap().unwrap();
    assert_eq!(&picture[..2], &[0xFF, 0xD8]);

    let entries = retriever.metadata().unwrap().unwrap();
    assert_eq!(entries.get(keys::TITLE).map(String::as_str), Some("Intro"));
    assert_eq!(
        retriever.extract_metadata(keys::ARTIST).unwrap().as_deref(),
        Some("The xx")
    );
    assert_eq!(retriever.extract_metadata("lyricist").unwrap(), None);

    let snapshot = retriever.snapshot().unwrap().unwrap();
    assert_eq!(snapshot.duration_ms(), Some(128_000));
    assert!(!snapshot.has_video());

    // Audio-only handles fall back to the trait default.
    assert_eq!(
        retriever.frame_at_time(1_000_000, FrameOption::ClosestSync).unwrap(),
        None
    );
    retriever.release();
}

#[test]
fn native_failures_yield_none() {
    let mut handle = MockHandle::new();
    handle
        .expect_embedded_picture()
        .returning(|| Err(BridgeError::OperationFailed("corrupt APIC frame".into())));
    handle
        .expect_metadata()
        .returning(|| Err(BridgeError::native(1, -1007)));
    handle.expect_release().times(1).return_const(());

    let mut retriever = MetadataRetriever::new(factory_for(handle));
    retriever.set_data_source("/sdcard/Music/broken.mp3").unwrap();

    assert_eq!(retriever.embedded_picture().unwrap(), None);
    assert_eq!(retriever.metadata().unwrap(), None);
    assert_eq!(retriever.snapshot().unwrap(), None);
    assert!(matches!(
        retriever.extract_metadata(keys::TITLE),
        Err(MetadataError::ExtractionFailed(_))
    ));
}

#[test]
fn release_is_idempotent_and_final() {
    let mut retriever = MetadataRetriever::new(factory_for(healthy_handle()));
    retriever.set_data_source("/sdcard/Music/intro.flac").unwrap();

    retriever.release();
    retriever.release();
    assert!(retriever.is_released());
    assert!(matches!(retriever.metadata(), Err(MetadataError::Released)));
    assert!(matches!(
        retriever.set_data_source("/sdcard/Music/other.flac"),
        Err(MetadataError::Released)
    ));
}

#[test]
fn new_source_releases_the_previous_handle() {
    let mut first = MockHandle::new();
    first.expect_release().times(1).return_const(());
    let second = healthy_handle();

    let mut factory = MockFactory::new();
    let mut handles = vec![second, first];
    factory.expect_open().times(2).returning(move |_| {
        let handle = handles.pop().unwrap();
        Ok(Box::new(handle) as Box<dyn NativeRetriever>)
    });

    let mut retriever = MetadataRetriever::new(Arc::new(factory));
    retriever.set_data_source("a.mp3").unwrap();
    retriever.set_data_source("b.mp3").unwrap();
    assert!(retriever.metadata().unwrap().is_some());
}

#[test]
fn open_failure_is_reported() {
    let mut factory = MockFactory::new();
    factory
        .expect_open()
        .returning(|_| Err(BridgeError::NotAvailable("no demuxer".into())));
    let mut retriever = MetadataRetriever::new(Arc::new(factory));

    assert!(matches!(
        retriever.set_data_source("clip.ts"),
        Err(MetadataError::Bridge(BridgeError::NotAvailable(_)))
    ));
    assert!(matches!(retriever.metadata(), Err(MetadataError::NotInitialized)));
}

#[core_async::test]
async fn probe_runs_on_the_blocking_pool() {
    let runtime = core_async::runtime::current().unwrap();
    let snapshot = MetadataRetriever::probe_in_background(
        &runtime,
        factory_for(healthy_handle()),
        DataSource::new("/sdcard/Music/intro.flac"),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(snapshot.title(), Some("Intro"));
    assert_eq!(snapshot.artist(), Some("The xx"));
    assert!(snapshot.picture.is_some());
}

#[core_async::test]
async fn probe_surfaces_invalid_sources() {
    let runtime = core_async::runtime::current().unwrap();
    let result = MetadataRetriever::probe_in_background(
        &runtime,
        Arc::new(MockFactory::new()),
        DataSource::new("mem://preview"),
    )
    .await;
    assert!(matches!(result, Err(MetadataError::InvalidSource(_))));
}
