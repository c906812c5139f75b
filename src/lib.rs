//! Workspace facade crate.
//!
//! Re-exports the media engine crates behind feature flags so host
//! applications can depend on `avplayer-workspace` alone:
//!
//! - `playback` (default): [`core_playback`], [`core_runtime`], [`bridge_traits`]
//! - `metadata` (default): [`core_metadata`]
//! - `lofty-backend`: the `lofty`-backed metadata retriever for audio files

#[cfg(any(feature = "playback", feature = "metadata"))]
pub use bridge_traits;

#[cfg(feature = "playback")]
pub use core_playback;

#[cfg(feature = "playback")]
pub use core_runtime;

#[cfg(feature = "metadata")]
pub use core_metadata;

#[cfg(feature = "playback")]
pub use core_playback::{MediaPlayer, PlayerError, PlayerState};

#[cfg(feature = "metadata")]
pub use core_metadata::{MetadataRetriever, MediaMetadata};
