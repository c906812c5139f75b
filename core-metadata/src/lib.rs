//! # Metadata Module
//!
//! Cover art and key/value metadata for a media source, read through a native
//! handle of its own so probing never races a player preparing the same
//! source.
//!
//! ## Overview
//!
//! - [`MetadataRetriever`]: blocking accessor over a
//!   [`RetrieverFactory`](bridge_traits::metadata::RetrieverFactory) handle
//! - [`MetadataRetriever::probe_in_background`]: one full probe on a runtime's
//!   blocking pool
//! - `lofty_backend` (feature `lofty-backend`): local audio files via `lofty`

pub mod error;
pub mod retriever;

#[cfg(feature = "lofty-backend")]
pub mod lofty_backend;

pub use bridge_traits::metadata::{keys, FrameOption};
pub use error::{MetadataError, Result};
#[cfg(feature = "lofty-backend")]
pub use lofty_backend::LoftyRetrieverFactory;
pub use retriever::{MediaMetadata, MetadataRetriever};
