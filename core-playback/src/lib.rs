//! # Playback Session
//!
//! The player state machine and its collaborators.
//!
//! ## Overview
//!
//! - [`MediaPlayer`]: lifecycle, control, queries and listener registration
//! - [`options`]: native options queued before prepare and applied once
//! - [`reporter`]: periodic position samples while playing
//! - [`surface`]: the weakly held display target
//! - [`listeners`]: listener slots and stale-notification filtering
//! - [`dispatch`]: a serial dispatcher for hosts without an event loop
//!
//! The native decoder sits behind
//! [`NativePlayerFactory`](bridge_traits::native::NativePlayerFactory).

pub mod dispatch;
pub mod error;
pub mod listeners;
pub mod options;
pub mod player;
pub mod reporter;
pub mod state;
pub mod surface;
pub mod video;

pub use dispatch::SerialDispatcher;
pub use error::{PlayerError, Result};
pub use listeners::Notification;
pub use options::OptionEntry;
pub use player::{MediaPlayer, MediaPlayerBuilder};
pub use reporter::PositionSample;
pub use state::{Operation, PlayerState};
pub use video::VideoGeometry;
