//! # Core Runtime Module
//!
//! Ambient infrastructure shared by the player engine crates:
//! - Logging and tracing setup with host log forwarding
//! - Player configuration
//! - Broadcast event mirror
//!
//! Engine crates log through `tracing` and never install a subscriber
//! themselves; hosts call [`logging::init_logging`] once at startup.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{NegativePositionPolicy, PlayerConfig, StoppedRestartPolicy};
pub use error::{Error, Result};
pub use events::{EventBus, PlayerEvent, SessionId};
