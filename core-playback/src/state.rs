//! Lifecycle states and the operations legal in each.
//!
//! ```text
//! Idle ─set_data_source→ Initialized ─prepare(_async)→ Preparing ─ok→ Prepared
//!                                                        │
//!                                                        └─fail→ Error
//! Prepared ─start→ Started ⇄ Paused
//! Started ─native completion→ Completed ─start→ Started
//! Prepared | Started | Paused | Completed ─stop→ Stopped ─start→ Started (policy)
//! any ─reset→ Idle        any ─release→ Released (terminal)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PlayerError, Result};

/// Lifecycle state of a playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerState {
    Idle,
    Initialized,
    Preparing,
    Prepared,
    Started,
    Paused,
    Stopped,
    /// End of stream reached while playing.
    Completed,
    /// Preparation or playback failed; `reset()` or `release()` to recover.
    Error,
    Released,
}

impl PlayerState {
    pub fn name(self) -> &'static str {
        match self {
            PlayerState::Idle => "Idle",
            PlayerState::Initialized => "Initialized",
            PlayerState::Preparing => "Preparing",
            PlayerState::Prepared => "Prepared",
            PlayerState::Started => "Started",
            PlayerState::Paused => "Paused",
            PlayerState::Stopped => "Stopped",
            PlayerState::Completed => "Completed",
            PlayerState::Error => "Error",
            PlayerState::Released => "Released",
        }
    }

    /// States in which the session owns a prepared native handle.
    pub fn is_prepared(self) -> bool {
        matches!(
            self,
            PlayerState::Prepared
                | PlayerState::Started
                | PlayerState::Paused
                | PlayerState::Stopped
                | PlayerState::Completed
        )
    }

    pub fn is_terminal(self) -> bool {
        self == PlayerState::Released
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Operations gated by lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    SetDataSource,
    SetOption,
    Prepare,
    PrepareAsync,
    Start,
    Pause,
    Stop,
    SeekTo,
    Reset,
    SetDisplay,
    AdjustPlayback,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::SetDataSource => "set_data_source",
            Operation::SetOption => "set_option",
            Operation::Prepare => "prepare",
            Operation::PrepareAsync => "prepare_async",
            Operation::Start => "start",
            Operation::Pause => "pause",
            Operation::Stop => "stop",
            Operation::SeekTo => "seek_to",
            Operation::Reset => "reset",
            Operation::SetDisplay => "set_display",
            Operation::AdjustPlayback => "playback settings",
        }
    }

    /// Whether the operation may run in `state`. `Released` is handled by
    /// [`check`] and never reaches this table.
    pub fn allowed_in(self, state: PlayerState) -> bool {
        use PlayerState::*;

        match self {
            Operation::SetDataSource => matches!(state, Idle | Initialized),
            Operation::SetOption => matches!(state, Idle | Initialized | Preparing | Prepared),
            Operation::Prepare | Operation::PrepareAsync => state == Initialized,
            Operation::Start => matches!(state, Prepared | Started | Paused | Stopped | Completed),
            Operation::Pause => matches!(state, Started | Paused),
            Operation::Stop => matches!(state, Prepared | Started | Paused | Stopped | Completed),
            Operation::SeekTo => matches!(state, Prepared | Started | Paused | Stopped | Completed),
            Operation::Reset | Operation::SetDisplay | Operation::AdjustPlayback => state != Released,
        }
    }
}

/// Reject `operation` unless it is legal in `state`.
pub fn check(operation: Operation, state: PlayerState) -> Result<()> {
    if state == PlayerState::Released {
        return Err(PlayerError::Released);
    }
    if !operation.allowed_in(state) {
        return Err(PlayerError::InvalidState {
            operation: operation.name(),
            state,
        });
    }
    Ok(())
}
