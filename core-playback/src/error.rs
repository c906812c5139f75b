//! # Player Error Types
//!
//! Errors returned synchronously by [`MediaPlayer`](crate::MediaPlayer)
//! operations. Asynchronous native failures (prepare, decode, render) are not
//! returned here; they reach the host through the error listener as a
//! `(code, extra)` pair.

use bridge_traits::error::BridgeError;
use thiserror::Error;

use crate::state::PlayerState;

/// Errors that can occur during player operations.
#[derive(Error, Debug)]
pub enum PlayerError {
    /// Operation is not legal in the current lifecycle state.
    #[error("{operation} is not allowed in state {state}")]
    InvalidState {
        operation: &'static str,
        state: PlayerState,
    },

    /// The session was released; nothing further can be done with it.
    #[error("Player has been released")]
    Released,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A synchronous native call failed.
    #[error("Native error: code={code}, extra={extra}")]
    Native { code: i32, extra: i32 },

    /// No async runtime was available to run background work on.
    #[error("No async runtime available; construct the player inside a runtime or pass a handle")]
    RuntimeUnavailable,

    #[error("Invalid player configuration: {0}")]
    Config(#[from] core_runtime::Error),

    #[error("Bridge error: {0}")]
    Bridge(#[source] BridgeError),
}

impl From<BridgeError> for PlayerError {
    fn from(error: BridgeError) -> Self {
        match error {
            BridgeError::Native { code, extra } => PlayerError::Native { code, extra },
            other => PlayerError::Bridge(other),
        }
    }
}

impl PlayerError {
    /// Returns `true` when the operation was rejected because of the
    /// lifecycle state (including after release).
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, PlayerError::InvalidState { .. } | PlayerError::Released)
    }

    /// Returns `true` when the native layer reported the failure.
    pub fn is_native(&self) -> bool {
        matches!(self, PlayerError::Native { .. } | PlayerError::Bridge(_))
    }

    /// The `(code, extra)` pair for native failures.
    pub fn native_code(&self) -> Option<(i32, i32)> {
        match self {
            PlayerError::Native { code, extra } => Some((*code, *extra)),
            PlayerError::Bridge(error) => Some(error.code_pair()),
            _ => None,
        }
    }
}

/// Result type for player operations.
pub type Result<T> = std::result::Result<T, PlayerError>;
