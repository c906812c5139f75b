use thiserror::Error;

use crate::native::error_codes;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// Status reported by the native decode/render layer.
    #[error("Native error: code={code}, extra={extra}")]
    Native { code: i32, extra: i32 },

    #[error("Invalid native operation: {0}")]
    InvalidOperation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    pub fn native(code: i32, extra: i32) -> Self {
        BridgeError::Native { code, extra }
    }

    /// The `(code, extra)` pair delivered to error listeners.
    ///
    /// Non-native failures collapse to [`error_codes::UNKNOWN`], with I/O
    /// failures carrying [`error_codes::IO`] as the extra detail.
    pub fn code_pair(&self) -> (i32, i32) {
        match self {
            BridgeError::Native { code, extra } => (*code, *extra),
            BridgeError::Io(_) => (error_codes::UNKNOWN, error_codes::IO),
            BridgeError::InvalidOperation(_) => (error_codes::UNKNOWN, error_codes::UNSUPPORTED),
            _ => (error_codes::UNKNOWN, 0),
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
