use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    /// A query was made before `set_data_source`.
    #[error("No data source set")]
    NotInitialized,

    #[error("Invalid data source: {0}")]
    InvalidSource(String),

    #[error("Failed to extract metadata: {0}")]
    ExtractionFailed(String),

    #[error("Retriever has been released")]
    Released,

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MetadataError>;
