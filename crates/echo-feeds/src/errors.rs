//! Error types for feed handling and metadata persistence.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    /// Append was attempted on a feed opened read-only.
    #[error("Feed {0} is not writable")]
    ReadOnly(String),
}

#[derive(Debug, Error)]
pub enum MetadataError {
    /// Saving the backing file failed. Load-side corruption is not an
    /// error: the store falls back to empty state instead.
    #[error("Metadata I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Metadata encoding failed: {0}")]
    Encode(String),
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),
}
