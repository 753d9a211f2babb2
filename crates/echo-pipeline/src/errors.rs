//! Error types for the pipeline orchestrator.

use thiserror::Error;

/// Error returned by the external mutation sink.
#[derive(Debug, Error)]
#[error("Mutation sink failed: {0}")]
pub struct SinkError(pub String);

#[derive(Debug, Error)]
pub enum PipelineError {
    /// `open` was called on an already-open pipeline.
    #[error("Pipeline is already open")]
    AlreadyOpen,

    /// Snapshot restore is only valid before the pipeline is opened.
    #[error("Pipeline is open; restore must happen before open")]
    RestoreWhileOpen,

    /// No writable feed has been set.
    #[error("Pipeline has no write feed")]
    NotWritable,

    #[error(transparent)]
    Feed(#[from] echo_feeds::FeedError),

    #[error(transparent)]
    Provider(#[from] echo_feeds::ProviderError),

    #[error(transparent)]
    Trust(#[from] halo_trust::TrustError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}
