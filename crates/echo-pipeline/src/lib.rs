//! # ECHO Pipeline Crate
//!
//! The causal multi-feed ordering core. Entries arrive on an unbounded,
//! dynamically growing set of single-writer feeds in arbitrary order; the
//! pipeline re-presents them as one totally ordered stream per party that
//! respects both trust-bootstrap ordering (genesis before everything) and
//! causal completeness (an entry is held back until every `(feed, seq)` pair
//! in its declared timeframe has been delivered).
//!
//! ## Architecture
//!
//! - [`TimeframeClock`]: the party's local delivery clock, split into a
//!   pending frame (advances on delivery) and a committed frame (advances
//!   after dispatch, drives barriers).
//! - [`MessageSelector`] / [`TrustAwareSelector`]: the eligibility policy
//!   applied to the head entry of every tracked feed.
//! - [`FeedSetIterator`]: the pull loop that scans candidates, stalls
//!   observably when nothing is eligible, and grows its feed set live.
//! - [`Pipeline`]: the per-party orchestrator wiring the iterator to the
//!   trust processor and the external mutation sink.

pub mod clock;
pub mod config;
pub mod errors;
pub mod iterator;
pub mod pipeline;
pub mod selector;

pub use clock::TimeframeClock;
pub use config::PipelineConfig;
pub use errors::{PipelineError, SinkError};
pub use iterator::{FeedSetHandle, FeedSetIterator, StallDiagnostics};
pub use pipeline::{MutationRecord, MutationSink, PartySnapshot, Pipeline, PipelineEvent};
pub use selector::{Candidate, MessageSelector, TrustAwareSelector};
