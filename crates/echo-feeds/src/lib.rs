//! # ECHO Feeds Crate
//!
//! Open feed handles and per-party feed bookkeeping:
//!
//! - [`Feed`]: an open handle over one append-only, single-writer log.
//! - [`FeedStore`]: the keyed collection of open handles.
//! - [`PartyFeedProvider`]: per-party provisioning; creates or reopens the
//!   local writable feed, lazily opens remote feeds on admission, and exposes
//!   feed-set growth to the merge iterator.
//! - [`MetadataStore`]: the durable, restart-surviving cache of per-party
//!   feed records. A cache only; the feeds themselves stay the ground truth.

pub mod errors;
pub mod feed;
pub mod metadata;
pub mod provider;
pub mod store;

pub use errors::{FeedError, MetadataError, ProviderError};
pub use feed::Feed;
pub use metadata::{MetadataStore, PartyFeedRecord, STORAGE_VERSION};
pub use provider::PartyFeedProvider;
pub use store::FeedStore;
