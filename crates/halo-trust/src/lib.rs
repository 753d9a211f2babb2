//! # HALO Trust Crate
//!
//! The credential-based trust state machine for one party.
//!
//! Trust is bootstrapped entirely from messages replicated over untrusted
//! feeds: nothing is applied until the party's genesis credential arrives,
//! and every later credential must carry a signer chain rooted in an
//! already-admitted key.
//!
//! ## Architecture
//!
//! - **State**: [`PartyTrustState`] is a pure reducer: it applies one signed
//!   credential and returns the admission events that fall out, making the
//!   whole machine trivially replayable.
//! - **Processor**: [`PartyProcessor`] owns the state plus an ordered replay
//!   log used for snapshotting, and broadcasts events to subscribers.

pub mod errors;
pub mod events;
pub mod processor;
pub mod state;

pub use errors::{RejectReason, TrustError};
pub use events::TrustEvent;
pub use processor::{PartyProcessor, ProcessorSnapshot};
pub use state::{FeedAdmission, MemberInfo, PartyTrustState};
