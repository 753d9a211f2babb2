//! # Shared Types Crate
//!
//! This crate contains the domain types shared between the HALO (trust) and
//! ECHO (data) subsystems:
//!
//! - **Keys**: opaque public identities for parties, feeds, and members.
//! - **Timeframe**: the vector clock mapping feed keys to consumed sequence
//!   numbers; the causal-dependency metadata carried by every data entry.
//! - **Credentials**: the tagged admission statements written to feeds.
//! - **Feed messages**: the wire union (`halo` | `echo`) stored in feeds.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: all cross-crate types are defined here.
//! - **Value semantics**: timeframes and credentials are immutable values;
//!   operations return fresh values rather than mutating in place.

pub mod credentials;
pub mod feed_message;
pub mod keys;
pub mod timeframe;

pub use credentials::{Credential, KeyDelegation, SignatureProof, SignedCredential};
pub use feed_message::{EchoPayload, FeedMessage, FeedMessageBlock, FeedPayload};
pub use keys::{FeedKey, IdentityKey, PartyKey, PublicKey};
pub use timeframe::Timeframe;
