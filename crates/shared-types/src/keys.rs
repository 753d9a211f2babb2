//! Public key identities.
//!
//! Every party, feed, and member is identified by an opaque 32-byte public
//! key. Keys are comparable, hashable, and orderable so they can index maps
//! with a deterministic iteration order.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque 32-byte public identity.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PublicKey([u8; 32]);

/// Identifies a party (the trust domain spanning multiple feeds).
pub type PartyKey = PublicKey;

/// Identifies one append-only, single-writer log.
pub type FeedKey = PublicKey;

/// Identifies a member (a key admitted to a party).
pub type IdentityKey = PublicKey;

impl PublicKey {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Generate a random key. Intended for tests and for minting fresh
    /// identities where no keypair is required.
    pub fn random() -> Self {
        Self(rand::random())
    }

    /// Short hex form used in logs.
    pub fn short(&self) -> String {
        let mut s = String::with_capacity(8);
        for byte in &self.0[..4] {
            s.push_str(&format!("{byte:02x}"));
        }
        s
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}..)", self.short())
    }
}

impl From<[u8; 32]> for PublicKey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}
