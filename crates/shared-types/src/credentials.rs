//! Credentials: signed admission statements written to feeds.
//!
//! Trust in a party is established purely by reading credentials off the
//! feeds. The acceptance policy (is the signer chain rooted in an
//! already-trusted key) lives in the `halo-trust` crate; signature and chain
//! verification live in `shared-crypto`. This module only defines the data.

use crate::keys::{FeedKey, IdentityKey, PartyKey, PublicKey};
use serde::{Deserialize, Serialize};

/// A tagged admission statement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Credential {
    /// The start-of-authority for a party: establishes the party key, the
    /// first trusted feed, and the first trusted member in one statement.
    PartyGenesis {
        party_key: PartyKey,
        feed_key: FeedKey,
        identity_key: IdentityKey,
    },

    /// Admits a key as a member of the party.
    KeyAdmit {
        party_key: PartyKey,
        admit_key: IdentityKey,
    },

    /// Admits a feed and records its owning member.
    FeedAdmit {
        party_key: PartyKey,
        feed_key: FeedKey,
        identity_key: IdentityKey,
    },

    /// Attaches descriptive info to an already-admitted member.
    IdentityInfo {
        identity_key: IdentityKey,
        display_name: String,
    },

    /// Peer authentication. Does not change membership, but may carry the
    /// authenticating peer's feed so it can be admitted lazily.
    Auth {
        party_key: PartyKey,
        identity_key: IdentityKey,
        feed_key: Option<FeedKey>,
    },
}

impl Credential {
    /// The party this credential addresses, if it names one.
    pub fn party_key(&self) -> Option<&PartyKey> {
        match self {
            Credential::PartyGenesis { party_key, .. }
            | Credential::KeyAdmit { party_key, .. }
            | Credential::FeedAdmit { party_key, .. }
            | Credential::Auth { party_key, .. } => Some(party_key),
            Credential::IdentityInfo { .. } => None,
        }
    }

    pub fn is_genesis(&self) -> bool {
        matches!(self, Credential::PartyGenesis { .. })
    }
}

/// One link of a signer chain: `issuer` vouches for `subject` by signing the
/// subject's key bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDelegation {
    pub subject: PublicKey,
    pub issuer: PublicKey,
    /// Raw ed25519 signature bytes; length is validated at verify time.
    pub signature: Vec<u8>,
}

/// Signature over a credential, plus the delegation chain connecting the
/// leaf signer to some (hopefully trusted) root key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureProof {
    /// The key that signed the credential bytes.
    pub signer: PublicKey,
    /// Raw ed25519 signature bytes; length is validated at verify time.
    pub signature: Vec<u8>,
    /// Delegations ordered leaf-first: `chain[0].subject == signer`.
    pub chain: Vec<KeyDelegation>,
}

/// A credential together with its signature proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedCredential {
    pub credential: Credential,
    pub proof: SignatureProof,
}
