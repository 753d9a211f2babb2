//! The party trust state reducer.
//!
//! State is derived purely from signed credentials read off the feeds and
//! only ever grows: members and feeds are admitted, never revoked.

use crate::errors::RejectReason;
use crate::events::TrustEvent;
use serde::{Deserialize, Serialize};
use shared_crypto::{resolve_signer_chain, verify_credential};
use shared_types::{Credential, FeedKey, IdentityKey, PartyKey, SignedCredential};
use std::collections::BTreeMap;
use tracing::debug;

/// An admitted member and its optional descriptive info.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInfo {
    pub identity: IdentityKey,
    pub display_name: Option<String>,
}

/// An admitted feed. The owner is immutable once recorded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedAdmission {
    pub feed_key: FeedKey,
    pub owner: IdentityKey,
}

/// Current trust state of one party: genesis, members, admitted feeds.
///
/// `apply` is a reducer: it mutates the state and returns the admission
/// events produced, or a non-fatal rejection. Applying the same credential
/// sequence always produces the same state, which is what makes snapshots
/// replayable.
#[derive(Clone, Debug)]
pub struct PartyTrustState {
    party_key: PartyKey,
    genesis: Option<SignedCredential>,
    members: BTreeMap<IdentityKey, MemberInfo>,
    feeds: BTreeMap<FeedKey, FeedAdmission>,
}

impl PartyTrustState {
    pub fn new(party_key: PartyKey) -> Self {
        Self {
            party_key,
            genesis: None,
            members: BTreeMap::new(),
            feeds: BTreeMap::new(),
        }
    }

    pub fn party_key(&self) -> &PartyKey {
        &self.party_key
    }

    /// Presence of the genesis credential gates all other processing.
    pub fn genesis_found(&self) -> bool {
        self.genesis.is_some()
    }

    pub fn genesis_credential(&self) -> Option<&SignedCredential> {
        self.genesis.as_ref()
    }

    pub fn is_member(&self, identity: &IdentityKey) -> bool {
        self.members.contains_key(identity)
    }

    pub fn member_keys(&self) -> Vec<IdentityKey> {
        self.members.keys().copied().collect()
    }

    pub fn member_info(&self, identity: &IdentityKey) -> Option<&MemberInfo> {
        self.members.get(identity)
    }

    pub fn feed_keys(&self) -> Vec<FeedKey> {
        self.feeds.keys().copied().collect()
    }

    pub fn is_feed_admitted(&self, feed_key: &FeedKey) -> bool {
        self.feeds.contains_key(feed_key)
    }

    /// The member that owns a feed, once its admission has been processed.
    pub fn feed_owner(&self, feed_key: &FeedKey) -> Option<IdentityKey> {
        self.feeds.get(feed_key).map(|admission| admission.owner)
    }

    /// True when nothing has been applied yet.
    pub fn is_pristine(&self) -> bool {
        self.genesis.is_none() && self.members.is_empty() && self.feeds.is_empty()
    }

    /// Apply one signed credential.
    ///
    /// The acceptance policy:
    /// 1. Before genesis, only the party's own genesis credential applies.
    /// 2. After genesis, the signer chain must pass through an admitted key
    ///    (or the party key itself).
    /// 3. Feed re-admission is idempotent: no state change, no event.
    pub fn apply(&mut self, message: &SignedCredential) -> Result<Vec<TrustEvent>, RejectReason> {
        if !verify_credential(message) {
            return Err(RejectReason::BadSignature);
        }

        if self.genesis.is_none() {
            return match &message.credential {
                Credential::PartyGenesis { .. } => self.apply_genesis(message),
                _ => Err(RejectReason::GenesisRequired),
            };
        }

        self.check_party(&message.credential)?;

        match &message.credential {
            Credential::PartyGenesis { .. } => {
                // Replays of the same genesis are no-ops.
                if self.genesis.as_ref() == Some(message) {
                    Ok(Vec::new())
                } else {
                    Err(RejectReason::GenesisAlreadyFound)
                }
            }

            Credential::KeyAdmit { admit_key, .. } => {
                self.check_trusted_signer(message)?;
                Ok(self.admit_member(*admit_key, None))
            }

            Credential::FeedAdmit {
                feed_key,
                identity_key,
                ..
            } => {
                self.check_trusted_signer(message)?;
                Ok(self.admit_feed(*feed_key, *identity_key))
            }

            Credential::IdentityInfo {
                identity_key,
                display_name,
            } => {
                self.check_trusted_signer(message)?;
                let Some(member) = self.members.get_mut(identity_key) else {
                    return Err(RejectReason::UnknownIdentity);
                };
                member.display_name = Some(display_name.clone());
                Ok(vec![TrustEvent::MemberInfoUpdated {
                    identity: *identity_key,
                    display_name: display_name.clone(),
                }])
            }

            Credential::Auth {
                identity_key,
                feed_key,
                ..
            } => {
                self.check_trusted_signer(message)?;
                // Auth never changes membership, but it bridges into feed
                // admission for the authenticating peer's declared feed.
                match feed_key {
                    Some(feed_key) if !self.feeds.contains_key(feed_key) => {
                        Ok(self.admit_feed(*feed_key, *identity_key))
                    }
                    _ => Ok(Vec::new()),
                }
            }
        }
    }

    fn apply_genesis(&mut self, message: &SignedCredential) -> Result<Vec<TrustEvent>, RejectReason> {
        let Credential::PartyGenesis {
            party_key,
            feed_key,
            identity_key,
        } = &message.credential
        else {
            unreachable!("caller matched PartyGenesis");
        };

        if *party_key != self.party_key {
            return Err(RejectReason::PartyMismatch);
        }

        // The genesis is the root of authority: it must be signed by the
        // party key itself, there is nothing else to trust yet.
        let chain = resolve_signer_chain(message);
        if !chain.contains(&self.party_key) {
            return Err(RejectReason::UntrustedSigner);
        }

        debug!(party = %self.party_key.short(), feed = %feed_key.short(), "genesis found");
        self.genesis = Some(message.clone());

        let mut events = self.admit_member(*identity_key, None);
        events.extend(self.admit_feed(*feed_key, *identity_key));
        Ok(events)
    }

    fn check_party(&self, credential: &Credential) -> Result<(), RejectReason> {
        match credential.party_key() {
            Some(party_key) if *party_key != self.party_key => Err(RejectReason::PartyMismatch),
            _ => Ok(()),
        }
    }

    /// The chain must pass through an admitted member key or the party key.
    fn check_trusted_signer(&self, message: &SignedCredential) -> Result<(), RejectReason> {
        let chain = resolve_signer_chain(message);
        let trusted = chain
            .iter()
            .any(|key| self.members.contains_key(key) || *key == self.party_key);
        if trusted {
            Ok(())
        } else {
            Err(RejectReason::UntrustedSigner)
        }
    }

    fn admit_member(&mut self, identity: IdentityKey, display_name: Option<String>) -> Vec<TrustEvent> {
        if self.members.contains_key(&identity) {
            return Vec::new();
        }
        self.members.insert(
            identity,
            MemberInfo {
                identity,
                display_name: display_name.clone(),
            },
        );
        debug!(identity = %identity.short(), "member admitted");
        vec![TrustEvent::MemberAdmitted {
            identity,
            display_name,
        }]
    }

    fn admit_feed(&mut self, feed_key: FeedKey, owner: IdentityKey) -> Vec<TrustEvent> {
        if self.feeds.contains_key(&feed_key) {
            // Re-admission is a no-op, not a conflict; the first recorded
            // owner stands.
            return Vec::new();
        }
        self.feeds.insert(feed_key, FeedAdmission { feed_key, owner });
        debug!(feed = %feed_key.short(), owner = %owner.short(), "feed admitted");
        vec![TrustEvent::FeedAdmitted { feed_key, owner }]
    }
}
