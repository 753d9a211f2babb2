//! Admission events emitted by the trust state machine.

use serde::{Deserialize, Serialize};
use shared_types::{FeedKey, IdentityKey};

/// Side effects of applying a credential, returned by the reducer and
/// re-broadcast by the processor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrustEvent {
    /// A new identity was admitted to the party.
    MemberAdmitted {
        identity: IdentityKey,
        display_name: Option<String>,
    },

    /// A feed was admitted, with its immutable owning member.
    FeedAdmitted {
        feed_key: FeedKey,
        owner: IdentityKey,
    },

    /// Descriptive info attached to an existing member changed.
    MemberInfoUpdated {
        identity: IdentityKey,
        display_name: String,
    },
}
