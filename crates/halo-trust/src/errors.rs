//! Error types for the trust state machine.
//!
//! Rejections are non-fatal: a rejected credential is logged and dropped,
//! processing continues. `TrustError` variants are programming errors and
//! fail fast.

use thiserror::Error;

/// Why a credential was not applied. Never fatal to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    /// No credential other than the party genesis is applied while the
    /// genesis is absent.
    #[error("Genesis credential required before any other processing")]
    GenesisRequired,

    /// The credential names a different party.
    #[error("Credential addressed to a different party")]
    PartyMismatch,

    /// A second, different genesis arrived after one was already applied.
    #[error("Genesis already found for this party")]
    GenesisAlreadyFound,

    /// The signature or delegation chain did not verify cryptographically.
    #[error("Signature verification failed")]
    BadSignature,

    /// The signer chain does not terminate at an admitted key.
    #[error("Signer chain is not rooted in a trusted key")]
    UntrustedSigner,

    /// The credential refers to an identity that is not a member.
    #[error("Unknown identity")]
    UnknownIdentity,
}

/// Invariant violations on the processor itself.
#[derive(Debug, Error)]
pub enum TrustError {
    /// Snapshot restore is only valid as the very first operation.
    #[error("Cannot restore snapshot into a non-empty processor")]
    NotEmpty,

    /// The snapshot belongs to a different party.
    #[error("Snapshot party key does not match processor party key")]
    SnapshotPartyMismatch,
}
