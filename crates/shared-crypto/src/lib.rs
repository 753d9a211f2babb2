//! # Shared Crypto Crate
//!
//! Ed25519 signing and verification for HALO credentials.
//!
//! The trust *policy* (is a signer chain rooted in an admitted key) lives in
//! `halo-trust`; this crate only answers the mechanical questions: does this
//! signature verify, and which keys does this proof's chain pass through.

pub mod errors;
pub mod keyring;
pub mod verify;

pub use errors::CryptoError;
pub use keyring::Keyring;
pub use verify::{resolve_signer_chain, verify_credential};
