//! Error types for credential signing and verification.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    /// No secret key material is held for the requested signer.
    #[error("Unknown signing key: {0}")]
    UnknownSigningKey(String),

    /// The credential could not be serialized into its signing byte image.
    #[error("Failed to encode credential for signing: {0}")]
    EncodeFailed(String),
}
