//! In-memory keyring: generates keypairs and signs credentials.
//!
//! The keyring is the only holder of secret key material. Everything else in
//! the pipeline works with public keys alone.

use crate::errors::CryptoError;
use ed25519_dalek::{Signer, SigningKey};
use parking_lot::RwLock;
use shared_types::{Credential, KeyDelegation, PublicKey, SignatureProof, SignedCredential};
use std::collections::HashMap;
use zeroize::Zeroize;

/// Byte image that gets signed for a credential.
pub(crate) fn credential_bytes(credential: &Credential) -> Result<Vec<u8>, CryptoError> {
    bincode::serialize(credential).map_err(|err| CryptoError::EncodeFailed(err.to_string()))
}

/// Holds secret keys and produces signed credentials and delegations.
#[derive(Default)]
pub struct Keyring {
    keys: RwLock<HashMap<PublicKey, SigningKey>>,
}

impl Keyring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a fresh keypair and return its public key.
    pub fn generate(&self) -> PublicKey {
        let signing_key = SigningKey::generate(&mut rand::thread_rng());
        let public_key = PublicKey::from_bytes(signing_key.verifying_key().to_bytes());
        self.keys.write().insert(public_key, signing_key);
        public_key
    }

    /// Import a keypair from a 32-byte seed. The seed is zeroized after use.
    pub fn import_seed(&self, mut seed: [u8; 32]) -> PublicKey {
        let signing_key = SigningKey::from_bytes(&seed);
        seed.zeroize();
        let public_key = PublicKey::from_bytes(signing_key.verifying_key().to_bytes());
        self.keys.write().insert(public_key, signing_key);
        public_key
    }

    /// Whether secret material is held for this public key.
    pub fn has_secret(&self, public_key: &PublicKey) -> bool {
        self.keys.read().contains_key(public_key)
    }

    fn sign_raw(&self, message: &[u8], signer: &PublicKey) -> Result<Vec<u8>, CryptoError> {
        let keys = self.keys.read();
        let signing_key = keys
            .get(signer)
            .ok_or_else(|| CryptoError::UnknownSigningKey(signer.short()))?;
        Ok(signing_key.sign(message).to_bytes().to_vec())
    }

    /// Sign a credential directly with `signer` (no delegation chain).
    pub fn sign_credential(
        &self,
        credential: Credential,
        signer: &PublicKey,
    ) -> Result<SignedCredential, CryptoError> {
        self.sign_credential_with_chain(credential, signer, Vec::new())
    }

    /// Sign a credential with `signer`, attaching a delegation chain that
    /// connects the signer to some root key. `chain[0].subject` must equal
    /// `signer` for the proof to verify.
    pub fn sign_credential_with_chain(
        &self,
        credential: Credential,
        signer: &PublicKey,
        chain: Vec<KeyDelegation>,
    ) -> Result<SignedCredential, CryptoError> {
        let bytes = credential_bytes(&credential)?;
        let signature = self.sign_raw(&bytes, signer)?;
        Ok(SignedCredential {
            credential,
            proof: SignatureProof {
                signer: *signer,
                signature,
                chain,
            },
        })
    }

    /// Issue a delegation: `issuer` vouches for `subject` by signing the
    /// subject's key bytes.
    pub fn delegate(
        &self,
        subject: &PublicKey,
        issuer: &PublicKey,
    ) -> Result<KeyDelegation, CryptoError> {
        let signature = self.sign_raw(subject.as_bytes(), issuer)?;
        Ok(KeyDelegation {
            subject: *subject,
            issuer: *issuer,
            signature,
        })
    }
}
