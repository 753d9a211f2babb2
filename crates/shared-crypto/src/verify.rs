//! Signature and signer-chain verification.

use crate::keyring::credential_bytes;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use shared_types::{PublicKey, SignedCredential};

fn verify_raw(message: &[u8], signature: &[u8], public_key: &PublicKey) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(public_key.as_bytes()) else {
        return false;
    };
    // Rejects signatures that are not exactly 64 bytes.
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };
    verifying_key.verify(message, &signature).is_ok()
}

/// Verify a signed credential: the leaf signature over the credential bytes
/// plus every delegation link in the proof's chain.
///
/// Chain structure is also checked: the first link must vouch for the leaf
/// signer, and each subsequent link must vouch for the previous issuer.
/// Whether the chain terminates at a *trusted* key is the caller's policy.
pub fn verify_credential(signed: &SignedCredential) -> bool {
    let Ok(bytes) = credential_bytes(&signed.credential) else {
        return false;
    };
    if !verify_raw(&bytes, &signed.proof.signature, &signed.proof.signer) {
        return false;
    }

    let mut expected_subject = signed.proof.signer;
    for delegation in &signed.proof.chain {
        if delegation.subject != expected_subject {
            return false;
        }
        if !verify_raw(
            delegation.subject.as_bytes(),
            &delegation.signature,
            &delegation.issuer,
        ) {
            return false;
        }
        expected_subject = delegation.issuer;
    }

    true
}

/// The keys a proof's chain passes through, leaf signer first.
///
/// Does not verify anything; call [`verify_credential`] first.
pub fn resolve_signer_chain(signed: &SignedCredential) -> Vec<PublicKey> {
    let mut keys = Vec::with_capacity(1 + signed.proof.chain.len());
    keys.push(signed.proof.signer);
    for delegation in &signed.proof.chain {
        keys.push(delegation.issuer);
    }
    keys
}
