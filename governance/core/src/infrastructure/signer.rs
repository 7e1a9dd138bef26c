// Copyright (c) 2026 Vorion Labs, Inc.
// SPDX-License-Identifier: AGPL-3.0
//! Ed25519 system signer for truth-chain entries and exports.
//!
//! The orchestrating platform holds one signing key per deployment; entry
//! hashes and export digests are signed so downstream auditors can verify
//! provenance without access to the live system.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand_core::OsRng;

use crate::domain::error::GovernanceError;

pub struct SystemSigner {
    signing_key: SigningKey,
}

impl SystemSigner {
    /// Generate a fresh keypair. Production deployments load the key from
    /// the platform secret store instead.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// Sign raw bytes; returns the signature hex-encoded.
    pub fn sign_hex(&self, payload: &[u8]) -> String {
        hex::encode(self.signing_key.sign(payload).to_bytes())
    }

    /// Hex-encoded public half, embedded in exports.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.signing_key.verifying_key().to_bytes())
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }
}

/// Verify a hex signature over a payload against a hex public key.
pub fn verify_hex_signature(
    payload: &[u8],
    signature_hex: &str,
    public_key_hex: &str,
) -> Result<bool, GovernanceError> {
    let key_bytes: [u8; 32] = hex::decode(public_key_hex)
        .map_err(|e| GovernanceError::Signature(e.to_string()))?
        .try_into()
        .map_err(|_| GovernanceError::Signature("public key must be 32 bytes".to_string()))?;
    let sig_bytes: [u8; 64] = hex::decode(signature_hex)
        .map_err(|e| GovernanceError::Signature(e.to_string()))?
        .try_into()
        .map_err(|_| GovernanceError::Signature("signature must be 64 bytes".to_string()))?;

    let key = VerifyingKey::from_bytes(&key_bytes)
        .map_err(|e| GovernanceError::Signature(e.to_string()))?;
    Ok(key.verify(payload, &Signature::from_bytes(&sig_bytes)).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify_round_trip() {
        let signer = SystemSigner::generate();
        let sig = signer.sign_hex(b"block-1");
        assert!(verify_hex_signature(b"block-1", &sig, &signer.public_key_hex()).unwrap());
        assert!(!verify_hex_signature(b"block-2", &sig, &signer.public_key_hex()).unwrap());
    }

    #[test]
    fn test_seeded_signer_is_deterministic() {
        let a = SystemSigner::from_seed([7u8; 32]);
        let b = SystemSigner::from_seed([7u8; 32]);
        assert_eq!(a.public_key_hex(), b.public_key_hex());
        assert_eq!(a.sign_hex(b"x"), b.sign_hex(b"x"));
    }

    #[test]
    fn test_verify_rejects_malformed_inputs() {
        let signer = SystemSigner::generate();
        let sig = signer.sign_hex(b"payload");
        assert!(verify_hex_signature(b"payload", "zz", &signer.public_key_hex()).is_err());
        assert!(verify_hex_signature(b"payload", &sig, "abcd").is_err());
    }
}
