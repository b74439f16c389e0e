//! ECDSA signatures over P-256 with SHA-256

use crate::types::KeyError;
use p256::ecdsa::signature::{Signer as _, Verifier as _};
use p256::ecdsa::{DerSignature, Signature, SigningKey, VerifyingKey};
use p256::SecretKey;

/// Signs data with a P-256 private key, producing DER encoded signatures
pub struct Signer {
    signing_key: SigningKey,
}

impl Signer {
    pub fn new(private_key: &[u8]) -> Result<Self, KeyError> {
        let secret = SecretKey::from_slice(private_key)
            .map_err(|_| KeyError::InvalidEncoding("not a P-256 private scalar".into()))?;
        Ok(Self {
            signing_key: SigningKey::from(secret),
        })
    }

    pub fn sign(&self, data: &[u8]) -> Vec<u8> {
        let signature: DerSignature = self.signing_key.sign(data);
        signature.as_bytes().to_vec()
    }

    /// Verify a DER signature against an SEC1 encoded public key
    ///
    /// Malformed keys and signatures verify as `false`.
    pub fn verify(data: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_sec1_bytes(public_key) else {
            return false;
        };
        let Ok(signature) = Signature::from_der(signature) else {
            return false;
        };
        verifying_key.verify(data, &signature).is_ok()
    }
}
