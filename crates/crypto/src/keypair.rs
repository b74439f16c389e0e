//! P-256 key pairs for key transport recipients

use crate::types::{KeyError, SecretBytes};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::SecretKey;
use rand::rngs::OsRng;

/// NIST P-256 key pair
///
/// The public key is kept as an uncompressed SEC1 point and the private key
/// as the raw 32-byte scalar.
#[derive(Clone)]
pub struct KeyPair {
    public_key: Vec<u8>,
    private_key: SecretBytes,
}

impl KeyPair {
    pub fn generate() -> Self {
        Self::from_secret(&SecretKey::random(&mut OsRng))
    }

    /// Rebuild a key pair from its private scalar
    pub fn from_private_key(private_key: &[u8]) -> Result<Self, KeyError> {
        let secret = SecretKey::from_slice(private_key)
            .map_err(|_| KeyError::InvalidEncoding("not a P-256 private scalar".into()))?;
        Ok(Self::from_secret(&secret))
    }

    fn from_secret(secret: &SecretKey) -> Self {
        Self {
            public_key: secret.public_key().to_encoded_point(false).as_bytes().to_vec(),
            private_key: SecretBytes::from_slice(secret.to_bytes().as_slice()),
        }
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    pub fn private_key(&self) -> &SecretBytes {
        &self.private_key
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key_len", &self.public_key.len())
            .field("private_key", &self.private_key)
            .finish()
    }
}
