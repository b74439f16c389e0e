//! Randomness helpers

use crate::types::{Nonce96, SecretBytes};
use rand::{rngs::OsRng, RngCore};

/// Generate a random 96-bit nonce for AES-GCM
pub fn generate_nonce() -> Nonce96 {
    let mut nonce = Nonce96::default();
    OsRng.fill_bytes(nonce.as_mut_slice());
    nonce
}

/// Fill a fresh buffer with `len` random bytes
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    OsRng.fill_bytes(&mut out);
    out
}

/// Generate a random secret of `len` bytes
pub fn random_secret(len: usize) -> SecretBytes {
    SecretBytes::new(random_bytes(len))
}
