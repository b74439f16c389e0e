//! Key Encapsulation Mechanisms (KEM)
//!
//! Abstractions for wrapping the content key to a recipient's public key.

use thiserror::Error;

pub mod ec;

/// KEM-related errors
#[derive(Debug, Error)]
pub enum KemError {
    #[error("Key wrapping failed: {0}")]
    WrapError(String),

    #[error("Key unwrapping failed: {0}")]
    UnwrapError(String),

    #[error("Invalid public key")]
    InvalidPublicKey,

    #[error("Invalid private key")]
    InvalidPrivateKey,

    #[error("Key derivation failed")]
    KeyDerivationFailed,

    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}

/// Trait for key encapsulation mechanisms
pub trait KeyEncapsulation {
    /// Public key type
    type PublicKey: ?Sized;

    /// Private key type
    type PrivateKey: ?Sized;

    /// Wrapped key type (ciphertext)
    type WrappedKey: AsRef<[u8]>;

    /// Wrap a symmetric key with a public key
    fn wrap(&self, key: &[u8], public_key: &Self::PublicKey) -> Result<Self::WrappedKey, KemError>;

    /// Unwrap a symmetric key with a private key
    fn unwrap(&self, wrapped: &[u8], private_key: &Self::PrivateKey) -> Result<Vec<u8>, KemError>;
}
