//! CMS Envelope Cryptographic Operations
//!
//! This crate provides the cryptographic engines used by the envelope:
//! - [`SymmetricCipher`]: AES-256-GCM and AES-256-CBC with incremental processing
//! - [`EcdhKem`]: key transport to P-256 recipients (ECDH + HKDF + AES-GCM)
//! - [`PasswordCipher`]: PBKDF2 based key wrapping for password recipients
//! - [`Hash`] and [`Signer`]: digests, HMAC and ECDSA signatures
//!
//! # Security Features
//!
//! - **Zeroization**: All key material uses `zeroize` to clear memory on drop
//! - **Constant-time comparison**: MAC verification uses `subtle::ConstantTimeEq`
//!
//! # Example
//!
//! ```
//! use cmsenvelope_crypto::{EcdhKem, KeyEncapsulation, KeyPair};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let recipient = KeyPair::generate();
//! let kem = EcdhKem;
//!
//! let wrapped = kem.wrap(&[7u8; 32], recipient.public_key())?;
//! let key = kem.unwrap(&wrapped, recipient.private_key().as_slice())?;
//! assert_eq!(key, vec![7u8; 32]);
//! # Ok(())
//! # }
//! ```

pub mod hash;
pub mod helpers;
pub mod kem;
pub mod keypair;
pub mod pbe;
pub mod signer;
pub mod symmetric;
pub mod types;

// Re-export commonly used types
pub use hash::{Hash, HashAlgorithm, HashError};
pub use helpers::{generate_nonce, random_bytes, random_secret};
pub use kem::ec::EcdhKem;
pub use kem::{KemError, KeyEncapsulation};
pub use keypair::KeyPair;
pub use pbe::{PasswordCipher, PasswordWrapped, PbeError};
pub use signer::Signer;
pub use symmetric::{Direction, Padding, SymmetricAlgorithm, SymmetricCipher, SymmetricError};
pub use types::{KeyError, Nonce96, SecretBytes};
