//! Password based key wrapping
//!
//! The content key is wrapped with AES-256-GCM under a key derived from the
//! password with PBKDF2-HMAC-SHA256.
//!
//! ```text
//! PBKDF2-params ::= SEQUENCE {
//!     salt            OCTET STRING,
//!     iterationCount  INTEGER,
//!     prf             AlgorithmIdentifier   -- hmacWithSHA256
//! }
//! ```

use crate::helpers::random_bytes;
use crate::symmetric::{SymmetricAlgorithm, SymmetricCipher, SymmetricError};
use crate::types::SecretBytes;
use cmsenvelope_protocol::asn1::oid::known;
use cmsenvelope_protocol::{AlgorithmIdentifier, Asn1Compatible, Asn1Error, Asn1Reader, Asn1Writer};
use sha2::Sha256;
use thiserror::Error;
use tracing::debug;
use zeroize::Zeroizing;

pub const MIN_ITERATIONS: u32 = 1024;
pub const DEFAULT_ITERATIONS: u32 = 2048;
const SALT_LENGTH: usize = 16;
const KEK_LENGTH: usize = 32;

#[derive(Debug, Error)]
pub enum PbeError {
    #[error("Iteration count {0} is below the minimum of 1024")]
    TooFewIterations(u32),

    #[error("Password is empty")]
    EmptyPassword,

    #[error("Unsupported key derivation: {0}")]
    UnsupportedKdf(String),

    #[error("Key derivation parameters are missing")]
    MissingKdf,

    #[error("Invalid key derivation parameters: {0}")]
    InvalidParams(#[from] Asn1Error),

    #[error("Key encryption failed: {0}")]
    Cipher(#[from] SymmetricError),
}

/// Output of [`PasswordCipher::wrap`]
#[derive(Debug, Clone)]
pub struct PasswordWrapped {
    pub key_derivation_algorithm: AlgorithmIdentifier,
    pub key_encryption_algorithm: AlgorithmIdentifier,
    pub encrypted_key: Vec<u8>,
}

#[derive(Debug, Clone, Copy)]
pub struct PasswordCipher {
    iterations: u32,
}

impl Default for PasswordCipher {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

impl PasswordCipher {
    pub fn new(iterations: u32) -> Result<Self, PbeError> {
        if iterations < MIN_ITERATIONS {
            return Err(PbeError::TooFewIterations(iterations));
        }
        Ok(Self { iterations })
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Wrap `key` under `password` with a fresh salt and IV
    pub fn wrap(&self, key: &[u8], password: &[u8]) -> Result<PasswordWrapped, PbeError> {
        if password.is_empty() {
            return Err(PbeError::EmptyPassword);
        }
        let salt = random_bytes(SALT_LENGTH);
        let kek = derive_kek(password, &salt, self.iterations);

        let mut cipher = SymmetricCipher::new(SymmetricAlgorithm::Aes256Gcm);
        cipher.set_encryption_key(kek.as_ref())?;
        cipher.set_iv(&random_bytes(cipher.iv_size()))?;
        let encrypted_key = cipher.process(key)?;

        debug!(iterations = self.iterations, "Wrapped key with password");
        Ok(PasswordWrapped {
            key_derivation_algorithm: pbkdf2_algorithm(&salt, self.iterations)?,
            key_encryption_algorithm: cipher.algorithm_identifier()?,
            encrypted_key,
        })
    }

    /// Recover a key wrapped by [`wrap`](Self::wrap)
    ///
    /// A wrong password surfaces as [`SymmetricError::AuthenticationFailed`].
    pub fn unwrap(
        &self,
        key_derivation_algorithm: Option<&AlgorithmIdentifier>,
        key_encryption_algorithm: &AlgorithmIdentifier,
        encrypted_key: &[u8],
        password: &[u8],
    ) -> Result<SecretBytes, PbeError> {
        let kdf = key_derivation_algorithm.ok_or(PbeError::MissingKdf)?;
        let (salt, iterations) = parse_pbkdf2_algorithm(kdf)?;
        let kek = derive_kek(password, &salt, iterations);

        let mut cipher = SymmetricCipher::from_algorithm_identifier(key_encryption_algorithm)?;
        cipher.set_decryption_key(kek.as_ref())?;
        Ok(SecretBytes::new(cipher.process(encrypted_key)?))
    }
}

fn derive_kek(password: &[u8], salt: &[u8], iterations: u32) -> Zeroizing<[u8; KEK_LENGTH]> {
    let mut kek = Zeroizing::new([0u8; KEK_LENGTH]);
    pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, iterations, kek.as_mut());
    kek
}

fn pbkdf2_algorithm(salt: &[u8], iterations: u32) -> Result<AlgorithmIdentifier, Asn1Error> {
    let iterations = i32::try_from(iterations)
        .map_err(|_| Asn1Error::InvalidArgument(format!("iteration count {}", iterations)))?;
    let mut writer = Asn1Writer::new();
    let mut len = AlgorithmIdentifier::new(known::hmac_with_sha256(), None).asn1_write(&mut writer)?;
    len += writer.write_integer(iterations)?;
    len += writer.write_octet_string(salt)?;
    writer.write_sequence(len)?;
    Ok(AlgorithmIdentifier::new(known::pbkdf2(), Some(writer.finish()?)))
}

fn parse_pbkdf2_algorithm(alg: &AlgorithmIdentifier) -> Result<(Vec<u8>, u32), PbeError> {
    if alg.oid != known::pbkdf2() {
        return Err(PbeError::UnsupportedKdf(alg.oid.to_string()));
    }
    let params = alg.params.as_deref().ok_or(PbeError::MissingKdf)?;
    let mut reader = Asn1Reader::new(params);
    reader.read_sequence()?;
    let salt = reader.read_octet_string()?;
    let iterations = reader.read_integer()?;
    let prf = AlgorithmIdentifier::asn1_read(&mut reader)?;
    if prf.oid != known::hmac_with_sha256() {
        return Err(PbeError::UnsupportedKdf(format!("PBKDF2 with {}", prf.oid)));
    }
    let iterations = u32::try_from(iterations)
        .ok()
        .filter(|i| *i >= MIN_ITERATIONS)
        .ok_or_else(|| {
            PbeError::InvalidParams(Asn1Error::InvalidValue {
                kind: "PBKDF2-params",
                reason: format!("iteration count {}", iterations),
            })
        })?;
    Ok((salt, iterations))
}
