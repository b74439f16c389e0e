//! Elliptic Curve Key Encapsulation
//!
//! ECDH-based key wrapping on NIST P-256.

use super::{KemError, KeyEncapsulation};
use crate::helpers::generate_nonce;
use crate::symmetric::{SymmetricAlgorithm, SymmetricCipher};
use cmsenvelope_protocol::asn1::oid::known;
use cmsenvelope_protocol::AlgorithmIdentifier;
use hkdf::Hkdf;
use p256::ecdh::EphemeralSecret;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey, SecretKey};
use rand::rngs::OsRng;
use sha2::Sha256;
use zeroize::Zeroizing;

/// Uncompressed SEC1 point length for P-256
pub const P256_PUBLIC_KEY_LENGTH: usize = 65;
const NONCE_LENGTH: usize = 12;
const TAG_LENGTH: usize = 16;
const HKDF_INFO: &[u8] = b"cms-envelope ecdh key wrap";

/// ECDH key encapsulation mechanism
///
/// # Protocol Flow
///
/// 1. Generate ephemeral EC key pair
/// 2. Perform ECDH with recipient's public key → shared secret
/// 3. Derive wrapping key using HKDF-SHA256, salted with the ephemeral public key
/// 4. Wrap the content key with AES-256-GCM
/// 5. Return ephemeral public key || nonce || wrapped key
#[derive(Debug, Default, Clone, Copy)]
pub struct EcdhKem;

impl EcdhKem {
    /// `id-ecPublicKey` with the `prime256v1` named curve
    pub fn algorithm_identifier(&self) -> Result<AlgorithmIdentifier, KemError> {
        AlgorithmIdentifier::with_oid(known::ec_public_key(), &known::prime256v1())
            .map_err(|e| KemError::EncodingError(e.to_string()))
    }

    /// Check that `alg` names this mechanism
    pub fn check_algorithm(&self, alg: &AlgorithmIdentifier) -> Result<(), KemError> {
        if alg.oid != known::ec_public_key() {
            return Err(KemError::UnsupportedAlgorithm(alg.oid.to_string()));
        }
        match alg.oid_params() {
            Ok(curve) if curve == known::prime256v1() => Ok(()),
            Ok(curve) => Err(KemError::UnsupportedAlgorithm(format!("curve {}", curve))),
            Err(e) => Err(KemError::EncodingError(e.to_string())),
        }
    }

    /// Reject anything that is not a valid SEC1 encoded P-256 point
    pub fn check_public_key(&self, public_key: &[u8]) -> Result<(), KemError> {
        PublicKey::from_sec1_bytes(public_key)
            .map(|_| ())
            .map_err(|_| KemError::InvalidPublicKey)
    }

    /// Reject anything that is not a valid P-256 private scalar
    pub fn check_private_key(&self, private_key: &[u8]) -> Result<(), KemError> {
        SecretKey::from_slice(private_key)
            .map(|_| ())
            .map_err(|_| KemError::InvalidPrivateKey)
    }

    fn wrapping_key(shared_secret: &[u8], salt: &[u8]) -> Result<Zeroizing<[u8; 32]>, KemError> {
        let hkdf = Hkdf::<Sha256>::new(Some(salt), shared_secret);
        let mut key = Zeroizing::new([0u8; 32]);
        hkdf.expand(HKDF_INFO, key.as_mut())
            .map_err(|_| KemError::KeyDerivationFailed)?;
        Ok(key)
    }
}

impl KeyEncapsulation for EcdhKem {
    type PublicKey = [u8]; // Uncompressed or compressed SEC1 point
    type PrivateKey = [u8]; // 32-byte scalar
    type WrappedKey = Vec<u8>; // Ephemeral public key || nonce || wrapped key

    fn wrap(&self, key: &[u8], public_key: &[u8]) -> Result<Vec<u8>, KemError> {
        let recipient =
            PublicKey::from_sec1_bytes(public_key).map_err(|_| KemError::InvalidPublicKey)?;

        let ephemeral = EphemeralSecret::random(&mut OsRng);
        let ephemeral_public = ephemeral.public_key().to_encoded_point(false);
        let shared = ephemeral.diffie_hellman(&recipient);
        let wrapping_key =
            Self::wrapping_key(shared.raw_secret_bytes(), ephemeral_public.as_bytes())?;

        let nonce = generate_nonce();
        let mut cipher = SymmetricCipher::new(SymmetricAlgorithm::Aes256Gcm);
        cipher
            .set_encryption_key(wrapping_key.as_ref())
            .and_then(|_| cipher.set_iv(nonce.as_slice()))
            .map_err(|e| KemError::WrapError(e.to_string()))?;
        let wrapped = cipher
            .process(key)
            .map_err(|e| KemError::WrapError(e.to_string()))?;

        let mut out = Vec::with_capacity(P256_PUBLIC_KEY_LENGTH + NONCE_LENGTH + wrapped.len());
        out.extend_from_slice(ephemeral_public.as_bytes());
        out.extend_from_slice(nonce.as_slice());
        out.extend_from_slice(&wrapped);
        Ok(out)
    }

    fn unwrap(&self, wrapped: &[u8], private_key: &[u8]) -> Result<Vec<u8>, KemError> {
        if wrapped.len() < P256_PUBLIC_KEY_LENGTH + NONCE_LENGTH + TAG_LENGTH {
            return Err(KemError::UnwrapError(format!(
                "wrapped key is too short: {} bytes",
                wrapped.len()
            )));
        }
        let secret = SecretKey::from_slice(private_key).map_err(|_| KemError::InvalidPrivateKey)?;

        let (ephemeral_bytes, rest) = wrapped.split_at(P256_PUBLIC_KEY_LENGTH);
        let (nonce, ciphertext) = rest.split_at(NONCE_LENGTH);
        let ephemeral =
            PublicKey::from_sec1_bytes(ephemeral_bytes).map_err(|_| KemError::InvalidPublicKey)?;

        let shared = p256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), ephemeral.as_affine());
        let wrapping_key = Self::wrapping_key(shared.raw_secret_bytes(), ephemeral_bytes)?;

        let mut cipher = SymmetricCipher::new(SymmetricAlgorithm::Aes256Gcm);
        cipher
            .set_decryption_key(wrapping_key.as_ref())
            .and_then(|_| cipher.set_iv(nonce))
            .map_err(|e| KemError::UnwrapError(e.to_string()))?;
        cipher
            .process(ciphertext)
            .map_err(|e| KemError::UnwrapError(e.to_string()))
    }
}
