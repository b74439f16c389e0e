//! Message digests and HMAC with constant-time verification

use cmsenvelope_protocol::asn1::oid::known;
use cmsenvelope_protocol::Oid;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("Hash is not started")]
    NotStarted,

    #[error("HMAC initialization failed")]
    InitFailed,

    #[error("HMAC verification failed")]
    VerificationFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    pub fn oid(self) -> Oid {
        match self {
            HashAlgorithm::Sha256 => known::sha256(),
            HashAlgorithm::Sha384 => known::sha384(),
            HashAlgorithm::Sha512 => known::sha512(),
        }
    }

    pub fn digest_length(self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }
}

enum State {
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
    Hmac256(Hmac<Sha256>),
    Hmac384(Hmac<Sha384>),
    Hmac512(Hmac<Sha512>),
}

/// Incremental digest or HMAC computation
///
/// `start` (or `hmac_start`) must precede `update` and `finish`. `finish`
/// consumes the running state, so a new computation needs another start.
pub struct Hash {
    algorithm: HashAlgorithm,
    state: Option<State>,
}

impl Hash {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            state: None,
        }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// One-shot digest
    pub fn hash(algorithm: HashAlgorithm, data: &[u8]) -> Vec<u8> {
        match algorithm {
            HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            HashAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    pub fn start(&mut self) {
        self.state = Some(match self.algorithm {
            HashAlgorithm::Sha256 => State::Sha256(Sha256::new()),
            HashAlgorithm::Sha384 => State::Sha384(Sha384::new()),
            HashAlgorithm::Sha512 => State::Sha512(Sha512::new()),
        });
    }

    pub fn hmac_start(&mut self, key: &[u8]) -> Result<(), HashError> {
        let state = match self.algorithm {
            HashAlgorithm::Sha256 => State::Hmac256(
                Hmac::<Sha256>::new_from_slice(key).map_err(|_| HashError::InitFailed)?,
            ),
            HashAlgorithm::Sha384 => State::Hmac384(
                Hmac::<Sha384>::new_from_slice(key).map_err(|_| HashError::InitFailed)?,
            ),
            HashAlgorithm::Sha512 => State::Hmac512(
                Hmac::<Sha512>::new_from_slice(key).map_err(|_| HashError::InitFailed)?,
            ),
        };
        self.state = Some(state);
        Ok(())
    }

    pub fn update(&mut self, data: &[u8]) -> Result<(), HashError> {
        match self.state.as_mut().ok_or(HashError::NotStarted)? {
            State::Sha256(h) => Digest::update(h, data),
            State::Sha384(h) => Digest::update(h, data),
            State::Sha512(h) => Digest::update(h, data),
            State::Hmac256(m) => Mac::update(m, data),
            State::Hmac384(m) => Mac::update(m, data),
            State::Hmac512(m) => Mac::update(m, data),
        }
        Ok(())
    }

    pub fn finish(&mut self) -> Result<Vec<u8>, HashError> {
        let digest = match self.state.take().ok_or(HashError::NotStarted)? {
            State::Sha256(h) => h.finalize().to_vec(),
            State::Sha384(h) => h.finalize().to_vec(),
            State::Sha512(h) => h.finalize().to_vec(),
            State::Hmac256(m) => m.finalize().into_bytes().to_vec(),
            State::Hmac384(m) => m.finalize().into_bytes().to_vec(),
            State::Hmac512(m) => m.finalize().into_bytes().to_vec(),
        };
        Ok(digest)
    }

    /// One-shot HMAC
    pub fn hmac(algorithm: HashAlgorithm, key: &[u8], data: &[u8]) -> Result<Vec<u8>, HashError> {
        let mut hash = Self::new(algorithm);
        hash.hmac_start(key)?;
        hash.update(data)?;
        hash.finish()
    }

    /// Verify an HMAC in constant time
    pub fn hmac_verify(
        algorithm: HashAlgorithm,
        key: &[u8],
        data: &[u8],
        expected: &[u8],
    ) -> Result<(), HashError> {
        let calculated = Self::hmac(algorithm, key, data)?;
        if calculated.ct_eq(expected).into() {
            Ok(())
        } else {
            Err(HashError::VerificationFailed)
        }
    }
}

impl std::fmt::Debug for Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hash")
            .field("algorithm", &self.algorithm)
            .field("started", &self.state.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_vector() {
        assert_eq!(
            hex::encode(Hash::hash(HashAlgorithm::Sha256, b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        for algorithm in [
            HashAlgorithm::Sha256,
            HashAlgorithm::Sha384,
            HashAlgorithm::Sha512,
        ] {
            let mut hash = Hash::new(algorithm);
            hash.start();
            hash.update(b"hello ").unwrap();
            hash.update(b"world").unwrap();
            let digest = hash.finish().unwrap();
            assert_eq!(digest, Hash::hash(algorithm, b"hello world"));
            assert_eq!(digest.len(), algorithm.digest_length());
        }
    }

    #[test]
    fn test_not_started() {
        let mut hash = Hash::new(HashAlgorithm::Sha256);
        assert!(matches!(hash.update(b"x"), Err(HashError::NotStarted)));
        assert!(matches!(hash.finish(), Err(HashError::NotStarted)));
    }

    #[test]
    fn test_hmac_verify() {
        let key = b"test_key_32_bytes_long_for_hmac!";
        let mac = Hash::hmac(HashAlgorithm::Sha256, key, b"test data").unwrap();
        assert_eq!(mac.len(), 32);
        assert!(Hash::hmac_verify(HashAlgorithm::Sha256, key, b"test data", &mac).is_ok());

        let mut wrong = mac.clone();
        wrong[31] ^= 1;
        assert!(matches!(
            Hash::hmac_verify(HashAlgorithm::Sha256, key, b"test data", &wrong),
            Err(HashError::VerificationFailed)
        ));
        assert!(Hash::hmac_verify(HashAlgorithm::Sha256, key, b"test data", &mac[..16]).is_err());
    }
}
