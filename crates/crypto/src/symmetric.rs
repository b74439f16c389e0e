//! Symmetric cipher engine
//!
//! A single incremental interface over AES-256-GCM and AES-256-CBC:
//!
//! 1. Pick the algorithm with [`SymmetricCipher::new`]
//! 2. Set a key for one direction and an IV
//! 3. Call [`reset`](SymmetricCipher::reset) to arm the engine
//! 4. Feed data through [`update`](SymmetricCipher::update), then call
//!    [`finish`](SymmetricCipher::finish)
//!
//! GCM runs as counter mode plus an incremental GHASH, so `update` releases
//! output for every byte it is given. Decryption holds back the trailing
//! tag-length bytes and `finish` verifies the tag. CBC streams whole blocks
//! from `update` and keeps the final block back until `finish` so the padding
//! can be handled.

use crate::types::SecretBytes;
use aes::Aes256;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::generic_array::GenericArray;
use cbc::cipher::{
    BlockDecryptMut, BlockEncrypt, BlockEncryptMut, KeyInit, KeyIvInit, StreamCipher,
};
use ghash::universal_hash::UniversalHash;
use ghash::GHash;
use subtle::ConstantTimeEq;
use cmsenvelope_protocol::asn1::oid::known;
use cmsenvelope_protocol::{AlgorithmIdentifier, Asn1Error, Oid};
use serde::{Deserialize, Serialize};
use thiserror::Error;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type Aes256Ctr32 = ctr::Ctr32BE<Aes256>;

const AES_BLOCK_SIZE: usize = 16;
const AES256_KEY_LENGTH: usize = 32;
const GCM_TAG_LENGTH: usize = 16;

#[derive(Debug, Error)]
pub enum SymmetricError {
    #[error("Cipher is not configured: {0}")]
    NotConfigured(&'static str),

    #[error("Invalid key length: expected {expected}, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("Invalid IV length: expected {expected}, got {got}")]
    InvalidIvLength { expected: usize, got: usize },

    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("{0:?} does not support padding")]
    PaddingNotSupported(SymmetricAlgorithm),

    #[error("{0:?} does not support additional authenticated data")]
    AuthDataNotSupported(SymmetricAlgorithm),

    #[error("Invalid ciphertext length {0}")]
    InvalidCiphertextLength(usize),

    #[error("Plaintext length {0} is not a multiple of the block size and padding is disabled")]
    UnalignedPlaintext(usize),

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Invalid padding")]
    InvalidPadding,

    #[error("Encoding error: {0}")]
    Encoding(#[from] Asn1Error),
}

/// Supported content encryption algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SymmetricAlgorithm {
    #[default]
    Aes256Gcm,
    Aes256Cbc,
}

impl SymmetricAlgorithm {
    pub fn oid(self) -> Oid {
        match self {
            SymmetricAlgorithm::Aes256Gcm => known::aes256_gcm(),
            SymmetricAlgorithm::Aes256Cbc => known::aes256_cbc(),
        }
    }

    pub fn from_oid(oid: &Oid) -> Result<Self, SymmetricError> {
        if *oid == known::aes256_gcm() {
            Ok(SymmetricAlgorithm::Aes256Gcm)
        } else if *oid == known::aes256_cbc() {
            Ok(SymmetricAlgorithm::Aes256Cbc)
        } else {
            Err(SymmetricError::UnsupportedAlgorithm(oid.to_string()))
        }
    }

    pub fn key_length(self) -> usize {
        AES256_KEY_LENGTH
    }

    pub fn iv_size(self) -> usize {
        match self {
            SymmetricAlgorithm::Aes256Gcm => 12,
            SymmetricAlgorithm::Aes256Cbc => AES_BLOCK_SIZE,
        }
    }

    pub fn block_size(self) -> usize {
        AES_BLOCK_SIZE
    }

    pub fn is_support_padding(self) -> bool {
        matches!(self, SymmetricAlgorithm::Aes256Cbc)
    }

    pub fn auth_tag_length(self) -> usize {
        match self {
            SymmetricAlgorithm::Aes256Gcm => GCM_TAG_LENGTH,
            SymmetricAlgorithm::Aes256Cbc => 0,
        }
    }
}

/// Block padding mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Padding {
    None,
    Pkcs7,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Encrypt,
    Decrypt,
}

/// Running GCM state: the CTR keystream, GHASH over AAD and ciphertext,
/// and the encrypted initial counter block that masks the tag
struct GcmState {
    keystream: Aes256Ctr32,
    ghash: GHash,
    tag_mask: [u8; GCM_TAG_LENGTH],
    // Ciphertext not yet absorbed by GHASH, always shorter than a block
    unhashed: Vec<u8>,
    // Decryption only: trailing bytes that may turn out to be the tag
    held_back: Vec<u8>,
    aad_len: u64,
    text_len: u64,
}

impl GcmState {
    fn new(key: &[u8], iv: &[u8], aad: &[u8]) -> Result<Self, SymmetricError> {
        let block_cipher = Aes256::new_from_slice(key).map_err(|_| {
            SymmetricError::InvalidKeyLength {
                expected: AES256_KEY_LENGTH,
                got: key.len(),
            }
        })?;

        let mut hash_key = GenericArray::default();
        block_cipher.encrypt_block(&mut hash_key);
        let mut ghash = GHash::new(&hash_key);
        ghash.update_padded(aad);

        // J0 = IV || 0^31 || 1 for a 96-bit IV; the payload counter starts at J0 + 1
        let mut counter = [0u8; AES_BLOCK_SIZE];
        counter[..iv.len()].copy_from_slice(iv);
        counter[AES_BLOCK_SIZE - 1] = 1;
        let mut tag_mask = GenericArray::clone_from_slice(&counter);
        block_cipher.encrypt_block(&mut tag_mask);
        counter[AES_BLOCK_SIZE - 1] = 2;

        let keystream = Aes256Ctr32::new_from_slices(key, &counter)
            .map_err(|_| SymmetricError::NotConfigured("invalid key or IV"))?;

        let mut mask = [0u8; GCM_TAG_LENGTH];
        mask.copy_from_slice(&tag_mask);
        Ok(Self {
            keystream,
            ghash,
            tag_mask: mask,
            unhashed: Vec::with_capacity(AES_BLOCK_SIZE),
            held_back: Vec::new(),
            aad_len: aad.len() as u64,
            text_len: 0,
        })
    }

    /// Feed ciphertext to GHASH, keeping a partial block for the next call
    fn absorb(&mut self, ciphertext: &[u8]) {
        self.text_len += ciphertext.len() as u64;
        let mut rest = ciphertext;
        if !self.unhashed.is_empty() {
            let take = (AES_BLOCK_SIZE - self.unhashed.len()).min(rest.len());
            self.unhashed.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
            if self.unhashed.len() < AES_BLOCK_SIZE {
                return;
            }
            self.ghash.update_padded(&self.unhashed);
            self.unhashed.clear();
        }
        let whole = rest.len() - rest.len() % AES_BLOCK_SIZE;
        self.ghash.update_padded(&rest[..whole]);
        self.unhashed.extend_from_slice(&rest[whole..]);
    }

    fn encrypt(&mut self, data: &[u8]) -> Vec<u8> {
        let mut out = data.to_vec();
        self.keystream.apply_keystream(&mut out);
        self.absorb(&out);
        out
    }

    fn decrypt(&mut self, data: &[u8]) -> Vec<u8> {
        self.held_back.extend_from_slice(data);
        let ready = self.held_back.len().saturating_sub(GCM_TAG_LENGTH);
        let mut out: Vec<u8> = self.held_back.drain(..ready).collect();
        self.absorb(&out);
        self.keystream.apply_keystream(&mut out);
        out
    }

    fn tag(mut self) -> [u8; GCM_TAG_LENGTH] {
        self.ghash.update_padded(&self.unhashed);
        let mut lengths = [0u8; AES_BLOCK_SIZE];
        lengths[..8].copy_from_slice(&(self.aad_len * 8).to_be_bytes());
        lengths[8..].copy_from_slice(&(self.text_len * 8).to_be_bytes());
        self.ghash.update_padded(&lengths);

        let mut tag = [0u8; GCM_TAG_LENGTH];
        for ((t, s), m) in tag.iter_mut().zip(self.ghash.finalize()).zip(self.tag_mask) {
            *t = s ^ m;
        }
        tag
    }
}

enum Engine {
    Idle,
    Gcm(Box<GcmState>),
    CbcEncrypt {
        cipher: Option<Aes256CbcEnc>,
        pending: Vec<u8>,
    },
    CbcDecrypt {
        cipher: Option<Aes256CbcDec>,
        pending: Vec<u8>,
    },
}

/// Incremental symmetric cipher
pub struct SymmetricCipher {
    algorithm: SymmetricAlgorithm,
    key: Option<SecretBytes>,
    direction: Option<Direction>,
    iv: Vec<u8>,
    aad: Vec<u8>,
    padding: Padding,
    engine: Engine,
}

impl std::fmt::Debug for SymmetricCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricCipher")
            .field("algorithm", &self.algorithm)
            .field("direction", &self.direction)
            .field("padding", &self.padding)
            .field("armed", &!matches!(self.engine, Engine::Idle))
            .finish()
    }
}

impl SymmetricCipher {
    pub fn new(algorithm: SymmetricAlgorithm) -> Self {
        Self {
            algorithm,
            key: None,
            direction: None,
            iv: Vec::new(),
            aad: Vec::new(),
            padding: if algorithm.is_support_padding() {
                Padding::Pkcs7
            } else {
                Padding::None
            },
            engine: Engine::Idle,
        }
    }

    /// Build a cipher from a content encryption AlgorithmIdentifier, taking
    /// the IV from its parameters
    pub fn from_algorithm_identifier(alg: &AlgorithmIdentifier) -> Result<Self, SymmetricError> {
        let mut cipher = Self::new(SymmetricAlgorithm::from_oid(&alg.oid)?);
        cipher.set_iv(&alg.octet_string_params()?)?;
        Ok(cipher)
    }

    /// AlgorithmIdentifier carrying the algorithm OID and the current IV
    pub fn algorithm_identifier(&self) -> Result<AlgorithmIdentifier, SymmetricError> {
        if self.iv.is_empty() {
            return Err(SymmetricError::NotConfigured("IV is not set"));
        }
        Ok(AlgorithmIdentifier::with_octet_string(
            self.algorithm.oid(),
            &self.iv,
        )?)
    }

    pub fn algorithm(&self) -> SymmetricAlgorithm {
        self.algorithm
    }

    pub fn block_size(&self) -> usize {
        self.algorithm.block_size()
    }

    pub fn iv_size(&self) -> usize {
        self.algorithm.iv_size()
    }

    pub fn key_length(&self) -> usize {
        self.algorithm.key_length()
    }

    pub fn is_support_padding(&self) -> bool {
        self.algorithm.is_support_padding()
    }

    pub fn auth_tag_length(&self) -> usize {
        self.algorithm.auth_tag_length()
    }

    pub fn is_encryption(&self) -> bool {
        self.direction == Some(Direction::Encrypt)
    }

    pub fn is_decryption(&self) -> bool {
        self.direction == Some(Direction::Decrypt)
    }

    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    pub fn set_encryption_key(&mut self, key: &[u8]) -> Result<(), SymmetricError> {
        self.set_key(key, Direction::Encrypt)
    }

    pub fn set_decryption_key(&mut self, key: &[u8]) -> Result<(), SymmetricError> {
        self.set_key(key, Direction::Decrypt)
    }

    fn set_key(&mut self, key: &[u8], direction: Direction) -> Result<(), SymmetricError> {
        if key.len() != self.key_length() {
            return Err(SymmetricError::InvalidKeyLength {
                expected: self.key_length(),
                got: key.len(),
            });
        }
        self.key = Some(SecretBytes::from_slice(key));
        self.direction = Some(direction);
        self.engine = Engine::Idle;
        Ok(())
    }

    pub fn set_iv(&mut self, iv: &[u8]) -> Result<(), SymmetricError> {
        if iv.len() != self.iv_size() {
            return Err(SymmetricError::InvalidIvLength {
                expected: self.iv_size(),
                got: iv.len(),
            });
        }
        self.iv = iv.to_vec();
        Ok(())
    }

    pub fn set_padding(&mut self, padding: Padding) -> Result<(), SymmetricError> {
        if padding != Padding::None && !self.is_support_padding() {
            return Err(SymmetricError::PaddingNotSupported(self.algorithm));
        }
        self.padding = padding;
        Ok(())
    }

    pub fn padding(&self) -> Padding {
        self.padding
    }

    pub fn set_auth_data(&mut self, aad: &[u8]) -> Result<(), SymmetricError> {
        if self.auth_tag_length() == 0 {
            return Err(SymmetricError::AuthDataNotSupported(self.algorithm));
        }
        self.aad = aad.to_vec();
        Ok(())
    }

    /// Arm the engine with the current key, IV and padding
    pub fn reset(&mut self) -> Result<(), SymmetricError> {
        let key = self
            .key
            .as_ref()
            .ok_or(SymmetricError::NotConfigured("key is not set"))?;
        let direction = self
            .direction
            .ok_or(SymmetricError::NotConfigured("direction is not set"))?;
        if self.iv.len() != self.iv_size() {
            return Err(SymmetricError::NotConfigured("IV is not set"));
        }

        self.engine = match (self.algorithm, direction) {
            (SymmetricAlgorithm::Aes256Gcm, _) => {
                Engine::Gcm(Box::new(GcmState::new(key.as_slice(), &self.iv, &self.aad)?))
            }
            (SymmetricAlgorithm::Aes256Cbc, Direction::Encrypt) => Engine::CbcEncrypt {
                cipher: Some(
                    Aes256CbcEnc::new_from_slices(key.as_slice(), &self.iv)
                        .map_err(|_| SymmetricError::NotConfigured("invalid key or IV"))?,
                ),
                pending: Vec::new(),
            },
            (SymmetricAlgorithm::Aes256Cbc, Direction::Decrypt) => Engine::CbcDecrypt {
                cipher: Some(
                    Aes256CbcDec::new_from_slices(key.as_slice(), &self.iv)
                        .map_err(|_| SymmetricError::NotConfigured("invalid key or IV"))?,
                ),
                pending: Vec::new(),
            },
        };
        Ok(())
    }

    /// Process more input, returning whatever output is ready
    pub fn update(&mut self, data: &[u8]) -> Result<Vec<u8>, SymmetricError> {
        let padding = self.padding;
        let encrypting = self.is_encryption();
        match &mut self.engine {
            Engine::Idle => Err(SymmetricError::NotConfigured("call 'reset' before 'update'")),
            Engine::Gcm(state) if encrypting => Ok(state.encrypt(data)),
            Engine::Gcm(state) => Ok(state.decrypt(data)),
            Engine::CbcEncrypt { cipher, pending } => {
                pending.extend_from_slice(data);
                let ready = pending.len() - pending.len() % AES_BLOCK_SIZE;
                let mut out: Vec<u8> = pending.drain(..ready).collect();
                let cipher = cipher
                    .as_mut()
                    .ok_or(SymmetricError::NotConfigured("cipher was finished"))?;
                for block in out.chunks_exact_mut(AES_BLOCK_SIZE) {
                    cipher.encrypt_block_mut(GenericArray::from_mut_slice(block));
                }
                Ok(out)
            }
            Engine::CbcDecrypt { cipher, pending } => {
                pending.extend_from_slice(data);
                let mut ready = pending.len() - pending.len() % AES_BLOCK_SIZE;
                // The final block carries the padding and is only released by finish
                if padding == Padding::Pkcs7 && ready == pending.len() {
                    ready = ready.saturating_sub(AES_BLOCK_SIZE);
                }
                let mut out: Vec<u8> = pending.drain(..ready).collect();
                let cipher = cipher
                    .as_mut()
                    .ok_or(SymmetricError::NotConfigured("cipher was finished"))?;
                for block in out.chunks_exact_mut(AES_BLOCK_SIZE) {
                    cipher.decrypt_block_mut(GenericArray::from_mut_slice(block));
                }
                Ok(out)
            }
        }
    }

    /// Flush the remaining output and disarm the engine
    pub fn finish(&mut self) -> Result<Vec<u8>, SymmetricError> {
        let engine = std::mem::replace(&mut self.engine, Engine::Idle);
        match engine {
            Engine::Idle => Err(SymmetricError::NotConfigured("call 'reset' before 'finish'")),
            Engine::Gcm(state) if self.is_encryption() => Ok(state.tag().to_vec()),
            Engine::Gcm(mut state) => {
                let received = std::mem::take(&mut state.held_back);
                if received.len() != GCM_TAG_LENGTH {
                    return Err(SymmetricError::InvalidCiphertextLength(received.len()));
                }
                if bool::from(state.tag()[..].ct_eq(&received[..])) {
                    Ok(Vec::new())
                } else {
                    Err(SymmetricError::AuthenticationFailed)
                }
            }
            Engine::CbcEncrypt { cipher, pending } => {
                let cipher = cipher.ok_or(SymmetricError::NotConfigured("cipher was finished"))?;
                match self.padding {
                    Padding::Pkcs7 => Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(&pending)),
                    Padding::None if pending.is_empty() => Ok(Vec::new()),
                    Padding::None => Err(SymmetricError::UnalignedPlaintext(pending.len())),
                }
            }
            Engine::CbcDecrypt { cipher, pending } => {
                let cipher = cipher.ok_or(SymmetricError::NotConfigured("cipher was finished"))?;
                match self.padding {
                    Padding::Pkcs7 => {
                        if pending.len() != AES_BLOCK_SIZE {
                            return Err(SymmetricError::InvalidCiphertextLength(pending.len()));
                        }
                        cipher
                            .decrypt_padded_vec_mut::<Pkcs7>(&pending)
                            .map_err(|_| SymmetricError::InvalidPadding)
                    }
                    Padding::None if pending.is_empty() => Ok(Vec::new()),
                    Padding::None => Err(SymmetricError::InvalidCiphertextLength(pending.len())),
                }
            }
        }
    }

    /// Forget the key and any buffered data
    pub fn clear(&mut self) {
        self.key = None;
        self.direction = None;
        self.iv.clear();
        self.aad.clear();
        self.engine = Engine::Idle;
    }

    /// One-shot encryption or decryption of `data` with the current settings
    pub fn process(&mut self, data: &[u8]) -> Result<Vec<u8>, SymmetricError> {
        self.reset()?;
        let mut out = self.update(data)?;
        out.extend(self.finish()?);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher(algorithm: SymmetricAlgorithm, direction: Direction) -> SymmetricCipher {
        let mut c = SymmetricCipher::new(algorithm);
        let key = [0x42u8; 32];
        match direction {
            Direction::Encrypt => c.set_encryption_key(&key).unwrap(),
            Direction::Decrypt => c.set_decryption_key(&key).unwrap(),
        }
        c.set_iv(&vec![0x24u8; algorithm.iv_size()]).unwrap();
        c
    }

    fn roundtrip(algorithm: SymmetricAlgorithm, data: &[u8], pieces: usize) {
        let mut enc = cipher(algorithm, Direction::Encrypt);
        enc.reset().unwrap();
        let mut ciphertext = Vec::new();
        for piece in data.chunks((data.len() / pieces).max(1)) {
            ciphertext.extend(enc.update(piece).unwrap());
        }
        ciphertext.extend(enc.finish().unwrap());

        let mut dec = cipher(algorithm, Direction::Decrypt);
        dec.reset().unwrap();
        let mut plaintext = Vec::new();
        for piece in ciphertext.chunks(7) {
            plaintext.extend(dec.update(piece).unwrap());
        }
        plaintext.extend(dec.finish().unwrap());
        assert_eq!(plaintext, data);
    }

    #[test]
    fn test_gcm_roundtrip() {
        roundtrip(SymmetricAlgorithm::Aes256Gcm, b"", 1);
        roundtrip(SymmetricAlgorithm::Aes256Gcm, &[7u8; 1000], 9);
    }

    #[test]
    fn test_cbc_roundtrip() {
        roundtrip(SymmetricAlgorithm::Aes256Cbc, b"", 1);
        roundtrip(SymmetricAlgorithm::Aes256Cbc, &[1u8; 15], 2);
        roundtrip(SymmetricAlgorithm::Aes256Cbc, &[1u8; 16], 3);
        roundtrip(SymmetricAlgorithm::Aes256Cbc, &[9u8; 1000], 13);
    }

    #[test]
    fn test_cbc_streaming_matches_one_shot() {
        let data = [0x5Au8; 100];
        let mut one_shot = cipher(SymmetricAlgorithm::Aes256Cbc, Direction::Encrypt);
        let expected = one_shot.process(&data).unwrap();
        assert_eq!(expected.len(), 112);

        let mut streaming = cipher(SymmetricAlgorithm::Aes256Cbc, Direction::Encrypt);
        streaming.reset().unwrap();
        let mut out = streaming.update(&data[..33]).unwrap();
        assert_eq!(out.len(), 32);
        out.extend(streaming.update(&data[33..]).unwrap());
        out.extend(streaming.finish().unwrap());
        assert_eq!(out, expected);
    }

    #[test]
    fn test_gcm_output_length() {
        let mut enc = cipher(SymmetricAlgorithm::Aes256Gcm, Direction::Encrypt);
        let out = enc.process(&[0u8; 50]).unwrap();
        assert_eq!(out.len(), 50 + GCM_TAG_LENGTH);
    }

    #[test]
    fn test_gcm_matches_one_shot_aead() {
        use aes_gcm::aead::{Aead, Payload};
        use aes_gcm::{Aes256Gcm, Nonce};

        let key = [0x42u8; 32];
        let iv = [0x24u8; 12];
        let data: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
        let reference = Aes256Gcm::new_from_slice(&key)
            .unwrap()
            .encrypt(
                Nonce::from_slice(&iv),
                Payload {
                    msg: &data,
                    aad: b"header",
                },
            )
            .unwrap();

        let mut enc = cipher(SymmetricAlgorithm::Aes256Gcm, Direction::Encrypt);
        enc.set_auth_data(b"header").unwrap();
        enc.reset().unwrap();
        let mut ciphertext = Vec::new();
        for piece in [&data[..5], &data[5..21], &data[21..500], &data[500..]] {
            ciphertext.extend(enc.update(piece).unwrap());
        }
        ciphertext.extend(enc.finish().unwrap());
        assert_eq!(ciphertext, reference);
    }

    #[test]
    fn test_gcm_releases_output_per_update() {
        let mut enc = cipher(SymmetricAlgorithm::Aes256Gcm, Direction::Encrypt);
        enc.reset().unwrap();
        let first = enc.update(&[1u8; 100]).unwrap();
        assert_eq!(first.len(), 100);
        let second = enc.update(&[2u8; 7]).unwrap();
        assert_eq!(second.len(), 7);
        let tag = enc.finish().unwrap();
        assert_eq!(tag.len(), GCM_TAG_LENGTH);

        let mut ciphertext = first;
        ciphertext.extend(second);
        ciphertext.extend(tag);
        let mut dec = cipher(SymmetricAlgorithm::Aes256Gcm, Direction::Decrypt);
        dec.reset().unwrap();
        // Everything except the possible tag comes out immediately
        assert_eq!(dec.update(&ciphertext[..50]).unwrap().len(), 50 - GCM_TAG_LENGTH);
        assert_eq!(dec.update(&ciphertext[50..]).unwrap().len(), 107 - 50 + GCM_TAG_LENGTH);
        assert!(dec.finish().unwrap().is_empty());
    }

    #[test]
    fn test_gcm_truncated_tag() {
        let mut dec = cipher(SymmetricAlgorithm::Aes256Gcm, Direction::Decrypt);
        dec.reset().unwrap();
        assert!(dec.update(&[0u8; 10]).unwrap().is_empty());
        assert!(matches!(
            dec.finish(),
            Err(SymmetricError::InvalidCiphertextLength(10))
        ));
    }

    #[test]
    fn test_gcm_tamper_detected() {
        let mut enc = cipher(SymmetricAlgorithm::Aes256Gcm, Direction::Encrypt);
        let mut ciphertext = enc.process(b"authenticated").unwrap();
        ciphertext[0] ^= 0x01;
        let mut dec = cipher(SymmetricAlgorithm::Aes256Gcm, Direction::Decrypt);
        assert!(matches!(
            dec.process(&ciphertext),
            Err(SymmetricError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_gcm_auth_data() {
        let mut enc = cipher(SymmetricAlgorithm::Aes256Gcm, Direction::Encrypt);
        enc.set_auth_data(b"header").unwrap();
        let ciphertext = enc.process(b"body").unwrap();

        let mut dec = cipher(SymmetricAlgorithm::Aes256Gcm, Direction::Decrypt);
        dec.set_auth_data(b"other").unwrap();
        assert!(dec.process(&ciphertext).is_err());
        dec.set_auth_data(b"header").unwrap();
        assert_eq!(dec.process(&ciphertext).unwrap(), b"body");
    }

    #[test]
    fn test_update_requires_reset() {
        let mut enc = cipher(SymmetricAlgorithm::Aes256Gcm, Direction::Encrypt);
        assert!(matches!(
            enc.update(b"data"),
            Err(SymmetricError::NotConfigured(_))
        ));
        assert!(enc.finish().is_err());
    }

    #[test]
    fn test_configuration_errors() {
        let mut gcm = SymmetricCipher::new(SymmetricAlgorithm::Aes256Gcm);
        assert!(gcm.reset().is_err());
        assert!(gcm.set_encryption_key(&[0u8; 16]).is_err());
        assert!(gcm.set_iv(&[0u8; 16]).is_err());
        assert!(matches!(
            gcm.set_padding(Padding::Pkcs7),
            Err(SymmetricError::PaddingNotSupported(_))
        ));

        let mut cbc = SymmetricCipher::new(SymmetricAlgorithm::Aes256Cbc);
        assert!(cbc.set_auth_data(b"aad").is_err());
        assert_eq!(cbc.padding(), Padding::Pkcs7);
    }

    #[test]
    fn test_cbc_without_padding() {
        let mut enc = cipher(SymmetricAlgorithm::Aes256Cbc, Direction::Encrypt);
        enc.set_padding(Padding::None).unwrap();
        assert!(matches!(
            enc.process(&[0u8; 10]),
            Err(SymmetricError::UnalignedPlaintext(10))
        ));
        let ciphertext = enc.process(&[3u8; 32]).unwrap();
        assert_eq!(ciphertext.len(), 32);

        let mut dec = cipher(SymmetricAlgorithm::Aes256Cbc, Direction::Decrypt);
        dec.set_padding(Padding::None).unwrap();
        assert_eq!(dec.process(&ciphertext).unwrap(), vec![3u8; 32]);
    }

    #[test]
    fn test_algorithm_identifier_roundtrip() {
        let enc = cipher(SymmetricAlgorithm::Aes256Cbc, Direction::Encrypt);
        let alg = enc.algorithm_identifier().unwrap();
        let restored = SymmetricCipher::from_algorithm_identifier(&alg).unwrap();
        assert_eq!(restored.algorithm(), SymmetricAlgorithm::Aes256Cbc);
        assert_eq!(restored.iv(), enc.iv());
    }

    #[test]
    fn test_unknown_oid() {
        let oid = Oid::new(&[1, 2, 3]);
        assert!(matches!(
            SymmetricAlgorithm::from_oid(&oid),
            Err(SymmetricError::UnsupportedAlgorithm(_))
        ));
    }
}
