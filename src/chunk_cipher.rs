//! Independently encrypted fixed-size chunks
//!
//! Every chunk is a complete encryption under the content key with its own
//! nonce: the base IV with the chunk index XOR-ed into its low eight bytes
//! (big-endian). The encryption chunk size is stored in the ContentInfo
//! custom parameters under [`CHUNK_SIZE_PARAM`] so the reader can compute
//! the matching ciphertext chunk size.
//!
//! | Algorithm   | Plaintext chunk            | Ciphertext chunk           |
//! |-------------|----------------------------|----------------------------|
//! | AES-256-CBC | `k * 16 - 1`               | `k * 16`                   |
//! | AES-256-GCM | preferred size, unchanged  | plaintext chunk + 16 (tag) |

use crate::cipher_base::CipherBase;
use crate::config::CipherOptions;
use crate::data::{write_checked, DataSink, DataSource};
use crate::error::CipherError;
use cmsenvelope_crypto::SymmetricAlgorithm;
use std::ops::{Deref, DerefMut};
use tracing::{debug, trace};

/// Custom parameter carrying the encryption chunk size
pub const CHUNK_SIZE_PARAM: &str = "chunkSize";

#[derive(Debug, Default)]
pub struct ChunkCipher {
    base: CipherBase,
    base_iv: Vec<u8>,
    chunk_index: u64,
    chunk_size: usize,
}

impl ChunkCipher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CipherOptions) -> Self {
        Self {
            base: CipherBase::with_options(options),
            ..Self::default()
        }
    }

    /// Plaintext chunk size actually used for a preferred size
    ///
    /// With padding every chunk grows to the next block boundary, so the
    /// size is kept one byte short of a block multiple.
    pub fn adjust_encryption_chunk_size(preferred: usize, algorithm: SymmetricAlgorithm) -> usize {
        if !algorithm.is_support_padding() {
            return preferred.max(1);
        }
        let block_size = algorithm.block_size();
        if preferred < block_size {
            block_size - 1
        } else {
            preferred / block_size * block_size - 1
        }
    }

    /// Ciphertext chunk size produced by an encryption chunk size
    pub fn adjust_decryption_chunk_size(
        encryption_chunk_size: usize,
        algorithm: SymmetricAlgorithm,
    ) -> usize {
        let unit = if algorithm.is_support_padding() {
            algorithm.block_size()
        } else {
            1
        };
        encryption_chunk_size.div_ceil(unit) * unit + algorithm.auth_tag_length()
    }

    /// Size of the chunks `process` expects in the running operation
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Nonce of chunk `index` derived from `base_iv`
    pub fn chunk_nonce(base_iv: &[u8], index: u64) -> Vec<u8> {
        let mut nonce = base_iv.to_vec();
        for (byte, counter) in nonce.iter_mut().rev().zip(index.to_be_bytes().iter().rev()) {
            *byte ^= counter;
        }
        nonce
    }

    /// Begin encryption and return the plaintext chunk size to feed
    ///
    /// The ContentInfo is built immediately and available through
    /// [`CipherBase::content_info`].
    pub fn start_encryption(&mut self, preferred_chunk_size: usize) -> Result<usize, CipherError> {
        if preferred_chunk_size == 0 {
            return Err(CipherError::InvalidArgument(
                "preferred chunk size must be positive".to_string(),
            ));
        }
        let algorithm = self.base.options().algorithm;
        let chunk_size = Self::adjust_encryption_chunk_size(preferred_chunk_size, algorithm);
        let stored = i32::try_from(chunk_size).map_err(|_| {
            CipherError::InvalidArgument(format!("chunk size {} is too large", chunk_size))
        })?;
        self.base
            .custom_params_mut()
            .set_integer(CHUNK_SIZE_PARAM, stored);

        match self.begin_encryption() {
            Ok(base_iv) => self.arm(base_iv, chunk_size),
            Err(e) => {
                self.reset_chunks();
                return Err(e);
            }
        }
        debug!(chunk_size, ?algorithm, "Chunk encryption started");
        Ok(chunk_size)
    }

    fn begin_encryption(&mut self) -> Result<Vec<u8>, CipherError> {
        let base_iv = self.base.init_encryption()?.iv().to_vec();
        self.base.build_content_info()?;
        Ok(base_iv)
    }

    /// Begin decryption as key recipient and return the ciphertext chunk size
    pub fn start_decryption_with_key(
        &mut self,
        recipient_id: &[u8],
        private_key: &[u8],
    ) -> Result<usize, CipherError> {
        let result = self
            .base
            .init_decryption_with_key(recipient_id, private_key)
            .map(|cipher| cipher.iv().to_vec());
        self.start_decryption(result)
    }

    /// Begin decryption with a password and return the ciphertext chunk size
    pub fn start_decryption_with_password(&mut self, password: &[u8]) -> Result<usize, CipherError> {
        let result = self
            .base
            .init_decryption_with_password(password)
            .map(|cipher| cipher.iv().to_vec());
        self.start_decryption(result)
    }

    fn start_decryption(&mut self, base_iv: Result<Vec<u8>, CipherError>) -> Result<usize, CipherError> {
        let armed = base_iv.and_then(|iv| {
            let algorithm = self.base.symmetric_cipher()?.algorithm();
            let encryption_chunk_size = self.stored_chunk_size()?;
            Ok((
                iv,
                Self::adjust_decryption_chunk_size(encryption_chunk_size, algorithm),
            ))
        });
        match armed {
            Ok((iv, chunk_size)) => {
                self.arm(iv, chunk_size);
                debug!(chunk_size, "Chunk decryption started");
                Ok(chunk_size)
            }
            Err(e) => {
                self.reset_chunks();
                Err(e)
            }
        }
    }

    fn stored_chunk_size(&self) -> Result<usize, CipherError> {
        let value = self
            .base
            .custom_params()
            .get_integer(CHUNK_SIZE_PARAM)
            .map_err(|_| {
                CipherError::InvalidFormat("chunk size is not defined in the content info".to_string())
            })?;
        match usize::try_from(value) {
            Ok(size) if size > 0 => Ok(size),
            _ => Err(CipherError::InvalidFormat(format!(
                "invalid chunk size {} in the content info",
                value
            ))),
        }
    }

    fn arm(&mut self, base_iv: Vec<u8>, chunk_size: usize) {
        self.base_iv = base_iv;
        self.chunk_index = 0;
        self.chunk_size = chunk_size;
    }

    fn reset_chunks(&mut self) {
        self.base.clear_cipher_info();
        self.base_iv.clear();
        self.chunk_index = 0;
        self.chunk_size = 0;
    }

    /// Encrypt or decrypt the next chunk
    ///
    /// Chunks must be processed in order; only the last one may be shorter
    /// than [`chunk_size`](Self::chunk_size).
    pub fn process(&mut self, chunk: &[u8]) -> Result<Vec<u8>, CipherError> {
        if !self.base.is_encrypting() && !self.base.is_decrypting() {
            return Err(CipherError::InvalidState(
                "'process' can not be called before 'start_encryption' or 'start_decryption'"
                    .to_string(),
            ));
        }
        let result = self.process_chunk(chunk);
        if result.is_err() {
            self.reset_chunks();
        }
        result
    }

    fn process_chunk(&mut self, chunk: &[u8]) -> Result<Vec<u8>, CipherError> {
        if chunk.len() > self.chunk_size {
            return Err(CipherError::InvalidArgument(format!(
                "chunk of {} bytes exceeds the chunk size {}",
                chunk.len(),
                self.chunk_size
            )));
        }
        let decrypting = self.base.is_decrypting();
        let nonce = Self::chunk_nonce(&self.base_iv, self.chunk_index);
        let cipher = self.base.symmetric_cipher_mut()?;
        if decrypting {
            if cipher.is_support_padding() && chunk.len() % cipher.block_size() != 0 {
                return Err(CipherError::InvalidArgument(format!(
                    "encrypted chunk size must be a multiple of {}",
                    cipher.block_size()
                )));
            }
            if chunk.len() < cipher.auth_tag_length() {
                return Err(CipherError::InvalidArgument(format!(
                    "encrypted chunk is shorter than the {} byte tag",
                    cipher.auth_tag_length()
                )));
            }
        }

        cipher.set_iv(&nonce)?;
        cipher.reset()?;
        let mut out = cipher.update(chunk)?;
        out.extend(cipher.finish()?);
        trace!(index = self.chunk_index, input = chunk.len(), output = out.len(), "Chunk processed");
        self.chunk_index = self
            .chunk_index
            .checked_add(1)
            .ok_or_else(|| CipherError::InvalidState("chunk counter overflow".to_string()))?;
        Ok(out)
    }

    /// Complete the running operation and drop the key material
    pub fn finish(&mut self) -> Result<(), CipherError> {
        if !self.base.is_encrypting() && !self.base.is_decrypting() {
            return Err(CipherError::InvalidState(
                "'finish' can not be called before 'start_encryption' or 'start_decryption'"
                    .to_string(),
            ));
        }
        debug!(chunks = self.chunk_index, "Chunk operation finished");
        self.reset_chunks();
        Ok(())
    }

    /// Encrypt `source` into `sink`, re-chunking the input on exact chunk
    /// boundaries
    pub fn encrypt<S, K>(
        &mut self,
        source: &mut S,
        sink: &mut K,
        embed_content_info: bool,
    ) -> Result<(), CipherError>
    where
        S: DataSource + ?Sized,
        K: DataSink + ?Sized,
    {
        let chunk_size = self.start_encryption(self.base.options().preferred_chunk_size)?;
        let result = self.encrypt_source(chunk_size, source, sink, embed_content_info);
        self.finish_after(result)
    }

    fn encrypt_source<S, K>(
        &mut self,
        chunk_size: usize,
        source: &mut S,
        sink: &mut K,
        embed_content_info: bool,
    ) -> Result<(), CipherError>
    where
        S: DataSource + ?Sized,
        K: DataSink + ?Sized,
    {
        if embed_content_info {
            write_checked(sink, self.base.content_info()?)?;
        }
        self.process_source(Vec::new(), chunk_size, source, sink)
    }

    pub fn decrypt_with_key<S, K>(
        &mut self,
        source: &mut S,
        sink: &mut K,
        recipient_id: &[u8],
        private_key: &[u8],
    ) -> Result<(), CipherError>
    where
        S: DataSource + ?Sized,
        K: DataSink + ?Sized,
    {
        let head = self.base.read_content_info(source)?;
        let chunk_size = self.start_decryption_with_key(recipient_id, private_key)?;
        let result = self.process_source(head, chunk_size, source, sink);
        self.finish_after(result)
    }

    pub fn decrypt_with_password<S, K>(
        &mut self,
        source: &mut S,
        sink: &mut K,
        password: &[u8],
    ) -> Result<(), CipherError>
    where
        S: DataSource + ?Sized,
        K: DataSink + ?Sized,
    {
        let head = self.base.read_content_info(source)?;
        let chunk_size = self.start_decryption_with_password(password)?;
        let result = self.process_source(head, chunk_size, source, sink);
        self.finish_after(result)
    }

    fn finish_after(&mut self, result: Result<(), CipherError>) -> Result<(), CipherError> {
        match result {
            Ok(()) => self.finish(),
            Err(e) => {
                self.reset_chunks();
                Err(e)
            }
        }
    }

    fn process_source<S, K>(
        &mut self,
        mut buffer: Vec<u8>,
        chunk_size: usize,
        source: &mut S,
        sink: &mut K,
    ) -> Result<(), CipherError>
    where
        S: DataSource + ?Sized,
        K: DataSink + ?Sized,
    {
        loop {
            while buffer.len() >= chunk_size {
                let rest = buffer.split_off(chunk_size);
                write_checked(sink, &self.process(&buffer)?)?;
                buffer = rest;
            }
            if !source.has_data()? {
                break;
            }
            buffer.extend(source.read()?);
        }
        if !buffer.is_empty() {
            write_checked(sink, &self.process(&buffer)?)?;
        }
        Ok(())
    }
}

impl Deref for ChunkCipher {
    type Target = CipherBase;

    fn deref(&self) -> &CipherBase {
        &self.base
    }
}

impl DerefMut for ChunkCipher {
    fn deref_mut(&mut self) -> &mut CipherBase {
        &mut self.base
    }
}
