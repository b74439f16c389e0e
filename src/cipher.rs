//! Whole-buffer encryption

use crate::cipher_base::CipherBase;
use crate::config::CipherOptions;
use crate::error::CipherError;
use std::ops::{Deref, DerefMut};
use tracing::debug;

/// Encrypts or decrypts a complete message held in memory
///
/// # Examples
///
/// ```
/// use cmsenvelope::Cipher;
///
/// let mut cipher = Cipher::new();
/// cipher.add_password_recipient(b"secret").unwrap();
/// let encrypted = cipher.encrypt(b"hello", true).unwrap();
///
/// let mut reader = Cipher::new();
/// assert_eq!(reader.decrypt_with_password(&encrypted, b"secret").unwrap(), b"hello");
/// ```
#[derive(Debug, Default)]
pub struct Cipher {
    base: CipherBase,
}

impl Cipher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CipherOptions) -> Self {
        Self {
            base: CipherBase::with_options(options),
        }
    }

    /// Encrypt `data` for every configured recipient
    ///
    /// With `embed_content_info` the ContentInfo is prepended to the
    /// ciphertext; otherwise it stays available through
    /// [`CipherBase::content_info`] and must travel separately.
    pub fn encrypt(&mut self, data: &[u8], embed_content_info: bool) -> Result<Vec<u8>, CipherError> {
        let result = self.encrypt_message(data, embed_content_info);
        self.base.clear_cipher_info();
        result
    }

    fn encrypt_message(&mut self, data: &[u8], embed_content_info: bool) -> Result<Vec<u8>, CipherError> {
        self.base.init_encryption()?;
        let content_info = self.base.build_content_info()?.to_vec();
        let cipher = self.base.symmetric_cipher_mut()?;
        let mut ciphertext = cipher.update(data)?;
        ciphertext.extend(cipher.finish()?);
        debug!(
            plaintext = data.len(),
            ciphertext = ciphertext.len(),
            embedded = embed_content_info,
            "Encrypted message"
        );

        if !embed_content_info {
            return Ok(ciphertext);
        }
        let mut out = content_info;
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypt `data` as the key recipient `recipient_id`
    pub fn decrypt_with_key(
        &mut self,
        data: &[u8],
        recipient_id: &[u8],
        private_key: &[u8],
    ) -> Result<Vec<u8>, CipherError> {
        let result = self.base.try_read_content_info(data).and_then(|payload| {
            self.base.init_decryption_with_key(recipient_id, private_key)?;
            Self::decrypt_payload(&mut self.base, payload)
        });
        self.base.clear_cipher_info();
        result
    }

    /// Decrypt `data` with one of its password recipients
    pub fn decrypt_with_password(
        &mut self,
        data: &[u8],
        password: &[u8],
    ) -> Result<Vec<u8>, CipherError> {
        let result = self.base.try_read_content_info(data).and_then(|payload| {
            self.base.init_decryption_with_password(password)?;
            Self::decrypt_payload(&mut self.base, payload)
        });
        self.base.clear_cipher_info();
        result
    }

    fn decrypt_payload(base: &mut CipherBase, payload: &[u8]) -> Result<Vec<u8>, CipherError> {
        let cipher = base.symmetric_cipher_mut()?;
        let mut plaintext = cipher.update(payload)?;
        plaintext.extend(cipher.finish()?);
        Ok(plaintext)
    }
}

impl Deref for Cipher {
    type Target = CipherBase;

    fn deref(&self) -> &CipherBase {
        &self.base
    }
}

impl DerefMut for Cipher {
    fn deref_mut(&mut self) -> &mut CipherBase {
        &mut self.base
    }
}
