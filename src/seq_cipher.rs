//! Push-style encryption of a sequence of arbitrary portions
//!
//! The caller drives the data flow: `start_*`, any number of `process`
//! calls, then `finish`. On decryption the ContentInfo may either be
//! supplied up front with [`CipherBase::set_content_info`] or arrive at the
//! head of the data; in the latter case the credential is held until the
//! header has been extracted.

use crate::cipher_base::CipherBase;
use crate::config::CipherOptions;
use crate::content_info_filter::ContentInfoFilter;
use crate::error::CipherError;
use cmsenvelope_crypto::{EcdhKem, SecretBytes};
use std::ops::{Deref, DerefMut};
use tracing::debug;

/// Decryption credential waiting for the ContentInfo
enum Credential {
    Key {
        recipient_id: Vec<u8>,
        private_key: SecretBytes,
    },
    Password(SecretBytes),
}

#[derive(Default)]
pub struct SeqCipher {
    base: CipherBase,
    filter: ContentInfoFilter,
    credential: Option<Credential>,
}

impl std::fmt::Debug for SeqCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeqCipher")
            .field("base", &self.base)
            .field("filter", &self.filter.state())
            .field("has_credential", &self.credential.is_some())
            .finish()
    }
}

impl SeqCipher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CipherOptions) -> Self {
        Self {
            base: CipherBase::with_options(options),
            ..Self::default()
        }
    }

    /// Begin encryption and return the serialized ContentInfo
    ///
    /// Writing the returned bytes ahead of the ciphertext embeds the
    /// ContentInfo; storing them elsewhere keeps it detached.
    pub fn start_encryption(&mut self) -> Result<Vec<u8>, CipherError> {
        let result = self.begin_encryption();
        if result.is_err() {
            self.abort();
        }
        result
    }

    fn begin_encryption(&mut self) -> Result<Vec<u8>, CipherError> {
        self.base.init_encryption()?;
        Ok(self.base.build_content_info()?.to_vec())
    }

    /// Prepare decryption as key recipient
    ///
    /// Recipient lookup happens once the ContentInfo is known, which may be
    /// during the first `process` calls.
    pub fn start_decryption_with_key(
        &mut self,
        recipient_id: &[u8],
        private_key: &[u8],
    ) -> Result<(), CipherError> {
        if recipient_id.is_empty() {
            return Err(CipherError::InvalidArgument(
                "recipient identifier is empty".to_string(),
            ));
        }
        EcdhKem.check_private_key(private_key)?;
        self.begin_decryption(Credential::Key {
            recipient_id: recipient_id.to_vec(),
            private_key: SecretBytes::from_slice(private_key),
        })
    }

    /// Prepare decryption with a password
    pub fn start_decryption_with_password(&mut self, password: &[u8]) -> Result<(), CipherError> {
        if password.is_empty() {
            return Err(CipherError::InvalidArgument("password is empty".to_string()));
        }
        self.begin_decryption(Credential::Password(SecretBytes::from_slice(password)))
    }

    fn begin_decryption(&mut self, credential: Credential) -> Result<(), CipherError> {
        if self.base.is_encrypting() || self.base.is_decrypting() {
            return Err(CipherError::InvalidState(
                "another operation is in progress, call 'finish' first".to_string(),
            ));
        }
        self.filter.reset();
        self.credential = Some(credential);
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.base.is_encrypting() || self.base.is_decrypting() || self.credential.is_some()
    }

    /// Encrypt or decrypt the next portion of data
    ///
    /// Any error aborts the operation and drops the key material.
    pub fn process(&mut self, data: &[u8]) -> Result<Vec<u8>, CipherError> {
        if !self.is_started() {
            return Err(CipherError::InvalidState(
                "'process' can not be called before any 'start' function".to_string(),
            ));
        }
        let result = self.process_data(data);
        if result.is_err() {
            self.abort();
        }
        result
    }

    fn process_data(&mut self, data: &[u8]) -> Result<Vec<u8>, CipherError> {
        if self.base.is_encrypting() {
            return Ok(self.base.symmetric_cipher_mut()?.update(data)?);
        }
        let payload = self.filter_and_setup(data, false)?;
        if !self.base.is_decrypting() {
            return Ok(Vec::new());
        }
        Ok(self.base.symmetric_cipher_mut()?.update(&payload)?)
    }

    /// Flush the remaining output and end the operation
    pub fn finish(&mut self) -> Result<Vec<u8>, CipherError> {
        if !self.is_started() {
            return Err(CipherError::InvalidState(
                "'finish' can not be called before any 'start' function".to_string(),
            ));
        }
        let result = self.finish_data();
        self.abort();
        result
    }

    fn finish_data(&mut self) -> Result<Vec<u8>, CipherError> {
        if self.base.is_encrypting() {
            return Ok(self.base.symmetric_cipher_mut()?.finish()?);
        }
        let payload = self.filter_and_setup(&[], true)?;
        self.filter.finish()?;
        let cipher = self.base.symmetric_cipher_mut()?;
        let mut out = cipher.update(&payload)?;
        out.extend(cipher.finish()?);
        Ok(out)
    }

    /// Strip an embedded ContentInfo and configure decryption as soon as the
    /// header question is settled
    fn filter_and_setup(&mut self, data: &[u8], is_last: bool) -> Result<Vec<u8>, CipherError> {
        let mut payload = self.filter.filter_data(data)?;
        if is_last {
            self.filter.tell_last_chunk()?;
            payload.extend(self.filter.pop_encrypted_data());
        }
        if self.filter.is_content_info_broken() {
            return Err(CipherError::InvalidFormat(
                "data ended inside the content info".to_string(),
            ));
        }

        let Some(credential) = self.credential.take() else {
            return Ok(payload);
        };
        if self.filter.is_waiting_data() {
            self.credential = Some(credential);
            return Ok(payload);
        }

        if self.filter.is_content_info_found() {
            let content_info = self.filter.pop_content_info()?;
            self.base.set_content_info(&content_info)?;
        } else if !self.base.has_content_info() {
            return Err(CipherError::InvalidFormat(
                "content info is neither embedded in the data nor set".to_string(),
            ));
        }

        match credential {
            Credential::Key {
                recipient_id,
                private_key,
            } => {
                self.base
                    .init_decryption_with_key(&recipient_id, private_key.as_slice())?;
            }
            Credential::Password(password) => {
                self.base.init_decryption_with_password(password.as_slice())?;
            }
        }
        debug!(
            embedded = self.filter.is_content_info_found(),
            "Sequential decryption configured"
        );
        Ok(payload)
    }

    fn abort(&mut self) {
        self.base.clear_cipher_info();
        self.filter.reset();
        self.credential = None;
    }
}

impl Deref for SeqCipher {
    type Target = CipherBase;

    fn deref(&self) -> &CipherBase {
        &self.base
    }
}

impl DerefMut for SeqCipher {
    fn deref_mut(&mut self) -> &mut CipherBase {
        &mut self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmsenvelope_crypto::KeyPair;

    fn encrypt_in_parts(cipher: &mut SeqCipher, data: &[u8], part: usize) -> (Vec<u8>, Vec<u8>) {
        let content_info = cipher.start_encryption().unwrap();
        let mut encrypted = Vec::new();
        for chunk in data.chunks(part) {
            encrypted.extend(cipher.process(chunk).unwrap());
        }
        encrypted.extend(cipher.finish().unwrap());
        (content_info, encrypted)
    }

    fn decrypt_in_parts(cipher: &mut SeqCipher, data: &[u8], part: usize) -> Result<Vec<u8>, CipherError> {
        let mut decrypted = Vec::new();
        for chunk in data.chunks(part) {
            decrypted.extend(cipher.process(chunk)?);
        }
        decrypted.extend(cipher.finish()?);
        Ok(decrypted)
    }

    #[test]
    fn test_embedded_content_info() {
        let bob = KeyPair::generate();
        let mut cipher = SeqCipher::new();
        cipher.add_key_recipient(b"bob", bob.public_key()).unwrap();
        let data = vec![0x11u8; 3000];
        let (mut stream, encrypted) = encrypt_in_parts(&mut cipher, &data, 100);
        stream.extend(encrypted);

        let mut reader = SeqCipher::new();
        reader
            .start_decryption_with_key(b"bob", bob.private_key().as_slice())
            .unwrap();
        assert_eq!(decrypt_in_parts(&mut reader, &stream, 5).unwrap(), data);
    }

    #[test]
    fn test_detached_content_info() {
        let mut cipher = SeqCipher::new();
        cipher.add_password_recipient(b"password").unwrap();
        let data = b"sequential data".repeat(50);
        let (content_info, encrypted) = encrypt_in_parts(&mut cipher, &data, 64);

        let mut reader = SeqCipher::new();
        reader.set_content_info(&content_info).unwrap();
        reader.start_decryption_with_password(b"password").unwrap();
        assert_eq!(decrypt_in_parts(&mut reader, &encrypted, 64).unwrap(), data);
    }

    #[test]
    fn test_missing_content_info() {
        let mut cipher = SeqCipher::new();
        cipher.add_password_recipient(b"password").unwrap();
        let (_, encrypted) = encrypt_in_parts(&mut cipher, b"payload without header", 8);

        let mut reader = SeqCipher::new();
        reader.start_decryption_with_password(b"password").unwrap();
        assert!(matches!(
            decrypt_in_parts(&mut reader, &encrypted, 8),
            Err(CipherError::InvalidFormat(_))
        ));
        assert!(matches!(
            reader.process(b"more"),
            Err(CipherError::InvalidState(_))
        ));
    }

    #[test]
    fn test_wrong_password() {
        let mut cipher = SeqCipher::new();
        cipher.add_password_recipient(b"password").unwrap();
        let (mut stream, encrypted) = encrypt_in_parts(&mut cipher, b"secret", 8);
        stream.extend(encrypted);

        let mut reader = SeqCipher::new();
        reader.start_decryption_with_password(b"wrong").unwrap();
        assert!(matches!(
            decrypt_in_parts(&mut reader, &stream, 1000),
            Err(CipherError::NotFoundPasswordRecipient)
        ));
    }

    #[test]
    fn test_call_order() {
        let mut cipher = SeqCipher::new();
        assert!(matches!(cipher.process(b"data"), Err(CipherError::InvalidState(_))));
        assert!(matches!(cipher.finish(), Err(CipherError::InvalidState(_))));
        assert!(matches!(
            cipher.start_decryption_with_password(b""),
            Err(CipherError::InvalidArgument(_))
        ));
        assert!(matches!(
            cipher.start_decryption_with_key(b"bob", b"short"),
            Err(CipherError::InvalidArgument(_))
        ));
    }
}
