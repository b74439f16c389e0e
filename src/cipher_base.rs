//! Recipient management and envelope construction shared by every cipher
//!
//! [`CipherBase`] owns the pending recipient registry, the content key, the
//! configured [`SymmetricCipher`] and the ContentInfo of the current
//! operation. The strategies ([`Cipher`](crate::Cipher),
//! [`StreamCipher`](crate::StreamCipher), [`ChunkCipher`](crate::ChunkCipher)
//! and [`SeqCipher`](crate::SeqCipher)) only decide how data flows through
//! the cipher it hands out.
//!
//! # State machine
//!
//! ```text
//!         add_*_recipient                 init_encryption
//! Idle ───────────────────▶ Configuring ───────────────────▶ Encrypting ──┐
//!  │                                                                      │
//!  │  set_content_info + init_decryption_with_*                           │ clear_cipher_info
//!  └──────────────────────────────────────────────────────▶ Decrypting ───┤ clear
//!                                                                         ▼
//!                                                                      Cleared
//! ```
//!
//! Processing is only possible while encrypting or decrypting. A cleared
//! instance keeps no key material; configuring new recipients or supplying
//! a new ContentInfo starts the next operation.

use crate::config::CipherOptions;
use crate::data::DataSource;
use crate::error::CipherError;
use cmsenvelope_crypto::{
    random_bytes, random_secret, EcdhKem, KeyEncapsulation, PasswordCipher, PasswordWrapped,
    SecretBytes, SymmetricCipher,
};
use cmsenvelope_protocol::{
    AlgorithmIdentifier, Asn1Compatible, ContentInfo, CustomParams, EncryptedContent,
    EnvelopedData, KeyTransRecipient, PasswordRecipient,
};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Bytes read from a stream before probing for an embedded ContentInfo
const CONTENT_INFO_PROBE_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherState {
    Idle,
    Configuring,
    Encrypting,
    Decrypting,
    Cleared,
}

pub struct CipherBase {
    options: CipherOptions,
    state: CipherState,
    key_recipients: BTreeMap<Vec<u8>, Vec<u8>>,
    password_recipients: Vec<SecretBytes>,
    custom_params: CustomParams,
    enveloped_data: Option<EnvelopedData>,
    content_info: Option<Vec<u8>>,
    content_key: Option<SecretBytes>,
    symmetric_cipher: Option<SymmetricCipher>,
}

impl Default for CipherBase {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CipherBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherBase")
            .field("state", &self.state)
            .field("key_recipients", &self.key_recipients.len())
            .field("password_recipients", &self.password_recipients.len())
            .field("has_content_info", &self.content_info.is_some())
            .finish()
    }
}

impl CipherBase {
    pub fn new() -> Self {
        Self::with_options(CipherOptions::default())
    }

    pub fn with_options(options: CipherOptions) -> Self {
        Self {
            options,
            state: CipherState::Idle,
            key_recipients: BTreeMap::new(),
            password_recipients: Vec::new(),
            custom_params: CustomParams::new(),
            enveloped_data: None,
            content_info: None,
            content_key: None,
            symmetric_cipher: None,
        }
    }

    pub fn options(&self) -> &CipherOptions {
        &self.options
    }

    pub fn state(&self) -> CipherState {
        self.state
    }

    pub fn is_encrypting(&self) -> bool {
        self.state == CipherState::Encrypting
    }

    pub fn is_decrypting(&self) -> bool {
        self.state == CipherState::Decrypting
    }

    fn check_not_processing(&self, operation: &str) -> Result<(), CipherError> {
        match self.state {
            CipherState::Encrypting | CipherState::Decrypting => Err(CipherError::InvalidState(
                format!("'{}' is not allowed while {:?}", operation, self.state),
            )),
            _ => Ok(()),
        }
    }

    fn has_pending_recipients(&self) -> bool {
        !self.key_recipients.is_empty() || !self.password_recipients.is_empty()
    }

    fn refresh_configuring_state(&mut self) {
        if self.has_pending_recipients() {
            self.state = CipherState::Configuring;
        } else if self.state == CipherState::Configuring {
            self.state = CipherState::Idle;
        }
    }

    /// Register a P-256 public key under `recipient_id`
    pub fn add_key_recipient(
        &mut self,
        recipient_id: &[u8],
        public_key: &[u8],
    ) -> Result<(), CipherError> {
        self.check_not_processing("add_key_recipient")?;
        if recipient_id.is_empty() {
            return Err(CipherError::InvalidArgument(
                "recipient identifier is empty".to_string(),
            ));
        }
        if public_key.is_empty() {
            return Err(CipherError::InvalidArgument("public key is empty".to_string()));
        }
        EcdhKem.check_public_key(public_key)?;
        if self.key_recipients.contains_key(recipient_id) {
            return Err(CipherError::InvalidArgument(format!(
                "recipient '{}' is already added",
                String::from_utf8_lossy(recipient_id)
            )));
        }
        self.key_recipients
            .insert(recipient_id.to_vec(), public_key.to_vec());
        self.refresh_configuring_state();
        debug!(count = self.key_recipients.len(), "Added key recipient");
        Ok(())
    }

    pub fn remove_key_recipient(&mut self, recipient_id: &[u8]) -> Result<(), CipherError> {
        self.check_not_processing("remove_key_recipient")?;
        self.key_recipients.remove(recipient_id);
        self.refresh_configuring_state();
        Ok(())
    }

    pub fn key_recipient_exists(&self, recipient_id: &[u8]) -> bool {
        self.key_recipients.contains_key(recipient_id)
    }

    /// Register a password recipient
    ///
    /// Adding a password that is already registered succeeds and leaves a
    /// single entry, so the envelope never carries two recipients for one
    /// password. This differs from [`add_key_recipient`](Self::add_key_recipient),
    /// which rejects a repeated recipient id with `InvalidArgument` since the
    /// id could name a different public key.
    pub fn add_password_recipient(&mut self, password: &[u8]) -> Result<(), CipherError> {
        self.check_not_processing("add_password_recipient")?;
        if password.is_empty() {
            return Err(CipherError::InvalidArgument("password is empty".to_string()));
        }
        if !self.password_recipient_exists(password) {
            self.password_recipients.push(SecretBytes::from_slice(password));
        }
        self.refresh_configuring_state();
        debug!(
            count = self.password_recipients.len(),
            "Added password recipient"
        );
        Ok(())
    }

    pub fn remove_password_recipient(&mut self, password: &[u8]) -> Result<(), CipherError> {
        self.check_not_processing("remove_password_recipient")?;
        self.password_recipients.retain(|p| !p.ct_eq(password));
        self.refresh_configuring_state();
        Ok(())
    }

    pub fn password_recipient_exists(&self, password: &[u8]) -> bool {
        self.password_recipients.iter().any(|p| p.ct_eq(password))
    }

    pub fn remove_all_recipients(&mut self) -> Result<(), CipherError> {
        self.check_not_processing("remove_all_recipients")?;
        self.key_recipients.clear();
        self.password_recipients.clear();
        self.refresh_configuring_state();
        Ok(())
    }

    pub fn custom_params(&self) -> &CustomParams {
        &self.custom_params
    }

    pub fn custom_params_mut(&mut self) -> &mut CustomParams {
        &mut self.custom_params
    }

    pub fn has_content_info(&self) -> bool {
        self.enveloped_data.is_some()
    }

    /// Serialized ContentInfo of the last encryption or the one supplied
    /// for decryption
    pub fn content_info(&self) -> Result<&[u8], CipherError> {
        self.content_info
            .as_deref()
            .ok_or_else(|| CipherError::InvalidState("content info is not defined".to_string()))
    }

    /// Supply a detached ContentInfo for decryption
    pub fn set_content_info(&mut self, data: &[u8]) -> Result<(), CipherError> {
        self.check_not_processing("set_content_info")?;
        let info = ContentInfo::from_asn1(data)?;
        let enveloped_data = info.enveloped_data()?;
        trace!(
            recipients = enveloped_data.recipient_count(),
            version = enveloped_data.version(),
            "Parsed content info"
        );
        self.enveloped_data = Some(enveloped_data);
        self.custom_params = info.custom_params;
        self.content_info = Some(data.to_vec());
        Ok(())
    }

    /// Byte length of the ContentInfo at the start of `data`, or 0
    pub fn define_content_info_size(data: &[u8]) -> usize {
        ContentInfo::define_size(data)
    }

    /// Consume a ContentInfo embedded at the start of `data`
    ///
    /// Returns the bytes that follow it, or all of `data` when it carries no
    /// ContentInfo.
    pub fn try_read_content_info<'a>(&mut self, data: &'a [u8]) -> Result<&'a [u8], CipherError> {
        let size = Self::define_content_info_size(data);
        if size == 0 {
            return Ok(data);
        }
        if size > data.len() {
            return Err(CipherError::InvalidFormat(format!(
                "content info needs {} bytes, only {} available",
                size,
                data.len()
            )));
        }
        self.set_content_info(&data[..size])?;
        Ok(&data[size..])
    }

    /// Pull enough of `source` to consume an embedded ContentInfo
    ///
    /// Returns the payload bytes that were read past it.
    pub fn read_content_info<S: DataSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> Result<Vec<u8>, CipherError> {
        let mut data = Vec::new();
        while data.len() < CONTENT_INFO_PROBE_SIZE && source.has_data()? {
            data.extend(source.read()?);
        }
        let size = Self::define_content_info_size(&data);
        if size > 0 {
            while data.len() < size && source.has_data()? {
                data.extend(source.read()?);
            }
        }
        Ok(self.try_read_content_info(&data)?.to_vec())
    }

    /// Generate the content key, wrap it for every pending recipient and
    /// arm the symmetric cipher for encryption
    pub fn init_encryption(&mut self) -> Result<&mut SymmetricCipher, CipherError> {
        self.check_not_processing("init_encryption")?;
        if !self.has_pending_recipients() {
            return Err(CipherError::InvalidState(
                "no recipients were added".to_string(),
            ));
        }
        self.options.validate()?;
        if let Err(e) = self.configure_encryption() {
            self.clear_cipher_info();
            return Err(e);
        }
        self.symmetric_cipher_mut()
    }

    fn configure_encryption(&mut self) -> Result<(), CipherError> {
        let mut cipher = SymmetricCipher::new(self.options.algorithm);
        let content_key = random_secret(cipher.key_length());
        cipher.set_encryption_key(content_key.as_slice())?;
        cipher.set_iv(&random_bytes(cipher.iv_size()))?;
        cipher.reset()?;
        debug!(algorithm = ?cipher.algorithm(), "Generated content encryption key");

        self.enveloped_data = Some(EnvelopedData {
            encrypted_content: EncryptedContent {
                content_encryption_algorithm: Some(cipher.algorithm_identifier()?),
                encrypted_content: Vec::new(),
            },
            ..EnvelopedData::default()
        });
        self.content_info = None;
        self.content_key = Some(content_key);
        self.symmetric_cipher = Some(cipher);
        self.state = CipherState::Encrypting;

        let kem = EcdhKem;
        self.encrypt_key_recipients(|public_key, key| {
            Ok((kem.algorithm_identifier()?, kem.wrap(key, public_key)?))
        })?;
        let pbe = PasswordCipher::new(self.options.pbkdf2_iterations)?;
        self.encrypt_password_recipients(|password, key| Ok(pbe.wrap(key, password)?))?;
        Ok(())
    }

    fn check_encrypting(&self, operation: &str) -> Result<(), CipherError> {
        if self.state != CipherState::Encrypting {
            return Err(CipherError::InvalidState(format!(
                "'{}' is only allowed after 'init_encryption'",
                operation
            )));
        }
        Ok(())
    }

    fn encryption_parts(
        &mut self,
    ) -> Result<(&SecretBytes, &mut EnvelopedData), CipherError> {
        match (self.content_key.as_ref(), self.enveloped_data.as_mut()) {
            (Some(key), Some(enveloped_data)) => Ok((key, enveloped_data)),
            _ => Err(CipherError::NotInitialized(
                "content key is not generated".to_string(),
            )),
        }
    }

    /// Wrap the content key for every pending key recipient
    ///
    /// `wrap` receives the recipient public key and the content key and
    /// returns the key encryption algorithm with the wrapped key. The pending
    /// key recipients are consumed.
    pub fn encrypt_key_recipients<F>(&mut self, mut wrap: F) -> Result<usize, CipherError>
    where
        F: FnMut(&[u8], &[u8]) -> Result<(AlgorithmIdentifier, Vec<u8>), CipherError>,
    {
        self.check_encrypting("encrypt_key_recipients")?;
        let pending = std::mem::take(&mut self.key_recipients);
        let (content_key, enveloped_data) = self.encryption_parts()?;
        for (recipient_identifier, public_key) in &pending {
            let (key_encryption_algorithm, encrypted_key) =
                wrap(public_key, content_key.as_slice())?;
            enveloped_data.key_trans_recipients.push(KeyTransRecipient {
                recipient_identifier: recipient_identifier.clone(),
                key_encryption_algorithm,
                encrypted_key,
            });
        }
        debug!(count = pending.len(), "Encrypted key recipients");
        Ok(pending.len())
    }

    /// Wrap the content key for every pending password recipient
    ///
    /// The pending password recipients are consumed.
    pub fn encrypt_password_recipients<F>(&mut self, mut wrap: F) -> Result<usize, CipherError>
    where
        F: FnMut(&[u8], &[u8]) -> Result<PasswordWrapped, CipherError>,
    {
        self.check_encrypting("encrypt_password_recipients")?;
        let pending = std::mem::take(&mut self.password_recipients);
        let (content_key, enveloped_data) = self.encryption_parts()?;
        for password in &pending {
            let wrapped = wrap(password.as_slice(), content_key.as_slice())?;
            enveloped_data.password_recipients.push(PasswordRecipient {
                key_derivation_algorithm: Some(wrapped.key_derivation_algorithm),
                key_encryption_algorithm: wrapped.key_encryption_algorithm,
                encrypted_key: wrapped.encrypted_key,
            });
        }
        debug!(count = pending.len(), "Encrypted password recipients");
        Ok(pending.len())
    }

    /// Serialize the envelope of the running encryption
    pub fn build_content_info(&mut self) -> Result<&[u8], CipherError> {
        self.check_encrypting("build_content_info")?;
        let enveloped_data = self
            .enveloped_data
            .as_ref()
            .ok_or_else(|| CipherError::NotInitialized("enveloped data".to_string()))?;
        let info = ContentInfo::from_enveloped_data(enveloped_data, self.custom_params.clone())?;
        let der = info.to_asn1()?;
        debug!(
            size = der.len(),
            recipients = enveloped_data.recipient_count(),
            "Built content info"
        );
        Ok(self.content_info.insert(der).as_slice())
    }

    /// Unwrap the content key for `recipient_id` and arm the symmetric
    /// cipher for decryption
    pub fn init_decryption_with_key(
        &mut self,
        recipient_id: &[u8],
        private_key: &[u8],
    ) -> Result<&mut SymmetricCipher, CipherError> {
        self.check_not_processing("init_decryption_with_key")?;
        if recipient_id.is_empty() {
            return Err(CipherError::InvalidArgument(
                "recipient identifier is empty".to_string(),
            ));
        }
        let kem = EcdhKem;
        kem.check_private_key(private_key)?;
        let content_key = self
            .decrypt_key_recipient(recipient_id, |algorithm, encrypted_key| {
                kem.check_algorithm(algorithm)?;
                let key = kem.unwrap(encrypted_key, private_key)?;
                Ok(SecretBytes::new(key))
            })?
            .ok_or(CipherError::NotFoundKeyRecipient)?;
        self.configure_decryption(content_key)
    }

    /// Try every password recipient with `password` and arm the symmetric
    /// cipher for decryption
    pub fn init_decryption_with_password(
        &mut self,
        password: &[u8],
    ) -> Result<&mut SymmetricCipher, CipherError> {
        self.check_not_processing("init_decryption_with_password")?;
        if password.is_empty() {
            return Err(CipherError::InvalidArgument("password is empty".to_string()));
        }
        let pbe = PasswordCipher::default();
        let content_key = self
            .decrypt_password_recipient(|recipient| {
                Ok(pbe.unwrap(
                    recipient.key_derivation_algorithm.as_ref(),
                    &recipient.key_encryption_algorithm,
                    &recipient.encrypted_key,
                    password,
                )?)
            })?
            .ok_or(CipherError::NotFoundPasswordRecipient)?;
        self.configure_decryption(content_key)
    }

    fn parsed_enveloped_data(&self) -> Result<&EnvelopedData, CipherError> {
        self.enveloped_data.as_ref().ok_or_else(|| {
            CipherError::InvalidState(
                "content info is not defined, embed it into the data or call 'set_content_info'"
                    .to_string(),
            )
        })
    }

    /// Find the key recipient with `recipient_id` and unwrap its key
    ///
    /// Returns `None` when no recipient matches or when `unwrap` reports a
    /// cryptographic failure for the matching one.
    pub fn decrypt_key_recipient<F>(
        &self,
        recipient_id: &[u8],
        mut unwrap: F,
    ) -> Result<Option<SecretBytes>, CipherError>
    where
        F: FnMut(&AlgorithmIdentifier, &[u8]) -> Result<SecretBytes, CipherError>,
    {
        let enveloped_data = self.parsed_enveloped_data()?;
        let Some(recipient) = enveloped_data
            .key_trans_recipients
            .iter()
            .find(|r| r.recipient_identifier == recipient_id)
        else {
            debug!("No key recipient matches the identifier");
            return Ok(None);
        };
        match unwrap(&recipient.key_encryption_algorithm, &recipient.encrypted_key) {
            Ok(key) => Ok(Some(key)),
            Err(CipherError::Crypto(reason)) => {
                debug!(%reason, "Key recipient matched but its key could not be unwrapped");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Try the password recipients in order and return the first key that
    /// unwraps
    pub fn decrypt_password_recipient<F>(
        &self,
        mut unwrap: F,
    ) -> Result<Option<SecretBytes>, CipherError>
    where
        F: FnMut(&PasswordRecipient) -> Result<SecretBytes, CipherError>,
    {
        let enveloped_data = self.parsed_enveloped_data()?;
        for (index, recipient) in enveloped_data.password_recipients.iter().enumerate() {
            match unwrap(recipient) {
                Ok(key) => return Ok(Some(key)),
                Err(e) => debug!(index, error = %e, "Password recipient did not match"),
            }
        }
        Ok(None)
    }

    fn configure_decryption(
        &mut self,
        content_key: SecretBytes,
    ) -> Result<&mut SymmetricCipher, CipherError> {
        let algorithm = self
            .parsed_enveloped_data()?
            .encrypted_content
            .content_encryption_algorithm
            .as_ref()
            .ok_or_else(|| {
                CipherError::InvalidFormat(
                    "content encryption algorithm is not defined".to_string(),
                )
            })?;
        let mut cipher = SymmetricCipher::from_algorithm_identifier(algorithm)?;
        cipher.set_decryption_key(content_key.as_slice())?;
        cipher.reset()?;
        debug!(algorithm = ?cipher.algorithm(), "Configured content decryption");

        self.content_key = Some(content_key);
        self.symmetric_cipher = Some(cipher);
        self.state = CipherState::Decrypting;
        self.symmetric_cipher_mut()
    }

    pub fn symmetric_cipher(&self) -> Result<&SymmetricCipher, CipherError> {
        self.symmetric_cipher
            .as_ref()
            .ok_or_else(|| CipherError::NotInitialized("symmetric cipher".to_string()))
    }

    pub fn symmetric_cipher_mut(&mut self) -> Result<&mut SymmetricCipher, CipherError> {
        self.symmetric_cipher
            .as_mut()
            .ok_or_else(|| CipherError::NotInitialized("symmetric cipher".to_string()))
    }

    /// Drop the content key and the symmetric cipher, keeping the ContentInfo
    pub fn clear_cipher_info(&mut self) {
        if let Some(cipher) = self.symmetric_cipher.as_mut() {
            cipher.clear();
        }
        self.symmetric_cipher = None;
        self.content_key = None;
        self.state = CipherState::Cleared;
    }

    /// Forget everything: recipients, key material, ContentInfo and custom
    /// parameters
    pub fn clear(&mut self) {
        self.clear_cipher_info();
        self.key_recipients.clear();
        self.password_recipients.clear();
        self.custom_params.clear();
        self.enveloped_data = None;
        self.content_info = None;
    }

    /// Re-wrap a content key for another public key
    ///
    /// `encrypted_key` is a key wrapped for `private_key`'s public half; the
    /// result is the same content key wrapped for `public_key`, so a new
    /// recipient can be added without touching the encrypted payload.
    pub fn reencrypt_key(
        encrypted_key: &[u8],
        public_key: &[u8],
        private_key: &[u8],
    ) -> Result<Vec<u8>, CipherError> {
        let kem = EcdhKem;
        let key = SecretBytes::new(kem.unwrap(encrypted_key, private_key)?);
        Ok(kem.wrap(key.as_slice(), public_key)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmsenvelope_crypto::KeyPair;

    const BOB: &[u8] = b"valid-bob-id";
    const ALICE: &[u8] = b"valid-alice-id";

    #[test]
    fn test_add_key_recipient() {
        let pair = KeyPair::generate();
        let mut base = CipherBase::new();
        base.add_key_recipient(BOB, pair.public_key()).unwrap();
        assert_eq!(base.state(), CipherState::Configuring);
        assert!(base.key_recipient_exists(BOB));
        assert!(!base.key_recipient_exists(ALICE));
        assert!(!base.key_recipient_exists(b""));

        assert!(matches!(
            base.add_key_recipient(b"", pair.public_key()),
            Err(CipherError::InvalidArgument(_))
        ));
        assert!(matches!(
            base.add_key_recipient(ALICE, b""),
            Err(CipherError::InvalidArgument(_))
        ));
        assert!(matches!(
            base.add_key_recipient(ALICE, b"invalid public key"),
            Err(CipherError::InvalidArgument(_))
        ));
        assert!(matches!(
            base.add_key_recipient(BOB, pair.public_key()),
            Err(CipherError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_remove_recipients() {
        let pair = KeyPair::generate();
        let mut base = CipherBase::new();
        base.add_key_recipient(BOB, pair.public_key()).unwrap();
        base.remove_key_recipient(ALICE).unwrap();
        base.remove_key_recipient(b"").unwrap();
        assert!(base.key_recipient_exists(BOB));
        base.remove_key_recipient(BOB).unwrap();
        assert!(!base.key_recipient_exists(BOB));
        assert_eq!(base.state(), CipherState::Idle);

        base.add_password_recipient(b"valid-bob-password").unwrap();
        base.add_password_recipient(b"valid-bob-password").unwrap();
        assert!(base.password_recipient_exists(b"valid-bob-password"));
        assert!(!base.password_recipient_exists(b"valid-alice-password"));
        base.remove_password_recipient(b"valid-alice-password").unwrap();
        base.remove_password_recipient(b"valid-bob-password").unwrap();
        base.remove_password_recipient(b"valid-bob-password").unwrap();
        assert!(!base.password_recipient_exists(b"valid-bob-password"));
        assert!(matches!(
            base.add_password_recipient(b""),
            Err(CipherError::InvalidArgument(_))
        ));

        base.add_key_recipient(BOB, pair.public_key()).unwrap();
        base.add_password_recipient(b"pw").unwrap();
        base.remove_all_recipients().unwrap();
        assert!(!base.key_recipient_exists(BOB));
        assert!(!base.password_recipient_exists(b"pw"));
    }

    #[test]
    fn test_encryption_consumes_recipients() {
        let pair = KeyPair::generate();
        let mut base = CipherBase::new();
        base.add_key_recipient(BOB, pair.public_key()).unwrap();
        base.add_password_recipient(b"password").unwrap();

        base.init_encryption().unwrap();
        assert!(base.is_encrypting());
        assert!(!base.key_recipient_exists(BOB));
        assert!(!base.password_recipient_exists(b"password"));

        let info = base.build_content_info().unwrap().to_vec();
        assert_eq!(CipherBase::define_content_info_size(&info), info.len());

        // Registry is frozen while processing
        assert!(matches!(
            base.add_password_recipient(b"late"),
            Err(CipherError::InvalidState(_))
        ));

        base.clear_cipher_info();
        assert_eq!(base.state(), CipherState::Cleared);
        assert_eq!(base.content_info().unwrap(), info.as_slice());
        assert!(matches!(
            base.init_encryption(),
            Err(CipherError::InvalidState(_))
        ));
    }

    #[test]
    fn test_duplicate_recipients() {
        use cmsenvelope_protocol::{Asn1Compatible, ContentInfo};

        let pair = KeyPair::generate();
        let mut base = CipherBase::new();
        base.add_key_recipient(BOB, pair.public_key()).unwrap();
        assert!(matches!(
            base.add_key_recipient(BOB, KeyPair::generate().public_key()),
            Err(CipherError::InvalidArgument(_))
        ));

        base.add_password_recipient(b"password").unwrap();
        base.add_password_recipient(b"password").unwrap();
        base.init_encryption().unwrap();
        let info = ContentInfo::from_asn1(base.build_content_info().unwrap()).unwrap();
        let enveloped = info.enveloped_data().unwrap();
        assert_eq!(enveloped.key_trans_recipients.len(), 1);
        assert_eq!(enveloped.password_recipients.len(), 1);
    }

    #[test]
    fn test_out_of_order_operations() {
        let mut base = CipherBase::new();
        assert!(matches!(
            base.init_encryption(),
            Err(CipherError::InvalidState(_))
        ));
        assert!(matches!(
            base.build_content_info(),
            Err(CipherError::InvalidState(_))
        ));
        assert!(matches!(
            base.init_decryption_with_password(b"password"),
            Err(CipherError::InvalidState(_))
        ));
        assert!(matches!(
            base.content_info(),
            Err(CipherError::InvalidState(_))
        ));
        assert!(matches!(
            base.symmetric_cipher(),
            Err(CipherError::NotInitialized(_))
        ));
    }

    #[test]
    fn test_decrypt_key_recipient_lookup() {
        let bob = KeyPair::generate();
        let mut base = CipherBase::new();
        base.add_key_recipient(BOB, bob.public_key()).unwrap();
        base.init_encryption().unwrap();
        let info = base.build_content_info().unwrap().to_vec();

        let mut reader = CipherBase::new();
        reader.set_content_info(&info).unwrap();
        let missing = reader
            .decrypt_key_recipient(ALICE, |_, _| {
                panic!("unwrap must not run for an unknown recipient")
            })
            .unwrap();
        assert!(missing.is_none());

        let found = reader
            .decrypt_key_recipient(BOB, |_, _| Ok(SecretBytes::from_slice(&[1u8; 32])))
            .unwrap();
        assert!(found.is_some());

        let failed = reader
            .decrypt_key_recipient(BOB, |_, _| Err(CipherError::Crypto("bad key".into())))
            .unwrap();
        assert!(failed.is_none());
    }

    #[test]
    fn test_password_trial_order() {
        let mut base = CipherBase::new();
        for password in [&b"first"[..], b"second", b"third"] {
            base.add_password_recipient(password).unwrap();
        }
        base.init_encryption().unwrap();
        let info = base.build_content_info().unwrap().to_vec();

        let mut reader = CipherBase::new();
        reader.set_content_info(&info).unwrap();
        let mut attempts = 0;
        let key = reader
            .decrypt_password_recipient(|_| {
                attempts += 1;
                if attempts == 2 {
                    Ok(SecretBytes::from_slice(b"key"))
                } else {
                    Err(CipherError::Crypto("wrong password".into()))
                }
            })
            .unwrap();
        assert!(key.is_some());
        assert_eq!(attempts, 2);

        let none = reader
            .decrypt_password_recipient(|_| Err(CipherError::Crypto("wrong password".into())))
            .unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_try_read_content_info() {
        let pair = KeyPair::generate();
        let mut base = CipherBase::new();
        base.add_key_recipient(BOB, pair.public_key()).unwrap();
        base.init_encryption().unwrap();
        let mut data = base.build_content_info().unwrap().to_vec();
        base.clear_cipher_info();
        data.extend_from_slice(b"payload");

        let mut reader = CipherBase::new();
        assert_eq!(reader.try_read_content_info(&data).unwrap(), b"payload");
        assert!(reader.has_content_info());

        let mut plain = CipherBase::new();
        assert_eq!(plain.try_read_content_info(b"raw bytes").unwrap(), b"raw bytes");
        assert!(!plain.has_content_info());

        let mut truncated = CipherBase::new();
        assert!(matches!(
            truncated.try_read_content_info(&data[..20]),
            Err(CipherError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_reencrypt_key() {
        let bob = KeyPair::generate();
        let carol = KeyPair::generate();
        let kem = EcdhKem;
        let wrapped_for_bob = kem.wrap(&[5u8; 32], bob.public_key()).unwrap();

        let wrapped_for_carol = CipherBase::reencrypt_key(
            &wrapped_for_bob,
            carol.public_key(),
            bob.private_key().as_slice(),
        )
        .unwrap();
        let key = kem
            .unwrap(&wrapped_for_carol, carol.private_key().as_slice())
            .unwrap();
        assert_eq!(key, vec![5u8; 32]);

        assert!(CipherBase::reencrypt_key(
            &wrapped_for_bob,
            carol.public_key(),
            carol.private_key().as_slice()
        )
        .is_err());
    }

    #[test]
    fn test_clear() {
        let pair = KeyPair::generate();
        let mut base = CipherBase::new();
        base.add_key_recipient(BOB, pair.public_key()).unwrap();
        base.custom_params_mut().set_integer("answer", 42);
        base.clear();
        assert_eq!(base.state(), CipherState::Cleared);
        assert!(!base.key_recipient_exists(BOB));
        assert!(base.custom_params().is_empty());
        assert!(!base.has_content_info());
    }
}
