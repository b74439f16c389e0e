//! Source-to-sink encryption of a single continuous stream

use crate::cipher_base::CipherBase;
use crate::config::CipherOptions;
use crate::data::{write_checked, DataSink, DataSource, IoDataSink, IoDataSource};
use crate::error::CipherError;
use std::io::{Read, Write};
use std::ops::{Deref, DerefMut};
use tracing::debug;

/// Encrypts or decrypts everything a [`DataSource`] yields into a
/// [`DataSink`]
///
/// Memory use is bounded by the source read size: every portion read is
/// encrypted or decrypted and written before the next one is pulled.
#[derive(Debug, Default)]
pub struct StreamCipher {
    base: CipherBase,
}

impl StreamCipher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CipherOptions) -> Self {
        Self {
            base: CipherBase::with_options(options),
        }
    }

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
        let result = self.encrypt_stream(source, sink, embed_content_info);
        self.base.clear_cipher_info();
        result
    }

    fn encrypt_stream<S, K>(
        &mut self,
        source: &mut S,
        sink: &mut K,
        embed_content_info: bool,
    ) -> Result<(), CipherError>
    where
        S: DataSource + ?Sized,
        K: DataSink + ?Sized,
    {
        self.base.init_encryption()?;
        let content_info = self.base.build_content_info()?;
        if embed_content_info {
            write_checked(sink, content_info)?;
        }
        self.pump(Vec::new(), source, sink)
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
        let result = self.base.read_content_info(source).and_then(|head| {
            self.base.init_decryption_with_key(recipient_id, private_key)?;
            self.pump(head, source, sink)
        });
        self.base.clear_cipher_info();
        result
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
        let result = self.base.read_content_info(source).and_then(|head| {
            self.base.init_decryption_with_password(password)?;
            self.pump(head, source, sink)
        });
        self.base.clear_cipher_info();
        result
    }

    /// Run `head` and the rest of `source` through the armed cipher
    /// Encrypt from a reader into a writer, pulling
    /// [`CipherOptions::stream_read_size`] bytes at a time
    pub fn encrypt_io<R: Read, W: Write>(
        &mut self,
        reader: R,
        writer: W,
        embed_content_info: bool,
    ) -> Result<(), CipherError> {
        let mut source = IoDataSource::with_options(reader, self.base.options());
        self.encrypt(&mut source, &mut IoDataSink::new(writer), embed_content_info)
    }

    pub fn decrypt_io_with_key<R: Read, W: Write>(
        &mut self,
        reader: R,
        writer: W,
        recipient_id: &[u8],
        private_key: &[u8],
    ) -> Result<(), CipherError> {
        let mut source = IoDataSource::with_options(reader, self.base.options());
        self.decrypt_with_key(
            &mut source,
            &mut IoDataSink::new(writer),
            recipient_id,
            private_key,
        )
    }

    pub fn decrypt_io_with_password<R: Read, W: Write>(
        &mut self,
        reader: R,
        writer: W,
        password: &[u8],
    ) -> Result<(), CipherError> {
        let mut source = IoDataSource::with_options(reader, self.base.options());
        self.decrypt_with_password(&mut source, &mut IoDataSink::new(writer), password)
    }

    fn pump<S, K>(&mut self, head: Vec<u8>, source: &mut S, sink: &mut K) -> Result<(), CipherError>
    where
        S: DataSource + ?Sized,
        K: DataSink + ?Sized,
    {
        let cipher = self.base.symmetric_cipher_mut()?;
        let mut processed = head.len();
        write_checked(sink, &cipher.update(&head)?)?;
        while source.has_data()? {
            let data = source.read()?;
            processed += data.len();
            write_checked(sink, &cipher.update(&data)?)?;
        }
        write_checked(sink, &cipher.finish()?)?;
        debug!(bytes = processed, "Stream processed");
        Ok(())
    }
}

impl Deref for StreamCipher {
    type Target = CipherBase;

    fn deref(&self) -> &CipherBase {
        &self.base
    }
}

impl DerefMut for StreamCipher {
    fn deref_mut(&mut self) -> &mut CipherBase {
        &mut self.base
    }
}
