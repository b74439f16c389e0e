//! CMS envelope encryption
//!
//! Data is encrypted once under a random content key; the key is wrapped for
//! every recipient, either with an EC P-256 public key or with a password.
//! The wrapped keys and the content encryption parameters travel in a DER
//! encoded CMS ContentInfo that is embedded ahead of the ciphertext or kept
//! separately.
//!
//! Four strategies share the recipient handling of [`CipherBase`]:
//!
//! - [`Cipher`] for whole messages in memory
//! - [`StreamCipher`] from a [`DataSource`] to a [`DataSink`]
//! - [`ChunkCipher`] for independently decryptable fixed-size chunks
//! - [`SeqCipher`] for caller-driven `start`/`process`/`finish` sequences
//!
//! # Example
//!
//! ```
//! use cmsenvelope::{Cipher, KeyPair};
//!
//! let bob = KeyPair::generate();
//! let mut cipher = Cipher::new();
//! cipher.add_key_recipient(b"bob", bob.public_key())?;
//! cipher.add_password_recipient(b"alice's password")?;
//! let encrypted = cipher.encrypt(b"this string will be encrypted", true)?;
//!
//! let mut reader = Cipher::new();
//! let plaintext = reader.decrypt_with_key(&encrypted, b"bob", bob.private_key().as_slice())?;
//! assert_eq!(plaintext, b"this string will be encrypted");
//! # Ok::<(), cmsenvelope::CipherError>(())
//! ```

pub mod chunk_cipher;
pub mod cipher;
pub mod cipher_base;
pub mod config;
pub mod content_info_filter;
pub mod data;
pub mod error;
pub mod prelude;
pub mod seq_cipher;
pub mod stream_cipher;

pub use chunk_cipher::{ChunkCipher, CHUNK_SIZE_PARAM};
pub use cipher::Cipher;
pub use cipher_base::{CipherBase, CipherState};
pub use config::CipherOptions;
pub use content_info_filter::{ContentInfoFilter, FilterState};
pub use data::{BytesDataSource, DataSink, DataSource, IoDataSink, IoDataSource, VecDataSink};
pub use error::{CipherError, ErrorKind};
pub use seq_cipher::SeqCipher;
pub use stream_cipher::StreamCipher;

pub use cmsenvelope_crypto::{KeyPair, SecretBytes, Signer, SymmetricAlgorithm};
pub use cmsenvelope_protocol::CustomParams;

// Lower layers for callers that build envelopes by hand
pub use cmsenvelope_crypto as crypto;
pub use cmsenvelope_protocol as protocol;
