//! Commonly used types in one import
//!
//! # Example
//!
//! ```rust
//! use cmsenvelope::prelude::*;
//!
//! # fn example() -> Result<(), CipherError> {
//! let mut cipher = SeqCipher::with_options(CipherOptions::default());
//! cipher.add_password_recipient(b"password")?;
//! let header = cipher.start_encryption()?;
//! let mut encrypted = cipher.process(b"portion")?;
//! encrypted.extend(cipher.finish()?);
//! assert!(!header.is_empty());
//! # Ok(())
//! # }
//! ```

pub use crate::{
    BytesDataSource, ChunkCipher, Cipher, CipherBase, CipherError, CipherOptions, CipherState,
    CustomParams, DataSink, DataSource, ErrorKind, IoDataSink, IoDataSource, KeyPair, SeqCipher,
    StreamCipher, SymmetricAlgorithm, VecDataSink,
};
