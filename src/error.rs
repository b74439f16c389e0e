//! Unified error type for the cipher API
//!
//! The protocol and crypto crates keep their domain-specific errors for
//! precise handling. Everything that crosses the cipher API is folded into
//! [`CipherError`], whose variants are the error kinds callers act on.
//!
//! # Example
//!
//! ```no_run
//! use cmsenvelope::{Cipher, CipherError};
//!
//! fn open(data: &[u8], password: &[u8]) -> Result<Vec<u8>, CipherError> {
//!     let mut cipher = Cipher::new();
//!     match cipher.decrypt_with_password(data, password) {
//!         Err(CipherError::NotFoundPasswordRecipient) => Err(CipherError::InvalidArgument(
//!             "wrong password".to_string(),
//!         )),
//!         other => other,
//!     }
//! }
//! ```

use cmsenvelope_crypto::{HashError, KemError, KeyError, PbeError, SymmetricError};
use cmsenvelope_protocol::{Asn1Error, CmsError};
use thiserror::Error;

/// Coarse classification of a [`CipherError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    InvalidState,
    InvalidFormat,
    UnsupportedAlgorithm,
    NotFoundKeyRecipient,
    NotFoundPasswordRecipient,
    ExceededMaxSize,
    NotInitialized,
    Io,
    Crypto,
}

/// Unified error type for all cipher operations
#[derive(Debug, Error)]
pub enum CipherError {
    /// Empty or malformed caller input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation called out of order
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Structurally malformed envelope
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Recipient with given identifier is not found")]
    NotFoundKeyRecipient,

    #[error("Recipient with given password is not found")]
    NotFoundPasswordRecipient,

    #[error("Structure size {requested} exceeds the maximum of {max} bytes")]
    ExceededMaxSize { requested: usize, max: usize },

    #[error("Not initialized: {0}")]
    NotInitialized(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure reported by a cryptographic engine
    #[error("Crypto error: {0}")]
    Crypto(String),
}

impl CipherError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::InvalidFormat(_) => ErrorKind::InvalidFormat,
            Self::UnsupportedAlgorithm(_) => ErrorKind::UnsupportedAlgorithm,
            Self::NotFoundKeyRecipient => ErrorKind::NotFoundKeyRecipient,
            Self::NotFoundPasswordRecipient => ErrorKind::NotFoundPasswordRecipient,
            Self::ExceededMaxSize { .. } => ErrorKind::ExceededMaxSize,
            Self::NotInitialized(_) => ErrorKind::NotInitialized,
            Self::Io(_) => ErrorKind::Io,
            Self::Crypto(_) => ErrorKind::Crypto,
        }
    }

    /// Returns true if the input data is malformed
    pub fn is_format_error(&self) -> bool {
        matches!(self, Self::InvalidFormat(_) | Self::ExceededMaxSize { .. })
    }

    /// Returns true if an operation was called out of sequence
    pub fn is_state_error(&self) -> bool {
        matches!(self, Self::InvalidState(_) | Self::NotInitialized(_))
    }

    /// Returns true if no recipient matched the supplied credential
    pub fn is_recipient_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFoundKeyRecipient | Self::NotFoundPasswordRecipient
        )
    }

    /// Returns a suggestion for resolving this error
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::NotFoundKeyRecipient => Some(
                "Check that the recipient identifier and private key match one of the recipients the data was encrypted for",
            ),
            Self::NotFoundPasswordRecipient => Some("Check the password"),
            Self::InvalidState(_) | Self::NotInitialized(_) => {
                Some("Call one of the 'start' or 'init' operations before processing data")
            }
            Self::InvalidFormat(_) => Some(
                "The envelope is corrupted or was not produced by this library; supply the content info separately if it was detached",
            ),
            _ => None,
        }
    }
}

impl From<Asn1Error> for CipherError {
    fn from(err: Asn1Error) -> Self {
        match err {
            Asn1Error::InvalidState(msg) => Self::InvalidState(msg.to_string()),
            Asn1Error::InvalidArgument(msg) => Self::InvalidArgument(msg),
            Asn1Error::ExceededMaxSize { requested, max } => {
                Self::ExceededMaxSize { requested, max }
            }
            other => Self::InvalidFormat(other.to_string()),
        }
    }
}

impl From<CmsError> for CipherError {
    fn from(err: CmsError) -> Self {
        match err {
            CmsError::Asn1(e) => e.into(),
            CmsError::RequiredField(_) | CmsError::ParamNotFound { .. } => {
                Self::InvalidArgument(err.to_string())
            }
            CmsError::UnsupportedAlgorithm(msg) => Self::UnsupportedAlgorithm(msg),
            CmsError::InvalidFormat(_) | CmsError::UnsupportedVersion { .. } => {
                Self::InvalidFormat(err.to_string())
            }
        }
    }
}

impl From<SymmetricError> for CipherError {
    fn from(err: SymmetricError) -> Self {
        match err {
            SymmetricError::Encoding(e) => e.into(),
            SymmetricError::NotConfigured(msg) => Self::InvalidState(msg.to_string()),
            SymmetricError::UnsupportedAlgorithm(msg) => Self::UnsupportedAlgorithm(msg),
            SymmetricError::InvalidCiphertextLength(_) => Self::InvalidFormat(err.to_string()),
            SymmetricError::AuthenticationFailed | SymmetricError::InvalidPadding => {
                Self::Crypto(err.to_string())
            }
            _ => Self::InvalidArgument(err.to_string()),
        }
    }
}

impl From<KemError> for CipherError {
    fn from(err: KemError) -> Self {
        match err {
            KemError::UnsupportedAlgorithm(msg) => Self::UnsupportedAlgorithm(msg),
            KemError::InvalidPublicKey | KemError::InvalidPrivateKey => {
                Self::InvalidArgument(err.to_string())
            }
            _ => Self::Crypto(err.to_string()),
        }
    }
}

impl From<PbeError> for CipherError {
    fn from(err: PbeError) -> Self {
        match err {
            PbeError::Cipher(e) => e.into(),
            PbeError::InvalidParams(e) => Self::InvalidFormat(e.to_string()),
            PbeError::UnsupportedKdf(msg) => Self::UnsupportedAlgorithm(msg),
            PbeError::MissingKdf => Self::InvalidFormat(err.to_string()),
            PbeError::TooFewIterations(_) | PbeError::EmptyPassword => {
                Self::InvalidArgument(err.to_string())
            }
        }
    }
}

impl From<KeyError> for CipherError {
    fn from(err: KeyError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

impl From<HashError> for CipherError {
    fn from(err: HashError) -> Self {
        match err {
            HashError::NotStarted => Self::InvalidState(err.to_string()),
            _ => Self::Crypto(err.to_string()),
        }
    }
}
