//! CMS envelope structures
//!
//! The envelope loosely follows RFC 5652:
//!
//! ```text
//! ContentInfo ::= SEQUENCE {
//!     version        INTEGER (0),
//!     content        CMSContent,
//!     customParams   [0] CustomParams OPTIONAL
//! }
//!
//! CMSContent ::= SEQUENCE {
//!     contentType    OBJECT IDENTIFIER,
//!     content        [0] ANY
//! }
//!
//! EnvelopedData ::= SEQUENCE {
//!     version              INTEGER,
//!     recipientInfos       SET OF RecipientInfo,
//!     encryptedContentInfo EncryptedContent
//! }
//! ```
//!
//! All structures implement [`Asn1Compatible`](crate::asn1::Asn1Compatible)
//! with [`CmsError`] as their error type.

use crate::asn1::Asn1Error;
use thiserror::Error;

pub mod content;
pub mod content_info;
pub mod encrypted_content;
pub mod enveloped_data;
pub mod key_trans;
pub mod password;

pub use content::{CmsContent, ContentType};
pub use content_info::ContentInfo;
pub use encrypted_content::EncryptedContent;
pub use enveloped_data::{EnvelopedData, RecipientInfo};
pub use key_trans::KeyTransRecipient;
pub use password::PasswordRecipient;

/// Errors raised while building or parsing CMS structures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CmsError {
    #[error("ASN.1 error: {0}")]
    Asn1(#[from] Asn1Error),

    #[error("Required field not specified: {0}")]
    RequiredField(&'static str),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported version {found} of {structure}")]
    UnsupportedVersion { structure: &'static str, found: i32 },

    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Custom parameter '{key}' is not found")]
    ParamNotFound { key: String },
}

impl CmsError {
    /// Returns true if the error describes malformed input rather than an
    /// unsupported but well-formed structure
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::Asn1(_) | Self::InvalidFormat(_) | Self::RequiredField(_)
        )
    }
}

/// Fail with [`CmsError::RequiredField`] when a mandatory byte field is empty
pub(crate) fn check_required(value: &[u8], field: &'static str) -> Result<(), CmsError> {
    if value.is_empty() {
        return Err(CmsError::RequiredField(field));
    }
    Ok(())
}
