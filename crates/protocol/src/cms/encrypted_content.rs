//! EncryptedContentInfo
//!
//! ```text
//! EncryptedContentInfo ::= SEQUENCE {
//!     contentType                 OBJECT IDENTIFIER (data),
//!     contentEncryptionAlgorithm  AlgorithmIdentifier,
//!     encryptedContent            [0] OCTET STRING OPTIONAL
//! }
//! ```

use super::{CmsError, ContentType};
use crate::algorithm::AlgorithmIdentifier;
use crate::asn1::{Asn1Compatible, Asn1Reader, Asn1Writer};

const ENCRYPTED_CONTENT_TAG: u8 = 0;

/// Content encryption parameters and, optionally, the ciphertext itself
///
/// The ciphertext is normally carried outside of the envelope, in which case
/// `encrypted_content` stays empty and the field is omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncryptedContent {
    pub content_encryption_algorithm: Option<AlgorithmIdentifier>,
    pub encrypted_content: Vec<u8>,
}

impl Asn1Compatible for EncryptedContent {
    type Error = CmsError;

    fn asn1_write(&self, writer: &mut Asn1Writer) -> Result<usize, CmsError> {
        let algorithm = self
            .content_encryption_algorithm
            .as_ref()
            .ok_or(CmsError::RequiredField(
                "EncryptedContent.contentEncryptionAlgorithm",
            ))?;

        let mut len = 0;
        if !self.encrypted_content.is_empty() {
            len += writer.write_octet_string(&self.encrypted_content)?;
            len += writer.write_context_tag(ENCRYPTED_CONTENT_TAG, len)?;
        }
        len += algorithm.asn1_write(writer)?;
        len += writer.write_oid(&ContentType::Data.oid())?;
        len += writer.write_sequence(len)?;
        Ok(len)
    }

    fn asn1_read(reader: &mut Asn1Reader) -> Result<Self, CmsError> {
        reader.read_sequence()?;
        // Content type is always data
        reader.read_oid()?;
        let content_encryption_algorithm = Some(AlgorithmIdentifier::asn1_read(reader)?);
        let encrypted_content = if reader.read_context_tag(ENCRYPTED_CONTENT_TAG)? > 0 {
            reader.read_octet_string()?
        } else {
            Vec::new()
        };
        Ok(Self {
            content_encryption_algorithm,
            encrypted_content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asn1::oid::known;

    fn algorithm() -> AlgorithmIdentifier {
        AlgorithmIdentifier::with_octet_string(known::aes256_gcm(), &[1u8; 12]).unwrap()
    }

    #[test]
    fn test_detached_content() {
        let content = EncryptedContent {
            content_encryption_algorithm: Some(algorithm()),
            encrypted_content: Vec::new(),
        };
        let der = content.to_asn1().unwrap();
        assert_eq!(EncryptedContent::from_asn1(&der).unwrap(), content);
    }

    #[test]
    fn test_embedded_content() {
        let content = EncryptedContent {
            content_encryption_algorithm: Some(algorithm()),
            encrypted_content: b"ciphertext".to_vec(),
        };
        let der = content.to_asn1().unwrap();
        let parsed = EncryptedContent::from_asn1(&der).unwrap();
        assert_eq!(parsed.encrypted_content, b"ciphertext".to_vec());
    }

    #[test]
    fn test_missing_algorithm() {
        assert!(matches!(
            EncryptedContent::default().to_asn1(),
            Err(CmsError::RequiredField(_))
        ));
    }
}
