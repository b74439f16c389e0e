//! CMSContent and the content type registry

use super::CmsError;
use crate::asn1::oid::known;
use crate::asn1::{Asn1Compatible, Asn1Reader, Asn1Writer, Oid};

const CONTENT_TAG: u8 = 0;

/// CMS content types, each bound to exactly one OID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Data,
    SignedData,
    EnvelopedData,
    DigestedData,
    EncryptedData,
    AuthenticatedData,
    SignedAndEnvelopedData,
    DataWithAttributes,
    EncryptedPrivateKeyInfo,
}

impl ContentType {
    pub const ALL: [ContentType; 9] = [
        ContentType::Data,
        ContentType::SignedData,
        ContentType::EnvelopedData,
        ContentType::DigestedData,
        ContentType::EncryptedData,
        ContentType::AuthenticatedData,
        ContentType::SignedAndEnvelopedData,
        ContentType::DataWithAttributes,
        ContentType::EncryptedPrivateKeyInfo,
    ];

    pub fn oid(self) -> Oid {
        match self {
            ContentType::Data => known::pkcs7_data(),
            ContentType::SignedData => known::pkcs7_signed_data(),
            ContentType::EnvelopedData => known::pkcs7_enveloped_data(),
            ContentType::DigestedData => known::pkcs7_digested_data(),
            ContentType::EncryptedData => known::pkcs7_encrypted_data(),
            ContentType::AuthenticatedData => known::pkcs9_authenticated_data(),
            ContentType::SignedAndEnvelopedData => known::pkcs7_signed_and_enveloped_data(),
            ContentType::DataWithAttributes => known::pkcs7_data_with_attributes(),
            ContentType::EncryptedPrivateKeyInfo => known::pkcs7_encrypted_private_key_info(),
        }
    }

    pub fn from_oid(oid: &Oid) -> Result<Self, CmsError> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.oid() == *oid)
            .ok_or_else(|| CmsError::UnsupportedAlgorithm(format!("content type {}", oid)))
    }
}

/// A typed content blob
///
/// `content` holds the complete DER encoding of the inner structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmsContent {
    pub content_type: ContentType,
    pub content: Vec<u8>,
}

impl Default for CmsContent {
    fn default() -> Self {
        Self {
            content_type: ContentType::Data,
            content: Vec::new(),
        }
    }
}

impl Asn1Compatible for CmsContent {
    type Error = CmsError;

    fn asn1_write(&self, writer: &mut Asn1Writer) -> Result<usize, CmsError> {
        super::check_required(&self.content, "CMSContent.content")?;
        let mut len = writer.write_data(&self.content)?;
        len += writer.write_context_tag(CONTENT_TAG, len)?;
        len += writer.write_oid(&self.content_type.oid())?;
        len += writer.write_sequence(len)?;
        Ok(len)
    }

    fn asn1_read(reader: &mut Asn1Reader) -> Result<Self, CmsError> {
        reader.read_sequence()?;
        let content_type = ContentType::from_oid(&reader.read_oid()?)?;
        if reader.read_context_tag(CONTENT_TAG)? == 0 {
            return Err(CmsError::InvalidFormat(
                "CMSContent has no [0] content".to_string(),
            ));
        }
        let content = reader.read_data()?;
        Ok(Self {
            content_type,
            content,
        })
    }
}
