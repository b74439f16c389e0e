//! Top level envelope

use super::{CmsContent, CmsError, ContentType, EnvelopedData};
use crate::asn1::{decode_length, tag, Asn1Compatible, Asn1Reader, Asn1Writer};
use crate::custom_params::CustomParams;

const VERSION: i32 = 0;
const CUSTOM_PARAMS_TAG: u8 = 0;

/// Versioned wrapper around a [`CmsContent`] with optional [`CustomParams`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentInfo {
    pub cms_content: CmsContent,
    pub custom_params: CustomParams,
}

impl ContentInfo {
    /// Wrap enveloped data
    pub fn from_enveloped_data(
        enveloped_data: &EnvelopedData,
        custom_params: CustomParams,
    ) -> Result<Self, CmsError> {
        Ok(Self {
            cms_content: CmsContent {
                content_type: ContentType::EnvelopedData,
                content: enveloped_data.to_asn1()?,
            },
            custom_params,
        })
    }

    /// Parse the content as enveloped data
    pub fn enveloped_data(&self) -> Result<EnvelopedData, CmsError> {
        if self.cms_content.content_type != ContentType::EnvelopedData {
            return Err(CmsError::UnsupportedAlgorithm(format!(
                "expected enveloped data, found {:?}",
                self.cms_content.content_type
            )));
        }
        EnvelopedData::from_asn1(&self.cms_content.content)
    }

    /// Determine the byte length of a ContentInfo at the start of `data`
    ///
    /// Only the outer SEQUENCE header and the version INTEGER are inspected, so
    /// `data` may be a prefix of the full structure. Returns 0 when `data` does
    /// not start with a ContentInfo.
    pub fn define_size(data: &[u8]) -> usize {
        if data.first() != Some(&tag::SEQUENCE) {
            return 0;
        }
        let Ok((len, header)) = decode_length(&data[1..]) else {
            return 0;
        };
        let body = &data[1 + header..];
        // A minimal version INTEGER is three bytes; longer forms still fit in six
        let probe = &body[..body.len().min(6)];
        match Asn1Reader::new(probe).read_integer() {
            Ok(VERSION) => len + 1 + header,
            _ => 0,
        }
    }
}

impl Asn1Compatible for ContentInfo {
    type Error = CmsError;

    fn asn1_write(&self, writer: &mut Asn1Writer) -> Result<usize, CmsError> {
        let mut len = 0;
        if !self.custom_params.is_empty() {
            len += self.custom_params.asn1_write(writer)?;
            len += writer.write_context_tag(CUSTOM_PARAMS_TAG, len)?;
        }
        len += self.cms_content.asn1_write(writer)?;
        len += writer.write_integer(VERSION)?;
        len += writer.write_sequence(len)?;
        Ok(len)
    }

    fn asn1_read(reader: &mut Asn1Reader) -> Result<Self, CmsError> {
        reader.read_sequence()?;
        let version = reader.read_integer()?;
        if version != VERSION {
            return Err(CmsError::UnsupportedVersion {
                structure: "ContentInfo",
                found: version,
            });
        }
        let cms_content = CmsContent::asn1_read(reader)?;
        let custom_params = if reader.read_context_tag(CUSTOM_PARAMS_TAG)? > 0 {
            CustomParams::asn1_read(reader)?
        } else {
            CustomParams::default()
        };
        Ok(Self {
            cms_content,
            custom_params,
        })
    }
}
