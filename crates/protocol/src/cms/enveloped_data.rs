//! EnvelopedData and the recipient union

use super::{CmsError, EncryptedContent, KeyTransRecipient, PasswordRecipient};
use crate::asn1::{tag, Asn1Compatible, Asn1Reader, Asn1Writer};
use tracing::trace;

const ORIGINATOR_INFO_TAG: u8 = 0;
const KEY_AGREE_RECIPIENT_TAG: u8 = 1;
const KEK_RECIPIENT_TAG: u8 = 2;
const PASSWORD_RECIPIENT_TAG: u8 = 3;
const OTHER_RECIPIENT_TAG: u8 = 4;

/// One element of `recipientInfos`
///
/// Key transport recipients are untagged SEQUENCEs inside the SET; password
/// recipients are wrapped in `[3]`. Key agreement `[1]`, KEK `[2]` and other
/// `[4]` recipients are recognized but rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipientInfo {
    KeyTrans(KeyTransRecipient),
    Password(PasswordRecipient),
}

impl RecipientInfo {
    /// Encode as a SET element
    pub fn to_element(&self) -> Result<Vec<u8>, CmsError> {
        match self {
            RecipientInfo::KeyTrans(recipient) => recipient.to_asn1(),
            RecipientInfo::Password(recipient) => {
                let mut writer = Asn1Writer::new();
                let len = recipient.asn1_write(&mut writer)?;
                writer.write_context_tag(PASSWORD_RECIPIENT_TAG, len)?;
                Ok(writer.finish()?)
            }
        }
    }

    /// Decode one SET element, dispatching on its tag
    pub fn from_element(element: &[u8]) -> Result<Self, CmsError> {
        let first = element.first().copied().ok_or_else(|| {
            CmsError::InvalidFormat("empty RecipientInfo element".to_string())
        })?;
        match first {
            tag::SEQUENCE => Ok(RecipientInfo::KeyTrans(KeyTransRecipient::from_asn1(
                element,
            )?)),
            t if t == tag::context(PASSWORD_RECIPIENT_TAG) => {
                let mut reader = Asn1Reader::new(element);
                reader.read_context_tag(PASSWORD_RECIPIENT_TAG)?;
                Ok(RecipientInfo::Password(PasswordRecipient::asn1_read(
                    &mut reader,
                )?))
            }
            t if t == tag::context(KEY_AGREE_RECIPIENT_TAG) => Err(CmsError::UnsupportedAlgorithm(
                "KeyAgreeRecipientInfo is not supported".to_string(),
            )),
            t if t == tag::context(KEK_RECIPIENT_TAG) => Err(CmsError::UnsupportedAlgorithm(
                "KEKRecipientInfo is not supported".to_string(),
            )),
            t if t == tag::context(OTHER_RECIPIENT_TAG) => Err(CmsError::UnsupportedAlgorithm(
                "OtherRecipientInfo is not supported".to_string(),
            )),
            other => Err(CmsError::InvalidFormat(format!(
                "unexpected RecipientInfo tag 0x{:02x}",
                other
            ))),
        }
    }
}

/// Content encrypted for any number of key and password recipients
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvelopedData {
    pub key_trans_recipients: Vec<KeyTransRecipient>,
    pub password_recipients: Vec<PasswordRecipient>,
    pub encrypted_content: EncryptedContent,
}

impl EnvelopedData {
    /// CMS version derived from the recipient kinds present
    pub fn version(&self) -> i32 {
        if !self.password_recipients.is_empty() {
            3
        } else if !self.key_trans_recipients.is_empty() {
            2
        } else {
            0
        }
    }

    pub fn recipient_count(&self) -> usize {
        self.key_trans_recipients.len() + self.password_recipients.len()
    }

    /// All recipients as a single list, key transport recipients first
    pub fn recipients(&self) -> Vec<RecipientInfo> {
        self.key_trans_recipients
            .iter()
            .cloned()
            .map(RecipientInfo::KeyTrans)
            .chain(
                self.password_recipients
                    .iter()
                    .cloned()
                    .map(RecipientInfo::Password),
            )
            .collect()
    }
}

impl Asn1Compatible for EnvelopedData {
    type Error = CmsError;

    fn asn1_write(&self, writer: &mut Asn1Writer) -> Result<usize, CmsError> {
        if self.recipient_count() == 0 {
            return Err(CmsError::RequiredField("EnvelopedData.recipientInfos"));
        }
        let mut len = self.encrypted_content.asn1_write(writer)?;

        let elements = self
            .recipients()
            .iter()
            .map(RecipientInfo::to_element)
            .collect::<Result<Vec<_>, _>>()?;
        len += writer.write_set(&elements)?;
        len += writer.write_integer(self.version())?;
        len += writer.write_sequence(len)?;
        Ok(len)
    }

    fn asn1_read(reader: &mut Asn1Reader) -> Result<Self, CmsError> {
        reader.read_sequence()?;
        // Version is derived from the recipients, the stored value is not trusted
        reader.read_integer()?;
        let originator_len = reader.read_context_tag(ORIGINATOR_INFO_TAG)?;
        if originator_len > 0 {
            reader.skip(originator_len)?;
        }

        let mut data = EnvelopedData::default();
        let mut remaining = reader.read_set()?;
        while remaining > 0 {
            let element = reader.read_data()?;
            remaining = remaining.saturating_sub(element.len());
            match RecipientInfo::from_element(&element)? {
                RecipientInfo::KeyTrans(r) => data.key_trans_recipients.push(r),
                RecipientInfo::Password(r) => data.password_recipients.push(r),
            }
        }
        trace!(
            key_trans = data.key_trans_recipients.len(),
            password = data.password_recipients.len(),
            "parsed recipient infos"
        );

        data.encrypted_content = EncryptedContent::asn1_read(reader)?;
        Ok(data)
    }
}
