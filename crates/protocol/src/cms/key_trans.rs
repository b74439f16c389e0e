//! Key transport recipient
//!
//! ```text
//! KeyTransRecipientInfo ::= SEQUENCE {
//!     version                 INTEGER (2),
//!     rid                     [0] OCTET STRING,
//!     keyEncryptionAlgorithm  AlgorithmIdentifier,
//!     encryptedKey            OCTET STRING
//! }
//! ```

use super::{check_required, CmsError};
use crate::algorithm::AlgorithmIdentifier;
use crate::asn1::{Asn1Compatible, Asn1Reader, Asn1Writer};

const VERSION: i32 = 2;
const RID_TAG: u8 = 0;

/// Recipient whose content key is wrapped with a public key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTransRecipient {
    /// Opaque caller supplied identifier, used only for lookup
    pub recipient_identifier: Vec<u8>,
    pub key_encryption_algorithm: AlgorithmIdentifier,
    pub encrypted_key: Vec<u8>,
}

impl Asn1Compatible for KeyTransRecipient {
    type Error = CmsError;

    fn asn1_write(&self, writer: &mut Asn1Writer) -> Result<usize, CmsError> {
        check_required(&self.recipient_identifier, "KeyTransRecipient.rid")?;
        check_required(&self.encrypted_key, "KeyTransRecipient.encryptedKey")?;

        let mut len = writer.write_octet_string(&self.encrypted_key)?;
        len += self.key_encryption_algorithm.asn1_write(writer)?;
        let rid_len = writer.write_octet_string(&self.recipient_identifier)?;
        len += rid_len + writer.write_context_tag(RID_TAG, rid_len)?;
        len += writer.write_integer(VERSION)?;
        len += writer.write_sequence(len)?;
        Ok(len)
    }

    fn asn1_read(reader: &mut Asn1Reader) -> Result<Self, CmsError> {
        reader.read_sequence()?;
        let version = reader.read_integer()?;
        if version != VERSION {
            return Err(CmsError::UnsupportedVersion {
                structure: "KeyTransRecipientInfo",
                found: version,
            });
        }
        if reader.read_context_tag(RID_TAG)? == 0 {
            return Err(CmsError::InvalidFormat(
                "KeyTransRecipientInfo has no [0] recipient identifier".to_string(),
            ));
        }
        let recipient_identifier = reader.read_octet_string()?;
        let key_encryption_algorithm = AlgorithmIdentifier::asn1_read(reader)?;
        let encrypted_key = reader.read_octet_string()?;
        Ok(Self {
            recipient_identifier,
            key_encryption_algorithm,
            encrypted_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asn1::oid::known;

    fn recipient() -> KeyTransRecipient {
        KeyTransRecipient {
            recipient_identifier: b"2e8176ba-34db-4c65-b977-c5eac687c4ac".to_vec(),
            key_encryption_algorithm: AlgorithmIdentifier::with_oid(
                known::ec_public_key(),
                &known::prime256v1(),
            )
            .unwrap(),
            encrypted_key: vec![0xAB; 48],
        }
    }

    #[test]
    fn test_roundtrip() {
        let original = recipient();
        let der = original.to_asn1().unwrap();
        assert_eq!(KeyTransRecipient::from_asn1(&der).unwrap(), original);
    }

    #[test]
    fn test_required_fields() {
        let mut missing_rid = recipient();
        missing_rid.recipient_identifier.clear();
        assert_eq!(
            missing_rid.to_asn1(),
            Err(CmsError::RequiredField("KeyTransRecipient.rid"))
        );

        let mut missing_key = recipient();
        missing_key.encrypted_key.clear();
        assert!(matches!(
            missing_key.to_asn1(),
            Err(CmsError::RequiredField(_))
        ));
    }

    #[test]
    fn test_wrong_version() {
        let mut der = recipient().to_asn1().unwrap();
        // SEQUENCE header is 2 bytes, INTEGER tag and length follow
        assert_eq!(&der[2..5], &[0x02, 0x01, 0x02]);
        der[4] = 0x03;
        assert_eq!(
            KeyTransRecipient::from_asn1(&der),
            Err(CmsError::UnsupportedVersion {
                structure: "KeyTransRecipientInfo",
                found: 3
            })
        );
    }
}
