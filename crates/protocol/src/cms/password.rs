//! Password recipient
//!
//! ```text
//! PasswordRecipientInfo ::= SEQUENCE {
//!     version                 INTEGER (0),
//!     keyDerivationAlgorithm  [0] AlgorithmIdentifier OPTIONAL,
//!     keyEncryptionAlgorithm  AlgorithmIdentifier,
//!     encryptedKey            OCTET STRING
//! }
//! ```

use super::{check_required, CmsError};
use crate::algorithm::AlgorithmIdentifier;
use crate::asn1::{Asn1Compatible, Asn1Reader, Asn1Writer};

const VERSION: i32 = 0;
const KDF_TAG: u8 = 0;

/// Recipient whose content key is wrapped with a password derived key
///
/// There is no identifier: on decryption every password recipient is tried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordRecipient {
    pub key_derivation_algorithm: Option<AlgorithmIdentifier>,
    pub key_encryption_algorithm: AlgorithmIdentifier,
    pub encrypted_key: Vec<u8>,
}

impl Asn1Compatible for PasswordRecipient {
    type Error = CmsError;

    fn asn1_write(&self, writer: &mut Asn1Writer) -> Result<usize, CmsError> {
        check_required(&self.encrypted_key, "PasswordRecipient.encryptedKey")?;

        let mut len = writer.write_octet_string(&self.encrypted_key)?;
        len += self.key_encryption_algorithm.asn1_write(writer)?;
        if let Some(kdf) = &self.key_derivation_algorithm {
            let kdf_len = kdf.asn1_write(writer)?;
            len += kdf_len + writer.write_context_tag(KDF_TAG, kdf_len)?;
        }
        len += writer.write_integer(VERSION)?;
        len += writer.write_sequence(len)?;
        Ok(len)
    }

    fn asn1_read(reader: &mut Asn1Reader) -> Result<Self, CmsError> {
        reader.read_sequence()?;
        let version = reader.read_integer()?;
        if version != VERSION {
            return Err(CmsError::UnsupportedVersion {
                structure: "PasswordRecipientInfo",
                found: version,
            });
        }
        let key_derivation_algorithm = if reader.read_context_tag(KDF_TAG)? > 0 {
            Some(AlgorithmIdentifier::asn1_read(reader)?)
        } else {
            None
        };
        let key_encryption_algorithm = AlgorithmIdentifier::asn1_read(reader)?;
        let encrypted_key = reader.read_octet_string()?;
        Ok(Self {
            key_derivation_algorithm,
            key_encryption_algorithm,
            encrypted_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asn1::oid::known;

    fn recipient(with_kdf: bool) -> PasswordRecipient {
        PasswordRecipient {
            key_derivation_algorithm: with_kdf.then(|| {
                AlgorithmIdentifier::with_octet_string(known::pbkdf2(), b"salt").unwrap()
            }),
            key_encryption_algorithm: AlgorithmIdentifier::with_octet_string(
                known::aes256_gcm(),
                &[0u8; 12],
            )
            .unwrap(),
            encrypted_key: vec![0x42; 48],
        }
    }

    #[test]
    fn test_roundtrip_with_kdf() {
        let original = recipient(true);
        let der = original.to_asn1().unwrap();
        assert_eq!(PasswordRecipient::from_asn1(&der).unwrap(), original);
    }

    #[test]
    fn test_roundtrip_without_kdf() {
        let original = recipient(false);
        let der = original.to_asn1().unwrap();
        let parsed = PasswordRecipient::from_asn1(&der).unwrap();
        assert!(parsed.key_derivation_algorithm.is_none());
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_missing_encrypted_key() {
        let mut r = recipient(true);
        r.encrypted_key.clear();
        assert_eq!(
            r.to_asn1(),
            Err(CmsError::RequiredField("PasswordRecipient.encryptedKey"))
        );
    }
}
