//! AlgorithmIdentifier
//!
//! ```text
//! AlgorithmIdentifier ::= SEQUENCE {
//!     algorithm   OBJECT IDENTIFIER,
//!     parameters  ANY OPTIONAL
//! }
//! ```

use crate::asn1::{Asn1Compatible, Asn1Error, Asn1Reader, Asn1Writer, Oid};

/// An algorithm OID with optional pre-encoded parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorithmIdentifier {
    pub oid: Oid,
    /// Complete DER element (tag, length and value) of the parameters
    pub params: Option<Vec<u8>>,
}

impl AlgorithmIdentifier {
    pub fn new(oid: Oid, params: Option<Vec<u8>>) -> Self {
        Self { oid, params }
    }

    /// Identifier whose parameters are a single OCTET STRING (typically an IV)
    pub fn with_octet_string(oid: Oid, value: &[u8]) -> Result<Self, Asn1Error> {
        let mut writer = Asn1Writer::new();
        writer.write_octet_string(value)?;
        Ok(Self::new(oid, Some(writer.finish()?)))
    }

    /// Identifier whose parameters are another OID (e.g. a named curve)
    pub fn with_oid(oid: Oid, param: &Oid) -> Result<Self, Asn1Error> {
        let mut writer = Asn1Writer::new();
        writer.write_oid(param)?;
        Ok(Self::new(oid, Some(writer.finish()?)))
    }

    /// Decode parameters written by [`with_octet_string`](Self::with_octet_string)
    pub fn octet_string_params(&self) -> Result<Vec<u8>, Asn1Error> {
        let params = self.params.as_deref().ok_or(Asn1Error::InvalidValue {
            kind: "AlgorithmIdentifier",
            reason: format!("{} has no parameters", self.oid),
        })?;
        Asn1Reader::new(params).read_octet_string()
    }

    /// Decode parameters written by [`with_oid`](Self::with_oid)
    pub fn oid_params(&self) -> Result<Oid, Asn1Error> {
        let params = self.params.as_deref().ok_or(Asn1Error::InvalidValue {
            kind: "AlgorithmIdentifier",
            reason: format!("{} has no parameters", self.oid),
        })?;
        Asn1Reader::new(params).read_oid()
    }
}

impl Asn1Compatible for AlgorithmIdentifier {
    type Error = Asn1Error;

    fn asn1_write(&self, writer: &mut Asn1Writer) -> Result<usize, Asn1Error> {
        let mut len = 0;
        if let Some(params) = &self.params {
            len += writer.write_data(params)?;
        }
        len += writer.write_oid(&self.oid)?;
        len += writer.write_sequence(len)?;
        Ok(len)
    }

    fn asn1_read(reader: &mut Asn1Reader) -> Result<Self, Asn1Error> {
        let len = reader.read_sequence()?;
        let start = reader.position();
        let oid = reader.read_oid()?;
        let params = if reader.position() - start < len {
            Some(reader.read_data()?)
        } else {
            None
        };
        Ok(Self { oid, params })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asn1::oid::known;

    #[test]
    fn test_iv_params() {
        let iv = [7u8; 12];
        let alg = AlgorithmIdentifier::with_octet_string(known::aes256_gcm(), &iv).unwrap();
        let der = alg.to_asn1().unwrap();
        assert_eq!(
            hex::encode(&der),
            "3019060960864801650304012e040c070707070707070707070707"
        );
        let parsed = AlgorithmIdentifier::from_asn1(&der).unwrap();
        assert_eq!(parsed, alg);
        assert_eq!(parsed.octet_string_params().unwrap(), iv.to_vec());
    }

    #[test]
    fn test_absent_params() {
        let alg = AlgorithmIdentifier::new(known::sha256(), None);
        let parsed = AlgorithmIdentifier::from_asn1(&alg.to_asn1().unwrap()).unwrap();
        assert_eq!(parsed.params, None);
        assert!(parsed.octet_string_params().is_err());
    }

    #[test]
    fn test_oid_params() {
        let alg =
            AlgorithmIdentifier::with_oid(known::ec_public_key(), &known::prime256v1()).unwrap();
        let parsed = AlgorithmIdentifier::from_asn1(&alg.to_asn1().unwrap()).unwrap();
        assert_eq!(parsed.oid_params().unwrap(), known::prime256v1());
    }
}
