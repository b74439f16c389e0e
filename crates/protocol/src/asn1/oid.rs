//! Object identifiers

use super::Asn1Error;
use std::fmt;
use std::str::FromStr;

/// An object identifier held as its arc values
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Oid {
    arcs: Vec<u32>,
}

impl Oid {
    /// Create an OID from its arcs
    pub fn new(arcs: &[u32]) -> Self {
        Self {
            arcs: arcs.to_vec(),
        }
    }

    pub fn arcs(&self) -> &[u32] {
        &self.arcs
    }

    /// Encode the OID value (no tag or length)
    pub fn to_der_value(&self) -> Result<Vec<u8>, Asn1Error> {
        if self.arcs.len() < 2 || self.arcs[0] > 2 || (self.arcs[0] < 2 && self.arcs[1] >= 40) {
            return Err(Asn1Error::InvalidValue {
                kind: "OID",
                reason: format!("'{}' has invalid leading arcs", self),
            });
        }
        let first = self.arcs[0]
            .checked_mul(40)
            .and_then(|value| value.checked_add(self.arcs[1]))
            .ok_or_else(|| Asn1Error::InvalidValue {
                kind: "OID",
                reason: format!("'{}' leading arcs overflow", self),
            })?;
        let mut buf = Vec::with_capacity(self.arcs.len() + 4);
        encode_arc(&mut buf, first);
        for &arc in &self.arcs[2..] {
            encode_arc(&mut buf, arc);
        }
        Ok(buf)
    }

    /// Decode an OID from its value bytes
    pub fn from_der_value(data: &[u8]) -> Result<Self, Asn1Error> {
        if data.is_empty() {
            return Err(Asn1Error::InvalidValue {
                kind: "OID",
                reason: "empty value".to_string(),
            });
        }
        let mut arcs = Vec::new();
        let mut offset = 0;
        while offset < data.len() {
            let (arc, consumed) = decode_arc(&data[offset..])?;
            if arcs.is_empty() {
                let first = (arc / 40).min(2);
                arcs.push(first);
                arcs.push(arc - first * 40);
            } else {
                arcs.push(arc);
            }
            offset += consumed;
        }
        Ok(Self { arcs })
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for arc in &self.arcs {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{}", arc)?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for Oid {
    type Err = Asn1Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let arcs = s
            .split('.')
            .map(|part| part.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| Asn1Error::InvalidValue {
                kind: "OID",
                reason: format!("'{}': {}", s, e),
            })?;
        Ok(Self { arcs })
    }
}

fn encode_arc(buf: &mut Vec<u8>, mut value: u32) {
    let mut tmp = [0u8; 5];
    let mut i = tmp.len();
    loop {
        i -= 1;
        tmp[i] = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            break;
        }
    }
    let last = tmp.len() - 1;
    for (pos, byte) in tmp.iter().enumerate().skip(i) {
        buf.push(if pos == last { *byte } else { *byte | 0x80 });
    }
}

fn decode_arc(data: &[u8]) -> Result<(u32, usize), Asn1Error> {
    let mut value: u32 = 0;
    for (i, &byte) in data.iter().enumerate() {
        if i == 0 && byte == 0x80 {
            return Err(Asn1Error::InvalidValue {
                kind: "OID",
                reason: "non-minimal arc encoding".to_string(),
            });
        }
        value = value
            .checked_mul(0x80)
            .ok_or_else(|| Asn1Error::InvalidValue {
                kind: "OID",
                reason: "arc overflows 32 bits".to_string(),
            })?
            | (byte & 0x7F) as u32;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(Asn1Error::InvalidValue {
        kind: "OID",
        reason: "truncated arc".to_string(),
    })
}

/// Object identifiers used by the envelope format
pub mod known {
    use super::Oid;

    fn pkcs7(n: u32) -> Oid {
        Oid::new(&[1, 2, 840, 113549, 1, 7, n])
    }

    pub fn pkcs7_data() -> Oid {
        pkcs7(1)
    }
    pub fn pkcs7_signed_data() -> Oid {
        pkcs7(2)
    }
    pub fn pkcs7_enveloped_data() -> Oid {
        pkcs7(3)
    }
    pub fn pkcs7_signed_and_enveloped_data() -> Oid {
        pkcs7(4)
    }
    pub fn pkcs7_digested_data() -> Oid {
        pkcs7(5)
    }
    pub fn pkcs7_encrypted_data() -> Oid {
        pkcs7(6)
    }
    pub fn pkcs7_data_with_attributes() -> Oid {
        pkcs7(7)
    }
    pub fn pkcs7_encrypted_private_key_info() -> Oid {
        pkcs7(8)
    }
    /// id-ct-authData
    pub fn pkcs9_authenticated_data() -> Oid {
        Oid::new(&[1, 2, 840, 113549, 1, 9, 16, 1, 2])
    }

    // Symmetric
    pub fn aes256_cbc() -> Oid {
        Oid::new(&[2, 16, 840, 1, 101, 3, 4, 1, 42])
    }
    pub fn aes256_gcm() -> Oid {
        Oid::new(&[2, 16, 840, 1, 101, 3, 4, 1, 46])
    }

    // Password based
    pub fn pbkdf2() -> Oid {
        Oid::new(&[1, 2, 840, 113549, 1, 5, 12])
    }
    pub fn hmac_with_sha256() -> Oid {
        Oid::new(&[1, 2, 840, 113549, 2, 9])
    }

    // EC
    pub fn ec_public_key() -> Oid {
        Oid::new(&[1, 2, 840, 10045, 2, 1])
    }
    pub fn prime256v1() -> Oid {
        Oid::new(&[1, 2, 840, 10045, 3, 1, 7])
    }
    pub fn ecdsa_with_sha256() -> Oid {
        Oid::new(&[1, 2, 840, 10045, 4, 3, 2])
    }

    // Digests
    pub fn sha256() -> Oid {
        Oid::new(&[2, 16, 840, 1, 101, 3, 4, 2, 1])
    }
    pub fn sha384() -> Oid {
        Oid::new(&[2, 16, 840, 1, 101, 3, 4, 2, 2])
    }
    pub fn sha512() -> Oid {
        Oid::new(&[2, 16, 840, 1, 101, 3, 4, 2, 3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enveloped_data_encoding() {
        let der = known::pkcs7_enveloped_data().to_der_value().unwrap();
        assert_eq!(hex::encode(&der), "2a864886f70d010703");
        assert_eq!(Oid::from_der_value(&der).unwrap(), known::pkcs7_enveloped_data());
    }

    #[test]
    fn test_joint_iso_arcs() {
        let der = known::aes256_gcm().to_der_value().unwrap();
        assert_eq!(hex::encode(&der), "60864801650304012e");
        assert_eq!(Oid::from_der_value(&der).unwrap(), known::aes256_gcm());
    }

    #[test]
    fn test_dotted_string() {
        let oid: Oid = "1.2.840.10045.3.1.7".parse().unwrap();
        assert_eq!(oid, known::prime256v1());
        assert_eq!(oid.to_string(), "1.2.840.10045.3.1.7");
        assert!("1.2.x".parse::<Oid>().is_err());
    }

    #[test]
    fn test_invalid_values() {
        assert!(Oid::from_der_value(&[]).is_err());
        assert!(Oid::from_der_value(&[0x2A, 0x86]).is_err());
        assert!(Oid::new(&[1]).to_der_value().is_err());
        assert!(Oid::new(&[1, 40]).to_der_value().is_err());
    }

    #[test]
    fn test_large_second_arc() {
        assert!(matches!(
            Oid::new(&[2, u32::MAX]).to_der_value(),
            Err(Asn1Error::InvalidValue { kind: "OID", .. })
        ));
        let largest = Oid::new(&[2, u32::MAX - 80]);
        let der = largest.to_der_value().unwrap();
        assert_eq!(Oid::from_der_value(&der).unwrap(), largest);
    }
}
