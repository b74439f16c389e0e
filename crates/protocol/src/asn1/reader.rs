//! Forward DER reader

use super::{decode_length, tag, Asn1Error, Oid};

/// Sequential DER reader
///
/// Constructed types (`read_sequence`, `read_set`, `read_context_tag`) only
/// consume the header and return the content length; the caller then reads
/// the children in order.
#[derive(Debug, Default)]
pub struct Asn1Reader {
    data: Vec<u8>,
    pos: usize,
    initialized: bool,
}

impl Asn1Reader {
    pub fn new(data: &[u8]) -> Self {
        let mut reader = Self::default();
        reader.reset(data);
        reader
    }

    /// Replace the input and rewind to its start
    pub fn reset(&mut self, data: &[u8]) {
        self.data = data.to_vec();
        self.pos = 0;
        self.initialized = true;
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes not consumed yet
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Peek the identifier octet of the next element
    pub fn peek_tag(&self) -> Option<u8> {
        if !self.initialized {
            return None;
        }
        self.data.get(self.pos).copied()
    }

    pub fn read_integer(&mut self) -> Result<i32, Asn1Error> {
        let value = self.read_primitive(tag::INTEGER)?;
        if value.is_empty() || value.len() > 4 {
            return Err(Asn1Error::InvalidValue {
                kind: "INTEGER",
                reason: format!("{} value bytes do not fit a 32-bit integer", value.len()),
            });
        }
        let fill = if value[0] & 0x80 != 0 { 0xFF } else { 0x00 };
        let mut bytes = [fill; 4];
        bytes[4 - value.len()..].copy_from_slice(value);
        Ok(i32::from_be_bytes(bytes))
    }

    pub fn read_bool(&mut self) -> Result<bool, Asn1Error> {
        let value = self.read_primitive(tag::BOOLEAN)?;
        match value {
            [b] => Ok(*b != 0),
            _ => Err(Asn1Error::InvalidValue {
                kind: "BOOLEAN",
                reason: format!("expected 1 value byte, found {}", value.len()),
            }),
        }
    }

    pub fn read_null(&mut self) -> Result<(), Asn1Error> {
        let value = self.read_primitive(tag::NULL)?;
        if !value.is_empty() {
            return Err(Asn1Error::InvalidValue {
                kind: "NULL",
                reason: "non-empty value".to_string(),
            });
        }
        Ok(())
    }

    pub fn read_octet_string(&mut self) -> Result<Vec<u8>, Asn1Error> {
        self.read_primitive(tag::OCTET_STRING).map(<[u8]>::to_vec)
    }

    pub fn read_utf8_string(&mut self) -> Result<Vec<u8>, Asn1Error> {
        self.read_primitive(tag::UTF8_STRING).map(<[u8]>::to_vec)
    }

    pub fn read_oid(&mut self) -> Result<Oid, Asn1Error> {
        let value = self.read_primitive(tag::OID)?;
        Oid::from_der_value(value)
    }

    /// Read one complete element (tag, length and value) as raw bytes
    pub fn read_data(&mut self) -> Result<Vec<u8>, Asn1Error> {
        self.check_state()?;
        let start = self.pos;
        let (len, header) = decode_length(&self.data[start + 1..])?;
        let end = self.checked_end(start + 1 + header, len)?;
        self.pos = end;
        Ok(self.data[start..end].to_vec())
    }

    /// Advance past `len` bytes, typically the content of a skipped element
    pub fn skip(&mut self, len: usize) -> Result<(), Asn1Error> {
        self.check_state()?;
        self.pos = self.checked_end(self.pos, len)?;
        Ok(())
    }

    /// Consume a SEQUENCE header and return its content length
    pub fn read_sequence(&mut self) -> Result<usize, Asn1Error> {
        self.read_header(tag::SEQUENCE)
    }

    /// Consume a SET header and return its content length
    pub fn read_set(&mut self) -> Result<usize, Asn1Error> {
        self.read_header(tag::SET)
    }

    /// Consume a constructed context tag if it is next
    ///
    /// Returns the content length, or 0 when the next element carries a
    /// different tag or the input is exhausted. This is how OPTIONAL fields
    /// are detected.
    pub fn read_context_tag(&mut self, number: u8) -> Result<usize, Asn1Error> {
        if number > tag::CONTEXT_TAG_MAX {
            return Err(Asn1Error::InvalidArgument(format!(
                "context tag {} is too big, max value is {}",
                number,
                tag::CONTEXT_TAG_MAX
            )));
        }
        if !self.initialized {
            return Err(Asn1Error::InvalidState(
                "reader was not initialized, call 'reset' first",
            ));
        }
        match self.data.get(self.pos) {
            Some(&found) if found == tag::context(number) => self.read_header(found),
            _ => Ok(0),
        }
    }

    fn read_primitive(&mut self, expected: u8) -> Result<&[u8], Asn1Error> {
        let len = self.read_header(expected)?;
        let start = self.pos;
        self.pos += len;
        Ok(&self.data[start..start + len])
    }

    /// Consume a tag and length, leaving the position at the first value byte
    fn read_header(&mut self, expected: u8) -> Result<usize, Asn1Error> {
        self.check_state()?;
        let found = self.data[self.pos];
        if found != expected {
            return Err(Asn1Error::UnexpectedTag { expected, found });
        }
        let (len, header) = decode_length(&self.data[self.pos + 1..])?;
        let value_start = self.pos + 1 + header;
        self.checked_end(value_start, len)?;
        self.pos = value_start;
        Ok(len)
    }

    fn checked_end(&self, value_start: usize, len: usize) -> Result<usize, Asn1Error> {
        let end = value_start.checked_add(len).ok_or(Asn1Error::InvalidLength)?;
        if end > self.data.len() {
            return Err(Asn1Error::OutOfData);
        }
        Ok(end)
    }

    fn check_state(&self) -> Result<(), Asn1Error> {
        if !self.initialized {
            return Err(Asn1Error::InvalidState(
                "reader was not initialized, call 'reset' first",
            ));
        }
        if self.pos >= self.data.len() {
            return Err(Asn1Error::OutOfData);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asn1::Asn1Writer;

    fn reader(hex_str: &str) -> Asn1Reader {
        Asn1Reader::new(&hex::decode(hex_str).unwrap())
    }

    #[test]
    fn test_read_integers() {
        assert_eq!(reader("020100").read_integer().unwrap(), 0);
        assert_eq!(reader("02020080").read_integer().unwrap(), 128);
        assert_eq!(reader("0202ff7f").read_integer().unwrap(), -129);
        assert_eq!(reader("020480000001").read_integer().unwrap(), -0x7fff_ffff);
        assert!(reader("02050100000000").read_integer().is_err());
    }

    #[test]
    fn test_read_primitives() {
        assert!(reader("0101ff").read_bool().unwrap());
        assert!(!reader("010100").read_bool().unwrap());
        reader("0500").read_null().unwrap();
        assert_eq!(reader("040201ff").read_octet_string().unwrap(), vec![0x01, 0xFF]);
        assert_eq!(reader("0c024142").read_utf8_string().unwrap(), b"AB".to_vec());
    }

    #[test]
    fn test_unexpected_tag() {
        assert_eq!(
            reader("0500").read_integer(),
            Err(Asn1Error::UnexpectedTag {
                expected: tag::INTEGER,
                found: tag::NULL
            })
        );
    }

    #[test]
    fn test_read_past_end() {
        let mut r = reader("0500");
        r.read_null().unwrap();
        assert_eq!(r.read_null(), Err(Asn1Error::OutOfData));
        assert_eq!(r.read_data(), Err(Asn1Error::OutOfData));
        // Optional context tags are simply absent at the end of input
        assert_eq!(r.read_context_tag(0).unwrap(), 0);
    }

    #[test]
    fn test_truncated_value() {
        assert_eq!(reader("0405aabb").read_octet_string(), Err(Asn1Error::OutOfData));
    }

    #[test]
    fn test_uninitialized_reader() {
        let mut r = Asn1Reader::default();
        assert!(matches!(r.read_integer(), Err(Asn1Error::InvalidState(_))));
        assert!(matches!(r.read_context_tag(0), Err(Asn1Error::InvalidState(_))));
    }

    #[test]
    fn test_context_tag_dispatch() {
        let mut r = reader("a1030201050500");
        assert_eq!(r.read_context_tag(0).unwrap(), 0);
        assert_eq!(r.read_context_tag(1).unwrap(), 3);
        assert_eq!(r.read_integer().unwrap(), 5);
        assert_eq!(r.read_context_tag(2).unwrap(), 0);
        r.read_null().unwrap();
        assert_eq!(r.read_context_tag(tag::CONTEXT_TAG_MAX).unwrap(), 0);
        // 0x1F is the high-tag-number escape, not a tag of its own
        assert!(matches!(
            r.read_context_tag(0x1F),
            Err(Asn1Error::InvalidArgument(_))
        ));
        assert!(r.read_context_tag(32).is_err());
    }

    #[test]
    fn test_set_iteration() {
        let elements = vec![
            hex::decode("020101").unwrap(),
            hex::decode("0c0141").unwrap(),
            hex::decode("a1020500").unwrap(),
        ];
        let mut writer = Asn1Writer::new();
        writer.write_set(&elements).unwrap();
        let der = writer.finish().unwrap();

        let mut r = Asn1Reader::new(&der);
        let mut remaining = r.read_set().unwrap();
        let mut seen = Vec::new();
        while remaining > 0 {
            let element = r.read_data().unwrap();
            remaining = remaining.saturating_sub(element.len());
            seen.push(element);
        }
        assert_eq!(seen.len(), 3);
        for element in &elements {
            assert!(seen.contains(element));
        }
    }

    #[test]
    fn test_read_data_returns_full_element() {
        let mut r = reader("3003020107ff");
        assert_eq!(r.read_data().unwrap(), hex::decode("3003020107").unwrap());
        assert_eq!(r.position(), 5);
        assert_eq!(r.remaining(), 1);
    }
}
