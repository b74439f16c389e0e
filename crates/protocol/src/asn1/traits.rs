//! Trait for structures with an ASN.1 representation

use super::{Asn1Reader, Asn1Writer};

/// Structures that serialize through [`Asn1Writer`] and parse through [`Asn1Reader`]
///
/// `asn1_write` writes the structure (children first, then its own wrapping
/// header) and returns the number of bytes it wrote.
pub trait Asn1Compatible: Sized {
    type Error: From<super::Asn1Error>;

    /// Write this structure and return the bytes written
    fn asn1_write(&self, writer: &mut Asn1Writer) -> Result<usize, Self::Error>;

    /// Parse this structure from the reader's current position
    fn asn1_read(reader: &mut Asn1Reader) -> Result<Self, Self::Error>;

    /// Encode into a standalone DER buffer
    fn to_asn1(&self) -> Result<Vec<u8>, Self::Error> {
        let mut writer = Asn1Writer::new();
        self.asn1_write(&mut writer)?;
        Ok(writer.finish()?)
    }

    /// Decode from a standalone DER buffer
    fn from_asn1(data: &[u8]) -> Result<Self, Self::Error> {
        let mut reader = Asn1Reader::new(data);
        Self::asn1_read(&mut reader)
    }
}
