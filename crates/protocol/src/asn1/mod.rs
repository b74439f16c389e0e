//! Minimal DER codec
//!
//! This module implements the subset of ASN.1 DER needed by the envelope
//! format: INTEGER, BOOLEAN, NULL, OCTET STRING, UTF8String, OBJECT IDENTIFIER,
//! SEQUENCE, SET and constructed context-specific tags.
//!
//! ## Encoding Overview
//!
//! ```text
//! ┌─────┬──────────────────────┬─────────────┐
//! │ tag │ length (1..=5 bytes) │ value bytes │
//! └─────┴──────────────────────┴─────────────┘
//! ```
//!
//! - Lengths up to 127 use the short form (one byte)
//! - Longer lengths use `0x80 | n` followed by `n` big-endian bytes
//! - [`Asn1Writer`] fills its buffer from the end, so children are written
//!   before the header that wraps them
//! - [`Asn1Reader`] consumes front-to-back by tag dispatch

use thiserror::Error;

pub mod oid;
pub mod reader;
pub mod traits;
pub mod writer;

pub use oid::Oid;
pub use reader::Asn1Reader;
pub use traits::Asn1Compatible;
pub use writer::Asn1Writer;

/// Universal tag numbers used by the codec
pub mod tag {
    pub const BOOLEAN: u8 = 0x01;
    pub const INTEGER: u8 = 0x02;
    pub const OCTET_STRING: u8 = 0x04;
    pub const NULL: u8 = 0x05;
    pub const OID: u8 = 0x06;
    pub const UTF8_STRING: u8 = 0x0C;
    pub const SEQUENCE: u8 = 0x30;
    pub const SET: u8 = 0x31;

    /// Context-specific class bit
    pub const CONTEXT_SPECIFIC: u8 = 0x80;
    /// Constructed encoding bit
    pub const CONSTRUCTED: u8 = 0x20;

    /// Largest tag number that fits into a single-byte context tag
    pub const CONTEXT_TAG_MAX: u8 = 0x1E;

    /// Build the identifier octet for a constructed context-specific tag
    pub const fn context(number: u8) -> u8 {
        CONTEXT_SPECIFIC | CONSTRUCTED | number
    }
}

/// Largest length value accepted for a single element
pub const MAX_LENGTH: usize = 0xFFFF;

/// Largest total structure produced by [`Asn1Writer`]: one maximal element
/// plus its tag and long-form length header
pub const MAX_STRUCTURE_SIZE: usize = MAX_LENGTH + 1 + 3;

/// Errors raised by the ASN.1 codec
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Asn1Error {
    #[error("Invalid state: {0}")]
    InvalidState(&'static str),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("ASN.1 structure was totally read, so no data left to be processed")]
    OutOfData,

    #[error("Unexpected tag: expected 0x{expected:02x}, found 0x{found:02x}")]
    UnexpectedTag { expected: u8, found: u8 },

    #[error("Invalid length encoding")]
    InvalidLength,

    #[error("Invalid {kind} value: {reason}")]
    InvalidValue { kind: &'static str, reason: String },

    #[error("ASN.1 structure exceeds maximum size: {requested} > {max}")]
    ExceededMaxSize { requested: usize, max: usize },
}

/// Encode a DER length field
pub(crate) fn encode_length(len: usize) -> Vec<u8> {
    if len < 0x80 {
        return vec![len as u8];
    }
    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    let significant = &bytes[skip..];
    let mut out = Vec::with_capacity(significant.len() + 1);
    out.push(0x80 | significant.len() as u8);
    out.extend_from_slice(significant);
    out
}

/// Decode a DER length field from the start of `data`
///
/// Returns the decoded length and the number of bytes the length field occupies.
pub(crate) fn decode_length(data: &[u8]) -> Result<(usize, usize), Asn1Error> {
    let first = *data.first().ok_or(Asn1Error::OutOfData)?;
    if first < 0x80 {
        return Ok((first as usize, 1));
    }
    let count = (first & 0x7F) as usize;
    // Indefinite lengths are BER only; anything wider than u32 is never produced
    if count == 0 || count > 4 {
        return Err(Asn1Error::InvalidLength);
    }
    if data.len() < 1 + count {
        return Err(Asn1Error::OutOfData);
    }
    let len = data[1..=count]
        .iter()
        .fold(0usize, |acc, b| (acc << 8) | *b as usize);
    Ok((len, 1 + count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_length() {
        assert_eq!(encode_length(0), vec![0x00]);
        assert_eq!(encode_length(127), vec![0x7F]);
        assert_eq!(decode_length(&[0x7F]).unwrap(), (127, 1));
    }

    #[test]
    fn test_long_length() {
        assert_eq!(encode_length(128), vec![0x81, 0x80]);
        assert_eq!(encode_length(0xFFFF), vec![0x82, 0xFF, 0xFF]);
        assert_eq!(decode_length(&[0x82, 0x01, 0x00]).unwrap(), (256, 3));
    }

    #[test]
    fn test_length_errors() {
        assert_eq!(decode_length(&[]), Err(Asn1Error::OutOfData));
        assert_eq!(decode_length(&[0x80]), Err(Asn1Error::InvalidLength));
        assert_eq!(decode_length(&[0x85, 1, 2, 3, 4, 5]), Err(Asn1Error::InvalidLength));
        assert_eq!(decode_length(&[0x82, 0x01]), Err(Asn1Error::OutOfData));
    }

    #[test]
    fn test_context_tag_byte() {
        assert_eq!(tag::context(0), 0xA0);
        assert_eq!(tag::context(3), 0xA3);
    }
}
