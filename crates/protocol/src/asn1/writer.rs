//! Back-to-front DER writer

use super::{encode_length, tag, Asn1Error, Oid, MAX_STRUCTURE_SIZE};
use std::cmp::Ordering;

const DEFAULT_CAPACITY: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Active,
    Finished,
}

/// DER writer that fills its buffer from the end
///
/// Every `write_*` method returns the number of bytes written by that call so
/// callers can accumulate the length of an enclosing SEQUENCE, SET or context
/// tag. Because bytes are prepended, structures are written last field first:
///
/// ```
/// use cmsenvelope_protocol::asn1::Asn1Writer;
///
/// # fn example() -> Result<(), cmsenvelope_protocol::asn1::Asn1Error> {
/// let mut writer = Asn1Writer::new();
/// let mut len = writer.write_utf8_string(b"second")?;
/// len += writer.write_integer(1)?;
/// writer.write_sequence(len)?;
/// let der = writer.finish()?;
/// assert_eq!(der[0], 0x30);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Asn1Writer {
    buf: Vec<u8>,
    /// Index of the first written byte; everything in `buf[start..]` is output
    start: usize,
    state: WriterState,
}

impl Default for Asn1Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl Asn1Writer {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a writer with an initial buffer of `capacity` bytes
    ///
    /// The buffer grows on demand, so a small capacity only affects the number
    /// of relocations.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_STRUCTURE_SIZE);
        Self {
            buf: vec![0u8; capacity],
            start: capacity,
            state: WriterState::Active,
        }
    }

    /// Discard any written bytes and make the writer usable again
    pub fn reset(&mut self) {
        self.buf = vec![0u8; DEFAULT_CAPACITY];
        self.start = DEFAULT_CAPACITY;
        self.state = WriterState::Active;
    }

    /// Number of bytes written so far
    pub fn written(&self) -> usize {
        self.buf.len() - self.start
    }

    /// Return the encoded bytes
    ///
    /// The writer cannot be used again until [`reset`](Self::reset) is called.
    pub fn finish(&mut self) -> Result<Vec<u8>, Asn1Error> {
        self.check_state()?;
        let out = self.buf.split_off(self.start);
        self.buf = Vec::new();
        self.start = 0;
        self.state = WriterState::Finished;
        Ok(out)
    }

    pub fn write_integer(&mut self, value: i32) -> Result<usize, Asn1Error> {
        let bytes = value.to_be_bytes();
        // Strip redundant sign octets while keeping the sign bit intact
        let mut skip = 0;
        while skip < bytes.len() - 1 {
            let (cur, next) = (bytes[skip], bytes[skip + 1]);
            if (cur == 0x00 && next & 0x80 == 0) || (cur == 0xFF && next & 0x80 != 0) {
                skip += 1;
            } else {
                break;
            }
        }
        self.write_tlv(tag::INTEGER, &bytes[skip..])
    }

    pub fn write_bool(&mut self, value: bool) -> Result<usize, Asn1Error> {
        self.write_tlv(tag::BOOLEAN, &[if value { 0xFF } else { 0x00 }])
    }

    pub fn write_null(&mut self) -> Result<usize, Asn1Error> {
        self.write_tlv(tag::NULL, &[])
    }

    pub fn write_octet_string(&mut self, data: &[u8]) -> Result<usize, Asn1Error> {
        self.write_tlv(tag::OCTET_STRING, data)
    }

    pub fn write_utf8_string(&mut self, data: &[u8]) -> Result<usize, Asn1Error> {
        self.write_tlv(tag::UTF8_STRING, data)
    }

    pub fn write_oid(&mut self, oid: &Oid) -> Result<usize, Asn1Error> {
        self.check_state()?;
        let value = oid.to_der_value()?;
        self.write_tlv(tag::OID, &value)
    }

    /// Write a pre-encoded element verbatim
    pub fn write_data(&mut self, data: &[u8]) -> Result<usize, Asn1Error> {
        self.prepend(data)
    }

    /// Wrap the last `len` written bytes in a constructed context-specific tag
    pub fn write_context_tag(&mut self, number: u8, len: usize) -> Result<usize, Asn1Error> {
        if number > tag::CONTEXT_TAG_MAX {
            return Err(Asn1Error::InvalidArgument(format!(
                "context tag {} is too big, max value is {}",
                number,
                tag::CONTEXT_TAG_MAX
            )));
        }
        self.write_header(tag::context(number), len)
    }

    /// Wrap the last `len` written bytes in a SEQUENCE
    pub fn write_sequence(&mut self, len: usize) -> Result<usize, Asn1Error> {
        self.write_header(tag::SEQUENCE, len)
    }

    /// Write a SET OF the given pre-encoded elements in canonical order
    pub fn write_set(&mut self, elements: &[Vec<u8>]) -> Result<usize, Asn1Error> {
        self.check_state()?;
        let mut sorted: Vec<&[u8]> = elements.iter().map(Vec::as_slice).collect();
        sorted.sort_by(|a, b| compare_with_value_padding(a, b));

        let mut len = 0;
        for element in sorted.iter().rev() {
            len += self.prepend(element)?;
        }
        len += self.write_header(tag::SET, len)?;
        Ok(len)
    }

    fn write_tlv(&mut self, tag: u8, value: &[u8]) -> Result<usize, Asn1Error> {
        let len = self.prepend(value)?;
        Ok(len + self.write_header(tag, len)?)
    }

    fn write_header(&mut self, tag: u8, len: usize) -> Result<usize, Asn1Error> {
        self.check_state()?;
        let mut header = Vec::with_capacity(6);
        header.push(tag);
        header.extend_from_slice(&encode_length(len));
        self.prepend(&header)
    }

    fn prepend(&mut self, bytes: &[u8]) -> Result<usize, Asn1Error> {
        self.check_state()?;
        self.ensure_space(bytes.len())?;
        let new_start = self.start - bytes.len();
        self.buf[new_start..self.start].copy_from_slice(bytes);
        self.start = new_start;
        Ok(bytes.len())
    }

    /// Grow the buffer so that `needed` more bytes fit in front of `start`
    fn ensure_space(&mut self, needed: usize) -> Result<(), Asn1Error> {
        if self.start >= needed {
            return Ok(());
        }
        let used = self.written();
        let required = used + needed;
        if required > MAX_STRUCTURE_SIZE {
            return Err(Asn1Error::ExceededMaxSize {
                requested: required,
                max: MAX_STRUCTURE_SIZE,
            });
        }
        let new_len = required.next_power_of_two().min(MAX_STRUCTURE_SIZE);
        let mut relocated = vec![0u8; new_len];
        relocated[new_len - used..].copy_from_slice(&self.buf[self.start..]);
        self.buf = relocated;
        self.start = new_len - used;
        Ok(())
    }

    fn check_state(&self) -> Result<(), Asn1Error> {
        match self.state {
            WriterState::Active => Ok(()),
            WriterState::Finished => Err(Asn1Error::InvalidState(
                "writer was finished, call 'reset' before writing again",
            )),
        }
    }
}

/// Total order over byte strings used for SET OF sorting
///
/// When lengths differ, the shorter string is treated as if left padded with a
/// byte one less than its own minimum byte (or 0x00 when empty).
fn compare_with_value_padding(a: &[u8], b: &[u8]) -> Ordering {
    if a.len() == b.len() {
        return a.cmp(b);
    }
    let (shorter, longer, swapped) = if a.len() < b.len() {
        (a, b, false)
    } else {
        (b, a, true)
    };
    let pad = shorter
        .iter()
        .min()
        .map(|m| m.saturating_sub(1))
        .unwrap_or(0x00);
    let padding = longer.len() - shorter.len();
    let padded = std::iter::repeat(pad).take(padding).chain(shorter.iter().copied());
    let ordering = padded
        .cmp(longer.iter().copied())
        .then(Ordering::Less);
    if swapped {
        ordering.reverse()
    } else {
        ordering
    }
}
