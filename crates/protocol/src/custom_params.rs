//! Caller defined metadata carried next to the envelope
//!
//! ```text
//! CustomParams ::= SET OF KeyValue
//!
//! KeyValue ::= SEQUENCE {
//!     key  UTF8String,
//!     val  CHOICE {
//!         int  [0] INTEGER,
//!         str  [1] UTF8String,
//!         data [2] OCTET STRING
//!     }
//! }
//! ```

use crate::asn1::{Asn1Compatible, Asn1Reader, Asn1Writer};
use crate::cms::CmsError;
use std::collections::BTreeMap;

const INTEGER_VALUE_TAG: u8 = 0;
const STRING_VALUE_TAG: u8 = 1;
const DATA_VALUE_TAG: u8 = 2;

/// Typed key/value parameters
///
/// A key lives in at most one of the three maps: setting a value of one type
/// removes any value of another type stored under the same key. Lookups with
/// the wrong type fail instead of converting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomParams {
    integers: BTreeMap<Vec<u8>, i32>,
    strings: BTreeMap<Vec<u8>, Vec<u8>>,
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl CustomParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.integers.is_empty() && self.strings.is_empty() && self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.integers.len() + self.strings.len() + self.data.len()
    }

    pub fn clear(&mut self) {
        self.integers.clear();
        self.strings.clear();
        self.data.clear();
    }

    pub fn set_integer(&mut self, key: impl AsRef<[u8]>, value: i32) {
        let key = key.as_ref();
        self.strings.remove(key);
        self.data.remove(key);
        self.integers.insert(key.to_vec(), value);
    }

    pub fn get_integer(&self, key: impl AsRef<[u8]>) -> Result<i32, CmsError> {
        let key = key.as_ref();
        self.integers.get(key).copied().ok_or_else(|| not_found(key))
    }

    pub fn remove_integer(&mut self, key: impl AsRef<[u8]>) {
        self.integers.remove(key.as_ref());
    }

    pub fn set_string(&mut self, key: impl AsRef<[u8]>, value: impl Into<Vec<u8>>) {
        let key = key.as_ref();
        self.integers.remove(key);
        self.data.remove(key);
        self.strings.insert(key.to_vec(), value.into());
    }

    pub fn get_string(&self, key: impl AsRef<[u8]>) -> Result<&[u8], CmsError> {
        let key = key.as_ref();
        self.strings
            .get(key)
            .map(Vec::as_slice)
            .ok_or_else(|| not_found(key))
    }

    pub fn remove_string(&mut self, key: impl AsRef<[u8]>) {
        self.strings.remove(key.as_ref());
    }

    pub fn set_data(&mut self, key: impl AsRef<[u8]>, value: impl Into<Vec<u8>>) {
        let key = key.as_ref();
        self.integers.remove(key);
        self.strings.remove(key);
        self.data.insert(key.to_vec(), value.into());
    }

    pub fn get_data(&self, key: impl AsRef<[u8]>) -> Result<&[u8], CmsError> {
        let key = key.as_ref();
        self.data
            .get(key)
            .map(Vec::as_slice)
            .ok_or_else(|| not_found(key))
    }

    pub fn remove_data(&mut self, key: impl AsRef<[u8]>) {
        self.data.remove(key.as_ref());
    }

    fn key_values(&self) -> Result<Vec<Vec<u8>>, CmsError> {
        let mut elements = Vec::with_capacity(self.len());
        for (key, value) in &self.integers {
            elements.push(encode_key_value(key, INTEGER_VALUE_TAG, |w| {
                w.write_integer(*value)
            })?);
        }
        for (key, value) in &self.strings {
            elements.push(encode_key_value(key, STRING_VALUE_TAG, |w| {
                w.write_utf8_string(value)
            })?);
        }
        for (key, value) in &self.data {
            elements.push(encode_key_value(key, DATA_VALUE_TAG, |w| {
                w.write_octet_string(value)
            })?);
        }
        Ok(elements)
    }
}

fn not_found(key: &[u8]) -> CmsError {
    CmsError::ParamNotFound {
        key: String::from_utf8_lossy(key).into_owned(),
    }
}

fn encode_key_value(
    key: &[u8],
    value_tag: u8,
    write_value: impl FnOnce(&mut Asn1Writer) -> Result<usize, crate::asn1::Asn1Error>,
) -> Result<Vec<u8>, CmsError> {
    let mut writer = Asn1Writer::new();
    let mut len = write_value(&mut writer)?;
    len += writer.write_context_tag(value_tag, len)?;
    len += writer.write_utf8_string(key)?;
    writer.write_sequence(len)?;
    Ok(writer.finish()?)
}

impl Asn1Compatible for CustomParams {
    type Error = CmsError;

    fn asn1_write(&self, writer: &mut Asn1Writer) -> Result<usize, CmsError> {
        Ok(writer.write_set(&self.key_values()?)?)
    }

    fn asn1_read(reader: &mut Asn1Reader) -> Result<Self, CmsError> {
        let mut params = CustomParams::default();
        let mut remaining = reader.read_set()?;
        while remaining > 0 {
            let element = reader.read_data()?;
            remaining = remaining.saturating_sub(element.len());

            let mut kv = Asn1Reader::new(&element);
            kv.read_sequence()?;
            let key = kv.read_utf8_string()?;
            if kv.read_context_tag(INTEGER_VALUE_TAG)? > 0 {
                params.integers.insert(key, kv.read_integer()?);
            } else if kv.read_context_tag(STRING_VALUE_TAG)? > 0 {
                params.strings.insert(key, kv.read_utf8_string()?);
            } else if kv.read_context_tag(DATA_VALUE_TAG)? > 0 {
                params.data.insert(key, kv.read_octet_string()?);
            } else {
                return Err(CmsError::InvalidFormat(format!(
                    "custom parameter '{}' has no value or an unexpected value type",
                    String::from_utf8_lossy(&key)
                )));
            }
        }
        Ok(params)
    }
}
