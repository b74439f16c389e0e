//! Separates a leading ContentInfo from the ciphertext that follows it
//!
//! Bytes arrive in arbitrary portions. The filter buffers until it has a
//! preamble large enough to probe with [`ContentInfo::define_size`], then
//! either buffers the rest of the header or declares that the stream carries
//! no header at all.
//!
//! ```text
//! WaitingPreamble ──probe ok──▶ WaitingBody ──full header──▶ Found ──▶ Done
//!        │                           │
//!        └──probe fails / EOF──▶ NotFound ──▶ Done
//!                                    │
//!                   EOF in body ──▶ Broken
//! ```

use crate::error::CipherError;
use cmsenvelope_protocol::ContentInfo;
use tracing::{debug, trace};

/// Bytes needed before the header size can be probed
pub const CONTENT_INFO_PREAMBLE_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    WaitingPreamble,
    WaitingBody,
    NotFound,
    Found,
    Broken,
    Done,
}

#[derive(Debug, Clone)]
pub struct ContentInfoFilter {
    state: FilterState,
    content_info: Vec<u8>,
    encrypted_data: Vec<u8>,
    expected_size: usize,
}

impl Default for ContentInfoFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentInfoFilter {
    pub fn new() -> Self {
        Self {
            state: FilterState::WaitingPreamble,
            content_info: Vec::new(),
            encrypted_data: Vec::new(),
            expected_size: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn state(&self) -> FilterState {
        self.state
    }

    /// Feed the next portion of the stream and return the payload bytes that
    /// are known to follow the header
    ///
    /// Once the header was found or declared absent, input is passed through.
    pub fn filter_data(&mut self, data: &[u8]) -> Result<Vec<u8>, CipherError> {
        match self.state {
            FilterState::WaitingPreamble | FilterState::WaitingBody => {}
            FilterState::Found | FilterState::NotFound => {
                self.encrypted_data.extend_from_slice(data);
                return Ok(self.pop_encrypted_data());
            }
            FilterState::Broken | FilterState::Done => {
                return Err(CipherError::InvalidState(format!(
                    "content info filter can not accept data in state {:?}",
                    self.state
                )));
            }
        }

        self.content_info.extend_from_slice(data);
        if self.content_info.len() < CONTENT_INFO_PREAMBLE_SIZE {
            return Ok(Vec::new());
        }

        if self.expected_size == 0 {
            self.expected_size = ContentInfo::define_size(&self.content_info);
            if self.expected_size == 0 {
                debug!("Stream does not start with a content info");
                self.encrypted_data = std::mem::take(&mut self.content_info);
                self.state = FilterState::NotFound;
                return Ok(self.pop_encrypted_data());
            }
            trace!(size = self.expected_size, "Content info header detected");
        }

        if self.content_info.len() >= self.expected_size {
            let payload = self.content_info.split_off(self.expected_size);
            self.encrypted_data.extend_from_slice(&payload);
            self.state = FilterState::Found;
            debug!(size = self.expected_size, "Content info extracted from stream");
            return Ok(self.pop_encrypted_data());
        }

        self.state = FilterState::WaitingBody;
        Ok(Vec::new())
    }

    /// Declare that no more data will arrive
    pub fn tell_last_chunk(&mut self) -> Result<(), CipherError> {
        match self.state {
            FilterState::WaitingPreamble => {
                self.encrypted_data = std::mem::take(&mut self.content_info);
                self.state = FilterState::NotFound;
                Ok(())
            }
            FilterState::WaitingBody => {
                debug!(
                    expected = self.expected_size,
                    received = self.content_info.len(),
                    "Stream ended inside the content info"
                );
                self.state = FilterState::Broken;
                Ok(())
            }
            FilterState::Found | FilterState::NotFound | FilterState::Broken => Ok(()),
            FilterState::Done => Err(CipherError::InvalidState(
                "content info filter is already done".to_string(),
            )),
        }
    }

    /// Close the filter once the header question is settled
    pub fn finish(&mut self) -> Result<(), CipherError> {
        match self.state {
            FilterState::Found | FilterState::NotFound => {
                self.state = FilterState::Done;
                Ok(())
            }
            state => Err(CipherError::InvalidState(format!(
                "content info filter can not finish in state {:?}",
                state
            ))),
        }
    }

    pub fn is_waiting_data(&self) -> bool {
        matches!(
            self.state,
            FilterState::WaitingPreamble | FilterState::WaitingBody
        )
    }

    pub fn is_content_info_found(&self) -> bool {
        self.state == FilterState::Found
    }

    pub fn is_content_info_absent(&self) -> bool {
        self.state == FilterState::NotFound
    }

    pub fn is_content_info_broken(&self) -> bool {
        self.state == FilterState::Broken
    }

    pub fn is_done(&self) -> bool {
        self.state == FilterState::Done
    }

    /// Take the extracted header bytes
    pub fn pop_content_info(&mut self) -> Result<Vec<u8>, CipherError> {
        if self.state != FilterState::Found {
            return Err(CipherError::InvalidState(
                "content info was not found".to_string(),
            ));
        }
        Ok(std::mem::take(&mut self.content_info))
    }

    /// Take the payload bytes buffered so far
    pub fn pop_encrypted_data(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.encrypted_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmsenvelope_protocol::{Asn1Compatible, CmsContent, ContentType, CustomParams};

    fn header() -> Vec<u8> {
        let mut params = CustomParams::new();
        params.set_data("padding", vec![0xAB; 300]);
        ContentInfo {
            cms_content: CmsContent {
                content_type: ContentType::Data,
                content: vec![0x05, 0x00],
            },
            custom_params: params,
        }
        .to_asn1()
        .unwrap()
    }

    #[test]
    fn test_header_in_small_portions() {
        let header = header();
        let mut stream = header.clone();
        stream.extend_from_slice(b"ciphertext");

        let mut filter = ContentInfoFilter::new();
        let mut payload = Vec::new();
        for part in stream.chunks(7) {
            payload.extend(filter.filter_data(part).unwrap());
        }
        assert!(filter.is_content_info_found());
        assert_eq!(filter.pop_content_info().unwrap(), header);
        assert_eq!(payload, b"ciphertext".to_vec());

        filter.finish().unwrap();
        assert!(filter.is_done());
        assert!(filter.filter_data(b"more").is_err());
    }

    #[test]
    fn test_header_in_one_portion() {
        let header = header();
        let mut stream = header.clone();
        stream.extend_from_slice(b"tail");

        let mut filter = ContentInfoFilter::new();
        assert_eq!(filter.filter_data(&stream).unwrap(), b"tail".to_vec());
        assert_eq!(filter.pop_content_info().unwrap(), header);
        assert_eq!(filter.filter_data(b" and more").unwrap(), b" and more".to_vec());
    }

    #[test]
    fn test_no_header() {
        let mut filter = ContentInfoFilter::new();
        assert!(filter.filter_data(b"abcdefghij").unwrap().is_empty());
        assert_eq!(
            filter.filter_data(b"klmnopqrst").unwrap(),
            b"abcdefghijklmnopqrst".to_vec()
        );
        assert!(filter.is_content_info_absent());
        assert!(filter.pop_content_info().is_err());
    }

    #[test]
    fn test_short_stream_without_header() {
        let mut filter = ContentInfoFilter::new();
        assert!(filter.filter_data(b"short").unwrap().is_empty());
        filter.tell_last_chunk().unwrap();
        assert!(filter.is_content_info_absent());
        assert_eq!(filter.pop_encrypted_data(), b"short".to_vec());
    }

    #[test]
    fn test_truncated_header() {
        let header = header();
        let mut filter = ContentInfoFilter::new();
        assert!(filter.filter_data(&header[..40]).unwrap().is_empty());
        assert_eq!(filter.state(), FilterState::WaitingBody);
        filter.tell_last_chunk().unwrap();
        assert!(filter.is_content_info_broken());
        assert!(filter.finish().is_err());
    }
}
