//! Data sources and sinks for the streaming strategies
//!
//! Sources are pulled (`has_data` then `read`), sinks are pushed (`write`).
//! A sink that fails makes the running operation fail with
//! [`CipherError::Io`]; output is never silently dropped.

use crate::config::CipherOptions;
use crate::error::CipherError;
use std::io::{BufRead, BufReader, Read, Write};

/// Pull-based input
pub trait DataSource {
    /// Returns true while more bytes can be read
    fn has_data(&mut self) -> Result<bool, CipherError>;

    /// Read the next portion of data
    fn read(&mut self) -> Result<Vec<u8>, CipherError>;
}

/// Push-based output
pub trait DataSink {
    /// Returns false once the sink can no longer accept data
    fn is_good(&self) -> bool {
        true
    }

    fn write(&mut self, data: &[u8]) -> Result<(), CipherError>;
}

/// Source over an in-memory buffer, handed out in fixed portions
#[derive(Debug, Clone)]
pub struct BytesDataSource {
    data: Vec<u8>,
    position: usize,
    read_size: usize,
}

impl BytesDataSource {
    pub fn new(data: impl Into<Vec<u8>>, read_size: usize) -> Self {
        Self {
            data: data.into(),
            position: 0,
            read_size: read_size.max(1),
        }
    }
}

impl DataSource for BytesDataSource {
    fn has_data(&mut self) -> Result<bool, CipherError> {
        Ok(self.position < self.data.len())
    }

    fn read(&mut self) -> Result<Vec<u8>, CipherError> {
        let end = (self.position + self.read_size).min(self.data.len());
        let out = self.data[self.position..end].to_vec();
        self.position = end;
        Ok(out)
    }
}

/// Source over any [`Read`] implementation
pub struct IoDataSource<R: Read> {
    reader: BufReader<R>,
    read_size: usize,
}

impl<R: Read> IoDataSource<R> {
    pub fn new(reader: R, read_size: usize) -> Self {
        Self {
            reader: BufReader::new(reader),
            read_size: read_size.max(1),
        }
    }

    /// Source pulling `stream_read_size` bytes per read
    pub fn with_options(reader: R, options: &CipherOptions) -> Self {
        Self::new(reader, options.stream_read_size)
    }

    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }
}

impl<R: Read> DataSource for IoDataSource<R> {
    fn has_data(&mut self) -> Result<bool, CipherError> {
        Ok(!self.reader.fill_buf()?.is_empty())
    }

    fn read(&mut self) -> Result<Vec<u8>, CipherError> {
        let mut out = Vec::with_capacity(self.read_size);
        (&mut self.reader)
            .take(self.read_size as u64)
            .read_to_end(&mut out)?;
        Ok(out)
    }
}

/// Sink collecting everything into memory
#[derive(Debug, Clone, Default)]
pub struct VecDataSink {
    data: Vec<u8>,
}

impl VecDataSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl DataSink for VecDataSink {
    fn write(&mut self, data: &[u8]) -> Result<(), CipherError> {
        self.data.extend_from_slice(data);
        Ok(())
    }
}

/// Sink over any [`Write`] implementation
///
/// After the first failed write the sink reports itself as not good.
pub struct IoDataSink<W: Write> {
    writer: W,
    good: bool,
}

impl<W: Write> IoDataSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, good: true }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> DataSink for IoDataSink<W> {
    fn is_good(&self) -> bool {
        self.good
    }

    fn write(&mut self, data: &[u8]) -> Result<(), CipherError> {
        if !self.good {
            return Err(CipherError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "sink failed earlier",
            )));
        }
        if let Err(e) = self.writer.write_all(data).and_then(|_| self.writer.flush()) {
            self.good = false;
            return Err(e.into());
        }
        Ok(())
    }
}

/// Write to `sink`, failing with an I/O error when it is no longer good
pub(crate) fn write_checked<S: DataSink + ?Sized>(
    sink: &mut S,
    data: &[u8],
) -> Result<(), CipherError> {
    if !sink.is_good() {
        return Err(CipherError::Io(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "data sink is not good",
        )));
    }
    if data.is_empty() {
        return Ok(());
    }
    sink.write(data)
}
