// In-memory byte source

use std::borrow::Cow;
use std::io::{Error as IoError, ErrorKind, SeekFrom};

use crate::error::StreamError;
use crate::stream::{BulkSource, ByteSource, NamedSource, SeekableSource};

/// Byte source over a borrowed slice, e.g. a metadata block already in memory.
#[derive(Debug, Clone)]
pub struct SliceSource<'a> {
    data: &'a [u8],
    pos: usize,
    name: &'a str,
}

impl<'a> SliceSource<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        SliceSource {
            data,
            pos: 0,
            name: "<memory>",
        }
    }

    pub fn with_name(mut self, name: &'a str) -> Self {
        self.name = name;
        self
    }

    /// Unconsumed bytes.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }
}

impl ByteSource for SliceSource<'_> {
    fn fill_buf(&mut self) -> Result<&[u8], StreamError> {
        Ok(&self.data[self.pos..])
    }

    fn consume(&mut self, amount: usize) {
        self.pos = (self.pos + amount).min(self.data.len());
    }
}

impl BulkSource for SliceSource<'_> {
    fn read_slice(&mut self, n: usize) -> Result<Cow<'_, [u8]>, StreamError> {
        let start = self.pos;
        let end = start + n.min(self.data.len() - start);
        self.pos = end;
        Ok(Cow::Borrowed(&self.data[start..end]))
    }
}

impl SeekableSource for SliceSource<'_> {
    fn tell(&mut self) -> Result<u64, StreamError> {
        Ok(self.pos as u64)
    }

    fn size(&mut self) -> Result<u64, StreamError> {
        Ok(self.data.len() as u64)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64, StreamError> {
        let target = match pos {
            SeekFrom::Start(offset) => i128::from(offset),
            SeekFrom::Current(offset) => self.pos as i128 + i128::from(offset),
            SeekFrom::End(offset) => self.data.len() as i128 + i128::from(offset),
        };
        if target < 0 {
            return Err(IoError::new(ErrorKind::InvalidInput, "seek before start of data").into());
        }
        // Seeking past the end clamps to the end and leaves the source exhausted.
        self.pos = usize::try_from(target).map_or(self.data.len(), |t| t.min(self.data.len()));
        Ok(self.pos as u64)
    }
}

impl NamedSource for SliceSource<'_> {
    fn name(&self) -> &str {
        self.name
    }
}
