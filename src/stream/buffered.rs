// Buffered, seekable byte source over a random-access store

use std::borrow::Cow;
use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::StreamError;
use crate::stream::{BulkSource, ByteSource, NamedSource, SeekableSource};

/// Read-ahead buffer size used unless a capacity is given.
pub const DEFAULT_CAPACITY: usize = 4096;

/// Byte source reading ahead from a `Read + Seek` store in fixed-size refills.
///
/// The unread part of the buffer is `buf[pos..filled]`. Every refill is one
/// `read` call on the store sized to the buffer capacity; a refill returning
/// no bytes marks the source exhausted until the next seek.
#[derive(Debug)]
pub struct BufferedSource<R> {
    inner: R,
    buf: Box<[u8]>,
    pos: usize,
    filled: usize,
    exhausted: bool,
    name: String,
}

impl BufferedSource<File> {
    /// Open a file with the default buffer capacity.
    pub fn open<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        Self::open_with_capacity(path, DEFAULT_CAPACITY)
    }

    /// Open a file with a given buffer capacity.
    pub fn open_with_capacity<P: AsRef<Path>>(path: P, capacity: usize) -> std::io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Ok(Self::with_capacity(capacity, file).with_name(path.display().to_string()))
    }
}

impl<R: Read + Seek> BufferedSource<R> {
    pub fn new(inner: R) -> Self {
        Self::with_capacity(DEFAULT_CAPACITY, inner)
    }

    /// Wrap an already-open store. `capacity` must be non-zero.
    pub fn with_capacity(capacity: usize, inner: R) -> Self {
        assert!(capacity > 0, "buffer capacity must be non-zero");
        BufferedSource {
            inner,
            buf: vec![0u8; capacity].into_boxed_slice(),
            pos: 0,
            filled: 0,
            exhausted: false,
            name: String::from("<stream>"),
        }
    }

    /// Set the origin identifier reported by [`NamedSource::name`].
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Bytes read from the store but not yet consumed.
    pub fn buffered(&self) -> usize {
        self.filled - self.pos
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn refill(&mut self) -> Result<(), StreamError> {
        self.pos = 0;
        self.filled = 0;
        let n = loop {
            match self.inner.read(&mut self.buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };
        log::trace!("{}: refilled {} bytes", self.name, n);
        self.filled = n;
        self.exhausted = n == 0;
        Ok(())
    }
}

impl<R: Read + Seek> ByteSource for BufferedSource<R> {
    fn fill_buf(&mut self) -> Result<&[u8], StreamError> {
        if self.pos >= self.filled && !self.exhausted {
            self.refill()?;
        }
        Ok(&self.buf[self.pos..self.filled])
    }

    fn consume(&mut self, amount: usize) {
        self.pos = (self.pos + amount).min(self.filled);
    }

    fn is_exhausted(&mut self) -> Result<bool, StreamError> {
        if self.pos < self.filled {
            return Ok(false);
        }
        Ok(self.fill_buf()?.is_empty())
    }
}

impl<R: Read + Seek> BulkSource for BufferedSource<R> {
    /// Borrows from the read-ahead buffer when `n` bytes are already
    /// buffered. Otherwise `n` is clamped to what is left in the store and the
    /// bytes are copied into a fresh allocation, since one refill cannot hold
    /// more than the buffer capacity.
    fn read_slice(&mut self, n: usize) -> Result<Cow<'_, [u8]>, StreamError> {
        if self.buffered() == 0 && !self.exhausted && n <= self.capacity() {
            self.refill()?;
        }
        if n <= self.buffered() {
            let start = self.pos;
            self.pos += n;
            return Ok(Cow::Borrowed(&self.buf[start..start + n]));
        }

        let left = self.remaining()?;
        let n = usize::try_from(left).map_or(n, |left| left.min(n));
        let mut owned = vec![0u8; n];
        let got = self.read_into(&mut owned)?.len();
        owned.truncate(got);
        Ok(Cow::Owned(owned))
    }
}

impl<R: Read + Seek> SeekableSource for BufferedSource<R> {
    fn tell(&mut self) -> Result<u64, StreamError> {
        let store_pos = self.inner.stream_position()?;
        Ok(store_pos - self.buffered() as u64)
    }

    fn size(&mut self) -> Result<u64, StreamError> {
        let current = self.inner.stream_position()?;
        let end = self.inner.seek(SeekFrom::End(0))?;
        if end != current {
            let _ = self.inner.seek(SeekFrom::Start(current))?;
        }
        Ok(end)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64, StreamError> {
        let target = match pos {
            // The store cursor is ahead of the logical position by the
            // unconsumed part of the buffer.
            SeekFrom::Current(offset) => SeekFrom::Current(offset - self.buffered() as i64),
            other => other,
        };
        let new_pos = self.inner.seek(target)?;
        self.pos = 0;
        self.filled = 0;
        self.exhausted = false;
        Ok(new_pos)
    }
}

impl<R: Read + Seek> NamedSource for BufferedSource<R> {
    fn name(&self) -> &str {
        &self.name
    }
}
