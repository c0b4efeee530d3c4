// Byte source abstraction
//
// Every format decoder reads through the traits below. Capability tiers,
// each extending the previous one:
// - ByteSource:     sequential consumption (peek / pop / buffered window)
// - BulkSource:     fill a caller buffer, or hand back a slice of up to N bytes
// - SeekableSource: absolute position, total size, seeking
// - NamedSource:    origin identifier for diagnostics

pub mod bits;
pub mod buffered;
pub mod slice;
pub mod sync;

pub use bits::BitReader;
pub use buffered::BufferedSource;
pub use slice::SliceSource;
pub use sync::{sync_to, PatternSynchronizer, SyncOutcome};

use std::borrow::Cow;
use std::io::SeekFrom;

use crate::error::StreamError;

/// Sequential byte producer.
///
/// `fill_buf` exposes the bytes currently buffered without consuming them,
/// refilling only when nothing is buffered. An empty window means the source
/// is exhausted.
pub trait ByteSource {
    /// Returns the buffered window, refilling it when empty.
    fn fill_buf(&mut self) -> Result<&[u8], StreamError>;

    /// Marks `amount` bytes of the current window as consumed.
    ///
    /// `amount` must not exceed the length of the last window returned by
    /// [`ByteSource::fill_buf`].
    fn consume(&mut self, amount: usize);

    fn is_exhausted(&mut self) -> Result<bool, StreamError> {
        Ok(self.fill_buf()?.is_empty())
    }

    /// Next byte without consuming it.
    fn peek(&mut self) -> Result<Option<u8>, StreamError> {
        Ok(self.fill_buf()?.first().copied())
    }

    /// Consumes and returns the next byte.
    fn pop(&mut self) -> Result<u8, StreamError> {
        let byte = self.peek()?.ok_or_else(|| StreamError::exhausted(1, 0))?;
        self.consume(1);
        Ok(byte)
    }
}

/// Sources able to move many bytes per call.
pub trait BulkSource: ByteSource {
    /// Fills `buf` with up to `buf.len()` bytes and returns the filled part.
    ///
    /// The returned slice is shorter than `buf` only at end of data.
    fn read_into<'b>(&mut self, buf: &'b mut [u8]) -> Result<&'b [u8], StreamError> {
        let mut filled = 0;
        while filled < buf.len() {
            let window = self.fill_buf()?;
            if window.is_empty() {
                break;
            }
            let n = window.len().min(buf.len() - filled);
            buf[filled..filled + n].copy_from_slice(&window[..n]);
            self.consume(n);
            filled += n;
        }
        Ok(&buf[..filled])
    }

    /// Reads exactly `buf.len()` bytes or fails with `SourceExhausted`.
    fn read_exact_into(&mut self, buf: &mut [u8]) -> Result<(), StreamError> {
        let needed = buf.len();
        let got = self.read_into(buf)?.len();
        if got < needed {
            return Err(StreamError::exhausted(needed, got));
        }
        Ok(())
    }

    /// Consumes up to `n` bytes and returns them.
    ///
    /// Implementations borrow from their internal buffer when they can; the
    /// borrow ends before the next call that could refill or seek. This
    /// default always copies.
    fn read_slice(&mut self, n: usize) -> Result<Cow<'_, [u8]>, StreamError> {
        let mut owned = vec![0u8; n];
        let got = self.read_into(&mut owned)?.len();
        owned.truncate(got);
        Ok(Cow::Owned(owned))
    }

    /// Like [`BulkSource::read_slice`] but fails when fewer than `n` bytes remain.
    fn read_exact_slice(&mut self, n: usize) -> Result<Cow<'_, [u8]>, StreamError> {
        let slice = self.read_slice(n)?;
        if slice.len() < n {
            return Err(StreamError::exhausted(n, slice.len()));
        }
        Ok(slice)
    }

    /// Skips `n` bytes, returning how many were actually skipped.
    fn skip(&mut self, n: u64) -> Result<u64, StreamError> {
        let mut skipped = 0u64;
        while skipped < n {
            let window = self.fill_buf()?.len();
            if window == 0 {
                break;
            }
            let step = usize::try_from(n - skipped).map_or(window, |left| left.min(window));
            self.consume(step);
            skipped += step as u64;
        }
        Ok(skipped)
    }
}

/// Sources backed by a random-access store.
///
/// Seeking invalidates any slice previously handed out by
/// [`BulkSource::read_slice`]; the borrow checker enforces this since both
/// take `&mut self`.
pub trait SeekableSource: BulkSource {
    /// Absolute position of the next unread byte.
    fn tell(&mut self) -> Result<u64, StreamError>;

    /// Total size of the store in bytes.
    fn size(&mut self) -> Result<u64, StreamError>;

    /// Moves to a new position and returns it.
    fn seek(&mut self, pos: SeekFrom) -> Result<u64, StreamError>;

    /// Bytes left between the current position and the end of the store.
    fn remaining(&mut self) -> Result<u64, StreamError> {
        let size = self.size()?;
        let pos = self.tell()?;
        Ok(size.saturating_sub(pos))
    }
}

/// Sources that know where their bytes come from.
pub trait NamedSource: SeekableSource {
    fn name(&self) -> &str;
}
