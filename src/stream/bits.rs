// MSB-first bit extraction over a byte source

use crate::error::StreamError;
use crate::stream::ByteSource;

/// Unsigned integer types a [`BitReader`] can produce.
pub trait BitValue: Sized {
    const BITS: u32;
    fn from_bits(value: u64) -> Self;
}

macro_rules! impl_bit_value {
    ($($t:ty),*) => {
        $(
            impl BitValue for $t {
                const BITS: u32 = <$t>::BITS;
                fn from_bits(value: u64) -> Self {
                    value as $t
                }
            }
        )*
    };
}

impl_bit_value!(u8, u16, u32, u64);

/// Reads bit fields that do not fall on byte boundaries.
///
/// The reader exclusively borrows its source, so no byte-aligned read can
/// interleave with a partially consumed byte. `consumed` counts the bits
/// already taken from the byte at the front of the source and stays in
/// `0..8`; the byte is popped once all eight are used.
///
/// Call [`BitReader::finish`] when done; it is the checked way to end bit
/// reading. Dropping a reader with a partial byte pending logs a warning,
/// and in debug builds also trips an assertion unless a read on it has
/// already failed (the caller is then unwinding through `?`).
#[must_use = "call finish() to check that no partial byte is left pending"]
#[derive(Debug)]
pub struct BitReader<'a, S: ByteSource + ?Sized> {
    source: &'a mut S,
    consumed: u32,
    failed: bool,
}

impl<'a, S: ByteSource + ?Sized> BitReader<'a, S> {
    pub fn new(source: &'a mut S) -> Self {
        BitReader {
            source,
            consumed: 0,
            failed: false,
        }
    }

    /// Bits of the current byte already consumed.
    pub fn bit_offset(&self) -> u32 {
        self.consumed
    }

    /// Reads the next `bits` bits, most significant first.
    ///
    /// `bits` may not exceed the width of `T`. On `SourceExhausted` the bits
    /// taken so far are lost; earlier results are unaffected.
    pub fn read<T: BitValue>(&mut self, bits: u32) -> Result<T, StreamError> {
        let result = self.read_bits(bits);
        self.failed |= result.is_err();
        result
    }

    fn read_bits<T: BitValue>(&mut self, bits: u32) -> Result<T, StreamError> {
        if bits > T::BITS {
            return Err(StreamError::InvalidPrecondition(format!(
                "cannot read {} bits into a {}-bit value",
                bits,
                T::BITS
            )));
        }

        let mut value: u64 = 0;
        let mut remaining = bits;
        while remaining > 0 {
            let byte = self.source.peek()?.ok_or_else(|| {
                StreamError::exhausted(((remaining + self.consumed + 7) / 8) as usize, 0)
            })?;
            let available = 8 - self.consumed;
            if remaining < available {
                // Field ends inside this byte
                let shift = available - remaining;
                value = (value << remaining) | u64::from((byte >> shift) & mask(remaining));
                self.consumed += remaining;
                remaining = 0;
            } else {
                value = (value << available) | u64::from(byte & mask(available));
                remaining -= available;
                self.consumed = 0;
                self.source.consume(1);
            }
        }
        Ok(T::from_bits(value))
    }

    pub fn read_bool(&mut self) -> Result<bool, StreamError> {
        Ok(self.read::<u8>(1)? == 1)
    }

    /// Discards the rest of a partially consumed byte.
    pub fn align(&mut self) {
        if self.consumed != 0 {
            self.source.consume(1);
            self.consumed = 0;
        }
    }

    /// Ends bit-level reading; the source is free for byte-aligned use
    /// once the reader is gone.
    ///
    /// Fails with `InvalidPrecondition` when a byte is only partly consumed.
    pub fn finish(mut self) -> Result<(), StreamError> {
        let pending = std::mem::take(&mut self.consumed);
        if pending != 0 {
            return Err(StreamError::InvalidPrecondition(format!(
                "bit reader finished with {} bits of a byte consumed",
                pending
            )));
        }
        Ok(())
    }
}

impl<S: ByteSource + ?Sized> Drop for BitReader<'_, S> {
    fn drop(&mut self) {
        if self.consumed != 0 {
            log::warn!(
                "bit reader dropped with {} bits of a byte consumed; the byte stays unread",
                self.consumed
            );
            debug_assert!(
                self.failed || std::thread::panicking(),
                "bit reader dropped with {} bits pending; call finish()",
                self.consumed
            );
        }
    }
}

fn mask(bits: u32) -> u8 {
    ((1u16 << bits) - 1) as u8
}
