// Fixed-width integer decoding
//
// Byte order is always explicit; host endianness never leaks into a value.

use crate::error::StreamError;
use crate::stream::BulkSource;

/// Integers decodable from up to `WIDTH` bytes.
///
/// Signed types are reinterpretations of the unsigned bit pattern; a slice
/// shorter than the width is not sign-extended.
pub trait Decode: Sized {
    const WIDTH: usize;
    fn from_u64(value: u64) -> Self;
}

macro_rules! impl_decode {
    ($($t:ty),*) => {
        $(
            impl Decode for $t {
                const WIDTH: usize = std::mem::size_of::<$t>();
                fn from_u64(value: u64) -> Self {
                    value as $t
                }
            }
        )*
    };
}

impl_decode!(u8, u16, u32, u64, i8, i16, i32, i64);

/// Decode big-endian bytes. Panics if `bytes` is wider than `T`.
pub fn decode_be<T: Decode>(bytes: &[u8]) -> T {
    assert!(
        bytes.len() <= T::WIDTH,
        "{} bytes do not fit a {}-byte integer",
        bytes.len(),
        T::WIDTH
    );
    T::from_u64(bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
}

/// Decode little-endian bytes. Panics if `bytes` is wider than `T`.
pub fn decode_le<T: Decode>(bytes: &[u8]) -> T {
    assert!(
        bytes.len() <= T::WIDTH,
        "{} bytes do not fit a {}-byte integer",
        bytes.len(),
        T::WIDTH
    );
    T::from_u64(bytes.iter().rev().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
}

/// Decode a synchsafe integer (7 significant bits per byte, big-endian).
pub fn decode_synchsafe(bytes: &[u8]) -> u32 {
    assert!(bytes.len() <= 5, "synchsafe integers span at most 5 bytes");
    bytes
        .iter()
        .fold(0u32, |acc, &b| (acc << 7) | u32::from(b & 0x7F))
}

/// Read `n` bytes and decode them big-endian.
pub fn read_be<T: Decode, S: BulkSource + ?Sized>(source: &mut S, n: usize) -> Result<T, StreamError> {
    assert!(n <= T::WIDTH, "{} bytes do not fit a {}-byte integer", n, T::WIDTH);
    let mut raw = [0u8; 8];
    let buf = &mut raw[..n];
    source.read_exact_into(buf)?;
    Ok(decode_be(buf))
}

/// Read `n` bytes and decode them little-endian.
pub fn read_le<T: Decode, S: BulkSource + ?Sized>(source: &mut S, n: usize) -> Result<T, StreamError> {
    assert!(n <= T::WIDTH, "{} bytes do not fit a {}-byte integer", n, T::WIDTH);
    let mut raw = [0u8; 8];
    let buf = &mut raw[..n];
    source.read_exact_into(buf)?;
    Ok(decode_le(buf))
}

/// Read a full-width big-endian integer.
pub fn read_be_full<T: Decode, S: BulkSource + ?Sized>(source: &mut S) -> Result<T, StreamError> {
    read_be(source, T::WIDTH)
}

/// Read a full-width little-endian integer.
pub fn read_le_full<T: Decode, S: BulkSource + ?Sized>(source: &mut S) -> Result<T, StreamError> {
    read_le(source, T::WIDTH)
}
