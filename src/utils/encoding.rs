// Text decoding for tag fields

use encoding_rs::{UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};

/// Text encodings signalled by the first byte of an ID3v2 text field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Iso8859_1 = 0,
    Utf16 = 1,
    Utf16BE = 2,
    Utf8 = 3,
}

impl TextEncoding {
    /// Unknown encoding bytes fall back to ISO-8859-1.
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            1 => TextEncoding::Utf16,
            2 => TextEncoding::Utf16BE,
            3 => TextEncoding::Utf8,
            _ => TextEncoding::Iso8859_1,
        }
    }

    /// Width of the string terminator in bytes.
    pub fn terminator_len(self) -> usize {
        match self {
            TextEncoding::Utf16 | TextEncoding::Utf16BE => 2,
            TextEncoding::Iso8859_1 | TextEncoding::Utf8 => 1,
        }
    }
}

/// Decode text, dropping trailing terminators.
pub fn decode_text(data: &[u8], encoding: TextEncoding) -> String {
    let text = match encoding {
        // ISO-8859-1 is decoded as its Windows-1252 superset, like most taggers
        TextEncoding::Iso8859_1 => WINDOWS_1252.decode(data).0,
        TextEncoding::Utf16 => {
            if data.starts_with(&[0xFE, 0xFF]) {
                UTF_16BE.decode_without_bom_handling(&data[2..]).0
            } else if data.starts_with(&[0xFF, 0xFE]) {
                UTF_16LE.decode_without_bom_handling(&data[2..]).0
            } else {
                UTF_16LE.decode_without_bom_handling(data).0
            }
        }
        TextEncoding::Utf16BE => UTF_16BE.decode_without_bom_handling(data).0,
        TextEncoding::Utf8 => UTF_8.decode(data).0,
    };
    text.trim_end_matches('\0').to_string()
}

/// Split `data` at the first string terminator of `encoding`.
///
/// Returns the text before the terminator and the bytes after it; without a
/// terminator the whole input is text and the rest is empty.
pub fn split_terminated(data: &[u8], encoding: TextEncoding) -> (&[u8], &[u8]) {
    let width = encoding.terminator_len();
    let found = if width == 1 {
        data.iter().position(|&b| b == 0)
    } else {
        data.chunks_exact(2)
            .position(|pair| pair == [0, 0])
            .map(|index| index * 2)
    };
    match found {
        Some(end) => (&data[..end], &data[end + width..]),
        None => (data, &data[data.len()..]),
    }
}

/// Decode a fixed-width, NUL-padded Latin-1 field.
pub fn decode_latin1_field(data: &[u8]) -> String {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    WINDOWS_1252.decode(&data[..end]).0.trim().to_string()
}
