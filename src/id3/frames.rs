// ID3 frame definitions and parsers
//
// Frame ids select a decoder through a lookup table; ids without an entry
// fall back on their first letter (T = text, W = URL) and otherwise stay
// opaque.

use crate::error::StreamError;
use crate::flac::picture::PictureType;
use crate::stream::{ByteSource, SliceSource};
use crate::utils::encoding::{decode_latin1_field, decode_text, split_terminated, TextEncoding};
use crate::utils::io::decode_be;

/// Decoded body of an ID3v2 frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameContent {
    /// T*** frames; v2.4 allows several NUL-separated values
    Text(Vec<String>),
    UserText { description: String, value: String },
    Url(String),
    UserUrl { description: String, url: String },
    Comment(LanguageText),
    Lyrics(LanguageText),
    Picture(AttachedPicture),
    PlayCounter(u64),
    Popularimeter { email: String, rating: u8, counter: u64 },
    Opaque(Vec<u8>),
}

/// Body shared by COMM and USLT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageText {
    pub language: String,
    pub description: String,
    pub text: String,
}

/// APIC (v2.3+) or PIC (v2.2) frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedPicture {
    pub mime_type: String,
    pub picture_type: PictureType,
    pub description: String,
    pub data: Vec<u8>,
}

type FrameDecoder = fn(&[u8], u8) -> Result<FrameContent, StreamError>;

const DECODERS: &[(&str, FrameDecoder)] = &[
    ("TXXX", decode_user_text),
    ("WXXX", decode_user_url),
    ("COMM", decode_comment),
    ("USLT", decode_lyrics),
    ("APIC", decode_picture),
    ("PCNT", decode_play_counter),
    ("POPM", decode_popularimeter),
];

/// v2.2 ids and their v2.3 equivalents.
const V22_IDS: &[(&str, &str)] = &[
    ("TT1", "TIT1"),
    ("TT2", "TIT2"),
    ("TT3", "TIT3"),
    ("TP1", "TPE1"),
    ("TP2", "TPE2"),
    ("TP3", "TPE3"),
    ("TP4", "TPE4"),
    ("TCM", "TCOM"),
    ("TXT", "TEXT"),
    ("TAL", "TALB"),
    ("TYE", "TYER"),
    ("TRK", "TRCK"),
    ("TPA", "TPOS"),
    ("TCO", "TCON"),
    ("TBP", "TBPM"),
    ("TEN", "TENC"),
    ("TCR", "TCOP"),
    ("TPB", "TPUB"),
    ("TLE", "TLEN"),
    ("TXX", "TXXX"),
    ("WXX", "WXXX"),
    ("COM", "COMM"),
    ("ULT", "USLT"),
    ("PIC", "APIC"),
    ("CNT", "PCNT"),
    ("POP", "POPM"),
];

/// Map a three-character v2.2 id to its four-character form.
pub fn upgrade_v22_id(id: &str) -> Option<&'static str> {
    V22_IDS.iter().find(|(old, _)| *old == id).map(|(_, new)| *new)
}

fn lookup(frame_id: &str) -> Option<FrameDecoder> {
    if let Some((_, decoder)) = DECODERS.iter().find(|(id, _)| *id == frame_id) {
        return Some(*decoder);
    }
    match frame_id.as_bytes().first() {
        Some(b'T') => Some(decode_text_frame),
        Some(b'W') => Some(decode_url),
        _ => None,
    }
}

/// Decode a frame body; malformed bodies are kept opaque.
pub fn decode_frame(frame_id: &str, data: &[u8], major: u8) -> FrameContent {
    let Some(decoder) = lookup(frame_id) else {
        return FrameContent::Opaque(data.to_vec());
    };
    match decoder(data, major) {
        Ok(content) => content,
        Err(e) => {
            log::warn!("malformed {} frame: {}", frame_id, e);
            FrameContent::Opaque(data.to_vec())
        }
    }
}

/// Leading encoding byte and the bytes after it.
fn split_encoding(data: &[u8]) -> Result<(TextEncoding, &[u8]), StreamError> {
    match data.split_first() {
        Some((&byte, rest)) => Ok((TextEncoding::from_byte(byte), rest)),
        None => Err(StreamError::exhausted(1, 0)),
    }
}

fn decode_text_frame(data: &[u8], _major: u8) -> Result<FrameContent, StreamError> {
    let (encoding, rest) = split_encoding(data)?;
    let text = decode_text(rest, encoding);
    let values = text
        .split('\0')
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect();
    Ok(FrameContent::Text(values))
}

fn decode_user_text(data: &[u8], _major: u8) -> Result<FrameContent, StreamError> {
    let (encoding, rest) = split_encoding(data)?;
    let (description, value) = split_terminated(rest, encoding);
    Ok(FrameContent::UserText {
        description: decode_text(description, encoding),
        value: decode_text(value, encoding),
    })
}

fn decode_url(data: &[u8], _major: u8) -> Result<FrameContent, StreamError> {
    Ok(FrameContent::Url(decode_latin1_field(data)))
}

fn decode_user_url(data: &[u8], _major: u8) -> Result<FrameContent, StreamError> {
    let (encoding, rest) = split_encoding(data)?;
    let (description, url) = split_terminated(rest, encoding);
    Ok(FrameContent::UserUrl {
        description: decode_text(description, encoding),
        url: decode_latin1_field(url),
    })
}

fn decode_language_text(data: &[u8]) -> Result<LanguageText, StreamError> {
    let (encoding, rest) = split_encoding(data)?;
    if rest.len() < 3 {
        return Err(StreamError::exhausted(3, rest.len()));
    }
    let (language, rest) = rest.split_at(3);
    let (description, text) = split_terminated(rest, encoding);
    Ok(LanguageText {
        language: decode_latin1_field(language),
        description: decode_text(description, encoding),
        text: decode_text(text, encoding),
    })
}

fn decode_comment(data: &[u8], _major: u8) -> Result<FrameContent, StreamError> {
    decode_language_text(data).map(FrameContent::Comment)
}

fn decode_lyrics(data: &[u8], _major: u8) -> Result<FrameContent, StreamError> {
    decode_language_text(data).map(FrameContent::Lyrics)
}

fn decode_picture(data: &[u8], major: u8) -> Result<FrameContent, StreamError> {
    let (encoding, rest) = split_encoding(data)?;
    let (mime_type, rest) = if major == 2 {
        // Three-character image format instead of a MIME type
        if rest.len() < 3 {
            return Err(StreamError::exhausted(3, rest.len()));
        }
        let (format, rest) = rest.split_at(3);
        let mime = match decode_latin1_field(format).to_ascii_uppercase().as_str() {
            "PNG" => "image/png".to_string(),
            "JPG" => "image/jpeg".to_string(),
            other => format!("image/{}", other.to_ascii_lowercase()),
        };
        (mime, rest)
    } else {
        let (mime, rest) = split_terminated(rest, TextEncoding::Iso8859_1);
        (decode_latin1_field(mime), rest)
    };

    let mut source = SliceSource::new(rest);
    let picture_type = PictureType::from_u32(u32::from(source.pop()?));
    let (description, image) = split_terminated(source.rest(), encoding);

    Ok(FrameContent::Picture(AttachedPicture {
        mime_type,
        picture_type,
        description: decode_text(description, encoding),
        data: image.to_vec(),
    }))
}

/// Counters are at least 32 bits and grow a byte at a time.
fn decode_counter(data: &[u8]) -> u64 {
    let width = data.len().min(8);
    decode_be(&data[data.len() - width..])
}

fn decode_play_counter(data: &[u8], _major: u8) -> Result<FrameContent, StreamError> {
    if data.len() < 4 {
        return Err(StreamError::exhausted(4, data.len()));
    }
    Ok(FrameContent::PlayCounter(decode_counter(data)))
}

fn decode_popularimeter(data: &[u8], _major: u8) -> Result<FrameContent, StreamError> {
    let (email, rest) = split_terminated(data, TextEncoding::Iso8859_1);
    let (&rating, counter) = rest
        .split_first()
        .ok_or_else(|| StreamError::exhausted(1, 0))?;
    Ok(FrameContent::Popularimeter {
        email: decode_latin1_field(email),
        rating,
        counter: decode_counter(counter),
    })
}
