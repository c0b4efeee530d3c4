// ID3v2 tag implementation
//
// Header (10 bytes): "ID3", major version, revision, flags, synchsafe size.
// The size excludes the header and the optional 10-byte footer.
//
// Frame headers:
// - v2.2: 3-char id, 24-bit size
// - v2.3: 4-char id, 32-bit size, 16-bit flags
// - v2.4: 4-char id, synchsafe size, 16-bit flags

use crate::error::{Error, Result, StageContext, StreamError};
use crate::id3::frames::{decode_frame, upgrade_v22_id, FrameContent};
use crate::stream::{BulkSource, ByteSource, SliceSource};
use crate::utils::io::{decode_synchsafe, read_be, read_be_full};

const FORMAT: &str = "ID3v2";

pub const FLAG_UNSYNCHRONISATION: u8 = 0x80;
pub const FLAG_EXTENDED_HEADER: u8 = 0x40;
pub const FLAG_FOOTER: u8 = 0x10;

// v2.3 frame format flags
const V23_COMPRESSION: u16 = 0x0080;
const V23_ENCRYPTION: u16 = 0x0040;
const V23_GROUPING: u16 = 0x0020;

// v2.4 frame format flags
const V24_GROUPING: u16 = 0x0040;
const V24_COMPRESSION: u16 = 0x0008;
const V24_ENCRYPTION: u16 = 0x0004;
const V24_UNSYNCHRONISATION: u16 = 0x0002;
const V24_DATA_LENGTH: u16 = 0x0001;

/// ID3v2 header structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Id3v2Header {
    pub version: (u8, u8),
    pub flags: u8,
    pub size: u32,
}

impl Id3v2Header {
    pub const SIZE: usize = 10;
    const ID: &[u8; 3] = b"ID3";

    /// Parse a tag header; `None` unless the bytes form a valid one.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE || !bytes.starts_with(Self::ID) {
            return None;
        }
        let (major, revision) = (bytes[3], bytes[4]);
        if major == 0xFF || revision == 0xFF || bytes[6..10].iter().any(|&b| b & 0x80 != 0) {
            return None;
        }

        Some(Id3v2Header {
            version: (major, revision),
            flags: bytes[5],
            size: decode_synchsafe(&bytes[6..10]),
        })
    }

    pub fn major(&self) -> u8 {
        self.version.0
    }

    pub fn has_flag(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }

    /// Bytes occupied by the whole tag, header and footer included.
    pub fn tag_size(&self) -> u64 {
        let footer = if self.major() >= 4 && self.has_flag(FLAG_FOOTER) {
            Self::SIZE as u64
        } else {
            0
        };
        Self::SIZE as u64 + u64::from(self.size) + footer
    }

    fn frame_header_size(&self) -> usize {
        if self.major() == 2 {
            6
        } else {
            10
        }
    }
}

/// ID3v2 tag structure
#[derive(Debug, Clone)]
pub struct Id3v2Tag {
    pub header: Id3v2Header,
    pub frames: Vec<Id3Frame>,
}

/// ID3v2 frame structure
#[derive(Debug, Clone, PartialEq)]
pub struct Id3Frame {
    /// Four-character id; v2.2 ids are mapped to their v2.3 equivalents
    pub frame_id: String,
    pub flags: u16,
    pub content: FrameContent,
}

impl Id3v2Tag {
    /// Read a tag from the current position.
    ///
    /// Returns `Ok(None)` when the source does not start with an ID3v2 header.
    pub fn read<S: BulkSource + ?Sized>(source: &mut S) -> Result<Option<Self>> {
        let header = {
            let bytes = source.read_slice(Id3v2Header::SIZE).stage(FORMAT, "header")?;
            match Id3v2Header::parse(&bytes) {
                Some(header) => header,
                None => return Ok(None),
            }
        };
        if !(2..=4).contains(&header.major()) {
            log::warn!("unsupported ID3v2.{} tag ignored", header.major());
            return Ok(None);
        }
        log::debug!(
            "ID3v2.{}.{} tag, {} bytes, flags {:#04x}",
            header.version.0,
            header.version.1,
            header.size,
            header.flags
        );

        let declared = header.size as usize;
        let body = {
            let body = source.read_slice(declared).stage(FORMAT, "tag body")?;
            if body.len() < declared {
                return Err(Error::Decode {
                    origin: None,
                    format: FORMAT,
                    stage: "tag body",
                    source: StreamError::TruncatedHeader {
                        what: "ID3v2 tag",
                        declared,
                        available: body.len(),
                    },
                });
            }
            // v2.4 signals unsynchronisation per frame
            if header.major() < 4 && header.has_flag(FLAG_UNSYNCHRONISATION) {
                reverse_unsynchronisation(&body)
            } else {
                body.into_owned()
            }
        };

        let frames = Self::parse_frames(&header, &body).stage(FORMAT, "frames")?;
        Ok(Some(Id3v2Tag { header, frames }))
    }

    fn parse_frames(header: &Id3v2Header, body: &[u8]) -> Result<Vec<Id3Frame>, StreamError> {
        let mut source = SliceSource::new(body);
        if header.has_flag(FLAG_EXTENDED_HEADER) && header.major() >= 3 {
            skip_extended_header(header, &mut source)?;
        }

        let mut frames = Vec::new();
        while source.rest().len() >= header.frame_header_size() {
            // Padding
            if source.peek()? == Some(0) {
                break;
            }
            match read_frame(header, &mut source)? {
                Some(frame) => frames.push(frame),
                None => break,
            }
        }
        Ok(frames)
    }

    /// First frame with the given id.
    pub fn get(&self, frame_id: &str) -> Option<&Id3Frame> {
        self.frames.iter().find(|f| f.frame_id == frame_id)
    }
}

fn skip_extended_header(header: &Id3v2Header, source: &mut SliceSource<'_>) -> Result<(), StreamError> {
    let mut raw = [0u8; 4];
    source.read_exact_into(&mut raw)?;
    // v2.3 excludes the size field itself, v2.4 includes it
    let remaining = if header.major() >= 4 {
        (decode_synchsafe(&raw) as usize).saturating_sub(4)
    } else {
        u32::from_be_bytes(raw) as usize
    };
    let skipped = source.skip(remaining as u64)?;
    if (skipped as usize) < remaining {
        return Err(StreamError::TruncatedHeader {
            what: "extended header",
            declared: remaining,
            available: skipped as usize,
        });
    }
    Ok(())
}

fn read_frame(header: &Id3v2Header, source: &mut SliceSource<'_>) -> Result<Option<Id3Frame>, StreamError> {
    let major = header.major();
    let id_len = if major == 2 { 3 } else { 4 };
    let id_bytes = source.read_exact_slice(id_len)?;
    if !id_bytes.iter().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()) {
        log::warn!("invalid ID3v2 frame id {:?}; stopping", String::from_utf8_lossy(&id_bytes));
        return Ok(None);
    }
    let raw_id = String::from_utf8_lossy(&id_bytes).into_owned();

    let (size, flags) = match major {
        2 => (read_be::<u32, _>(source, 3)?, 0),
        3 => (read_be_full::<u32, _>(source)?, read_be_full::<u16, _>(source)?),
        _ => {
            let mut raw = [0u8; 4];
            source.read_exact_into(&mut raw)?;
            (decode_synchsafe(&raw), read_be_full::<u16, _>(source)?)
        }
    };

    let available = source.rest().len();
    if size as usize > available {
        log::warn!(
            "ID3v2 frame {} declares {} bytes, only {} left; stopping",
            raw_id,
            size,
            available
        );
        return Ok(None);
    }
    let data = source.read_exact_slice(size as usize)?;

    let frame_id = if major == 2 {
        upgrade_v22_id(&raw_id).map_or(raw_id, str::to_string)
    } else {
        raw_id
    };
    let content = frame_content(major, &frame_id, flags, &data);

    Ok(Some(Id3Frame {
        frame_id,
        flags,
        content,
    }))
}

/// Undo per-frame format flags, then decode.
fn frame_content(major: u8, frame_id: &str, flags: u16, data: &[u8]) -> FrameContent {
    let (compressed, encrypted, grouped) = match major {
        3 => (
            flags & V23_COMPRESSION != 0,
            flags & V23_ENCRYPTION != 0,
            flags & V23_GROUPING != 0,
        ),
        4 => (
            flags & V24_COMPRESSION != 0,
            flags & V24_ENCRYPTION != 0,
            flags & V24_GROUPING != 0,
        ),
        _ => (false, false, false),
    };
    if compressed || encrypted {
        log::debug!("frame {} is compressed or encrypted; kept opaque", frame_id);
        return FrameContent::Opaque(data.to_vec());
    }

    let mut skip = usize::from(grouped);
    if major == 4 && flags & V24_DATA_LENGTH != 0 {
        skip += 4;
    }
    let payload = data.get(skip..).unwrap_or_default();

    if major == 4 && flags & V24_UNSYNCHRONISATION != 0 {
        decode_frame(frame_id, &reverse_unsynchronisation(payload), major)
    } else {
        decode_frame(frame_id, payload, major)
    }
}

/// Remove the 0x00 inserted after every 0xFF by unsynchronisation.
pub fn reverse_unsynchronisation(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut previous = 0u8;
    for &byte in data {
        if !(previous == 0xFF && byte == 0x00) {
            out.push(byte);
        }
        previous = byte;
    }
    out
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a tag of the given major version from (id, body) frames.
    pub(crate) fn build_tag(major: u8, flags: u8, frames: &[(&str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (id, data) in frames {
            body.extend_from_slice(id.as_bytes());
            let size = data.len() as u32;
            match major {
                2 => body.extend_from_slice(&size.to_be_bytes()[1..]),
                3 => body.extend_from_slice(&size.to_be_bytes()),
                _ => body.extend_from_slice(&synchsafe(size)),
            }
            if major > 2 {
                body.extend_from_slice(&[0, 0]);
            }
            body.extend_from_slice(data);
        }
        body.extend_from_slice(&[0u8; 16]); // padding

        let mut tag = b"ID3".to_vec();
        tag.extend_from_slice(&[major, 0, flags]);
        tag.extend_from_slice(&synchsafe(body.len() as u32));
        tag.extend(body);
        tag
    }

    pub(crate) fn synchsafe(value: u32) -> [u8; 4] {
        [
            ((value >> 21) & 0x7F) as u8,
            ((value >> 14) & 0x7F) as u8,
            ((value >> 7) & 0x7F) as u8,
            (value & 0x7F) as u8,
        ]
    }

    fn text(frame: Option<&Id3Frame>) -> Option<String> {
        match &frame?.content {
            FrameContent::Text(values) => values.first().cloned(),
            _ => None,
        }
    }

    #[test]
    fn test_header_parse() {
        let header = Id3v2Header::parse(b"ID3\x04\x00\x50\x00\x00\x02\x01").unwrap();
        assert_eq!(header.version, (4, 0));
        assert_eq!(header.size, 257);
        assert_eq!(header.tag_size(), 10 + 257 + 10);
        assert!(Id3v2Header::parse(b"ID3\x04\x00\x00\x00\x00\x80\x00").is_none());
        assert!(Id3v2Header::parse(b"TAG").is_none());
    }

    #[test]
    fn test_read_v23_frames() {
        let tag = build_tag(3, 0, &[("TIT2", b"\x00Title"), ("TPE1", b"\x03Artist\x00")]);
        let mut source = SliceSource::new(&tag);
        let tag = Id3v2Tag::read(&mut source).unwrap().unwrap();

        assert_eq!(tag.frames.len(), 2);
        assert_eq!(text(tag.get("TIT2")).as_deref(), Some("Title"));
        assert_eq!(text(tag.get("TPE1")).as_deref(), Some("Artist"));
        assert!(source.rest().is_empty());
    }

    #[test]
    fn test_read_v24_synchsafe_sizes() {
        let long = format!("\x03{}", "a".repeat(200));
        let tag = build_tag(4, 0, &[("TALB", long.as_bytes())]);
        let mut source = SliceSource::new(&tag);
        let tag = Id3v2Tag::read(&mut source).unwrap().unwrap();
        assert_eq!(text(tag.get("TALB")).map(|s| s.len()), Some(200));
    }

    #[test]
    fn test_read_v22_ids_are_upgraded() {
        let tag = build_tag(2, 0, &[("TT2", b"\x00Old"), ("TP1", b"\x00School")]);
        let mut source = SliceSource::new(&tag);
        let tag = Id3v2Tag::read(&mut source).unwrap().unwrap();
        assert_eq!(text(tag.get("TIT2")).as_deref(), Some("Old"));
        assert_eq!(text(tag.get("TPE1")).as_deref(), Some("School"));
    }

    #[test]
    fn test_whole_tag_unsynchronisation() {
        let mut tag = build_tag(3, FLAG_UNSYNCHRONISATION, &[("TIT2", b"\x00a\xFFb")]);
        // Insert the unsynchronisation byte after 0xFF and grow the declared size
        let pos = tag.iter().position(|&b| b == 0xFF).unwrap();
        tag.insert(pos + 1, 0x00);
        let size = decode_synchsafe(&tag[6..10]) + 1;
        tag[6..10].copy_from_slice(&synchsafe(size));

        let mut source = SliceSource::new(&tag);
        let parsed = Id3v2Tag::read(&mut source).unwrap().unwrap();
        assert_eq!(text(parsed.get("TIT2")).as_deref(), Some("aÿb"));
    }

    #[test]
    fn test_reverse_unsynchronisation() {
        assert_eq!(reverse_unsynchronisation(&[0xFF, 0x00, 0xE0, 0xFF, 0x00, 0x00]), vec![0xFF, 0xE0, 0xFF, 0x00]);
    }

    #[test]
    fn test_extended_header_skipped() {
        let mut tag = build_tag(3, FLAG_EXTENDED_HEADER, &[("TIT2", b"\x00X")]);
        let ext = [0, 0, 0, 6, 0, 0, 0, 0, 0, 0];
        for (i, b) in ext.iter().enumerate() {
            tag.insert(10 + i, *b);
        }
        let size = decode_synchsafe(&tag[6..10]) + ext.len() as u32;
        tag[6..10].copy_from_slice(&synchsafe(size));

        let mut source = SliceSource::new(&tag);
        let parsed = Id3v2Tag::read(&mut source).unwrap().unwrap();
        assert_eq!(text(parsed.get("TIT2")).as_deref(), Some("X"));
    }

    #[test]
    fn test_not_a_tag() {
        let mut source = SliceSource::new(b"\xFF\xFB\x90\x00 mpeg frame");
        assert!(Id3v2Tag::read(&mut source).unwrap().is_none());
    }

    #[test]
    fn test_truncated_tag_body() {
        let mut tag = build_tag(3, 0, &[("TIT2", b"\x00Title")]);
        tag.truncate(20);
        let mut source = SliceSource::new(&tag);
        assert!(matches!(
            Id3v2Tag::read(&mut source),
            Err(crate::Error::Decode {
                stage: "tag body",
                ..
            })
        ));
    }

    #[test]
    fn test_oversized_frame_stops_parsing() {
        let mut tag = build_tag(3, 0, &[("TIT2", b"\x00A"), ("TPE1", b"\x00B")]);
        // Corrupt the second frame's size
        let second = 10 + 10 + 2;
        tag[second + 4..second + 8].copy_from_slice(&0x0100_0000u32.to_be_bytes());
        let mut source = SliceSource::new(&tag);
        let parsed = Id3v2Tag::read(&mut source).unwrap().unwrap();
        assert_eq!(parsed.frames.len(), 1);
    }
}
