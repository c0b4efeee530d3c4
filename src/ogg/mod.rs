// OGG container support
//
// OGG Page (27-byte fixed header):
// - Capture Pattern: "OggS" (4 bytes)
// - Version: 0 (1 byte)
// - Header Type: 1=continuation, 2=bos, 4=eos (1 byte)
// - Granule Position (8 bytes, LE)
// - Bitstream Serial Number (4 bytes, LE)
// - Page Sequence Number (4 bytes, LE)
// - CRC Checksum (4 bytes, LE, not verified)
// - Number of Page Segments (1 byte)
// - Segment Table (variable), then the payload
//
// Vorbis and Opus both put an identification packet first and the comment
// packet second; the comment packet may span several pages.

pub mod packet;
pub mod page;
pub mod vorbis;

pub use packet::{Packet, PacketAssembler};
pub use page::{Page, PageReader};

use crate::error::{Result, StageContext};
use crate::flac::vorbis::VorbisComment;
use crate::opus;
use crate::stream::{sync_to, BulkSource};
use crate::{DecodeOptions, StreamInfo};

pub const OGG_SIGNATURE: &[u8; 4] = b"OggS";
pub(crate) const CAPTURE_PATTERN_LEN: usize = 4;
pub(crate) const FIXED_HEADER_LEN: usize = 27;
pub(crate) const MAX_LACING_VALUE: u8 = 255;

pub const OGG_HEADER_TYPE_CONTINUATION: u8 = 0x01;
pub const OGG_HEADER_TYPE_BOS: u8 = 0x02; // Beginning of Stream
pub const OGG_HEADER_TYPE_EOS: u8 = 0x04; // End of Stream

const FORMAT: &str = "OGG";

/// Codec carried by the first logical stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OggCodec {
    Vorbis,
    Opus,
    Unknown,
}

impl OggCodec {
    fn identify(packet: &[u8]) -> Self {
        if packet.starts_with(vorbis::VORBIS_IDENTIFICATION) {
            OggCodec::Vorbis
        } else if packet.starts_with(opus::OPUS_SIGNATURE) {
            OggCodec::Opus
        } else {
            OggCodec::Unknown
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OggCodec::Vorbis => "OGG Vorbis",
            OggCodec::Opus => "OPUS",
            OggCodec::Unknown => "OGG",
        }
    }
}

/// Header information decoded from an OGG file.
#[derive(Debug)]
pub struct OggStream {
    pub codec: OggCodec,
    pub info: Option<StreamInfo>,
    pub comment: Option<VorbisComment>,
}

/// Locate the first page and decode the identification and comment headers.
///
/// Returns `Ok(None)` when the source contains no OGG page at all.
pub fn read_ogg<S: BulkSource + ?Sized>(source: &mut S, options: &DecodeOptions) -> Result<Option<OggStream>> {
    match sync_to(source, OGG_SIGNATURE) {
        Err(e) if e.is_not_found() => return Ok(None),
        other => other.stage(FORMAT, "capture pattern")?,
    };

    let mut packets = PacketAssembler::first_stream(PageReader::after_capture(source));
    let ident = match packets.next_packet().stage(FORMAT, "identification packet")? {
        Some(packet) => packet,
        None => return Ok(None),
    };

    let codec = OggCodec::identify(&ident.data);
    log::debug!("OGG stream {:#010x} carries {}", ident.serial, codec.name());
    let info = match codec {
        OggCodec::Vorbis => Some(vorbis::parse_identification(&ident.data).stage(FORMAT, "vorbis identification")?),
        OggCodec::Opus => Some(opus::parse_head(&ident.data).stage(FORMAT, "opus head")?),
        OggCodec::Unknown => None,
    };

    let marker: &[u8] = match codec {
        OggCodec::Vorbis => vorbis::VORBIS_COMMENT_HEADER,
        OggCodec::Opus => opus::OPUS_TAGS,
        OggCodec::Unknown => {
            return Ok(Some(OggStream {
                codec,
                info,
                comment: None,
            }))
        }
    };

    let mut comment = None;
    for _ in 0..options.max_header_packets {
        let packet = match packets.next_packet().stage(FORMAT, "comment packet")? {
            Some(packet) => packet,
            None => break,
        };
        if !packet.data.starts_with(marker) {
            continue;
        }
        let parsed = VorbisComment::parse(&packet.data[marker.len()..]).stage(FORMAT, "vorbis comment")?;
        comment = Some(parsed);
        break;
    }

    Ok(Some(OggStream { codec, info, comment }))
}


#[cfg(test)]
mod tests {
    use super::testing::paginate;
    use super::*;
    use crate::stream::SliceSource;

    fn vorbis_ident() -> Vec<u8> {
        let mut packet = vorbis::VORBIS_IDENTIFICATION.to_vec();
        packet.extend_from_slice(&0u32.to_le_bytes()); // version
        packet.push(2); // channels
        packet.extend_from_slice(&44_100u32.to_le_bytes());
        packet.extend_from_slice(&[0u8; 12]); // bitrates
        packet.push(0xB8); // block sizes
        packet.push(1); // framing
        packet
    }

    fn comment_body(fields: &[&str]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&6u32.to_le_bytes());
        body.extend_from_slice(b"vendor");
        body.extend_from_slice(&(fields.len() as u32).to_le_bytes());
        for field in fields {
            body.extend_from_slice(&(field.len() as u32).to_le_bytes());
            body.extend_from_slice(field.as_bytes());
        }
        body
    }

    #[test]
    fn test_vorbis_comment_spanning_pages() {
        let mut comment = vorbis::VORBIS_COMMENT_HEADER.to_vec();
        let long_title = format!("TITLE={}", "x".repeat(700));
        comment.extend(comment_body(&[&long_title, "ARTIST=Someone"]));
        comment.push(1);
        let setup = b"\x05vorbis-setup".to_vec();

        let mut bytes = b"leading junk".to_vec();
        bytes.extend(paginate(&[vorbis_ident(), comment, setup], 2));
        let mut source = SliceSource::new(&bytes);

        let stream = read_ogg(&mut source, &DecodeOptions::default()).unwrap().unwrap();
        assert_eq!(stream.codec, OggCodec::Vorbis);
        let info = stream.info.unwrap();
        assert_eq!(info.channels, Some(2));
        assert_eq!(info.sample_rate, Some(44_100));
        let comment = stream.comment.unwrap();
        assert_eq!(comment.get("title").map(String::len), Some(700));
        assert_eq!(comment.get("ARTIST").map(String::as_str), Some("Someone"));
    }

    fn stream_page(serial: u32, header_type: u8, sequence: u32, laces: Vec<u8>, payload: &[u8]) -> Vec<u8> {
        super::testing::encode(&Page {
            header_type,
            serial,
            sequence,
            segment_table: laces,
            payload: payload.to_vec(),
            ..Page::default()
        })
    }

    #[test]
    fn test_comment_survives_interleaved_stream() {
        let ident = vorbis_ident();
        let mut comment = vorbis::VORBIS_COMMENT_HEADER.to_vec();
        comment.extend(comment_body(&[&format!("TITLE={}", "t".repeat(300))]));
        comment.push(1);
        let other_head = b"\x80theora-ish header".to_vec();

        let mut bytes = stream_page(0xA, OGG_HEADER_TYPE_BOS, 0, vec![ident.len() as u8], &ident);
        bytes.extend(stream_page(0xB, OGG_HEADER_TYPE_BOS, 0, vec![other_head.len() as u8], &other_head));
        bytes.extend(stream_page(0xA, 0, 1, vec![255], &comment[..255]));
        bytes.extend(stream_page(0xB, 0, 1, vec![3], b"xyz"));
        bytes.extend(stream_page(
            0xA,
            OGG_HEADER_TYPE_CONTINUATION,
            2,
            vec![(comment.len() - 255) as u8],
            &comment[255..],
        ));
        let mut source = SliceSource::new(&bytes);

        let stream = read_ogg(&mut source, &DecodeOptions::default()).unwrap().unwrap();
        assert_eq!(stream.codec, OggCodec::Vorbis);
        let comment = stream.comment.unwrap();
        assert_eq!(comment.get("TITLE").map(String::len), Some(300));
    }

    #[test]
    fn test_no_capture_pattern_is_empty_result() {
        let mut source = SliceSource::new(b"ID3 but not ogg");
        assert!(read_ogg(&mut source, &DecodeOptions::default()).unwrap().is_none());
    }

    #[test]
    fn test_truncated_comment_packet_reports_stage() {
        let mut comment = vorbis::VORBIS_COMMENT_HEADER.to_vec();
        comment.extend(vec![b'a'; 600]);
        let mut bytes = paginate(&[vorbis_ident(), comment], 2);
        bytes.truncate(bytes.len() - 100);
        let mut source = SliceSource::new(&bytes);

        let err = read_ogg(&mut source, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Decode {
                stage: "comment packet",
                ..
            }
        ));
    }
}
