// OPUS format support (in OGG container)
//
// - Identification header: "OpusHead" (8 bytes) in the first packet
// - Comment header: "OpusTags" (8 bytes) followed by a Vorbis Comment
//
// Reference:
// - https://wiki.xiph.org/OggOpus
// - RFC 7845: Ogg Encapsulation for the Opus Audio Codec

use crate::error::StreamError;
use crate::stream::{BulkSource, SliceSource};
use crate::utils::io::{read_le, read_le_full};
use crate::StreamInfo;

pub const OPUS_SIGNATURE: &[u8] = b"OpusHead";
pub const OPUS_TAGS: &[u8] = b"OpusTags";

/// Opus always decodes at 48 kHz; the header only records the input rate.
const OPUS_DECODE_RATE: u32 = 48_000;

/// Decode the "OpusHead" identification packet.
pub fn parse_head(packet: &[u8]) -> Result<StreamInfo, StreamError> {
    let mut source = SliceSource::new(packet);
    source.skip(OPUS_SIGNATURE.len() as u64)?;

    let version: u8 = read_le(&mut source, 1)?;
    // Only the major version (upper nibble) is incompatible.
    if version >> 4 != 0 {
        log::warn!("unexpected OPUS header version {}", version);
    }
    let channels: u8 = read_le(&mut source, 1)?;
    let pre_skip: u16 = read_le_full(&mut source)?;
    let input_rate: u32 = read_le_full(&mut source)?;
    log::trace!("OPUS pre-skip {} samples, input rate {} Hz", pre_skip, input_rate);

    Ok(StreamInfo {
        sample_rate: Some(if input_rate == 0 { OPUS_DECODE_RATE } else { input_rate }),
        channels: Some(channels),
        ..StreamInfo::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ogg::testing::paginate;
    use crate::ogg::{read_ogg, OggCodec};
    use crate::DecodeOptions;

    fn opus_head(input_rate: u32) -> Vec<u8> {
        let mut packet = OPUS_SIGNATURE.to_vec();
        packet.push(1);
        packet.push(2);
        packet.extend_from_slice(&312u16.to_le_bytes());
        packet.extend_from_slice(&input_rate.to_le_bytes());
        packet.extend_from_slice(&0i16.to_le_bytes());
        packet.push(0);
        packet
    }

    #[test]
    fn test_head_defaults_to_decode_rate() {
        let info = parse_head(&opus_head(0)).unwrap();
        assert_eq!(info.sample_rate, Some(48_000));
        assert_eq!(info.channels, Some(2));
        assert_eq!(parse_head(&opus_head(44_100)).unwrap().sample_rate, Some(44_100));
    }

    #[test]
    fn test_opus_tags_through_ogg() {
        let mut tags = OPUS_TAGS.to_vec();
        tags.extend_from_slice(&3u32.to_le_bytes());
        tags.extend_from_slice(b"enc");
        tags.extend_from_slice(&1u32.to_le_bytes());
        tags.extend_from_slice(&10u32.to_le_bytes());
        tags.extend_from_slice(b"ALBUM=Disc");

        let bytes = paginate(&[opus_head(48_000), tags], 1);
        let mut source = SliceSource::new(&bytes);
        let stream = read_ogg(&mut source, &DecodeOptions::default()).unwrap().unwrap();

        assert_eq!(stream.codec, OggCodec::Opus);
        let comment = stream.comment.unwrap();
        assert_eq!(comment.vendor_string, "enc");
        assert_eq!(comment.get("album").map(String::as_str), Some("Disc"));
    }
}
