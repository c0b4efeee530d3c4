// OGG Vorbis header packets
//
// 1. Identification header: 0x01 "vorbis", version, channels, sample rate,
//    bitrates, block sizes, framing bit
// 2. Comment header: 0x03 "vorbis", Vorbis Comment, framing bit
// 3. Setup header: 0x05 "vorbis"

use crate::error::StreamError;
use crate::stream::{BulkSource, SliceSource};
use crate::utils::io::{read_le, read_le_full};
use crate::StreamInfo;

pub const VORBIS_IDENTIFICATION: &[u8] = b"\x01vorbis";
pub const VORBIS_COMMENT_HEADER: &[u8] = b"\x03vorbis";

/// Decode the identification header packet.
pub fn parse_identification(packet: &[u8]) -> Result<StreamInfo, StreamError> {
    let mut source = SliceSource::new(packet);
    source.skip(VORBIS_IDENTIFICATION.len() as u64)?;

    let version: u32 = read_le_full(&mut source)?;
    if version != 0 {
        log::warn!("unexpected Vorbis version {}", version);
    }
    let channels: u8 = read_le(&mut source, 1)?;
    let sample_rate: u32 = read_le_full(&mut source)?;
    let _maximum: i32 = read_le_full(&mut source)?;
    let nominal: i32 = read_le_full(&mut source)?;

    Ok(StreamInfo {
        sample_rate: Some(sample_rate),
        channels: Some(channels),
        bitrate: u32::try_from(nominal).ok().filter(|&b| b > 0),
        ..StreamInfo::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identification_header() {
        let mut packet = VORBIS_IDENTIFICATION.to_vec();
        packet.extend_from_slice(&0u32.to_le_bytes());
        packet.push(1);
        packet.extend_from_slice(&48_000u32.to_le_bytes());
        packet.extend_from_slice(&0i32.to_le_bytes());
        packet.extend_from_slice(&128_000i32.to_le_bytes());
        packet.extend_from_slice(&0i32.to_le_bytes());
        packet.extend_from_slice(&[0xB8, 0x01]);

        let info = parse_identification(&packet).unwrap();
        assert_eq!(info.channels, Some(1));
        assert_eq!(info.sample_rate, Some(48_000));
        assert_eq!(info.bitrate, Some(128_000));
    }

    #[test]
    fn test_short_identification_header() {
        let packet = b"\x01vorbis\0\0".to_vec();
        assert!(matches!(
            parse_identification(&packet),
            Err(StreamError::SourceExhausted { .. })
        ));
    }
}
