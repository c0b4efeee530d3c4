// FLAC metadata blocks
//
// Block header (4 bytes):
// - last-block flag (1 bit)
// - block type (7 bits)
// - body length (24 bits, big-endian)

use crate::error::StreamError;
use crate::stream::{BitReader, BulkSource, SliceSource};
use crate::utils::io::read_be;
use crate::StreamInfo;

/// FLAC metadata block types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlacMetadataBlockType {
    StreamInfo,
    Padding,
    Application,
    SeekTable,
    VorbisComment,
    CueSheet,
    Picture,
    Reserved(u8),
    Invalid,
}

impl FlacMetadataBlockType {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0 => FlacMetadataBlockType::StreamInfo,
            1 => FlacMetadataBlockType::Padding,
            2 => FlacMetadataBlockType::Application,
            3 => FlacMetadataBlockType::SeekTable,
            4 => FlacMetadataBlockType::VorbisComment,
            5 => FlacMetadataBlockType::CueSheet,
            6 => FlacMetadataBlockType::Picture,
            127 => FlacMetadataBlockType::Invalid,
            other => FlacMetadataBlockType::Reserved(other),
        }
    }
}

/// FLAC metadata block header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlacMetadataBlockHeader {
    pub is_last: bool,
    pub block_type: FlacMetadataBlockType,
    pub length: u32,
}

impl FlacMetadataBlockHeader {
    pub const SIZE: usize = 4;

    pub fn read<S: BulkSource + ?Sized>(source: &mut S) -> Result<Self, StreamError> {
        let first = source.pop()?;
        let length = read_be(source, 3)?;

        Ok(FlacMetadataBlockHeader {
            is_last: first & 0x80 != 0,
            block_type: FlacMetadataBlockType::from_byte(first & 0x7F),
            length,
        })
    }

    /// Reads the block body.
    pub fn read_body<S: BulkSource + ?Sized>(&self, source: &mut S) -> Result<Vec<u8>, StreamError> {
        let length = self.length as usize;
        let body = source.read_slice(length)?;
        if body.len() < length {
            return Err(StreamError::TruncatedHeader {
                what: "metadata block",
                declared: length,
                available: body.len(),
            });
        }
        Ok(body.into_owned())
    }

    /// Steps over the block body.
    pub fn skip_body<S: BulkSource + ?Sized>(&self, source: &mut S) -> Result<(), StreamError> {
        let skipped = source.skip(u64::from(self.length))?;
        if skipped < u64::from(self.length) {
            return Err(StreamError::TruncatedHeader {
                what: "metadata block",
                declared: self.length as usize,
                available: skipped as usize,
            });
        }
        Ok(())
    }
}

/// STREAMINFO block contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlacStreamInfo {
    pub min_block_size: u16,
    pub max_block_size: u16,
    pub min_frame_size: u32,
    pub max_frame_size: u32,
    pub sample_rate: u32,
    pub channels: u8,
    pub bits_per_sample: u8,
    /// 0 when unknown
    pub total_samples: u64,
    pub md5: [u8; 16],
}

impl FlacStreamInfo {
    pub const SIZE: usize = 34;

    pub fn parse(data: &[u8]) -> Result<Self, StreamError> {
        let mut source = SliceSource::new(data);
        let mut bits = BitReader::new(&mut source);

        let min_block_size = bits.read(16)?;
        let max_block_size = bits.read(16)?;
        let min_frame_size = bits.read(24)?;
        let max_frame_size = bits.read(24)?;
        let sample_rate = bits.read(20)?;
        let channels = bits.read::<u8>(3)? + 1;
        let bits_per_sample = bits.read::<u8>(5)? + 1;
        let total_samples = bits.read(36)?;
        bits.finish()?;

        let mut md5 = [0u8; 16];
        source.read_exact_into(&mut md5)?;

        Ok(FlacStreamInfo {
            min_block_size,
            max_block_size,
            min_frame_size,
            max_frame_size,
            sample_rate,
            channels,
            bits_per_sample,
            total_samples,
            md5,
        })
    }

    pub fn duration(&self) -> Option<f64> {
        if self.sample_rate == 0 || self.total_samples == 0 {
            return None;
        }
        Some(self.total_samples as f64 / f64::from(self.sample_rate))
    }

    pub fn to_stream_info(&self) -> StreamInfo {
        StreamInfo {
            sample_rate: Some(self.sample_rate).filter(|&rate| rate > 0),
            channels: Some(self.channels),
            bits_per_sample: Some(self.bits_per_sample),
            total_samples: Some(self.total_samples).filter(|&n| n > 0),
            duration: self.duration(),
            ..StreamInfo::default()
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// STREAMINFO body for 44.1 kHz stereo 16-bit audio.
    pub(crate) fn streaminfo_body(total_samples: u64) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&4096u16.to_be_bytes());
        body.extend_from_slice(&4096u16.to_be_bytes());
        body.extend_from_slice(&[0x00, 0x00, 0x0E]); // min frame size 14
        body.extend_from_slice(&[0x00, 0x10, 0x00]); // max frame size 4096
        // 20-bit rate 44100 (0x0AC44), 3-bit channels-1 = 1, 5-bit bps-1 = 15,
        // 36-bit total samples
        let packed: u64 = (0x0AC44 << 44) | (1 << 41) | (15 << 36) | (total_samples & 0xF_FFFF_FFFF);
        body.extend_from_slice(&packed.to_be_bytes());
        body.extend_from_slice(&[0xAB; 16]);
        body
    }

    #[test]
    fn test_block_header() {
        let mut source = SliceSource::new(&[0x84, 0x00, 0x01, 0x02, 0xFF]);
        let header = FlacMetadataBlockHeader::read(&mut source).unwrap();
        assert!(header.is_last);
        assert_eq!(header.block_type, FlacMetadataBlockType::VorbisComment);
        assert_eq!(header.length, 0x0102);
        assert_eq!(source.rest(), &[0xFF]);
    }

    #[test]
    fn test_block_type_codes() {
        assert_eq!(FlacMetadataBlockType::from_byte(6), FlacMetadataBlockType::Picture);
        assert_eq!(FlacMetadataBlockType::from_byte(9), FlacMetadataBlockType::Reserved(9));
        assert_eq!(FlacMetadataBlockType::from_byte(127), FlacMetadataBlockType::Invalid);
    }

    #[test]
    fn test_truncated_block_body() {
        let header = FlacMetadataBlockHeader {
            is_last: false,
            block_type: FlacMetadataBlockType::Padding,
            length: 10,
        };
        let mut source = SliceSource::new(&[0u8; 4]);
        assert!(matches!(
            header.skip_body(&mut source),
            Err(StreamError::TruncatedHeader {
                declared: 10,
                available: 4,
                ..
            })
        ));
    }

    #[test]
    fn test_streaminfo_fields() {
        let body = streaminfo_body(441_000);
        assert_eq!(body.len(), FlacStreamInfo::SIZE);

        let info = FlacStreamInfo::parse(&body).unwrap();
        assert_eq!(info.min_block_size, 4096);
        assert_eq!(info.min_frame_size, 14);
        assert_eq!(info.max_frame_size, 4096);
        assert_eq!(info.sample_rate, 44_100);
        assert_eq!(info.channels, 2);
        assert_eq!(info.bits_per_sample, 16);
        assert_eq!(info.total_samples, 441_000);
        assert_eq!(info.md5, [0xAB; 16]);
        assert_eq!(info.duration(), Some(10.0));
    }

    #[test]
    fn test_streaminfo_unknown_length() {
        let info = FlacStreamInfo::parse(&streaminfo_body(0)).unwrap();
        let stream = info.to_stream_info();
        assert_eq!(stream.total_samples, None);
        assert_eq!(stream.duration, None);
        assert_eq!(stream.sample_rate, Some(44_100));
    }

    #[test]
    fn test_short_streaminfo() {
        let body = streaminfo_body(1);
        assert!(matches!(
            FlacStreamInfo::parse(&body[..20]),
            Err(StreamError::SourceExhausted { needed: 16, available: 2 })
        ));
    }
}
