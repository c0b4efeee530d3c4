// Picture metadata, as stored in FLAC PICTURE blocks, METADATA_BLOCK_PICTURE
// comments and ID3v2 APIC frames

use serde::Serialize;

use crate::error::StreamError;
use crate::stream::{BulkSource, SliceSource};
use crate::utils::io::read_be_full;

/// Picture types shared by FLAC and ID3v2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PictureType {
    #[default]
    Other,
    FileIcon,
    OtherFileIcon,
    CoverFront,
    CoverBack,
    LeafletPage,
    Media,
    LeadArtist,
    Artist,
    Conductor,
    Band,
    Composer,
    Lyricist,
    RecordingLocation,
    DuringRecording,
    DuringPerformance,
    VideoScreenCapture,
    BrightColouredFish,
    Illustration,
    BandLogo,
    PublisherLogo,
}

const PICTURE_TYPES: [(PictureType, &str); 21] = [
    (PictureType::Other, "Other"),
    (PictureType::FileIcon, "File Icon"),
    (PictureType::OtherFileIcon, "Other File Icon"),
    (PictureType::CoverFront, "Cover (front)"),
    (PictureType::CoverBack, "Cover (back)"),
    (PictureType::LeafletPage, "Leaflet page"),
    (PictureType::Media, "Media"),
    (PictureType::LeadArtist, "Lead artist"),
    (PictureType::Artist, "Artist"),
    (PictureType::Conductor, "Conductor"),
    (PictureType::Band, "Band"),
    (PictureType::Composer, "Composer"),
    (PictureType::Lyricist, "Lyricist"),
    (PictureType::RecordingLocation, "Recording Location"),
    (PictureType::DuringRecording, "During recording"),
    (PictureType::DuringPerformance, "During performance"),
    (PictureType::VideoScreenCapture, "Video screen capture"),
    (PictureType::BrightColouredFish, "Bright coloured fish"),
    (PictureType::Illustration, "Illustration"),
    (PictureType::BandLogo, "Band logo"),
    (PictureType::PublisherLogo, "Publisher logo"),
];

impl PictureType {
    /// Out-of-range codes map to `Other`.
    pub fn from_u32(value: u32) -> Self {
        usize::try_from(value)
            .ok()
            .and_then(|index| PICTURE_TYPES.get(index))
            .map_or(PictureType::Other, |(kind, _)| *kind)
    }

    pub fn label(self) -> &'static str {
        PICTURE_TYPES[self as usize].1
    }
}

/// FLAC PICTURE block structure
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlacPicture {
    pub picture_type: PictureType,
    pub mime_type: String,
    pub description: String,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub colors: u32,
    pub data: Vec<u8>,
}

impl FlacPicture {
    /// Parse a PICTURE block body (all integers 32-bit big-endian).
    pub fn parse(data: &[u8]) -> Result<Self, StreamError> {
        let mut source = SliceSource::new(data);

        let picture_type = PictureType::from_u32(read_be_full(&mut source)?);
        let mime_type = read_sized_text(&mut source)?;
        let description = read_sized_text(&mut source)?;
        let width = read_be_full(&mut source)?;
        let height = read_be_full(&mut source)?;
        let depth = read_be_full(&mut source)?;
        let colors = read_be_full(&mut source)?;
        let length: u32 = read_be_full(&mut source)?;
        let data = source.read_exact_slice(length as usize)?.into_owned();

        Ok(FlacPicture {
            picture_type,
            mime_type,
            description,
            width,
            height,
            depth,
            colors,
            data,
        })
    }

    /// File extension for the MIME type, `jpg` when unknown.
    pub fn extension(&self) -> &'static str {
        mime_extension(&self.mime_type)
    }
}

/// File extension for an image MIME type, `jpg` when unknown.
pub fn mime_extension(mime_type: &str) -> &'static str {
    match mime_type.to_ascii_lowercase().as_str() {
        "image/png" | "png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/bmp" => "bmp",
        "image/tiff" => "tiff",
        _ => "jpg",
    }
}

fn read_sized_text(source: &mut SliceSource<'_>) -> Result<String, StreamError> {
    let length: u32 = read_be_full(source)?;
    let bytes = source.read_exact_slice(length as usize)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
impl FlacPicture {
    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(self.picture_type as u32).to_be_bytes());
        for text in [&self.mime_type, &self.description] {
            out.extend_from_slice(&(text.len() as u32).to_be_bytes());
            out.extend_from_slice(text.as_bytes());
        }
        for value in [self.width, self.height, self.depth, self.colors] {
            out.extend_from_slice(&value.to_be_bytes());
        }
        out.extend_from_slice(&(self.data.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.data);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_picture_type_codes() {
        assert_eq!(PictureType::from_u32(3), PictureType::CoverFront);
        assert_eq!(PictureType::from_u32(20), PictureType::PublisherLogo);
        assert_eq!(PictureType::from_u32(99), PictureType::Other);
        assert_eq!(PictureType::CoverBack.label(), "Cover (back)");
    }

    #[test]
    fn test_parse_block() {
        let picture = FlacPicture {
            picture_type: PictureType::CoverFront,
            mime_type: "image/jpeg".to_string(),
            description: String::new(),
            width: 500,
            height: 400,
            depth: 24,
            colors: 0,
            data: vec![0xFF, 0xD8, 0xFF],
        };
        let parsed = FlacPicture::parse(&picture.to_bytes()).unwrap();
        assert_eq!(parsed, picture);
        assert_eq!(parsed.extension(), "jpg");
    }

    #[test]
    fn test_declared_data_length_past_block() {
        let mut bytes = FlacPicture::default().to_bytes();
        let len = bytes.len();
        bytes[len - 4..].copy_from_slice(&10u32.to_be_bytes());
        assert!(FlacPicture::parse(&bytes).is_err());
    }
}
