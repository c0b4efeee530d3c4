// Vorbis Comment, shared by FLAC, OGG Vorbis and OPUS
//
// Layout (all lengths 32-bit little-endian):
// - vendor length, vendor string (UTF-8)
// - comment count
// - per comment: length, "FIELD=value" (UTF-8)

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::StreamError;
use crate::flac::picture::FlacPicture;
use crate::stream::{BulkSource, SliceSource};
use crate::utils::io::read_le_full;

/// Field carrying a base64-encoded FLAC PICTURE block.
pub const METADATA_BLOCK_PICTURE: &str = "METADATA_BLOCK_PICTURE";

/// Vorbis comment structure
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VorbisComment {
    pub vendor_string: String,
    pub comments: Vec<(String, String)>,
}

impl VorbisComment {
    /// Parse a comment block; trailing bytes (e.g. the Vorbis framing bit) are ignored.
    pub fn parse(data: &[u8]) -> Result<Self, StreamError> {
        let mut source = SliceSource::new(data);
        let vendor_string = read_string(&mut source)?;

        let count: u32 = read_le_full(&mut source)?;
        // Every entry takes at least its 4-byte length.
        let capacity = (count as usize).min(source.rest().len() / 4);
        let mut comments = Vec::with_capacity(capacity);
        for _ in 0..count {
            let entry = read_string(&mut source)?;
            match entry.split_once('=') {
                Some((field, value)) => comments.push((field.to_string(), value.to_string())),
                None => log::debug!("ignoring comment without '=': {:?}", entry),
            }
        }

        Ok(VorbisComment {
            vendor_string,
            comments,
        })
    }

    /// First value of a field, matched case-insensitively.
    pub fn get(&self, field: &str) -> Option<&String> {
        self.comments
            .iter()
            .find(|(f, _)| f.eq_ignore_ascii_case(field))
            .map(|(_, v)| v)
    }

    /// Every value of a field, in file order.
    pub fn get_all<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.comments
            .iter()
            .filter(move |(f, _)| f.eq_ignore_ascii_case(field))
            .map(|(_, v)| v.as_str())
    }

    /// Pictures embedded as `METADATA_BLOCK_PICTURE`; undecodable ones are skipped.
    pub fn pictures(&self) -> Vec<FlacPicture> {
        self.get_all(METADATA_BLOCK_PICTURE)
            .filter_map(|encoded| {
                let raw = match STANDARD.decode(encoded.trim()) {
                    Ok(raw) => raw,
                    Err(e) => {
                        log::warn!("invalid base64 in {}: {}", METADATA_BLOCK_PICTURE, e);
                        return None;
                    }
                };
                match FlacPicture::parse(&raw) {
                    Ok(picture) => Some(picture),
                    Err(e) => {
                        log::warn!("invalid picture in {}: {}", METADATA_BLOCK_PICTURE, e);
                        None
                    }
                }
            })
            .collect()
    }
}

fn read_string(source: &mut SliceSource<'_>) -> Result<String, StreamError> {
    let length: u32 = read_le_full(source)?;
    let bytes = source.read_exact_slice(length as usize)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
