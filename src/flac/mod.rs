// FLAC metadata handling module
//
// A FLAC file is "fLaC" followed by metadata blocks, the last one flagged in
// its header. Some encoders prepend an ID3v2 tag, which is skipped.

pub mod metadata;
pub mod picture;
pub mod vorbis;

pub use metadata::{FlacMetadataBlockHeader, FlacMetadataBlockType, FlacStreamInfo};
pub use picture::{FlacPicture, PictureType};
pub use vorbis::VorbisComment;

use std::io::SeekFrom;

use crate::error::{Result, StageContext};
use crate::id3::v2::Id3v2Header;
use crate::stream::{sync_to, SeekableSource};
use crate::DecodeOptions;

/// FLAC file signature
pub const FLAC_SIGNATURE: &[u8; 4] = b"fLaC";

const FORMAT: &str = "FLAC";

/// Metadata decoded from a FLAC file.
#[derive(Debug, Default)]
pub struct FlacFile {
    pub stream_info: Option<FlacStreamInfo>,
    pub comment: Option<VorbisComment>,
    pub pictures: Vec<FlacPicture>,
    /// Number of metadata blocks read, including skipped ones
    pub blocks: usize,
}

/// Skip a leading ID3v2 tag, if any, leaving the source just after it.
pub(crate) fn skip_id3v2<S: SeekableSource + ?Sized>(source: &mut S) -> Result<u64> {
    let start = source.tell().stage(FORMAT, "ID3v2 prefix")?;
    let header = {
        let bytes = source.read_slice(Id3v2Header::SIZE).stage(FORMAT, "ID3v2 prefix")?;
        Id3v2Header::parse(&bytes)
    };
    let skipped = header.map_or(0, |h| h.tag_size());
    source
        .seek(SeekFrom::Start(start + skipped))
        .stage(FORMAT, "ID3v2 prefix")?;
    if skipped > 0 {
        log::debug!("skipped {} byte ID3v2 tag before FLAC stream", skipped);
    }
    Ok(skipped)
}

/// Read the metadata blocks of a FLAC file.
///
/// Returns `Ok(None)` when no "fLaC" signature is present.
pub fn read_flac<S: SeekableSource + ?Sized>(source: &mut S, options: &DecodeOptions) -> Result<Option<FlacFile>> {
    skip_id3v2(source)?;
    match sync_to(source, FLAC_SIGNATURE) {
        Err(e) if e.is_not_found() => return Ok(None),
        other => other.stage(FORMAT, "signature")?,
    };

    let mut flac = FlacFile::default();
    loop {
        let header = FlacMetadataBlockHeader::read(source).stage(FORMAT, "block header")?;
        flac.blocks += 1;
        log::trace!(
            "FLAC block {:?}, {} bytes, last: {}",
            header.block_type,
            header.length,
            header.is_last
        );

        match header.block_type {
            FlacMetadataBlockType::StreamInfo => {
                let body = header.read_body(source).stage(FORMAT, "STREAMINFO")?;
                flac.stream_info = Some(FlacStreamInfo::parse(&body).stage(FORMAT, "STREAMINFO")?);
            }
            FlacMetadataBlockType::VorbisComment => {
                let body = header.read_body(source).stage(FORMAT, "VORBIS_COMMENT")?;
                flac.comment = Some(VorbisComment::parse(&body).stage(FORMAT, "VORBIS_COMMENT")?);
            }
            FlacMetadataBlockType::Picture if options.include_pictures => {
                let body = header.read_body(source).stage(FORMAT, "PICTURE")?;
                flac.pictures.push(FlacPicture::parse(&body).stage(FORMAT, "PICTURE")?);
            }
            other => {
                log::debug!("skipping FLAC {:?} block of {} bytes", other, header.length);
                header.skip_body(source).stage(FORMAT, "block body")?;
            }
        }

        if header.is_last {
            break;
        }
    }

    if options.include_pictures {
        if let Some(comment) = &flac.comment {
            flac.pictures.extend(comment.pictures());
        }
    }

    Ok(Some(flac))
}
