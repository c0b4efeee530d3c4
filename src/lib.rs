//! Tagstream - a streaming audio metadata reader
//!
//! Tags are decoded through a small stack of byte-stream primitives:
//! buffered and in-memory sources, a pattern synchronizer, a bit reader and
//! the OGG page/packet layer. The format decoders (ID3v1, ID3v2, FLAC,
//! OGG Vorbis, OPUS) are built on top of them and feed one unified
//! [`Metadata`] model.

pub mod error;
pub mod field_mapping;
pub mod flac;
pub mod id3;
pub mod ogg;
pub mod options;
pub mod opus;
pub mod stream;
pub mod utils;

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Serialize, Serializer};

pub use error::{Error, Result, StreamError};
use error::StageContext;
pub use field_mapping::{FieldMappings, StandardField, ValueConverter};
pub use options::DecodeOptions;

use flac::vorbis::METADATA_BLOCK_PICTURE;
use flac::{FlacPicture, PictureType, VorbisComment, FLAC_SIGNATURE};
use id3::{AttachedPicture, FrameContent, Id3v1Tag, Id3v2Header, Id3v2Tag};
use ogg::{OggCodec, OGG_SIGNATURE};
use stream::{BufferedSource, NamedSource};

const PROBE: &str = "probe";

/// Audio properties decoded from stream headers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StreamInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bits_per_sample: Option<u8>,
    /// Nominal bitrate in bits per second
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_samples: Option<u64>,
    /// Duration in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

/// Container or tag format a file was recognised as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FileType {
    Id3v2,
    Id3v1,
    Flac,
    OggVorbis,
    Opus,
    /// OGG container with a codec we do not decode
    Ogg,
    Unknown,
}

impl FileType {
    pub fn as_str(self) -> &'static str {
        match self {
            FileType::Id3v2 => "ID3v2",
            FileType::Id3v1 => "ID3v1",
            FileType::Flac => "FLAC",
            FileType::OggVorbis => "OGG Vorbis",
            FileType::Opus => "OPUS",
            FileType::Ogg => "OGG",
            FileType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<OggCodec> for FileType {
    fn from(codec: OggCodec) -> Self {
        match codec {
            OggCodec::Vorbis => FileType::OggVorbis,
            OggCodec::Opus => FileType::Opus,
            OggCodec::Unknown => FileType::Ogg,
        }
    }
}

fn serialize_base64<S: Serializer>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(data))
}

/// Cover art structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverArt {
    pub mime_type: String,
    pub picture_type: PictureType,
    pub description: String,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    #[serde(serialize_with = "serialize_base64")]
    pub data: Vec<u8>,
}

impl CoverArt {
    /// Save cover art to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        std::fs::write(path, &self.data)
    }

    /// File extension matching the MIME type
    pub fn extension(&self) -> &'static str {
        flac::picture::mime_extension(&self.mime_type)
    }
}

impl fmt::Display for CoverArt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CoverArt(mime_type={}, {}x{}, depth={}, {} bytes)",
            self.mime_type,
            self.width,
            self.height,
            self.depth,
            self.data.len()
        )
    }
}

impl From<FlacPicture> for CoverArt {
    fn from(picture: FlacPicture) -> Self {
        CoverArt {
            mime_type: picture.mime_type,
            picture_type: picture.picture_type,
            description: picture.description,
            width: picture.width,
            height: picture.height,
            depth: picture.depth,
            data: picture.data,
        }
    }
}

impl From<AttachedPicture> for CoverArt {
    fn from(picture: AttachedPicture) -> Self {
        CoverArt {
            mime_type: picture.mime_type,
            picture_type: picture.picture_type,
            description: picture.description,
            width: 0,
            height: 0,
            depth: 0,
            data: picture.data,
        }
    }
}

/// Audio metadata structure
#[derive(Debug, Clone, Default, Serialize)]
pub struct Metadata {
    /// Name of the source the metadata was read from, e.g. the file path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    pub file_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub year: Option<String>,
    pub track: Option<String>,
    pub disc: Option<String>,
    pub genre: Option<String>,
    pub composer: Option<String>,
    pub comment: Option<String>,
    pub lyrics: Option<String>,
    /// Fields without a standard counterpart, keyed by their native name
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<StreamInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pictures: Vec<CoverArt>,
}

impl Metadata {
    fn slot(&mut self, field: StandardField) -> &mut Option<String> {
        match field {
            StandardField::Title => &mut self.title,
            StandardField::Artist => &mut self.artist,
            StandardField::Album => &mut self.album,
            StandardField::AlbumArtist => &mut self.album_artist,
            StandardField::Year => &mut self.year,
            StandardField::Track => &mut self.track,
            StandardField::Disc => &mut self.disc,
            StandardField::Genre => &mut self.genre,
            StandardField::Composer => &mut self.composer,
            StandardField::Comment => &mut self.comment,
            StandardField::Lyrics => &mut self.lyrics,
        }
    }

    pub fn get(&self, field: StandardField) -> Option<&str> {
        let value = match field {
            StandardField::Title => &self.title,
            StandardField::Artist => &self.artist,
            StandardField::Album => &self.album,
            StandardField::AlbumArtist => &self.album_artist,
            StandardField::Year => &self.year,
            StandardField::Track => &self.track,
            StandardField::Disc => &self.disc,
            StandardField::Genre => &self.genre,
            StandardField::Composer => &self.composer,
            StandardField::Comment => &self.comment,
            StandardField::Lyrics => &self.lyrics,
        };
        value.as_deref()
    }

    /// Fill a field unless it is already set; blank values are ignored.
    pub fn fill(&mut self, field: StandardField, value: &str) {
        let value = ValueConverter::normalize(field, value);
        if value.is_empty() {
            return;
        }
        let slot = self.slot(field);
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    /// Preferred cover: the front cover if present, otherwise the first picture.
    pub fn cover(&self) -> Option<&CoverArt> {
        self.pictures
            .iter()
            .find(|p| p.picture_type == PictureType::CoverFront)
            .or_else(|| self.pictures.first())
    }

    fn apply_vorbis_comment(&mut self, comment: &VorbisComment) {
        for (key, value) in &comment.comments {
            if key.eq_ignore_ascii_case(METADATA_BLOCK_PICTURE) {
                continue;
            }
            match FieldMappings::from_vorbis(key) {
                Some(field) => self.fill(field, value),
                None => {
                    self.extra.entry(key.to_uppercase()).or_insert_with(|| value.clone());
                }
            }
        }
    }

    fn apply_id3v2(&mut self, tag: Id3v2Tag, include_pictures: bool) {
        for frame in tag.frames {
            let field = FieldMappings::from_id3v2(&frame.frame_id);
            match frame.content {
                FrameContent::Text(values) => {
                    let joined = values.join("; ");
                    match field {
                        Some(field) => self.fill(field, &joined),
                        None => {
                            self.extra.entry(frame.frame_id).or_insert(joined);
                        }
                    }
                }
                FrameContent::UserText { description, value } => {
                    self.extra.entry(description).or_insert(value);
                }
                FrameContent::Url(url) => {
                    self.extra.entry(frame.frame_id).or_insert(url);
                }
                FrameContent::UserUrl { description, url } => {
                    self.extra.entry(description).or_insert(url);
                }
                FrameContent::Comment(comment) => self.fill(StandardField::Comment, &comment.text),
                FrameContent::Lyrics(lyrics) => self.fill(StandardField::Lyrics, &lyrics.text),
                FrameContent::Picture(picture) if include_pictures => self.pictures.push(picture.into()),
                FrameContent::PlayCounter(count) => {
                    self.extra.insert("PLAY_COUNTER".to_string(), count.to_string());
                }
                FrameContent::Popularimeter { rating, .. } => {
                    self.extra.insert("RATING".to_string(), rating.to_string());
                }
                FrameContent::Picture(_) | FrameContent::Opaque(_) => {}
            }
        }
    }

    fn apply_id3v1(&mut self, tag: Id3v1Tag) {
        self.fill(StandardField::Title, &tag.title);
        self.fill(StandardField::Artist, &tag.artist);
        self.fill(StandardField::Album, &tag.album);
        self.fill(StandardField::Year, &tag.year);
        self.fill(StandardField::Comment, &tag.comment);
        if let Some(track) = tag.track {
            self.fill(StandardField::Track, &track.to_string());
        }
        if let Some(genre) = tag.genre_name() {
            self.fill(StandardField::Genre, genre);
        }
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Metadata(file_type={}, title={}, artist={}, album={})",
            self.file_type,
            self.title.as_deref().unwrap_or("None"),
            self.artist.as_deref().unwrap_or("None"),
            self.album.as_deref().unwrap_or("None")
        )
    }
}

/// Audio file metadata handler
#[derive(Debug, Clone)]
pub struct AudioFile {
    path: PathBuf,
    file_type: FileType,
    options: DecodeOptions,
}

impl AudioFile {
    /// Open a file and detect its type with default options.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, DecodeOptions::default())
    }

    pub fn open_with_options<P: AsRef<Path>>(path: P, options: DecodeOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut audio = AudioFile {
            path,
            file_type: FileType::Unknown,
            options,
        };
        audio.file_type = audio.detect()?;
        log::debug!("{} detected as {}", audio.path.display(), audio.file_type);
        Ok(audio)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    fn source(&self) -> Result<BufferedSource<File>> {
        BufferedSource::open_with_capacity(&self.path, self.options.buffer_capacity).map_err(|source| Error::Open {
            path: self.path.display().to_string(),
            source,
        })
    }

    fn detect(&self) -> Result<FileType> {
        let mut source = self.source()?;
        self.detect_from(&mut source).map_err(|e| e.with_origin(source.name()))
    }

    fn detect_from<S: NamedSource + ?Sized>(&self, source: &mut S) -> Result<FileType> {
        let mut head = [0u8; Id3v2Header::SIZE];
        let head = source.read_into(&mut head).stage(PROBE, "signature")?;

        if let Some(header) = Id3v2Header::parse(head) {
            // FLAC files sometimes carry a leading ID3v2 tag
            source
                .seek(SeekFrom::Start(header.tag_size()))
                .stage(PROBE, "ID3v2 prefix")?;
            let mut magic = [0u8; 4];
            let magic = source.read_into(&mut magic).stage(PROBE, "ID3v2 prefix")?;
            return Ok(if magic == FLAC_SIGNATURE { FileType::Flac } else { FileType::Id3v2 });
        }
        if head.starts_with(FLAC_SIGNATURE) {
            return Ok(FileType::Flac);
        }
        if head.starts_with(OGG_SIGNATURE) {
            source.seek(SeekFrom::Start(0)).stage(PROBE, "signature")?;
            let probe = DecodeOptions {
                max_header_packets: 0,
                ..self.options.clone()
            };
            let codec = ogg::read_ogg(source, &probe)?.map_or(OggCodec::Unknown, |stream| stream.codec);
            return Ok(codec.into());
        }
        if Id3v1Tag::read(source)?.is_some() {
            return Ok(FileType::Id3v1);
        }
        Ok(FileType::Unknown)
    }

    /// Tag or stream version, where the format has one.
    pub fn version(&self) -> Result<Option<String>> {
        let mut source = self.source()?;
        self.version_from(&mut source).map_err(|e| e.with_origin(source.name()))
    }

    fn version_from<S: NamedSource + ?Sized>(&self, source: &mut S) -> Result<Option<String>> {
        Ok(match self.file_type {
            FileType::Id3v2 => {
                let mut head = [0u8; Id3v2Header::SIZE];
                let head = source.read_into(&mut head).stage(PROBE, "signature")?;
                Id3v2Header::parse(head).map(|h| format!("2.{}.{}", h.version.0, h.version.1))
            }
            FileType::Id3v1 => Id3v1Tag::read(source)?.map(|tag| tag.version().to_string()),
            _ => None,
        })
    }

    /// Read metadata from the audio file
    pub fn read_metadata(&self) -> Result<Metadata> {
        let mut source = self.source()?;
        self.metadata_from(&mut source).map_err(|e| e.with_origin(source.name()))
    }

    /// Decode metadata from an already opened source of this file's type.
    pub fn metadata_from<S: NamedSource + ?Sized>(&self, source: &mut S) -> Result<Metadata> {
        let mut metadata = Metadata {
            origin: Some(source.name().to_string()),
            file_type: self.file_type.to_string(),
            ..Metadata::default()
        };

        match self.file_type {
            FileType::Id3v2 => {
                if let Some(tag) = Id3v2Tag::read(source)? {
                    metadata.version = Some(format!("2.{}.{}", tag.header.version.0, tag.header.version.1));
                    metadata.apply_id3v2(tag, self.options.include_pictures);
                }
                // ID3v1 fills whatever the ID3v2 tag left out
                if let Some(tag) = Id3v1Tag::read(source)? {
                    metadata.apply_id3v1(tag);
                }
            }
            FileType::Id3v1 => {
                if let Some(tag) = Id3v1Tag::read(source)? {
                    metadata.version = Some(tag.version().to_string());
                    metadata.apply_id3v1(tag);
                }
            }
            FileType::Flac => {
                if let Some(flac) = flac::read_flac(source, &self.options)? {
                    metadata.stream = flac.stream_info.as_ref().map(|info| info.to_stream_info());
                    if let Some(comment) = &flac.comment {
                        metadata.apply_vorbis_comment(comment);
                    }
                    metadata.pictures.extend(flac.pictures.into_iter().map(CoverArt::from));
                }
            }
            FileType::OggVorbis | FileType::Opus | FileType::Ogg => {
                if let Some(stream) = ogg::read_ogg(source, &self.options)? {
                    metadata.stream = stream.info;
                    if let Some(comment) = &stream.comment {
                        metadata.apply_vorbis_comment(comment);
                        if self.options.include_pictures {
                            metadata.pictures.extend(comment.pictures().into_iter().map(CoverArt::from));
                        }
                    }
                }
            }
            FileType::Unknown => {}
        }

        Ok(metadata)
    }

    /// Extract cover art from audio file
    pub fn read_cover(&self) -> Result<Option<CoverArt>> {
        let metadata = self.read_metadata()?;
        Ok(metadata.cover().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flac::tests::flac_bytes;
    use crate::id3::v2::tests::build_tag;
    use tempdir::TempDir;

    fn write(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_detect_types() {
        let dir = TempDir::new("tagstream-detect").unwrap();
        let mp3 = write(&dir, "a.mp3", &build_tag(3, 0, &[("TIT2", b"\x00A")]));
        let flac = write(&dir, "a.flac", &flac_bytes(&[], None));
        let junk = write(&dir, "a.bin", &[0u8; 64]);

        assert_eq!(AudioFile::open(&mp3).unwrap().file_type(), FileType::Id3v2);
        assert_eq!(AudioFile::open(&flac).unwrap().file_type(), FileType::Flac);
        assert_eq!(AudioFile::open(&junk).unwrap().file_type(), FileType::Unknown);
    }

    #[test]
    fn test_origin_follows_source_name() {
        let dir = TempDir::new("tagstream-origin").unwrap();
        let path = write(&dir, "named.flac", &flac_bytes(&["TITLE=x"], None));
        let audio = AudioFile::open(&path).unwrap();

        let metadata = audio.read_metadata().unwrap();
        assert_eq!(metadata.origin.as_deref(), Some(path.display().to_string().as_str()));

        let bytes = flac_bytes(&["TITLE=y"], None);
        let mut source = crate::stream::SliceSource::new(&bytes).with_name("in-memory.flac");
        let metadata = audio.metadata_from(&mut source).unwrap();
        assert_eq!(metadata.origin.as_deref(), Some("in-memory.flac"));
        assert_eq!(metadata.title.as_deref(), Some("y"));
    }

    #[test]
    fn test_decode_error_names_file() {
        let dir = TempDir::new("tagstream-origin").unwrap();
        let mut bytes = flac_bytes(&[], None);
        bytes.truncate(20);
        let path = write(&dir, "cut.flac", &bytes);

        let err = AudioFile::open(&path).unwrap().read_metadata().unwrap_err();
        let name = path.display().to_string();
        assert_eq!(err.origin(), Some(name.as_str()));
        assert!(err.to_string().starts_with(&format!("{}: FLAC STREAMINFO", name)));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new("tagstream-missing").unwrap();
        let err = AudioFile::open(dir.path().join("nope.mp3")).unwrap_err();
        assert!(matches!(err, Error::Open { .. }));
    }

    #[test]
    fn test_id3v2_with_id3v1_fallback() {
        let dir = TempDir::new("tagstream-id3").unwrap();
        let mut bytes = build_tag(
            4,
            0,
            &[
                ("TIT2", b"\x03Title"),
                ("TCON", b"\x00(17)"),
                ("TRCK", b"\x003/12"),
                ("TXXX", b"\x00MOOD\x00calm"),
            ],
        );
        bytes.extend_from_slice(&[0xFF, 0xFB, 0x90, 0x00]);
        bytes.extend_from_slice(&crate::id3::v1::tests::build_tag("Old", "Fallback", Some(9), 8));
        let path = write(&dir, "song.mp3", &bytes);

        let audio = AudioFile::open(&path).unwrap();
        let metadata = audio.read_metadata().unwrap();
        assert_eq!(metadata.version.as_deref(), Some("2.4.0"));
        assert_eq!(metadata.title.as_deref(), Some("Title"));
        assert_eq!(metadata.artist.as_deref(), Some("Fallback"));
        assert_eq!(metadata.genre.as_deref(), Some("Rock"));
        assert_eq!(metadata.track.as_deref(), Some("3"));
        assert_eq!(metadata.extra.get("MOOD").map(String::as_str), Some("calm"));
    }

    #[test]
    fn test_metadata_serializes_pictures_as_base64() {
        let metadata = Metadata {
            file_type: "FLAC".to_string(),
            pictures: vec![CoverArt {
                mime_type: "image/png".to_string(),
                picture_type: PictureType::CoverFront,
                description: String::new(),
                width: 1,
                height: 1,
                depth: 24,
                data: vec![1, 2, 3],
            }],
            ..Metadata::default()
        };
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["pictures"][0]["data"], "AQID");
        assert_eq!(json["pictures"][0]["picture_type"], "cover_front");
        assert!(json.get("stream").is_none());
    }

    #[test]
    fn test_fill_keeps_first_value() {
        let mut metadata = Metadata::default();
        metadata.fill(StandardField::Year, "2001-05-01");
        metadata.fill(StandardField::Year, "1999");
        metadata.fill(StandardField::Title, "   ");
        assert_eq!(metadata.get(StandardField::Year), Some("2001"));
        assert_eq!(metadata.get(StandardField::Title), None);
    }
}
