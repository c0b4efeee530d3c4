// Unified metadata field mapping
//
// Each tag format names its fields differently:
// - ID3v2: frame ids (TIT2, TPE1, TALB, ...)
// - FLAC/OGG: Vorbis comment keys (TITLE, ARTIST, ALBUM, ...)
//
// This module maps both onto one set of standard fields and normalises
// values that the formats spell differently.

use std::fmt;
use std::str::FromStr;

use crate::id3::v1::genre_name;

/// Standard metadata fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardField {
    Title,
    Artist,
    Album,
    AlbumArtist,
    Year,
    Track,
    Disc,
    Genre,
    Composer,
    Comment,
    Lyrics,
}

impl StandardField {
    pub const ALL: [StandardField; 11] = [
        StandardField::Title,
        StandardField::Artist,
        StandardField::Album,
        StandardField::AlbumArtist,
        StandardField::Year,
        StandardField::Track,
        StandardField::Disc,
        StandardField::Genre,
        StandardField::Composer,
        StandardField::Comment,
        StandardField::Lyrics,
    ];

    /// Get standard field name (lowercase)
    pub fn as_str(&self) -> &'static str {
        match self {
            StandardField::Title => "title",
            StandardField::Artist => "artist",
            StandardField::Album => "album",
            StandardField::AlbumArtist => "album_artist",
            StandardField::Year => "year",
            StandardField::Track => "track",
            StandardField::Disc => "disc",
            StandardField::Genre => "genre",
            StandardField::Composer => "composer",
            StandardField::Comment => "comment",
            StandardField::Lyrics => "lyrics",
        }
    }
}

impl fmt::Display for StandardField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StandardField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        StandardField::ALL
            .iter()
            .copied()
            .find(|field| field.as_str() == lower)
            .ok_or_else(|| format!("unknown field: {}", s))
    }
}

/// Format-specific field mappings
pub struct FieldMappings;

impl FieldMappings {
    // ID3v2 frame IDs
    pub const ID3V2_TITLE: &str = "TIT2";
    pub const ID3V2_ARTIST: &str = "TPE1";
    pub const ID3V2_ALBUM: &str = "TALB";
    pub const ID3V2_ALBUM_ARTIST: &str = "TPE2";
    pub const ID3V2_YEAR: &str = "TDRC";
    pub const ID3V2_TRACK: &str = "TRCK";
    pub const ID3V2_DISC: &str = "TPOS";
    pub const ID3V2_GENRE: &str = "TCON";
    pub const ID3V2_COMPOSER: &str = "TCOM";
    pub const ID3V2_COMMENT: &str = "COMM";
    pub const ID3V2_LYRICS: &str = "USLT";

    // Vorbis Comment keys (FLAC/OGG)
    pub const VORBIS_TITLE: &str = "TITLE";
    pub const VORBIS_ARTIST: &str = "ARTIST";
    pub const VORBIS_ALBUM: &str = "ALBUM";
    pub const VORBIS_ALBUM_ARTIST: &str = "ALBUMARTIST";
    pub const VORBIS_YEAR: &str = "DATE";
    pub const VORBIS_TRACK: &str = "TRACKNUMBER";
    pub const VORBIS_DISC: &str = "DISCNUMBER";
    pub const VORBIS_GENRE: &str = "GENRE";
    pub const VORBIS_COMPOSER: &str = "COMPOSER";
    pub const VORBIS_COMMENT: &str = "COMMENT";
    pub const VORBIS_LYRICS: &str = "LYRICS";

    /// Get ID3v2 frame ID for a standard field
    pub fn to_id3v2(field: StandardField) -> &'static str {
        match field {
            StandardField::Title => Self::ID3V2_TITLE,
            StandardField::Artist => Self::ID3V2_ARTIST,
            StandardField::Album => Self::ID3V2_ALBUM,
            StandardField::AlbumArtist => Self::ID3V2_ALBUM_ARTIST,
            StandardField::Year => Self::ID3V2_YEAR,
            StandardField::Track => Self::ID3V2_TRACK,
            StandardField::Disc => Self::ID3V2_DISC,
            StandardField::Genre => Self::ID3V2_GENRE,
            StandardField::Composer => Self::ID3V2_COMPOSER,
            StandardField::Comment => Self::ID3V2_COMMENT,
            StandardField::Lyrics => Self::ID3V2_LYRICS,
        }
    }

    /// Get Vorbis Comment key for a standard field
    pub fn to_vorbis(field: StandardField) -> &'static str {
        match field {
            StandardField::Title => Self::VORBIS_TITLE,
            StandardField::Artist => Self::VORBIS_ARTIST,
            StandardField::Album => Self::VORBIS_ALBUM,
            StandardField::AlbumArtist => Self::VORBIS_ALBUM_ARTIST,
            StandardField::Year => Self::VORBIS_YEAR,
            StandardField::Track => Self::VORBIS_TRACK,
            StandardField::Disc => Self::VORBIS_DISC,
            StandardField::Genre => Self::VORBIS_GENRE,
            StandardField::Composer => Self::VORBIS_COMPOSER,
            StandardField::Comment => Self::VORBIS_COMMENT,
            StandardField::Lyrics => Self::VORBIS_LYRICS,
        }
    }

    /// Convert ID3v2 frame to standard field
    pub fn from_id3v2(frame_id: &str) -> Option<StandardField> {
        match frame_id {
            Self::ID3V2_TITLE => Some(StandardField::Title),
            Self::ID3V2_ARTIST => Some(StandardField::Artist),
            Self::ID3V2_ALBUM => Some(StandardField::Album),
            Self::ID3V2_ALBUM_ARTIST => Some(StandardField::AlbumArtist),
            // TYER is the v2.3 year frame
            Self::ID3V2_YEAR | "TYER" => Some(StandardField::Year),
            Self::ID3V2_TRACK => Some(StandardField::Track),
            Self::ID3V2_DISC => Some(StandardField::Disc),
            Self::ID3V2_GENRE => Some(StandardField::Genre),
            Self::ID3V2_COMPOSER => Some(StandardField::Composer),
            Self::ID3V2_COMMENT => Some(StandardField::Comment),
            Self::ID3V2_LYRICS => Some(StandardField::Lyrics),
            _ => None,
        }
    }

    /// Convert Vorbis Comment key to standard field
    pub fn from_vorbis(key: &str) -> Option<StandardField> {
        match key.to_uppercase().as_str() {
            Self::VORBIS_TITLE => Some(StandardField::Title),
            Self::VORBIS_ARTIST => Some(StandardField::Artist),
            Self::VORBIS_ALBUM => Some(StandardField::Album),
            Self::VORBIS_ALBUM_ARTIST | "ALBUM ARTIST" => Some(StandardField::AlbumArtist),
            Self::VORBIS_YEAR | "YEAR" => Some(StandardField::Year),
            Self::VORBIS_TRACK | "TRACK" => Some(StandardField::Track),
            Self::VORBIS_DISC => Some(StandardField::Disc),
            Self::VORBIS_GENRE => Some(StandardField::Genre),
            Self::VORBIS_COMPOSER => Some(StandardField::Composer),
            Self::VORBIS_COMMENT | "DESCRIPTION" => Some(StandardField::Comment),
            Self::VORBIS_LYRICS | "UNSYNCEDLYRICS" => Some(StandardField::Lyrics),
            _ => None,
        }
    }
}

/// Metadata value converter for handling format-specific value formats
pub struct ValueConverter;

impl ValueConverter {
    /// Extract the year from dates such as "2024-01-15"
    pub fn normalize_year(year: &str) -> String {
        let year = year.trim();
        match year.get(..4) {
            Some(prefix) if prefix.bytes().all(|b| b.is_ascii_digit()) => prefix.to_string(),
            _ => year.to_string(),
        }
    }

    /// Convert track number to standard format (e.g., "1/10" -> "1")
    pub fn normalize_track(track: &str) -> String {
        track.split('/').next().unwrap_or(track).trim().to_string()
    }

    /// Resolve ID3 genre references: "(17)", "17", "(17)Rock", "RX", "CR".
    pub fn normalize_genre(genre: &str) -> String {
        let genre = genre.trim();
        match genre {
            "RX" | "(RX)" => return "Remix".to_string(),
            "CR" | "(CR)" => return "Cover".to_string(),
            _ => {}
        }

        if let Some(rest) = genre.strip_prefix('(') {
            if let Some((index, refinement)) = rest.split_once(')') {
                if !refinement.is_empty() {
                    return refinement.to_string();
                }
                if let Some(name) = index.parse::<u8>().ok().and_then(genre_name) {
                    return name.to_string();
                }
            }
        } else if let Some(name) = genre.parse::<u8>().ok().and_then(genre_name) {
            return name.to_string();
        }
        genre.to_string()
    }

    /// Apply the normalisation a standard field calls for.
    pub fn normalize(field: StandardField, value: &str) -> String {
        match field {
            StandardField::Year => Self::normalize_year(value),
            StandardField::Track | StandardField::Disc => Self::normalize_track(value),
            StandardField::Genre => Self::normalize_genre(value),
            _ => value.trim_end().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_field_parsing() {
        assert_eq!("title".parse::<StandardField>(), Ok(StandardField::Title));
        assert_eq!("TITLE".parse::<StandardField>(), Ok(StandardField::Title));
        assert_eq!("Album_Artist".parse::<StandardField>(), Ok(StandardField::AlbumArtist));
        assert!("unknown".parse::<StandardField>().is_err());
    }

    #[test]
    fn test_field_mapping() {
        assert_eq!(FieldMappings::to_id3v2(StandardField::Title), "TIT2");
        assert_eq!(FieldMappings::to_vorbis(StandardField::Title), "TITLE");

        assert_eq!(FieldMappings::from_id3v2("TIT2"), Some(StandardField::Title));
        assert_eq!(FieldMappings::from_id3v2("TYER"), Some(StandardField::Year));
        assert_eq!(FieldMappings::from_vorbis("tracknumber"), Some(StandardField::Track));
        assert_eq!(FieldMappings::from_vorbis("REPLAYGAIN_TRACK_GAIN"), None);
    }

    #[test]
    fn test_mappings_agree() {
        for field in StandardField::ALL {
            assert_eq!(FieldMappings::from_id3v2(FieldMappings::to_id3v2(field)), Some(field));
            assert_eq!(FieldMappings::from_vorbis(FieldMappings::to_vorbis(field)), Some(field));
        }
    }

    #[test]
    fn test_value_normalization() {
        assert_eq!(ValueConverter::normalize_year("2024-01-15"), "2024");
        assert_eq!(ValueConverter::normalize_year("2024"), "2024");
        assert_eq!(ValueConverter::normalize_year("late 90s"), "late 90s");
        assert_eq!(ValueConverter::normalize_track("1/10"), "1");
        assert_eq!(ValueConverter::normalize_track("5"), "5");
    }

    #[test]
    fn test_genre_normalization() {
        assert_eq!(ValueConverter::normalize_genre("(17)"), "Rock");
        assert_eq!(ValueConverter::normalize_genre("8"), "Jazz");
        assert_eq!(ValueConverter::normalize_genre("(4)Eurodisco"), "Eurodisco");
        assert_eq!(ValueConverter::normalize_genre("RX"), "Remix");
        assert_eq!(ValueConverter::normalize_genre("Shoegaze"), "Shoegaze");
        assert_eq!(ValueConverter::normalize_genre("(255)"), "(255)");
    }
}
