// ID3v1 tag implementation
//
// The last 128 bytes of the file:
// "TAG", title(30), artist(30), album(30), year(4), comment(30), genre(1)
// ID3v1.1 puts a zero byte and the track number in the last two comment bytes.

use std::io::SeekFrom;

use crate::error::{Result, StageContext};
use crate::stream::SeekableSource;
use crate::utils::encoding::decode_latin1_field;

const FORMAT: &str = "ID3v1";

/// ID3v1 tag structure
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Id3v1Tag {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub year: String,
    pub comment: String,
    pub track: Option<u8>,
    pub genre: u8,
}

impl Id3v1Tag {
    pub const TAG_SIZE: usize = 128;
    const TAG_ID: &[u8; 3] = b"TAG";

    /// Read the tag at the end of the source, restoring the position after.
    pub fn read<S: SeekableSource + ?Sized>(source: &mut S) -> Result<Option<Self>> {
        let size = source.size().stage(FORMAT, "size")?;
        if size < Self::TAG_SIZE as u64 {
            return Ok(None);
        }

        let start = source.tell().stage(FORMAT, "seek")?;
        source
            .seek(SeekFrom::Start(size - Self::TAG_SIZE as u64))
            .stage(FORMAT, "seek")?;
        let mut buffer = [0u8; Self::TAG_SIZE];
        source.read_exact_into(&mut buffer).stage(FORMAT, "tag")?;
        source.seek(SeekFrom::Start(start)).stage(FORMAT, "seek")?;

        Ok(Self::parse(&buffer))
    }

    /// Parse a 128-byte tag; `None` without the "TAG" identifier.
    pub fn parse(buffer: &[u8; 128]) -> Option<Self> {
        if !buffer.starts_with(Self::TAG_ID) {
            return None;
        }

        let (comment, track) = if buffer[125] == 0 && buffer[126] != 0 {
            (decode_latin1_field(&buffer[97..125]), Some(buffer[126]))
        } else {
            (decode_latin1_field(&buffer[97..127]), None)
        };

        Some(Id3v1Tag {
            title: decode_latin1_field(&buffer[3..33]),
            artist: decode_latin1_field(&buffer[33..63]),
            album: decode_latin1_field(&buffer[63..93]),
            year: decode_latin1_field(&buffer[93..97]),
            comment,
            track,
            genre: buffer[127],
        })
    }

    pub fn genre_name(&self) -> Option<&'static str> {
        genre_name(self.genre)
    }

    pub fn version(&self) -> &'static str {
        if self.track.is_some() {
            "1.1"
        } else {
            "1.0"
        }
    }
}

/// Genre names by ID3v1 index (including the Winamp extensions).
pub const GENRES: [&str; 192] = [
    "Blues", "Classic Rock", "Country", "Dance", "Disco", "Funk", "Grunge", "Hip-Hop",
    "Jazz", "Metal", "New Age", "Oldies", "Other", "Pop", "R&B", "Rap",
    "Reggae", "Rock", "Techno", "Industrial", "Alternative", "Ska", "Death Metal", "Pranks",
    "Soundtrack", "Euro-Techno", "Ambient", "Trip-Hop", "Vocal", "Jazz+Funk", "Fusion", "Trance",
    "Classical", "Instrumental", "Acid", "House", "Game", "Sound Clip", "Gospel", "Noise",
    "AlternRock", "Bass", "Soul", "Punk", "Space", "Meditative", "Instrumental Pop", "Instrumental Rock",
    "Ethnic", "Gothic", "Darkwave", "Techno-Industrial", "Electronic", "Pop-Folk", "Eurodance", "Dream",
    "Southern Rock", "Comedy", "Cult", "Gangsta", "Top 40", "Christian Rap", "Pop/Funk", "Jungle",
    "Native American", "Cabaret", "New Wave", "Psychadelic", "Rave", "Showtunes", "Trailer", "Lo-Fi",
    "Tribal", "Acid Punk", "Acid Jazz", "Polka", "Retro", "Musical", "Rock & Roll", "Hard Rock",
    "Folk", "Folk-Rock", "National Folk", "Swing", "Fast Fusion", "Bebob", "Latin", "Revival",
    "Celtic", "Bluegrass", "Avantgarde", "Gothic Rock", "Progressive Rock", "Psychedelic Rock", "Symphonic Rock", "Slow Rock",
    "Big Band", "Chorus", "Easy Listening", "Acoustic", "Humour", "Speech", "Chanson", "Opera",
    "Chamber Music", "Sonata", "Symphony", "Booty Bass", "Primus", "Porn Groove", "Satire", "Slow Jam",
    "Club", "Tango", "Samba", "Folklore", "Ballad", "Power Ballad", "Rhythmic Soul", "Freestyle",
    "Duet", "Punk Rock", "Drum Solo", "A capella", "Euro-House", "Dance Hall", "Goa", "Drum & Bass",
    "Club-House", "Hardcore", "Terror", "Indie", "BritPop", "Negerpunk", "Polsk Punk", "Beat",
    "Christian Gangsta Rap", "Heavy Metal", "Black Metal", "Crossover", "Contemporary Christian", "Christian Rock", "Merengue", "Salsa",
    "Thrash Metal", "Anime", "JPop", "Synthpop", "Abstract", "Art Rock", "Baroque", "Bhangra",
    "Big Beat", "Breakbeat", "Chillout", "Downtempo", "Dub", "EBM", "Eclectic", "Electro",
    "Electroclash", "Emo", "Experimental", "Garage", "Global", "IDM", "Illbient", "Industro-Goth",
    "Jam Band", "Krautrock", "Leftfield", "Lounge", "Math Rock", "New Romantic", "Nu-Breakz", "Post-Punk",
    "Post-Rock", "Psytrance", "Shoegaze", "Space Rock", "Trop Rock", "World Music", "Neoclassical", "Audiobook",
    "Audio Theatre", "Neue Deutsche Welle", "Podcast", "Indie Rock", "G-Funk", "Dubstep", "Garage Rock", "Psybient",
];

/// Name of an ID3v1 genre index; 255 and unassigned indices have none.
pub fn genre_name(index: u8) -> Option<&'static str> {
    GENRES.get(usize::from(index)).copied()
}
