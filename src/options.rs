// Decoder configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::stream::buffered::DEFAULT_CAPACITY;

/// Options shared by all format decoders.
///
/// Missing keys in a configuration file take their default values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Read buffer size of file-backed sources
    pub buffer_capacity: usize,
    /// How many OGG packets after the identification header to scan for the
    /// comment header
    pub max_header_packets: usize,
    /// Decode embedded pictures (FLAC PICTURE, METADATA_BLOCK_PICTURE, APIC)
    pub include_pictures: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            buffer_capacity: DEFAULT_CAPACITY,
            max_header_packets: 8,
            include_pictures: true,
        }
    }
}

impl DecodeOptions {
    /// Load options from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let options: DecodeOptions = serde_json::from_str(&text)?;
        if options.buffer_capacity == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "buffer_capacity must be positive",
            ));
        }
        Ok(options)
    }
}
