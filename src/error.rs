//! Error types for tagstream.
//!
//! - [`StreamError`] - failures of the byte-stream layer (sources, pattern
//!   search, bit extraction, page and packet reassembly)
//! - [`enum@Error`] - failures of a format decoder, carrying the format and
//!   the stage that failed

use thiserror::Error;

/// Errors raised by the stream decoding core.
#[derive(Error, Debug)]
pub enum StreamError {
    /// Fewer bytes were available than a read required
    #[error("source exhausted: needed {needed} bytes, {available} available")]
    SourceExhausted { needed: usize, available: usize },

    /// A signature never occurred; the source is left exhausted
    #[error("pattern {pattern:?} not found after {consumed} bytes")]
    PatternNotFound { pattern: Vec<u8>, consumed: u64 },

    /// A declared length runs past the available data
    #[error("truncated {what}: declared {declared} bytes, {available} available")]
    TruncatedHeader {
        what: &'static str,
        declared: usize,
        available: usize,
    },

    /// The page stream ended while a packet was still being assembled
    #[error("truncated packet: stream ended with {buffered} bytes of an unfinished packet")]
    TruncatedPacket { buffered: usize },

    /// Page stream structure version other than 0
    #[error("unsupported stream structure version {0}")]
    UnsupportedVersion(u8),

    /// Caller misuse, e.g. a bit width wider than the result type
    #[error("invalid precondition: {0}")]
    InvalidPrecondition(String),

    /// I/O error from the underlying store
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StreamError {
    /// True for errors caused by the caller rather than by the data.
    pub fn is_misuse(&self) -> bool {
        matches!(self, StreamError::InvalidPrecondition(_))
    }

    /// True when the source simply does not contain the searched signature.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StreamError::PatternNotFound { .. })
    }

    pub(crate) fn exhausted(needed: usize, available: usize) -> Self {
        StreamError::SourceExhausted { needed, available }
    }
}

/// Errors returned by the format decoders and [`crate::AudioFile`].
#[derive(Error, Debug)]
pub enum Error {
    /// The file could not be opened
    #[error("cannot open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A recognized container or tag turned out to be corrupt
    #[error("{}{format} {stage}: {source}", origin_prefix(.origin))]
    Decode {
        /// Name of the source being decoded, when known
        origin: Option<String>,
        format: &'static str,
        stage: &'static str,
        #[source]
        source: StreamError,
    },

    /// I/O error outside of a decoding stage
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Records the source name on decode errors that do not have one yet.
    pub fn with_origin(self, name: &str) -> Self {
        match self {
            Error::Decode {
                origin: None,
                format,
                stage,
                source,
            } => Error::Decode {
                origin: Some(name.to_string()),
                format,
                stage,
                source,
            },
            other => other,
        }
    }

    /// Name of the source a decode error came from.
    pub fn origin(&self) -> Option<&str> {
        match self {
            Error::Decode { origin, .. } => origin.as_deref(),
            Error::Open { path, .. } => Some(path),
            Error::Io(_) => None,
        }
    }
}

fn origin_prefix(origin: &Option<String>) -> String {
    origin.as_ref().map(|name| format!("{}: ", name)).unwrap_or_default()
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Attaches format and stage information to a [`StreamError`].
pub(crate) trait StageContext<T> {
    fn stage(self, format: &'static str, stage: &'static str) -> Result<T>;
}

impl<T> StageContext<T> for std::result::Result<T, StreamError> {
    fn stage(self, format: &'static str, stage: &'static str) -> Result<T> {
        self.map_err(|source| Error::Decode {
            origin: None,
            format,
            stage,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_context() {
        let result: std::result::Result<(), StreamError> = Err(StreamError::exhausted(4, 1));
        let err = result.stage("FLAC", "STREAMINFO").unwrap_err();
        assert_eq!(
            err.to_string(),
            "FLAC STREAMINFO: source exhausted: needed 4 bytes, 1 available"
        );
        assert!(matches!(err, Error::Decode { stage: "STREAMINFO", .. }));
        assert_eq!(err.origin(), None);
    }

    #[test]
    fn test_origin_is_reported() {
        let result: std::result::Result<(), StreamError> = Err(StreamError::TruncatedPacket { buffered: 7 });
        let err = result.stage("OGG", "comment packet").unwrap_err().with_origin("song.ogg");
        assert_eq!(err.origin(), Some("song.ogg"));
        assert!(err.to_string().starts_with("song.ogg: OGG comment packet: "));

        // The innermost origin wins
        let err = err.with_origin("outer");
        assert_eq!(err.origin(), Some("song.ogg"));
    }

    #[test]
    fn test_misuse_is_distinct() {
        assert!(StreamError::InvalidPrecondition("width".into()).is_misuse());
        assert!(!StreamError::TruncatedPacket { buffered: 3 }.is_misuse());
        let not_found = StreamError::PatternNotFound {
            pattern: b"OggS".to_vec(),
            consumed: 10,
        };
        assert!(not_found.is_not_found());
        assert!(!not_found.is_misuse());
    }
}
