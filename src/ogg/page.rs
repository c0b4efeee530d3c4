use crate::error::StreamError;
use crate::ogg::{
    CAPTURE_PATTERN_LEN, FIXED_HEADER_LEN, OGG_HEADER_TYPE_BOS, OGG_HEADER_TYPE_CONTINUATION,
    OGG_HEADER_TYPE_EOS, OGG_SIGNATURE,
};
use crate::stream::{BulkSource, PatternSynchronizer};
use crate::utils::io::decode_le;

/// One OGG page: parsed header fields plus its payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub version: u8,
    pub header_type: u8,
    pub granule_position: u64,
    pub serial: u32,
    pub sequence: u32,
    /// Stored CRC, never verified
    pub checksum: u32,
    pub segment_table: Vec<u8>,
    pub payload: Vec<u8>,
}

impl Page {
    /// Parse a page whose capture pattern has already been consumed.
    pub fn read<S: BulkSource + ?Sized>(source: &mut S) -> Result<Self, StreamError> {
        let mut header = [0u8; FIXED_HEADER_LEN - CAPTURE_PATTERN_LEN];
        source.read_exact_into(&mut header)?;

        let version = header[0];
        if version != 0 {
            return Err(StreamError::UnsupportedVersion(version));
        }
        let segment_count = usize::from(header[22]);

        let segment_table = source.read_slice(segment_count)?.into_owned();
        if segment_table.len() < segment_count {
            return Err(StreamError::TruncatedHeader {
                what: "segment table",
                declared: segment_count,
                available: segment_table.len(),
            });
        }

        let payload_size = payload_size(&segment_table);
        let payload = source.read_slice(payload_size)?.into_owned();
        if payload.len() < payload_size {
            return Err(StreamError::TruncatedHeader {
                what: "page payload",
                declared: payload_size,
                available: payload.len(),
            });
        }

        let page = Page {
            version,
            header_type: header[1],
            granule_position: decode_le(&header[2..10]),
            serial: decode_le(&header[10..14]),
            sequence: decode_le(&header[14..18]),
            checksum: decode_le(&header[18..22]),
            segment_table,
            payload,
        };
        log::trace!(
            "page {} of stream {:#010x}: {} segments, {} payload bytes",
            page.sequence,
            page.serial,
            page.segment_table.len(),
            page.payload.len()
        );
        Ok(page)
    }

    pub fn is_continuation(&self) -> bool {
        self.header_type & OGG_HEADER_TYPE_CONTINUATION != 0
    }

    pub fn is_first(&self) -> bool {
        self.header_type & OGG_HEADER_TYPE_BOS != 0
    }

    pub fn is_last(&self) -> bool {
        self.header_type & OGG_HEADER_TYPE_EOS != 0
    }

    /// Payload size implied by the segment table.
    pub fn data_size(&self) -> usize {
        payload_size(&self.segment_table)
    }
}

pub(crate) fn payload_size(segment_table: &[u8]) -> usize {
    segment_table.iter().map(|&x| usize::from(x)).sum()
}

/// Pulls pages from a source one at a time.
///
/// Each page after the first is located with the capture pattern; bytes
/// between pages are skipped with a warning. The reader ends cleanly when
/// the source runs out at a page boundary.
pub struct PageReader<'s, S: ?Sized> {
    source: &'s mut S,
    capture_consumed: bool,
    pages_read: u64,
}

impl<'s, S: BulkSource + ?Sized> PageReader<'s, S> {
    /// Reader positioned at a capture pattern (or garbage before one).
    pub fn new(source: &'s mut S) -> Self {
        PageReader {
            source,
            capture_consumed: false,
            pages_read: 0,
        }
    }

    /// Reader for a source whose first capture pattern was already consumed
    /// by a [`PatternSynchronizer`].
    pub fn after_capture(source: &'s mut S) -> Self {
        PageReader {
            source,
            capture_consumed: true,
            pages_read: 0,
        }
    }

    pub fn pages_read(&self) -> u64 {
        self.pages_read
    }

    pub fn next_page(&mut self) -> Result<Option<Page>, StreamError> {
        if !self.capture_consumed {
            if self.source.is_exhausted()? {
                return Ok(None);
            }
            let outcome = PatternSynchronizer::new(OGG_SIGNATURE).sync(self.source)?;
            if !outcome.found {
                log::debug!("{} trailing bytes after the last page", outcome.skipped);
                return Ok(None);
            }
            if outcome.skipped > 0 {
                log::warn!(
                    "lost page sync after page {}; skipped {} bytes",
                    self.pages_read,
                    outcome.skipped
                );
            }
        }
        self.capture_consumed = false;
        let page = Page::read(self.source)?;
        self.pages_read += 1;
        Ok(Some(page))
    }
}

impl<S: BulkSource + ?Sized> Iterator for PageReader<'_, S> {
    type Item = Result<Page, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_page().transpose()
    }
}
