use crate::error::StreamError;
use crate::ogg::page::Page;
use crate::ogg::MAX_LACING_VALUE;

/// A logical packet reassembled from one or more pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub data: Vec<u8>,
    pub serial: u32,
    /// Sequence number of the page the packet started on
    pub first_page_sequence: u32,
    /// Granule position of the page the packet ended on
    pub granule_position: u64,
}

/// Rebuilds packets from a stream of pages.
///
/// Lacing values are consumed left to right; each appends that many payload
/// bytes to the packet being built. A value of 255 means the packet goes on
/// (possibly onto the next page), anything smaller ends it. Pages are pulled
/// lazily, only when the current segment table is used up.
///
/// By default every page is treated as part of one logical stream. An
/// assembler built with [`PacketAssembler::first_stream`] demultiplexes:
/// it follows the serial of the first page and skips pages of any other.
pub struct PacketAssembler<I> {
    pages: I,
    page: Page,
    segment: usize,
    offset: usize,
    buffer: Vec<u8>,
    in_progress: bool,
    first_sequence: u32,
    pages_seen: u64,
    // Skipping the tail of a packet that began before the first page read
    orphaned: bool,
    follow_first: bool,
    serial: Option<u32>,
}

impl<I> PacketAssembler<I>
where
    I: Iterator<Item = Result<Page, StreamError>>,
{
    pub fn new(pages: I) -> Self {
        PacketAssembler {
            pages,
            page: Page::default(),
            segment: 0,
            offset: 0,
            buffer: Vec::new(),
            in_progress: false,
            first_sequence: 0,
            pages_seen: 0,
            orphaned: false,
            follow_first: false,
            serial: None,
        }
    }

    /// Assembler for the logical stream of the first page only.
    pub fn first_stream(pages: I) -> Self {
        PacketAssembler {
            follow_first: true,
            ..Self::new(pages)
        }
    }

    /// Serial of the followed stream, once its first page was seen.
    pub fn serial(&self) -> Option<u32> {
        self.serial
    }

    /// Next complete packet, or `None` once the pages end between packets.
    ///
    /// Fails with `TruncatedPacket` if the pages end mid-packet.
    pub fn next_packet(&mut self) -> Result<Option<Packet>, StreamError> {
        loop {
            if self.segment >= self.page.segment_table.len() {
                match self.pages.next().transpose()? {
                    Some(page) => {
                        if self.accepts(&page) {
                            self.start_page(page);
                        }
                    }
                    None if self.in_progress => {
                        return Err(StreamError::TruncatedPacket {
                            buffered: self.buffer.len(),
                        })
                    }
                    None => return Ok(None),
                }
                continue;
            }

            let lace = self.page.segment_table[self.segment];
            self.segment += 1;
            let end = self.offset + usize::from(lace);
            let chunk = self
                .page
                .payload
                .get(self.offset..end)
                .ok_or(StreamError::TruncatedHeader {
                    what: "page payload",
                    declared: end,
                    available: self.page.payload.len(),
                })?;

            if !self.in_progress {
                self.in_progress = true;
                self.first_sequence = self.page.sequence;
            }
            self.buffer.extend_from_slice(chunk);
            self.offset = end;

            if lace < MAX_LACING_VALUE {
                self.in_progress = false;
                return Ok(Some(Packet {
                    data: std::mem::take(&mut self.buffer),
                    serial: self.page.serial,
                    first_page_sequence: self.first_sequence,
                    granule_position: self.page.granule_position,
                }));
            }
        }
    }

    fn accepts(&mut self, page: &Page) -> bool {
        if !self.follow_first {
            return true;
        }
        match self.serial {
            None => {
                self.serial = Some(page.serial);
                true
            }
            Some(serial) if serial == page.serial => true,
            Some(serial) => {
                log::trace!(
                    "skipping page {} of stream {:#010x} while following {:#010x}",
                    page.sequence,
                    page.serial,
                    serial
                );
                false
            }
        }
    }

    fn start_page(&mut self, page: Page) {
        self.segment = 0;
        self.offset = 0;

        if page.is_continuation() {
            if !self.in_progress && (self.pages_seen == 0 || self.orphaned) {
                self.skip_orphaned_segments(&page);
            }
        } else {
            self.orphaned = false;
            if self.in_progress {
                log::warn!(
                    "page {} does not continue the open packet; dropping {} bytes",
                    page.sequence,
                    self.buffer.len()
                );
                self.buffer.clear();
                self.in_progress = false;
            }
        }

        self.pages_seen += 1;
        self.page = page;
    }

    /// Steps over lacing values belonging to a packet whose start was never seen.
    fn skip_orphaned_segments(&mut self, page: &Page) {
        self.orphaned = true;
        while self.segment < page.segment_table.len() {
            let lace = page.segment_table[self.segment];
            self.segment += 1;
            self.offset += usize::from(lace);
            if lace < MAX_LACING_VALUE {
                self.orphaned = false;
                break;
            }
        }
        log::debug!(
            "skipped {} bytes continuing a packet from before page {}",
            self.offset,
            page.sequence
        );
    }
}

impl<I> Iterator for PacketAssembler<I>
where
    I: Iterator<Item = Result<Page, StreamError>>,
{
    type Item = Result<Packet, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_packet().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ogg::testing::{encode, page};
    use crate::ogg::{PageReader, OGG_HEADER_TYPE_BOS, OGG_HEADER_TYPE_CONTINUATION, OGG_HEADER_TYPE_EOS};
    use crate::stream::SliceSource;

    fn assemble(pages: Vec<Page>) -> Result<Vec<Packet>, StreamError> {
        PacketAssembler::new(pages.into_iter().map(Ok)).collect()
    }

    fn sizes(packets: &[Packet]) -> Vec<usize> {
        packets.iter().map(|p| p.data.len()).collect()
    }

    #[test]
    fn test_short_lacing_value_ends_packet() {
        let packets = assemble(vec![page(0, 0, vec![10, 255, 255, 5])]).unwrap();
        assert_eq!(sizes(&packets), vec![10, 515]);
        assert_eq!(packets[1].data[0], 10);
    }

    #[test]
    fn test_single_large_packet_on_one_page() {
        let packets = assemble(vec![page(0, 0, vec![255, 255, 15])]).unwrap();
        assert_eq!(sizes(&packets), vec![525]);
    }

    #[test]
    fn test_packet_spanning_pages() {
        let first = page(0, 0, vec![20, 255]);
        let second = page(OGG_HEADER_TYPE_CONTINUATION, 1, vec![50, 7]);
        let packets = assemble(vec![first.clone(), second.clone()]).unwrap();

        assert_eq!(sizes(&packets), vec![20, 305, 7]);
        let spanning = &packets[1];
        assert_eq!(&spanning.data[..255], &first.payload[20..]);
        assert_eq!(&spanning.data[255..], &second.payload[..50]);
        assert_eq!(spanning.first_page_sequence, 0);
        assert_eq!(packets[2].first_page_sequence, 1);
    }

    #[test]
    fn test_zero_lacing_value_terminates() {
        let packets = assemble(vec![page(0, 0, vec![255, 0, 0])]).unwrap();
        assert_eq!(sizes(&packets), vec![255, 0]);
    }

    #[test]
    fn test_stream_ending_mid_packet() {
        let mut assembler = PacketAssembler::new(vec![Ok(page(0, 0, vec![3, 255]))].into_iter());
        assert_eq!(assembler.next_packet().unwrap().unwrap().data.len(), 3);
        assert!(matches!(
            assembler.next_packet(),
            Err(StreamError::TruncatedPacket { buffered: 255 })
        ));
    }

    #[test]
    fn test_pages_are_pulled_lazily() {
        let pages = vec![Ok(page(0, 0, vec![4])), Err(StreamError::TruncatedPacket { buffered: 0 })];
        let mut assembler = PacketAssembler::new(pages.into_iter());
        assert!(assembler.next_packet().unwrap().is_some());
        assert!(assembler.next_packet().is_err());
    }

    #[test]
    fn test_orphaned_continuation_at_stream_start() {
        let first = page(OGG_HEADER_TYPE_CONTINUATION, 5, vec![255, 30, 9]);
        let packets = assemble(vec![first]).unwrap();
        assert_eq!(sizes(&packets), vec![9]);
    }

    #[test]
    fn test_missing_continuation_drops_partial_packet() {
        let first = page(0, 0, vec![255]);
        let second = page(0, 1, vec![12]);
        let packets = assemble(vec![first, second]).unwrap();
        assert_eq!(sizes(&packets), vec![12]);
    }

    fn with_serial(mut page: Page, serial: u32) -> Page {
        page.serial = serial;
        page
    }

    #[test]
    fn test_first_stream_skips_interleaved_pages() {
        let pages = vec![
            with_serial(page(OGG_HEADER_TYPE_BOS, 0, vec![30]), 0xA),
            with_serial(page(OGG_HEADER_TYPE_BOS, 0, vec![40]), 0xB),
            with_serial(page(0, 1, vec![255]), 0xA),
            with_serial(page(0, 1, vec![60]), 0xB),
            with_serial(page(OGG_HEADER_TYPE_CONTINUATION, 2, vec![9]), 0xA),
        ];
        let mut assembler = PacketAssembler::first_stream(pages.into_iter().map(Ok));
        let packets: Vec<Packet> = assembler.by_ref().collect::<Result<_, _>>().unwrap();

        assert_eq!(sizes(&packets), vec![30, 264]);
        assert!(packets.iter().all(|p| p.serial == 0xA));
        assert_eq!(packets[1].first_page_sequence, 1);
        assert_eq!(assembler.serial(), Some(0xA));
    }

    #[test]
    fn test_default_assembler_mixes_streams() {
        let pages = vec![
            with_serial(page(0, 0, vec![255]), 0xA),
            with_serial(page(0, 0, vec![60]), 0xB),
        ];
        let packets = assemble(pages).unwrap();
        assert_eq!(sizes(&packets), vec![60]);
    }

    #[test]
    fn test_assemble_from_page_reader() {
        let mut bytes = encode(&page(0, 0, vec![255, 255]));
        bytes.extend(encode(&page(OGG_HEADER_TYPE_CONTINUATION | OGG_HEADER_TYPE_EOS, 1, vec![1])));
        let mut source = SliceSource::new(&bytes);

        let packets: Vec<Packet> = PacketAssembler::new(PageReader::new(&mut source))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(sizes(&packets), vec![511]);
    }
}
