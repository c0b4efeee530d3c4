// Signature search across buffer refills

use crate::error::StreamError;
use crate::stream::ByteSource;

/// Result of a signature search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Bytes skipped before the pattern, or every byte consumed when the
    /// pattern was not found.
    pub skipped: u64,
    pub found: bool,
}

/// Advances a [`ByteSource`] past the first occurrence of a fixed pattern.
///
/// The number of pattern bytes already matched (`run`) survives a refill, so
/// a signature split across two buffer windows is still found. After a
/// mismatch the match restarts naively against the pattern itself: the
/// bytes matched so far equal `pattern[..run]`, so no history is kept.
#[derive(Debug, Clone)]
pub struct PatternSynchronizer<'p> {
    pattern: &'p [u8],
    run: usize,
}

impl<'p> PatternSynchronizer<'p> {
    /// `pattern` must be non-empty.
    pub fn new(pattern: &'p [u8]) -> Self {
        assert!(!pattern.is_empty(), "sync pattern must be non-empty");
        PatternSynchronizer { pattern, run: 0 }
    }

    pub fn pattern(&self) -> &'p [u8] {
        self.pattern
    }

    /// Leaves the source right after the pattern, or exhausted.
    pub fn sync<S: ByteSource + ?Sized>(&mut self, source: &mut S) -> Result<SyncOutcome, StreamError> {
        self.run = 0;
        let mut consumed = 0u64;
        loop {
            let window = source.fill_buf()?;
            if window.is_empty() {
                self.run = 0;
                return Ok(SyncOutcome {
                    skipped: consumed,
                    found: false,
                });
            }

            let (used, found) = self.scan(window);
            source.consume(used);
            consumed += used as u64;

            if found {
                self.run = 0;
                return Ok(SyncOutcome {
                    skipped: consumed - self.pattern.len() as u64,
                    found: true,
                });
            }
        }
    }

    /// Feeds one window; returns bytes used and whether the match completed.
    fn scan(&mut self, window: &[u8]) -> (usize, bool) {
        let first = self.pattern[0];
        let mut i = 0;
        while i < window.len() {
            if self.run == 0 {
                match window[i..].iter().position(|&b| b == first) {
                    Some(offset) => i += offset,
                    None => return (window.len(), false),
                }
            }
            self.run = self.step(window[i]);
            i += 1;
            if self.run == self.pattern.len() {
                return (i, true);
            }
        }
        // Window ran out mid-match: `run` carries into the next refill.
        (window.len(), false)
    }

    fn step(&self, byte: u8) -> usize {
        let mut run = self.run;
        loop {
            if self.pattern[run] == byte {
                return run + 1;
            }
            if run == 0 {
                return 0;
            }
            run = self.restart(run);
        }
    }

    /// Naive rescan of the bytes matched so far, which are `pattern[..run]`:
    /// retrying each later start position in them and keeping the earliest
    /// that still matches gives the longest proper suffix that is also a
    /// prefix. No skip table is built.
    fn restart(&self, run: usize) -> usize {
        let matched = &self.pattern[..run];
        (1..run)
            .rev()
            .find(|&k| matched[run - k..] == self.pattern[..k])
            .unwrap_or(0)
    }
}

/// Searches for `pattern` and returns the number of bytes skipped before it.
///
/// Fails with [`StreamError::PatternNotFound`] when the source runs out.
pub fn sync_to<S: ByteSource + ?Sized>(source: &mut S, pattern: &[u8]) -> Result<u64, StreamError> {
    let outcome = PatternSynchronizer::new(pattern).sync(source)?;
    if !outcome.found {
        return Err(StreamError::PatternNotFound {
            pattern: pattern.to_vec(),
            consumed: outcome.skipped,
        });
    }
    if outcome.skipped > 0 {
        log::debug!("skipped {} bytes before {:?}", outcome.skipped, String::from_utf8_lossy(pattern));
    }
    Ok(outcome.skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{BufferedSource, SeekableSource, SliceSource};
    use rstest::rstest;
    use std::io::Cursor;

    const PATTERN: &[u8] = b"OggS";

    fn filler(len: usize) -> Vec<u8> {
        // Never contains 'O', so the pattern occurs only where placed.
        (0..len).map(|i| b'a' + (i % 20) as u8).collect()
    }

    #[rstest]
    #[case(0, 1234)]
    #[case(1000, 1234)]
    #[case(1230, 1234)]
    #[case(1000, 6000)]
    #[case(4090, 6000)]
    #[case(4093, 6000)]
    #[case(4094, 6000)]
    #[case(5000, 6000)]
    #[case(5996, 6000)]
    fn test_pattern_found_across_refills(#[case] pos: usize, #[case] len: usize) {
        let mut data = filler(len);
        data[pos..pos + PATTERN.len()].copy_from_slice(PATTERN);
        let mut source = BufferedSource::new(Cursor::new(data));

        let outcome = PatternSynchronizer::new(PATTERN).sync(&mut source).unwrap();
        assert_eq!(
            outcome,
            SyncOutcome {
                skipped: pos as u64,
                found: true
            }
        );
        assert_eq!(source.tell().unwrap(), (pos + PATTERN.len()) as u64);
    }

    #[test]
    fn test_pattern_is_entire_source() {
        let mut source = SliceSource::new(PATTERN);
        assert_eq!(sync_to(&mut source, PATTERN).unwrap(), 0);
        assert!(source.is_exhausted().unwrap());
    }

    #[test]
    fn test_empty_source() {
        let mut source = SliceSource::new(&[]);
        let outcome = PatternSynchronizer::new(PATTERN).sync(&mut source).unwrap();
        assert_eq!(
            outcome,
            SyncOutcome {
                skipped: 0,
                found: false
            }
        );
    }

    #[test]
    fn test_not_found_consumes_everything() {
        let data = b"xxOggxxOg";
        let mut source = SliceSource::new(data);
        let err = sync_to(&mut source, PATTERN).unwrap_err();
        assert!(matches!(err, StreamError::PatternNotFound { consumed: 9, .. }));
        assert!(source.is_exhausted().unwrap());
    }

    #[test]
    fn test_false_partial_match_restarts() {
        // "OOggS": the first 'O' starts a run that fails on the second 'O'.
        let data = b"OOggS-tail";
        let mut source = SliceSource::new(data);
        assert_eq!(sync_to(&mut source, PATTERN).unwrap(), 1);
        assert_eq!(source.rest(), b"-tail");
    }

    #[test]
    fn test_self_overlapping_pattern_split_by_refill() {
        // Pattern "abab" in "abaabab" starts at 3; a 4-byte buffer splits it.
        let data = b"abaabab".to_vec();
        let mut source = BufferedSource::with_capacity(4, Cursor::new(data));
        let outcome = PatternSynchronizer::new(b"abab").sync(&mut source).unwrap();
        assert_eq!(outcome.skipped, 3);
        assert!(outcome.found);
        assert!(source.is_exhausted().unwrap());
    }

    #[test]
    fn test_restart_keeps_overlapping_prefix() {
        // The third 'a' mismatches "aab" but is a valid second byte.
        let data = b"aaab";
        let mut source = SliceSource::new(data);
        assert_eq!(sync_to(&mut source, b"aab").unwrap(), 1);
    }
}
