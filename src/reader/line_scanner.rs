use super::bounded_reader::{decode_line, BoundedRangeReader};
use std::io::{self, Read, Seek, SeekFrom};

/// Default backward scan chunk (64 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Result of a backward scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackwardScan {
    /// Offset of the first byte of the earliest line found
    pub boundary: u64,
    /// True when the scan ran into byte 0
    pub reached_start: bool,
}

/// Locates line boundaries in a file without reading all of it.
///
/// Backward mode reads fixed-size chunks from an end offset toward byte 0
/// counting `\n` terminators; forward mode decodes the lines of a known
/// byte range. Neither mode knows about severities or view state.
#[derive(Debug, Clone, Copy)]
pub struct LineScanner {
    chunk_size: usize,
}

impl LineScanner {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Find the start of the `line_count`-th line ending at `end`.
    ///
    /// The byte at `end - 1` terminates the last line rather than opening a
    /// new one, so it is excluded from the count. Every other terminator at
    /// position `p` marks a line start at `p + 1`. When fewer than
    /// `line_count` terminators exist the boundary is 0.
    pub fn scan_backward<R: Read + Seek>(
        &self,
        source: &mut R,
        end: u64,
        line_count: usize,
    ) -> io::Result<BackwardScan> {
        if end == 0 {
            return Ok(BackwardScan {
                boundary: 0,
                reached_start: true,
            });
        }
        if line_count == 0 {
            return Ok(BackwardScan {
                boundary: end,
                reached_start: false,
            });
        }

        let mut hi = end - 1;
        let mut found = 0usize;
        let buf_len = usize::try_from(hi).map_or(self.chunk_size, |h| h.min(self.chunk_size));
        let mut buf = vec![0u8; buf_len];

        while hi > 0 {
            let len = hi.min(self.chunk_size as u64) as usize;
            let lo = hi - len as u64;
            let chunk = &mut buf[..len];

            source.seek(SeekFrom::Start(lo))?;
            source.read_exact(chunk)?;

            // Reverse order within the chunk; `found` carries across chunks
            for pos in memchr::memrchr_iter(b'\n', chunk) {
                found += 1;
                if found == line_count {
                    return Ok(BackwardScan {
                        boundary: lo + pos as u64 + 1,
                        reached_start: false,
                    });
                }
            }

            hi = lo;
        }

        Ok(BackwardScan {
            boundary: 0,
            reached_start: true,
        })
    }

    /// Offset just past the last terminator in `[start, end)`, or `start`
    /// when the range holds no complete line.
    pub fn complete_end<R: Read + Seek>(
        &self,
        source: &mut R,
        start: u64,
        end: u64,
    ) -> io::Result<u64> {
        let mut hi = end;
        let mut buf = vec![0u8; end.saturating_sub(start).min(self.chunk_size as u64) as usize];

        while hi > start {
            let len = (hi - start).min(self.chunk_size as u64) as usize;
            let lo = hi - len as u64;
            let chunk = &mut buf[..len];

            source.seek(SeekFrom::Start(lo))?;
            source.read_exact(chunk)?;

            if let Some(pos) = memchr::memrchr(b'\n', chunk) {
                return Ok(lo + pos as u64 + 1);
            }
            hi = lo;
        }

        Ok(start)
    }

    /// Decode every line in `[start, end)` in file order.
    ///
    /// A trailing fragment without a terminator is returned as the last line.
    /// Fails with `UnexpectedEof` if the source ends before `end`, so a file
    /// truncated mid-read never yields a silently shortened batch.
    pub fn decode_forward<R: Read + Seek>(
        &self,
        source: &mut R,
        start: u64,
        end: u64,
    ) -> io::Result<Vec<String>> {
        let mut reader = BoundedRangeReader::new(source, start, end)?;
        let mut lines = Vec::new();
        let mut buf = Vec::new();

        while reader.read_line_bytes(&mut buf)? > 0 {
            lines.push(decode_line(&buf));
        }

        if reader.remaining() > 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "source ended at byte {} before requested end {}",
                    reader.position(),
                    end
                ),
            ));
        }

        Ok(lines)
    }
}

impl Default for LineScanner {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const CHUNK_SIZES: [usize; 6] = [1, 2, 3, 7, 4096, 1024 * 1024];

    /// Reference: full linear split with read_line semantics
    fn naive_lines(data: &[u8]) -> Vec<String> {
        if data.is_empty() {
            return Vec::new();
        }
        let mut parts: Vec<&[u8]> = data.split(|&b| b == b'\n').collect();
        if data.ends_with(b"\n") {
            parts.pop();
        }
        parts
            .into_iter()
            .map(|p| {
                let p = p.strip_suffix(b"\r").unwrap_or(p);
                String::from_utf8_lossy(p).into_owned()
            })
            .collect()
    }

    fn tail(scanner: &LineScanner, data: &[u8], k: usize) -> (BackwardScan, Vec<String>) {
        let mut cursor = Cursor::new(data.to_vec());
        let end = data.len() as u64;
        let scan = scanner.scan_backward(&mut cursor, end, k).unwrap();
        let lines = scanner
            .decode_forward(&mut cursor, scan.boundary, end)
            .unwrap();
        (scan, lines)
    }

    /// Deterministic pseudo-random test content
    fn generated_file(seed: u64, lines: usize) -> Vec<u8> {
        let mut state = seed;
        let mut next = || {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 33) as usize
        };
        let mut out = Vec::new();
        for i in 0..lines {
            let len = next() % 40;
            if len % 9 == 0 {
                // Empty line
            } else {
                for j in 0..len {
                    out.push(b'a' + ((i + j) % 26) as u8);
                }
            }
            if next() % 5 == 0 {
                out.push(b'\r');
            }
            out.push(b'\n');
        }
        out
    }

    #[test]
    fn test_ten_line_scenario() {
        let data: Vec<u8> = (1..=10)
            .flat_map(|i| format!("L{:04}\n", i).into_bytes())
            .collect();
        let scanner = LineScanner::new(16);

        let (scan, lines) = tail(&scanner, &data, 3);
        assert_eq!(lines, vec!["L0008", "L0009", "L0010"]);
        assert_eq!(scan.boundary, 42);
        assert!(!scan.reached_start);
    }

    #[test]
    fn test_empty_source() {
        let scanner = LineScanner::default();
        let (scan, lines) = tail(&scanner, b"", 100);
        assert_eq!(scan.boundary, 0);
        assert!(scan.reached_start);
        assert!(lines.is_empty());
    }

    #[test]
    fn test_fewer_lines_than_requested() {
        let scanner = LineScanner::new(4);
        let (scan, lines) = tail(&scanner, b"a\nb\n", 10);
        assert!(scan.reached_start);
        assert_eq!(lines, vec!["a", "b"]);
    }

    #[test]
    fn test_leading_terminator_is_an_empty_line() {
        let scanner = LineScanner::new(2);
        let data = b"\nA\nB\n";

        let (scan, lines) = tail(&scanner, data, 2);
        assert_eq!(scan.boundary, 1);
        assert!(!scan.reached_start);
        assert_eq!(lines, vec!["A", "B"]);

        let (scan, lines) = tail(&scanner, data, 3);
        assert_eq!(scan.boundary, 0);
        assert!(scan.reached_start);
        assert_eq!(lines, vec!["", "A", "B"]);
    }

    #[test]
    fn test_single_terminator_file() {
        let scanner = LineScanner::new(1);
        let (scan, lines) = tail(&scanner, b"\n", 5);
        assert!(scan.reached_start);
        assert_eq!(lines, vec![""]);
    }

    #[test]
    fn test_no_trailing_terminator() {
        let scanner = LineScanner::new(3);
        let (scan, lines) = tail(&scanner, b"one\ntwo\nthree", 2);
        assert_eq!(scan.boundary, 4);
        assert_eq!(lines, vec!["two", "three"]);
    }

    #[test]
    fn test_zero_line_count_is_empty_window() {
        let scanner = LineScanner::default();
        let (scan, lines) = tail(&scanner, b"a\nb\n", 0);
        assert_eq!(scan.boundary, 4);
        assert!(lines.is_empty());
    }

    #[test]
    fn test_boundary_invariant_to_chunk_size() {
        for seed in 1..6u64 {
            let data = generated_file(seed, 300);
            let expected = naive_lines(&data);

            for k in [1, 2, 17, 150, 299, 300, 301, 1000] {
                let reference = LineScanner::new(DEFAULT_CHUNK_SIZE);
                let (ref_scan, _) = tail(&reference, &data, k);

                for chunk in CHUNK_SIZES {
                    let scanner = LineScanner::new(chunk);
                    let (scan, lines) = tail(&scanner, &data, k);
                    assert_eq!(scan, ref_scan, "seed {} k {} chunk {}", seed, k, chunk);

                    let want = &expected[expected.len().saturating_sub(k)..];
                    assert_eq!(lines, want, "seed {} k {} chunk {}", seed, k, chunk);
                }
            }
        }
    }

    #[test]
    fn test_paging_reassembles_whole_file() {
        let data = generated_file(42, 500);
        let expected = naive_lines(&data);

        for chunk in CHUNK_SIZES {
            let scanner = LineScanner::new(chunk);
            let mut cursor = Cursor::new(data.clone());
            let mut end = data.len() as u64;
            let mut pages: Vec<Vec<String>> = Vec::new();

            loop {
                let scan = scanner.scan_backward(&mut cursor, end, 37).unwrap();
                pages.push(scanner.decode_forward(&mut cursor, scan.boundary, end).unwrap());
                end = scan.boundary;
                if scan.reached_start {
                    break;
                }
            }

            let joined: Vec<String> = pages.into_iter().rev().flatten().collect();
            assert_eq!(joined, expected, "chunk {}", chunk);
        }
    }

    #[test]
    fn test_multibyte_utf8_across_chunk_seams() {
        let data = "日本語\n🎉🚀\nРусский\n".as_bytes();
        for chunk in CHUNK_SIZES {
            let scanner = LineScanner::new(chunk);
            let (_, lines) = tail(&scanner, data, 2);
            assert_eq!(lines, vec!["🎉🚀", "Русский"]);
        }
    }

    #[test]
    fn test_decode_forward_detects_short_source() {
        let scanner = LineScanner::default();
        let mut cursor = Cursor::new(b"abc\n".to_vec());
        let err = scanner.decode_forward(&mut cursor, 0, 10).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_scan_backward_detects_short_source() {
        let scanner = LineScanner::new(4);
        let mut cursor = Cursor::new(b"abc\n".to_vec());
        // Claimed end is past the real data
        let err = scanner.scan_backward(&mut cursor, 20, 3).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_complete_end_stops_after_last_terminator() {
        let data = b"one\ntwo\nthr";
        for chunk in CHUNK_SIZES {
            let scanner = LineScanner::new(chunk);
            let mut cursor = Cursor::new(data.to_vec());
            assert_eq!(scanner.complete_end(&mut cursor, 0, 11).unwrap(), 8);
            assert_eq!(scanner.complete_end(&mut cursor, 4, 8).unwrap(), 8);
            assert_eq!(scanner.complete_end(&mut cursor, 8, 11).unwrap(), 8);
            assert_eq!(scanner.complete_end(&mut cursor, 5, 5).unwrap(), 5);
            assert_eq!(scanner.complete_end(&mut cursor, 0, 3).unwrap(), 0);
        }
    }
}
