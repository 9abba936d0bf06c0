use super::bounded_reader::BoundedRangeReader;
use super::line_scanner::LineScanner;
use crate::config::TailConfig;
use crate::error::{TailError, TailResult};
use crate::severity::{LineClassifier, LogLine};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// Paging state of an open session.
///
/// Holds `start_offset <= consumed_offset <= file length` as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Byte offset of the first loaded line
    pub start_offset: u64,
    /// Byte offset up to which content has been read
    pub consumed_offset: u64,
    /// True once backward paging has exposed byte 0
    pub reached_start: bool,
}

/// Result of polling for appended content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Lines appended since the last poll, oldest first (possibly none)
    Lines(Vec<LogLine>),
    /// The file shrank below what was consumed (truncation or rotation).
    /// The consumed offset has been clamped to `length`; callers usually
    /// reload the tail.
    Reset { previous: u64, length: u64 },
}

impl PollOutcome {
    pub fn lines(&self) -> &[LogLine] {
        match self {
            PollOutcome::Lines(lines) => lines,
            PollOutcome::Reset { .. } => &[],
        }
    }

    pub fn is_reset(&self) -> bool {
        matches!(self, PollOutcome::Reset { .. })
    }
}

/// Pagination and live-tail driver for one file.
///
/// Memory stays bounded by the batches returned; the session itself only
/// keeps three offsets. The file is reopened read-only for every call so an
/// external writer can keep appending and a rotated file is picked up by
/// path. Every operation computes its result before touching the window, so
/// a failed call leaves the session exactly as it was.
pub struct TailSession {
    path: PathBuf,
    scanner: LineScanner,
    classifier: LineClassifier,
    window: Option<Window>,
}

impl TailSession {
    pub fn new<P: AsRef<Path>>(path: P, scanner: LineScanner, classifier: LineClassifier) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            scanner,
            classifier,
            window: None,
        }
    }

    /// Build a session using the chunk size and markers from `config`.
    pub fn with_config<P: AsRef<Path>>(path: P, config: &TailConfig) -> Self {
        Self::new(path, config.scanner(), config.classifier())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn window(&self) -> Option<Window> {
        self.window
    }

    pub fn is_open(&self) -> bool {
        self.window.is_some()
    }

    pub fn reached_start(&self) -> bool {
        self.window.map_or(false, |w| w.reached_start)
    }

    /// Load the last `line_count` lines and anchor paging at their start.
    pub fn open_tail(&mut self, line_count: usize) -> TailResult<Vec<LogLine>> {
        let mut file = self.open_file()?;
        let end = self.file_length(&file)?;

        let scan = self
            .scanner
            .scan_backward(&mut file, end, line_count)
            .map_err(|e| TailError::from_io(&self.path, e))?;
        let lines = self.decode(&mut file, scan.boundary, end)?;

        self.commit(Window {
            start_offset: scan.boundary,
            consumed_offset: end,
            reached_start: scan.boundary == 0,
        });
        log::debug!(
            "opened tail of {}: {} lines from byte {} to {}",
            self.path.display(),
            lines.len(),
            scan.boundary,
            end
        );

        Ok(lines)
    }

    /// Reveal up to `line_count` lines before the current window.
    ///
    /// Returns them oldest first for prepending. Returns nothing when the
    /// session is not open or the start of the file was already reached.
    pub fn load_older(&mut self, line_count: usize) -> TailResult<Vec<LogLine>> {
        let window = match self.window {
            Some(w) if !w.reached_start => w,
            _ => return Ok(Vec::new()),
        };

        let mut file = self.open_file()?;
        let length = self.file_length(&file)?;
        if length < window.consumed_offset {
            // Older bytes may belong to a different file now
            return Err(TailError::Truncated {
                path: self.path.clone(),
                consumed: window.consumed_offset,
                length,
            });
        }

        let scan = self
            .scanner
            .scan_backward(&mut file, window.start_offset, line_count)
            .map_err(|e| TailError::from_io(&self.path, e))?;
        let lines = self.decode(&mut file, scan.boundary, window.start_offset)?;

        self.commit(Window {
            start_offset: scan.boundary,
            reached_start: scan.boundary == 0,
            ..window
        });
        log::debug!(
            "loaded {} older lines of {}: window now starts at byte {}",
            lines.len(),
            self.path.display(),
            scan.boundary
        );

        Ok(lines)
    }

    /// Read the complete lines appended since the last read.
    ///
    /// A trailing fragment without a terminator stays unread until the writer
    /// finishes it, so a line is never split across two polls.
    pub fn poll_new_lines(&mut self) -> TailResult<PollOutcome> {
        let Some(window) = self.window else {
            return Ok(PollOutcome::Lines(Vec::new()));
        };

        let mut file = self.open_file()?;
        let length = self.file_length(&file)?;

        if length < window.consumed_offset {
            log::warn!(
                "{} shrank from {} to {} bytes; treating as rotation",
                self.path.display(),
                window.consumed_offset,
                length
            );
            // Old offsets mean nothing in the new content; restart at its end
            let end = self
                .scanner
                .complete_end(&mut file, 0, length)
                .map_err(|e| TailError::from_io(&self.path, e))?;
            self.commit(Window {
                start_offset: end,
                consumed_offset: end,
                reached_start: end == 0,
            });
            return Ok(PollOutcome::Reset {
                previous: window.consumed_offset,
                length,
            });
        }

        let end = self
            .scanner
            .complete_end(&mut file, window.consumed_offset, length)
            .map_err(|e| TailError::from_io(&self.path, e))?;
        if end == window.consumed_offset {
            return Ok(PollOutcome::Lines(Vec::new()));
        }

        let lines = self.decode(&mut file, window.consumed_offset, end)?;
        self.commit(Window {
            consumed_offset: end,
            ..window
        });
        log::debug!(
            "polled {} new lines of {} up to byte {}",
            lines.len(),
            self.path.display(),
            end
        );

        Ok(PollOutcome::Lines(lines))
    }

    /// Read the whole file front to back, keeping only lines matching `keep`.
    ///
    /// Lines are classified and dropped as they stream past, so memory grows
    /// with the kept lines only. The window then covers the entire file:
    /// there is nothing older to page and polling resumes from the end.
    pub fn open_filtered<F>(&mut self, keep: F) -> TailResult<Vec<LogLine>>
    where
        F: Fn(&LogLine) -> bool,
    {
        let mut file = self.open_file()?;
        let end = self.file_length(&file)?;

        let io_err = |e: io::Error| TailError::from_io(&self.path, e);
        let mut decoded = BoundedRangeReader::new(&mut file, 0, end)
            .map_err(io_err)?
            .decoded_lines();
        let mut lines = Vec::new();
        let mut scanned = 0usize;
        for text in decoded.by_ref() {
            let line = self.classifier.line(text.map_err(io_err)?);
            scanned += 1;
            if keep(&line) {
                lines.push(line);
            }
        }
        if decoded.remaining() > 0 {
            return Err(io_err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("file ended before byte {}", end),
            )));
        }

        self.commit(Window {
            start_offset: 0,
            consumed_offset: end,
            reached_start: true,
        });
        log::debug!(
            "filtered scan of {} kept {} of {} lines ({} bytes)",
            self.path.display(),
            lines.len(),
            scanned,
            end
        );

        Ok(lines)
    }

    fn open_file(&self) -> TailResult<File> {
        File::open(&self.path).map_err(|e| TailError::from_io(&self.path, e))
    }

    fn file_length(&self, file: &File) -> TailResult<u64> {
        file.metadata()
            .map(|m| m.len())
            .map_err(|e| TailError::from_io(&self.path, e))
    }

    fn decode(&self, file: &mut File, start: u64, end: u64) -> TailResult<Vec<LogLine>> {
        if start > end {
            return Err(TailError::InvalidRange { start, end });
        }

        let raw = self
            .scanner
            .decode_forward(file, start, end)
            .map_err(|e| TailError::from_io(&self.path, e))?;

        Ok(raw.into_iter().map(|text| self.classifier.line(text)).collect())
    }

    fn commit(&mut self, window: Window) {
        debug_assert!(
            window.start_offset <= window.consumed_offset,
            "start offset {} past consumed offset {}",
            window.start_offset,
            window.consumed_offset
        );
        self.window = Some(window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::severity::Severity;
    use anyhow::Result;
    use std::fs::{self, OpenOptions};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn texts(lines: &[LogLine]) -> Vec<&str> {
        lines.iter().map(|l| l.text.as_str()).collect()
    }

    fn session(path: &Path, chunk_size: usize) -> TailSession {
        TailSession::new(path, LineScanner::new(chunk_size), LineClassifier::default())
    }

    fn ten_line_file() -> Result<NamedTempFile> {
        let mut temp_file = NamedTempFile::new()?;
        for i in 1..=10 {
            // 5 bytes + terminator
            writeln!(temp_file, "L{:04}", i)?;
        }
        temp_file.flush()?;
        Ok(temp_file)
    }

    fn append(path: &Path, text: &str) -> Result<()> {
        let mut file = OpenOptions::new().append(true).open(path)?;
        file.write_all(text.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    #[test]
    fn test_open_tail_and_page_back() -> Result<()> {
        let temp_file = ten_line_file()?;
        let mut session = session(temp_file.path(), 8);

        let lines = session.open_tail(3)?;
        assert_eq!(texts(&lines), vec!["L0008", "L0009", "L0010"]);
        assert!(!session.reached_start());
        assert_eq!(session.window().unwrap().start_offset, 42);

        let lines = session.load_older(3)?;
        assert_eq!(texts(&lines), vec!["L0005", "L0006", "L0007"]);
        assert!(!session.reached_start());

        let lines = session.load_older(10)?;
        assert_eq!(texts(&lines), vec!["L0001", "L0002", "L0003", "L0004"]);
        assert!(session.reached_start());
        assert_eq!(session.window().unwrap().start_offset, 0);

        assert!(session.load_older(10)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_empty_file() -> Result<()> {
        let temp_file = NamedTempFile::new()?;
        let mut session = session(temp_file.path(), 1024);

        assert!(session.open_tail(100)?.is_empty());
        assert!(session.reached_start());
        assert!(session.load_older(100)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let mut session = session(Path::new("/path/that/does/not/exist/sync.log"), 1024);
        let err = session.open_tail(10).unwrap_err();
        assert!(matches!(err, TailError::NotFound { .. }));
        assert!(!session.is_open());
    }

    #[test]
    fn test_operations_before_open_are_noops() -> Result<()> {
        let temp_file = ten_line_file()?;
        let mut session = session(temp_file.path(), 1024);

        assert!(session.load_older(5)?.is_empty());
        assert_eq!(session.poll_new_lines()?, PollOutcome::Lines(Vec::new()));
        assert!(!session.is_open());
        Ok(())
    }

    #[test]
    fn test_poll_is_idempotent_without_writes() -> Result<()> {
        let temp_file = ten_line_file()?;
        let mut session = session(temp_file.path(), 1024);
        session.open_tail(2)?;
        let before = session.window();

        assert!(session.poll_new_lines()?.lines().is_empty());
        assert!(session.poll_new_lines()?.lines().is_empty());
        assert_eq!(session.window(), before);
        Ok(())
    }

    #[test]
    fn test_polling_is_gap_free() -> Result<()> {
        let temp_file = ten_line_file()?;
        let path = temp_file.path().to_path_buf();
        let mut session = session(&path, 4);

        let initial = session.open_tail(2)?;
        append(&path, "N1\nN2\n")?;
        let first = session.poll_new_lines()?;
        append(&path, "N3\nN4\nN5\n")?;
        let second = session.poll_new_lines()?;

        let mut all = texts(&initial);
        all.extend(texts(first.lines()));
        all.extend(texts(second.lines()));
        assert_eq!(
            all,
            vec!["L0009", "L0010", "N1", "N2", "N3", "N4", "N5"]
        );
        assert_eq!(
            session.window().unwrap().consumed_offset,
            fs::metadata(&path)?.len()
        );
        Ok(())
    }

    #[test]
    fn test_truncation_resets_consumed_offset() -> Result<()> {
        let temp_file = ten_line_file()?;
        let path = temp_file.path().to_path_buf();
        let mut session = session(&path, 1024);
        session.open_tail(3)?;

        fs::write(&path, "R1\n")?;
        let outcome = session.poll_new_lines()?;
        assert_eq!(
            outcome,
            PollOutcome::Reset {
                previous: 60,
                length: 3
            }
        );
        let window = session.window().unwrap();
        assert_eq!(window.consumed_offset, 3);
        assert_eq!(window.start_offset, 3);
        assert!(!window.reached_start);

        // Growth after the reset continues from the clamped offset
        append(&path, "R2\n")?;
        assert_eq!(texts(session.poll_new_lines()?.lines()), vec!["R2"]);
        Ok(())
    }

    #[test]
    fn test_load_older_after_truncation_reports_it() -> Result<()> {
        let temp_file = ten_line_file()?;
        let path = temp_file.path().to_path_buf();
        let mut session = session(&path, 1024);
        session.open_tail(3)?;
        let before = session.window();

        fs::write(&path, "short\n")?;
        let err = session.load_older(3).unwrap_err();
        assert!(matches!(err, TailError::Truncated { consumed: 60, .. }));
        assert_eq!(session.window(), before);
        Ok(())
    }

    #[test]
    fn test_failed_call_leaves_state_unchanged() -> Result<()> {
        let temp_file = ten_line_file()?;
        let path = temp_file.path().to_path_buf();
        let mut session = session(&path, 1024);
        session.open_tail(3)?;
        let before = session.window();

        drop(temp_file); // removes the file
        assert!(matches!(
            session.load_older(3),
            Err(TailError::NotFound { .. })
        ));
        assert!(matches!(
            session.poll_new_lines(),
            Err(TailError::NotFound { .. })
        ));
        assert_eq!(session.window(), before);
        Ok(())
    }

    #[test]
    fn test_lines_are_classified() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, "10:00 [INF] start")?;
        writeln!(temp_file, "10:01 [WRN] slow feed")?;
        writeln!(temp_file, "10:02 [ERR] upsert failed")?;
        temp_file.flush()?;

        let mut session = session(temp_file.path(), 1024);
        let severities: Vec<Severity> = session
            .open_tail(10)?
            .iter()
            .map(|l| l.severity)
            .collect();
        assert_eq!(
            severities,
            vec![Severity::Info, Severity::Warning, Severity::Error]
        );
        Ok(())
    }

    #[test]
    fn test_open_filtered_reads_whole_file() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, "[ERR] first")?;
        for i in 0..50 {
            writeln!(temp_file, "[INF] filler {}", i)?;
        }
        writeln!(temp_file, "[WRN] last")?;
        temp_file.flush()?;
        let path = temp_file.path().to_path_buf();

        let mut session = session(&path, 16);
        session.open_tail(5)?;
        let lines = session.open_filtered(|l| l.is_notable())?;
        assert_eq!(texts(&lines), vec!["[ERR] first", "[WRN] last"]);
        assert!(session.reached_start());
        assert!(session.load_older(10)?.is_empty());

        append(&path, "[INF] after\n")?;
        assert_eq!(texts(session.poll_new_lines()?.lines()), vec!["[INF] after"]);
        Ok(())
    }

    #[test]
    fn test_reopen_after_reset_shows_new_tail() -> Result<()> {
        let temp_file = ten_line_file()?;
        let path = temp_file.path().to_path_buf();
        let mut session = session(&path, 1024);
        session.open_tail(3)?;

        fs::write(&path, "A\nB\n")?;
        assert!(session.poll_new_lines()?.is_reset());
        assert_eq!(texts(&session.open_tail(3)?), vec!["A", "B"]);
        assert!(session.reached_start());
        Ok(())
    }

    #[test]
    fn test_paging_after_reset_walks_back_from_new_end() -> Result<()> {
        let temp_file = ten_line_file()?;
        let path = temp_file.path().to_path_buf();
        let mut session = session(&path, 8);
        session.open_tail(3)?;
        assert_eq!(session.window().unwrap().start_offset, 42);

        // Rotated to shorter lines; the old start offset would land mid-line
        let rotated: String = ('A'..='J').map(|c| format!("{}\n", c.to_string().repeat(4))).collect();
        fs::write(&path, &rotated)?;
        assert_eq!(
            session.poll_new_lines()?,
            PollOutcome::Reset {
                previous: 60,
                length: 50
            }
        );

        let older = session.load_older(100)?;
        assert_eq!(
            texts(&older),
            vec!["AAAA", "BBBB", "CCCC", "DDDD", "EEEE", "FFFF", "GGGG", "HHHH", "IIII", "JJJJ"]
        );
        assert!(session.reached_start());

        append(&path, "KKKK\n")?;
        assert_eq!(texts(session.poll_new_lines()?.lines()), vec!["KKKK"]);
        Ok(())
    }

    #[test]
    fn test_reset_leaves_unfinished_line_for_polling() -> Result<()> {
        let temp_file = ten_line_file()?;
        let path = temp_file.path().to_path_buf();
        let mut session = session(&path, 1024);
        session.open_tail(3)?;

        fs::write(&path, "A\nB\npart")?;
        assert!(session.poll_new_lines()?.is_reset());
        assert_eq!(session.window().unwrap().consumed_offset, 4);

        assert_eq!(texts(&session.load_older(10)?), vec!["A", "B"]);
        append(&path, "ial\n")?;
        assert_eq!(texts(session.poll_new_lines()?.lines()), vec!["partial"]);
        Ok(())
    }

    #[test]
    fn test_poll_waits_for_line_terminator() -> Result<()> {
        let temp_file = ten_line_file()?;
        let path = temp_file.path().to_path_buf();
        let mut session = session(&path, 4);
        session.open_tail(1)?;
        let before = session.window();

        append(&path, "[ER")?;
        assert!(session.poll_new_lines()?.lines().is_empty());
        assert_eq!(session.window(), before);

        append(&path, "R] feed down\n[INF] next")?;
        let outcome = session.poll_new_lines()?;
        assert_eq!(texts(outcome.lines()), vec!["[ERR] feed down"]);
        assert_eq!(outcome.lines()[0].severity, Severity::Error);

        append(&path, "\n")?;
        assert_eq!(texts(session.poll_new_lines()?.lines()), vec!["[INF] next"]);
        assert_eq!(
            session.window().unwrap().consumed_offset,
            fs::metadata(&path)?.len()
        );
        Ok(())
    }

    #[test]
    fn test_open_filtered_keeps_only_matches() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        for i in 0..1000 {
            if i % 250 == 0 {
                writeln!(temp_file, "[ERR] batch {}", i)?;
            } else {
                writeln!(temp_file, "[INF] row {}", i)?;
            }
        }
        write!(temp_file, "[WRN] no terminator")?;
        temp_file.flush()?;

        let mut session = session(temp_file.path(), 64);
        let seen = std::cell::Cell::new(0);
        let lines = session.open_filtered(|l| {
            seen.set(seen.get() + 1);
            l.is_notable()
        })?;

        assert_eq!(seen.get(), 1001);
        assert_eq!(
            texts(&lines),
            vec![
                "[ERR] batch 0",
                "[ERR] batch 250",
                "[ERR] batch 500",
                "[ERR] batch 750",
                "[WRN] no terminator"
            ]
        );
        Ok(())
    }
}
