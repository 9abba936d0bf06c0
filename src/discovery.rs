//! Log file discovery and per-file severity counts.
//!
//! This module handles:
//! - Listing the log files of a folder with size metadata
//! - Counting warnings/errors once per file, then only over appended bytes
//! - Applying directory watcher events to a listing

use crate::dir_watcher::{has_extension, DirEvent};
use crate::error::{TailError, TailResult};
use crate::reader::BoundedRangeReader;
use crate::severity::{LineClassifier, SeverityCounts};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

/// A discovered log file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFile {
    /// Display name (file name)
    pub name: String,
    /// Full path to the log file
    pub path: PathBuf,
    /// File length when last examined
    pub length: u64,
    /// Warning/error totals over all terminated lines seen so far
    pub counts: SeverityCounts,
    /// Offset just past the last counted line terminator
    counted_offset: u64,
}

impl LogFile {
    /// Examine `path` and count severities over its whole contents.
    pub fn scan(path: &Path, classifier: &LineClassifier) -> TailResult<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let mut log_file = Self {
            name,
            path: path.to_path_buf(),
            length: 0,
            counts: SeverityCounts::default(),
            counted_offset: 0,
        };
        log_file.refresh(classifier)?;
        Ok(log_file)
    }

    /// Re-stat the file and fold in severities of newly terminated lines.
    ///
    /// A file shorter than what was counted has been rotated and is recounted
    /// from scratch. Returns whether the length or counts changed.
    pub fn refresh(&mut self, classifier: &LineClassifier) -> TailResult<bool> {
        let file = File::open(&self.path).map_err(|e| TailError::from_io(&self.path, e))?;
        let length = file
            .metadata()
            .map_err(|e| TailError::from_io(&self.path, e))?
            .len();

        let (mut counts, mut start) = (self.counts, self.counted_offset);
        if length < self.counted_offset {
            log::debug!("{} shrank, recounting severities", self.path.display());
            counts = SeverityCounts::default();
            start = 0;
        }

        let (added, counted_offset) = count_range(file, start, length, classifier)
            .map_err(|e| TailError::from_io(&self.path, e))?;
        counts += added;

        let changed = length != self.length || counts != self.counts;
        self.length = length;
        self.counts = counts;
        self.counted_offset = counted_offset;
        Ok(changed)
    }
}

/// Count severities of the terminated lines in `[start, end)`.
///
/// Returns the counts and the offset just past the last terminator, so an
/// unterminated trailing fragment is counted once it is complete.
fn count_range(
    file: File,
    start: u64,
    end: u64,
    classifier: &LineClassifier,
) -> io::Result<(SeverityCounts, u64)> {
    let mut reader = BoundedRangeReader::new(file, start, end)?;
    let mut counts = SeverityCounts::default();
    let mut counted = start;
    let mut buf = Vec::new();

    while reader.read_line_bytes(&mut buf)? > 0 {
        if buf.last() != Some(&b'\n') {
            break;
        }
        counts.record(classifier.classify_bytes(&buf));
        counted = reader.position();
    }

    Ok((counts, counted))
}

/// List the files in `dir` with the given extension, sorted by name.
///
/// Files that vanish between listing and counting are skipped.
pub fn discover_log_files(
    dir: &Path,
    extension: &str,
    classifier: &LineClassifier,
) -> TailResult<Vec<LogFile>> {
    let entries = fs::read_dir(dir).map_err(|e| TailError::from_io(dir, e))?;
    let mut files = Vec::new();

    for entry in entries {
        let path = entry.map_err(|e| TailError::from_io(dir, e))?.path();
        if !path.is_file() || !has_extension(&path, extension) {
            continue;
        }

        match LogFile::scan(&path, classifier) {
            Ok(file) => files.push(file),
            Err(TailError::NotFound { .. }) => {
                log::debug!("{} disappeared during discovery", path.display());
            }
            Err(e) => return Err(e),
        }
    }

    // Sort by name for consistent ordering
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Apply a watcher event to a listing. Returns whether the listing changed.
pub fn reconcile(
    files: &mut Vec<LogFile>,
    event: &DirEvent,
    classifier: &LineClassifier,
) -> TailResult<bool> {
    let position = files.iter().position(|f| f.path == event.path());

    match (event, position) {
        (DirEvent::Removed(_), Some(idx)) => {
            files.remove(idx);
            Ok(true)
        }
        (DirEvent::Removed(_), None) => Ok(false),
        (DirEvent::Added(path) | DirEvent::Modified(path), None) => {
            match LogFile::scan(path, classifier) {
                Ok(file) => {
                    let idx = files.partition_point(|f| f.name < file.name);
                    files.insert(idx, file);
                    Ok(true)
                }
                Err(TailError::NotFound { .. }) => Ok(false),
                Err(e) => Err(e),
            }
        }
        (DirEvent::Added(_) | DirEvent::Modified(_), Some(idx)) => {
            match files[idx].refresh(classifier) {
                Ok(changed) => Ok(changed),
                Err(TailError::NotFound { .. }) => {
                    files.remove(idx);
                    Ok(true)
                }
                Err(e) => Err(e),
            }
        }
    }
}
