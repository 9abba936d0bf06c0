//! Config types for synctail.
//!
//! Raw (as parsed from YAML) and validated forms of the tailing settings.

use crate::reader::{LineScanner, DEFAULT_CHUNK_SIZE};
use crate::severity::{LineClassifier, DEFAULT_ERROR_MARKER, DEFAULT_WARNING_MARKER};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Default number of lines shown when a file is opened.
pub const DEFAULT_INITIAL_LINES: usize = 500;

/// Default number of lines revealed per backward page.
pub const DEFAULT_PAGE_LINES: usize = 500;

/// Default live-tail poll interval.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Default extension of log files in a watched folder.
pub const DEFAULT_LOG_EXTENSION: &str = "log";

/// Field names accepted in a config file (used for typo suggestions).
pub const KNOWN_FIELDS: &[&str] = &[
    "error_marker",
    "warning_marker",
    "chunk_size",
    "initial_lines",
    "page_lines",
    "poll_interval_ms",
    "log_extension",
    "log_dir",
];

/// Raw config file structure (used for parsing).
///
/// Mirrors the YAML file. Unknown fields are rejected with an error.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    pub error_marker: Option<String>,
    pub warning_marker: Option<String>,
    pub chunk_size: Option<usize>,
    pub initial_lines: Option<usize>,
    pub page_lines: Option<usize>,
    pub poll_interval_ms: Option<u64>,
    pub log_extension: Option<String>,
    /// Folder listed when no directory is given (may contain tilde).
    pub log_dir: Option<PathBuf>,
}

/// Validated settings passed explicitly into scanners, sessions and views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailConfig {
    /// Substring marking an error line.
    pub error_marker: String,
    /// Substring marking a warning line.
    pub warning_marker: String,
    /// Bytes read per backward scan step.
    pub chunk_size: usize,
    /// Lines loaded when a file is opened.
    pub initial_lines: usize,
    /// Lines revealed per "load older" request.
    pub page_lines: usize,
    /// Interval between live-tail polls.
    pub poll_interval_ms: u64,
    /// Extension (without dot) of files picked up by discovery.
    pub log_extension: String,
    /// Expanded default folder for listing.
    pub log_dir: Option<PathBuf>,
}

impl TailConfig {
    pub fn scanner(&self) -> LineScanner {
        LineScanner::new(self.chunk_size)
    }

    pub fn classifier(&self) -> LineClassifier {
        LineClassifier::new(self.error_marker.clone(), self.warning_marker.clone())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            error_marker: DEFAULT_ERROR_MARKER.to_string(),
            warning_marker: DEFAULT_WARNING_MARKER.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            initial_lines: DEFAULT_INITIAL_LINES,
            page_lines: DEFAULT_PAGE_LINES,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            log_extension: DEFAULT_LOG_EXTENSION.to_string(),
            log_dir: None,
        }
    }
}
