//! Line severity classification by marker substrings.

use memchr::memmem;
use std::ops::AddAssign;

/// Default marker for error lines (three-letter level tag).
pub const DEFAULT_ERROR_MARKER: &str = "ERR";

/// Default marker for warning lines.
pub const DEFAULT_WARNING_MARKER: &str = "WRN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    /// Warnings and errors; the lines kept by the errors-only view.
    pub fn is_notable(self) -> bool {
        matches!(self, Severity::Warning | Severity::Error)
    }
}

/// A decoded line and its severity. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub severity: Severity,
    pub text: String,
}

impl LogLine {
    pub fn is_notable(&self) -> bool {
        self.severity.is_notable()
    }
}

/// Maps raw line text to a [`Severity`].
///
/// Matching is a case-sensitive byte search; the error marker takes priority
/// over the warning marker. A message body that happens to contain a marker
/// is classified by it as well.
#[derive(Debug, Clone)]
pub struct LineClassifier {
    error_marker: String,
    warning_marker: String,
}

impl LineClassifier {
    pub fn new(error_marker: impl Into<String>, warning_marker: impl Into<String>) -> Self {
        Self {
            error_marker: error_marker.into(),
            warning_marker: warning_marker.into(),
        }
    }

    pub fn classify(&self, line: &str) -> Severity {
        self.classify_bytes(line.as_bytes())
    }

    /// Classify raw bytes without UTF-8 validation.
    pub fn classify_bytes(&self, bytes: &[u8]) -> Severity {
        if memmem::find(bytes, self.error_marker.as_bytes()).is_some() {
            Severity::Error
        } else if memmem::find(bytes, self.warning_marker.as_bytes()).is_some() {
            Severity::Warning
        } else {
            Severity::Info
        }
    }

    pub fn line(&self, text: String) -> LogLine {
        LogLine {
            severity: self.classify(&text),
            text,
        }
    }
}

impl Default for LineClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_ERROR_MARKER, DEFAULT_WARNING_MARKER)
    }
}

/// Running warning/error totals for one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeverityCounts {
    pub warnings: usize,
    pub errors: usize,
}

impl SeverityCounts {
    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Warning => self.warnings += 1,
            Severity::Error => self.errors += 1,
            Severity::Info => {}
        }
    }

    pub fn total(&self) -> usize {
        self.warnings + self.errors
    }
}

impl AddAssign for SeverityCounts {
    fn add_assign(&mut self, other: Self) {
        self.warnings += other.warnings;
        self.errors += other.errors;
    }
}

impl<'a> FromIterator<&'a LogLine> for SeverityCounts {
    fn from_iter<I: IntoIterator<Item = &'a LogLine>>(iter: I) -> Self {
        let mut counts = SeverityCounts::default();
        for line in iter {
            counts.record(line.severity);
        }
        counts
    }
}
