//! Error taxonomy for tail sessions.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure of a scan, paging or poll operation.
///
/// Session state is never mutated when one of these is returned, so the
/// same call can be retried once the cause has cleared.
#[derive(Debug, Error)]
pub enum TailError {
    /// Target file is missing at operation start.
    #[error("log file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// Transient read failure (sharing violation, disk error, file vanished mid-read).
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// File is now shorter than the offset a caller wanted to resume from.
    #[error("{} shrank to {length} bytes (previously read up to {consumed})", path.display())]
    Truncated {
        path: PathBuf,
        consumed: u64,
        length: u64,
    },

    /// Offsets out of order. Indicates a bug in the caller.
    #[error("invalid byte range {start}..{end}")]
    InvalidRange { start: u64, end: u64 },
}

impl TailError {
    /// Wrap an I/O error for `path`, promoting `NotFound` to its own variant.
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            TailError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            TailError::Io {
                path: path.to_path_buf(),
                source: err,
            }
        }
    }

    /// Whether retrying the same call later can succeed without other action.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TailError::Io { .. })
    }
}

pub type TailResult<T> = Result<T, TailError>;
