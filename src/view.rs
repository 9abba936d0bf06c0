//! Presentation-side line buffer.
//!
//! `LogView` consumes batches produced by a [`TailSession`] (directly or via a
//! [`SessionWorker`](crate::worker::SessionWorker)), keeps them in display
//! order and applies the errors-only filter. It does no I/O itself; switching
//! the filter or recovering from rotation yields a [`ReloadRequest`] for the
//! driver to run.

use crate::config::TailConfig;
use crate::error::{TailError, TailResult};
use crate::reader::{PollOutcome, TailSession};
use crate::severity::{LogLine, SeverityCounts};
use crate::worker::SessionEvent;
use std::collections::VecDeque;

/// How a session should be (re)opened for the current view mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadRequest {
    /// Windowed tail of the last N lines
    Tail(usize),
    /// Full forward scan keeping only warnings and errors
    Filtered,
}

impl ReloadRequest {
    /// Run this request against `session`, returning the new view contents.
    pub fn run(self, session: &mut TailSession) -> TailResult<Vec<LogLine>> {
        match self {
            ReloadRequest::Tail(count) => session.open_tail(count),
            // Skipped-by-paging lines still need evaluating, so read everything
            ReloadRequest::Filtered => session.open_filtered(LogLine::is_notable),
        }
    }
}

/// What changed after feeding the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewUpdate {
    /// Contents replaced wholesale
    Replaced,
    /// N older lines inserted at the top
    Prepended(usize),
    /// N newer lines added at the bottom
    Appended(usize),
    /// Nothing visible changed
    Unchanged,
    /// The file was rotated; run the request and feed the result back
    ReloadNeeded(ReloadRequest),
    /// An operation failed; contents are untouched
    Failed(String),
}

pub struct LogView {
    lines: VecDeque<LogLine>,
    errors_only: bool,
    reached_start: bool,
    initial_lines: usize,
}

impl LogView {
    pub fn new(config: &TailConfig) -> Self {
        Self {
            lines: VecDeque::new(),
            errors_only: false,
            reached_start: false,
            initial_lines: config.initial_lines,
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &LogLine> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The newest `n` lines, oldest first.
    pub fn last(&self, n: usize) -> impl Iterator<Item = &LogLine> {
        self.lines.iter().skip(self.lines.len().saturating_sub(n))
    }

    /// The oldest `n` lines.
    pub fn first(&self, n: usize) -> impl Iterator<Item = &LogLine> {
        self.lines.iter().take(n)
    }

    pub fn errors_only(&self) -> bool {
        self.errors_only
    }

    /// Whether "load older" should stay disabled.
    pub fn reached_start(&self) -> bool {
        self.reached_start
    }

    /// Warning/error totals of what is currently loaded.
    pub fn counts(&self) -> SeverityCounts {
        self.lines.iter().collect()
    }

    /// The request that (re)loads the view in its current mode.
    pub fn reload_request(&self) -> ReloadRequest {
        if self.errors_only {
            ReloadRequest::Filtered
        } else {
            ReloadRequest::Tail(self.initial_lines)
        }
    }

    /// Toggle the errors-only filter.
    ///
    /// Returns the reload the driver must perform, or `None` if the mode did
    /// not change.
    pub fn set_errors_only(&mut self, errors_only: bool) -> Option<ReloadRequest> {
        if self.errors_only == errors_only {
            return None;
        }
        self.errors_only = errors_only;
        Some(self.reload_request())
    }

    pub fn replace(&mut self, lines: Vec<LogLine>, reached_start: bool) -> ViewUpdate {
        self.lines = self.filtered(lines).collect();
        self.reached_start = reached_start;
        ViewUpdate::Replaced
    }

    pub fn prepend(&mut self, lines: Vec<LogLine>, reached_start: bool) -> ViewUpdate {
        self.reached_start = reached_start;
        let older: Vec<LogLine> = self.filtered(lines).collect();
        if older.is_empty() {
            return ViewUpdate::Unchanged;
        }

        let count = older.len();
        for line in older.into_iter().rev() {
            self.lines.push_front(line);
        }
        ViewUpdate::Prepended(count)
    }

    pub fn append(&mut self, lines: Vec<LogLine>) -> ViewUpdate {
        let before = self.lines.len();
        let newer: Vec<LogLine> = self.filtered(lines).collect();
        self.lines.extend(newer);

        match self.lines.len() - before {
            0 => ViewUpdate::Unchanged,
            n => ViewUpdate::Appended(n),
        }
    }

    pub fn apply_poll(&mut self, outcome: PollOutcome) -> ViewUpdate {
        match outcome {
            PollOutcome::Lines(lines) => self.append(lines),
            PollOutcome::Reset { .. } => ViewUpdate::ReloadNeeded(self.reload_request()),
        }
    }

    /// Feed a worker result into the view.
    pub fn apply(&mut self, event: SessionEvent) -> ViewUpdate {
        match event {
            SessionEvent::Opened {
                lines,
                reached_start,
            } => self.replace(lines, reached_start),
            SessionEvent::Older {
                lines,
                reached_start,
            } => self.prepend(lines, reached_start),
            SessionEvent::Polled(outcome) => self.apply_poll(outcome),
            SessionEvent::Failed {
                error: TailError::Truncated { .. },
                ..
            } => ViewUpdate::ReloadNeeded(self.reload_request()),
            SessionEvent::Failed { op, error } => {
                if error.is_retryable() {
                    log::warn!("{:?} failed, will retry: {}", op, error);
                } else {
                    log::error!("{:?} failed: {}", op, error);
                }
                ViewUpdate::Failed(error.to_string())
            }
        }
    }

    fn filtered(&self, lines: Vec<LogLine>) -> impl Iterator<Item = LogLine> {
        let errors_only = self.errors_only;
        lines
            .into_iter()
            .filter(move |line| !errors_only || line.is_notable())
    }
}
