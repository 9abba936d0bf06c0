//! Directory watcher for log folders.
//!
//! Uses the notify crate to report log files appearing, disappearing or
//! changing in one folder. It only informs: sessions decide what to reload.

use anyhow::{Context, Result};
use notify::{
    event::{CreateKind, ModifyKind, RemoveKind},
    Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

/// Events from the directory watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirEvent {
    /// A log file was created or renamed into the folder
    Added(PathBuf),
    /// A log file was removed
    Removed(PathBuf),
    /// A log file's contents changed
    Modified(PathBuf),
}

impl DirEvent {
    pub fn path(&self) -> &Path {
        match self {
            DirEvent::Added(p) | DirEvent::Removed(p) | DirEvent::Modified(p) => p,
        }
    }
}

/// Watches a directory for changes to files with one extension
pub struct DirectoryWatcher {
    _watcher: RecommendedWatcher,
    receiver: Receiver<DirEvent>,
}

impl DirectoryWatcher {
    /// Create a new directory watcher for the given path.
    ///
    /// Only notifies about files whose extension is `extension`.
    pub fn new<P: AsRef<Path>>(path: P, extension: &str) -> Result<Self> {
        let (tx, rx) = channel();
        let path_buf = path.as_ref().to_path_buf();
        let extension = extension.to_string();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => forward_event(event, &extension, &tx),
                Err(e) => log::warn!("directory watcher error: {}", e),
            }
        })
        .context("Failed to create directory watcher")?;

        // Non-recursive: only the folder's own files are tailed
        watcher
            .watch(&path_buf, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch directory: {}", path_buf.display()))?;

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
        })
    }

    /// Try to receive a directory event without blocking.
    pub fn try_recv(&self) -> Option<DirEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Wait up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<DirEvent> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

fn forward_event(event: Event, extension: &str, tx: &Sender<DirEvent>) {
    let make: fn(PathBuf) -> DirEvent = match event.kind {
        EventKind::Create(CreateKind::File)
        | EventKind::Create(CreateKind::Any)
        | EventKind::Modify(ModifyKind::Name(_)) => DirEvent::Added,
        EventKind::Remove(RemoveKind::File) | EventKind::Remove(RemoveKind::Any) => {
            DirEvent::Removed
        }
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => {
            DirEvent::Modified
        }
        _ => return,
    };

    for path in event.paths {
        if has_extension(&path, extension) {
            // A rename reports both names; the old one no longer exists
            let event = match make(path) {
                DirEvent::Added(p) if !p.exists() => DirEvent::Removed(p),
                other => other,
            };
            let _ = tx.send(event);
        }
    }
}

pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().is_some_and(|ext| ext == extension)
}
