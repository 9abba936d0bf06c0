//! Background execution of tail session operations.
//!
//! One worker thread owns at most one [`TailSession`] and runs commands in
//! arrival order, which serializes every read and write of the session
//! offsets. Results come back tagged with the generation they were issued
//! against; [`SessionWorker::open`] starts a new generation and replies from
//! older ones are dropped on receipt.

use crate::config::TailConfig;
use crate::error::TailError;
use crate::reader::{PollOutcome, TailSession};
use crate::severity::LogLine;
use crate::view::ReloadRequest;
use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOp {
    Open,
    LoadOlder,
    Poll,
}

/// Outcome of one session operation.
#[derive(Debug)]
pub enum SessionEvent {
    Opened {
        lines: Vec<LogLine>,
        reached_start: bool,
    },
    Older {
        lines: Vec<LogLine>,
        reached_start: bool,
    },
    Polled(PollOutcome),
    Failed {
        op: SessionOp,
        error: TailError,
    },
}

#[derive(Debug)]
pub struct WorkerReply {
    pub generation: u64,
    pub event: SessionEvent,
}

enum Command {
    Open {
        generation: u64,
        path: PathBuf,
        request: ReloadRequest,
    },
    LoadOlder {
        generation: u64,
        line_count: usize,
    },
    Poll {
        generation: u64,
    },
    Shutdown,
}

/// Handle to a session worker thread.
pub struct SessionWorker {
    commands: Sender<Command>,
    replies: Receiver<WorkerReply>,
    generation: u64,
    load_in_flight: bool,
    handle: Option<JoinHandle<()>>,
}

impl SessionWorker {
    pub fn spawn(config: TailConfig) -> io::Result<Self> {
        let (command_tx, command_rx) = channel();
        let (reply_tx, reply_rx) = channel();

        let handle = thread::Builder::new()
            .name("synctail-session".to_string())
            .spawn(move || run(config, command_rx, reply_tx))?;

        Ok(Self {
            commands: command_tx,
            replies: reply_rx,
            generation: 0,
            load_in_flight: false,
            handle: Some(handle),
        })
    }

    /// Generation that replies must carry to be delivered.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn load_in_flight(&self) -> bool {
        self.load_in_flight
    }

    /// Open `path` in a new generation, abandoning anything still pending.
    pub fn open(&mut self, path: PathBuf, request: ReloadRequest) -> u64 {
        self.generation += 1;
        self.load_in_flight = false;
        self.send(Command::Open {
            generation: self.generation,
            path,
            request,
        });
        self.generation
    }

    /// Ask for older lines. Returns false if a previous request is pending.
    pub fn load_older(&mut self, line_count: usize) -> bool {
        if self.load_in_flight {
            return false;
        }
        self.load_in_flight = true;
        self.send(Command::LoadOlder {
            generation: self.generation,
            line_count,
        });
        true
    }

    pub fn poll(&self) {
        self.send(Command::Poll {
            generation: self.generation,
        });
    }

    /// Next reply for the current generation, without blocking.
    pub fn try_recv(&mut self) -> Option<WorkerReply> {
        loop {
            match self.replies.try_recv() {
                Ok(reply) => {
                    if let Some(reply) = self.accept(reply) {
                        return Some(reply);
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return None,
            }
        }
    }

    /// Next reply for the current generation, waiting up to `timeout`.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<WorkerReply> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.replies.recv_timeout(remaining) {
                Ok(reply) => {
                    if let Some(reply) = self.accept(reply) {
                        return Some(reply);
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return None
                }
            }
        }
    }

    fn accept(&mut self, reply: WorkerReply) -> Option<WorkerReply> {
        if reply.generation != self.generation {
            log::debug!(
                "dropping reply for generation {} (current {})",
                reply.generation,
                self.generation
            );
            return None;
        }
        if matches!(
            reply.event,
            SessionEvent::Older { .. }
                | SessionEvent::Failed {
                    op: SessionOp::LoadOlder,
                    ..
                }
        ) {
            self.load_in_flight = false;
        }
        Some(reply)
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            log::warn!("session worker has stopped; command dropped");
        }
    }
}

impl Drop for SessionWorker {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run(config: TailConfig, commands: Receiver<Command>, replies: Sender<WorkerReply>) {
    let mut current: Option<(u64, TailSession)> = None;

    for command in commands {
        let (generation, event) = match command {
            Command::Open {
                generation,
                path,
                request,
            } => {
                let mut session = TailSession::with_config(&path, &config);
                let result = guarded(&path, || request.run(&mut session));
                let event = match result {
                    Ok(lines) => {
                        let reached_start = session.reached_start();
                        current = Some((generation, session));
                        SessionEvent::Opened {
                            lines,
                            reached_start,
                        }
                    }
                    Err(error) => {
                        current = None;
                        SessionEvent::Failed {
                            op: SessionOp::Open,
                            error,
                        }
                    }
                };
                (generation, event)
            }
            Command::LoadOlder {
                generation,
                line_count,
            } => {
                let event = match current.as_mut() {
                    Some((g, session)) if *g == generation => {
                        let path = session.path().to_path_buf();
                        match guarded(&path, || session.load_older(line_count)) {
                            Ok(lines) => SessionEvent::Older {
                                lines,
                                reached_start: session.reached_start(),
                            },
                            Err(error) => SessionEvent::Failed {
                                op: SessionOp::LoadOlder,
                                error,
                            },
                        }
                    }
                    // No open session for this generation: nothing to page
                    _ => SessionEvent::Older {
                        lines: Vec::new(),
                        reached_start: true,
                    },
                };
                (generation, event)
            }
            Command::Poll { generation } => {
                let event = match current.as_mut() {
                    Some((g, session)) if *g == generation => {
                        let path = session.path().to_path_buf();
                        match guarded(&path, || session.poll_new_lines()) {
                            Ok(outcome) => SessionEvent::Polled(outcome),
                            Err(error) => SessionEvent::Failed {
                                op: SessionOp::Poll,
                                error,
                            },
                        }
                    }
                    _ => SessionEvent::Polled(PollOutcome::Lines(Vec::new())),
                };
                (generation, event)
            }
            Command::Shutdown => break,
        };

        if replies.send(WorkerReply { generation, event }).is_err() {
            break;
        }
    }
}

/// Run a session operation, turning a panic into an I/O failure.
fn guarded<T, F>(path: &std::path::Path, op: F) -> Result<T, TailError>
where
    F: FnOnce() -> Result<T, TailError>,
{
    match catch_unwind(AssertUnwindSafe(op)) {
        Ok(result) => result,
        Err(_) => Err(TailError::Io {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::Other, "session operation panicked"),
        }),
    }
}
