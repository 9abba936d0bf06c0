//! Tail, page and follow one log file.

use crate::cli::ViewArgs;
use anyhow::{anyhow, bail, Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use synctail::config::TailConfig;
use synctail::dir_watcher::DirectoryWatcher;
use synctail::severity::{LogLine, Severity};
use synctail::view::{LogView, ReloadRequest, ViewUpdate};
use synctail::worker::SessionWorker;

/// How long to wait for the worker before giving up on a request
const REPLY_TIMEOUT: Duration = Duration::from_secs(30);

pub fn run(args: ViewArgs, mut config: TailConfig) -> Result<()> {
    if let Some(lines) = args.lines {
        config.initial_lines = lines.max(1);
    }

    let path = args.file.canonicalize().unwrap_or_else(|_| args.file.clone());
    let mut view = LogView::new(&config);
    view.set_errors_only(args.errors_only);

    let mut worker =
        SessionWorker::spawn(config.clone()).context("Failed to start session worker")?;

    let request = view.reload_request();
    reload(&mut worker, &mut view, &path, request)?;
    for _ in 0..args.older {
        if view.reached_start() || !worker.load_older(config.page_lines) {
            break;
        }
        match next_update(&mut worker, &mut view)? {
            ViewUpdate::Failed(message) => bail!(message),
            ViewUpdate::ReloadNeeded(request) => {
                // Rotated underneath us; start over from the fresh tail
                reload(&mut worker, &mut view, &path, request)?;
                break;
            }
            _ => {}
        }
    }

    for line in view.lines() {
        print_line(line);
    }

    if args.follow {
        follow(&mut worker, &mut view, &path, &config)?;
    }
    Ok(())
}

/// Poll on the configured interval, waking early on directory events.
fn follow(
    worker: &mut SessionWorker,
    view: &mut LogView,
    path: &Path,
    config: &TailConfig,
) -> Result<()> {
    let watcher = watch_parent(path);
    let interval = config.poll_interval();
    let mut next_poll = Instant::now() + interval;

    loop {
        let wait = next_poll.saturating_duration_since(Instant::now());
        let woken = match &watcher {
            Some(watcher) => watcher
                .recv_timeout(wait)
                .is_some_and(|event| event.path() == path),
            None => {
                std::thread::sleep(wait);
                false
            }
        };
        if !woken && Instant::now() < next_poll {
            continue;
        }
        next_poll = Instant::now() + interval;

        worker.poll();
        match next_update(worker, view)? {
            ViewUpdate::Appended(count) => {
                for line in view.last(count) {
                    print_line(line);
                }
            }
            ViewUpdate::ReloadNeeded(request) => {
                eprintln!("{}", "-- log rotated, reloading --".dimmed());
                reload(worker, view, path, request)?;
                for line in view.lines() {
                    print_line(line);
                }
            }
            ViewUpdate::Failed(message) => {
                // Keep what is shown; the next poll retries
                eprintln!("{} {}", "warning:".yellow(), message);
            }
            _ => {}
        }
    }
}

fn reload(
    worker: &mut SessionWorker,
    view: &mut LogView,
    path: &Path,
    request: ReloadRequest,
) -> Result<()> {
    worker.open(path.to_path_buf(), request);
    match next_update(worker, view)? {
        ViewUpdate::Failed(message) => bail!(message),
        _ => Ok(()),
    }
}

fn next_update(worker: &mut SessionWorker, view: &mut LogView) -> Result<ViewUpdate> {
    let reply = worker
        .recv_timeout(REPLY_TIMEOUT)
        .ok_or_else(|| anyhow!("Timed out waiting for the log reader"))?;
    Ok(view.apply(reply.event))
}

fn watch_parent(path: &Path) -> Option<DirectoryWatcher> {
    let dir: PathBuf = path.parent()?.to_path_buf();
    let extension = path.extension()?.to_string_lossy().to_string();
    match DirectoryWatcher::new(&dir, &extension) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            log::warn!("falling back to interval polling: {:#}", e);
            None
        }
    }
}

fn print_line(line: &LogLine) {
    match line.severity {
        Severity::Error => println!("{}", line.text.red()),
        Severity::Warning => println!("{}", line.text.yellow()),
        Severity::Info => println!("{}", line.text),
    }
}
