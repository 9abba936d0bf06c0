//! Folder listing with severity counts.

use crate::cli::ListArgs;
use anyhow::{Context, Result};
use colored::Colorize;
use std::time::Duration;
use synctail::config::TailConfig;
use synctail::dir_watcher::{DirEvent, DirectoryWatcher};
use synctail::discovery::{self, LogFile};

const WATCH_WAIT: Duration = Duration::from_millis(500);

pub fn run(args: ListArgs, config: &TailConfig) -> Result<()> {
    let dir = match args.dir.or_else(|| config.log_dir.clone()) {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let classifier = config.classifier();

    let mut files = discovery::discover_log_files(&dir, &config.log_extension, &classifier)
        .with_context(|| format!("Failed to list {}", dir.display()))?;

    if files.is_empty() {
        println!(
            "{}",
            format!("No .{} files in {}", config.log_extension, dir.display()).dimmed()
        );
    }
    for file in &files {
        print_file(file);
    }

    if !args.watch {
        return Ok(());
    }

    let watcher = DirectoryWatcher::new(&dir, &config.log_extension)?;
    loop {
        let Some(event) = watcher.recv_timeout(WATCH_WAIT) else {
            continue;
        };
        match discovery::reconcile(&mut files, &event, &classifier) {
            Ok(true) => report(&files, &event),
            Ok(false) => {}
            Err(e) => eprintln!("{} {}", "warning:".yellow(), e),
        }
    }
}

fn report(files: &[LogFile], event: &DirEvent) {
    let path = event.path();
    match files.iter().find(|f| f.path == path) {
        Some(file) => print_file(file),
        None => println!(
            "{} {}",
            "removed".dimmed(),
            path.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default()
        ),
    }
}

fn print_file(file: &LogFile) {
    let warnings = format!("{} warnings", file.counts.warnings);
    let errors = format!("{} errors", file.counts.errors);
    println!(
        "{} {:>12}  {}  {}",
        format!("{:<40}", file.name).green(),
        format_size(file.length),
        if file.counts.warnings > 0 {
            warnings.yellow()
        } else {
            warnings.dimmed()
        },
        if file.counts.errors > 0 {
            errors.red()
        } else {
            errors.dimmed()
        }
    );
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
