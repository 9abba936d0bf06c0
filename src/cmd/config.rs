//! Config validate and show commands for synctail.

use colored::Colorize;
use std::path::{Path, PathBuf};
use synctail::config::{self, TailConfig};

/// The config file that applies: explicit path, else closest discovered.
fn effective_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    config::discover().effective().map(Path::to_path_buf)
}

/// Validate the effective config file.
///
/// Follows Unix conventions:
/// - Exit 0 with no output on success (quiet success)
/// - Exit 1 with error message to stderr on failure
pub fn validate(explicit: Option<&Path>) -> Result<(), i32> {
    let config_path = match effective_config_path(explicit) {
        Some(path) => path,
        None => {
            eprintln!("error: No config found to validate");
            return Err(1);
        }
    };

    match config::load_file(&config_path) {
        Ok(cfg) => {
            if let Some(dir) = &cfg.log_dir {
                if !dir.is_dir() {
                    eprintln!("error: log_dir not found: {}", dir.display());
                    return Err(1);
                }
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", e);
            Err(1)
        }
    }
}

/// Show the effective configuration.
///
/// Respects NO_COLOR environment variable via the colored crate.
pub fn show(explicit: Option<&Path>) -> Result<(), i32> {
    match effective_config_path(explicit) {
        Some(path) => match config::load_file(&path) {
            Ok(cfg) => {
                println!("Using: {}", path.display().to_string().dimmed());
                println!();
                show_config(&cfg);
                Ok(())
            }
            Err(e) => {
                eprintln!("{}", e);
                Err(1)
            }
        },
        None => {
            println!("{}", "No config found. Using defaults.".dimmed());
            println!();
            show_config(&TailConfig::default());
            Ok(())
        }
    }
}

fn show_config(cfg: &TailConfig) {
    println!("{}: {}", "error_marker".cyan(), cfg.error_marker.red());
    println!("{}: {}", "warning_marker".cyan(), cfg.warning_marker.yellow());
    println!("{}: {}", "chunk_size".cyan(), cfg.chunk_size);
    println!("{}: {}", "initial_lines".cyan(), cfg.initial_lines);
    println!("{}: {}", "page_lines".cyan(), cfg.page_lines);
    println!("{}: {}", "poll_interval_ms".cyan(), cfg.poll_interval_ms);
    println!("{}: {}", "log_extension".cyan(), cfg.log_extension.green());
    match &cfg.log_dir {
        Some(dir) => {
            let status = if dir.is_dir() {
                String::new()
            } else {
                format!(" {}", "(not found)".red())
            };
            println!(
                "{}: {}{}",
                "log_dir".cyan(),
                dir.display().to_string().yellow(),
                status
            );
        }
        None => println!("{}: {}", "log_dir".cyan(), "(not set)".dimmed()),
    }
}
