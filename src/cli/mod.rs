//! CLI subcommand definitions for synctail.

use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Available subcommands for synctail.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the tail of a log file, optionally following new lines
    View(ViewArgs),

    /// List log files in a folder with warning and error counts
    List(ListArgs),

    /// Config file commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Arguments for the view subcommand.
#[derive(Args, Debug)]
pub struct ViewArgs {
    /// Log file to view
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Number of lines to show initially (default from config)
    #[arg(short = 'n', long = "lines")]
    pub lines: Option<usize>,

    /// Also load this many older pages before printing
    #[arg(long, default_value_t = 0)]
    pub older: usize,

    /// Keep running and print lines as they are appended
    #[arg(short = 'f', long)]
    pub follow: bool,

    /// Show only warning and error lines (reads the whole file)
    #[arg(short = 'e', long = "errors-only")]
    pub errors_only: bool,
}

/// Arguments for the list subcommand.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Folder to list (default: log_dir from config, then current directory)
    #[arg(value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Keep running and report files as they appear, change or disappear
    #[arg(short = 'w', long)]
    pub watch: bool,
}

/// Config subcommand actions.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the config file
    Validate,
    /// Show effective configuration
    Show,
}
