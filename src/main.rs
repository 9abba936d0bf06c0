mod cli;
mod cmd;

use anyhow::Result;
use clap::Parser;
use cli::{Commands, ConfigAction};
use std::path::{Path, PathBuf};
use synctail::config::{self, TailConfig};

#[derive(Parser, Debug)]
#[command(name = "synctail")]
#[command(version)]
#[command(about = "Tail, page back through and follow large append-only log files", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Config file to use instead of the discovered synctail.yaml
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Verbose diagnostics on stderr (RUST_LOG overrides)
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Commands::Config { action } => {
            let result = match action {
                ConfigAction::Validate => cmd::config::validate(args.config.as_deref()),
                ConfigAction::Show => cmd::config::show(args.config.as_deref()),
            };
            if let Err(code) = result {
                std::process::exit(code);
            }
            Ok(())
        }
        Commands::View(view_args) => {
            let config = load_config(args.config.as_deref());
            cmd::view::run(view_args, config)
        }
        Commands::List(list_args) => {
            let config = load_config(args.config.as_deref());
            cmd::list::run(list_args, &config)
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

/// Load the effective config, exiting with a Cargo-style message on error.
fn load_config(explicit: Option<&Path>) -> TailConfig {
    let discovery = config::discover();
    match config::load(explicit, &discovery) {
        Ok((config, used)) => {
            match used {
                Some(path) => log::debug!("using config {}", path.display()),
                None => log::debug!("no config found, using defaults"),
            }
            config
        }
        Err(e) => {
            log::debug!("rejected config {}: {:?}", e.path().display(), e);
            eprint!("{}", e);
            std::process::exit(1);
        }
    }
}
