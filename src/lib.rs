// Library interface for synctail
// Exposes the tailing core, discovery and view model for the CLI and tests

pub mod config;
pub mod dir_watcher;
pub mod discovery;
pub mod error;
pub mod reader;
pub mod severity;
pub mod view;
pub mod worker;

pub use error::{TailError, TailResult};
