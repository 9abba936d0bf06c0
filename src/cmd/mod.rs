//! Subcommand implementations for synctail.

pub mod config;
pub mod list;
pub mod view;
