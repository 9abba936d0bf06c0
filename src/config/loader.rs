//! Config loading for synctail.
//!
//! Loads and validates YAML config files with path expansion.

use std::fs;
use std::path::{Path, PathBuf};

use strsim::jaro_winkler;

use crate::config::discovery::DiscoveryResult;
use crate::config::error::ConfigError;
use crate::config::types::{RawConfig, TailConfig};

const SIMILARITY_THRESHOLD: f64 = 0.8;

/// Expand tilde in path to home directory.
///
/// - `~/foo` -> `/home/user/foo`
/// - `/absolute/path` -> unchanged
/// - `relative/path` -> unchanged
pub fn expand_path(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();

    if let Some(rest) = path_str.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path_str == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }

    path.to_path_buf()
}

/// Closest known name to `name`, if any is similar enough.
pub fn suggest_field(name: &str, known: &[&str]) -> Option<String> {
    known
        .iter()
        .filter(|&&candidate| jaro_winkler(name, candidate) >= SIMILARITY_THRESHOLD)
        .max_by(|a, b| {
            jaro_winkler(name, a)
                .partial_cmp(&jaro_winkler(name, b))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|&s| s.to_string())
}

/// Parse YAML config text; `path` is only used for error reporting.
pub fn parse_str(content: &str, path: &Path) -> Result<TailConfig, ConfigError> {
    // A file holding only comments has no document to deserialize
    let has_content = content
        .lines()
        .any(|l| !l.trim().is_empty() && !l.trim_start().starts_with('#'));
    let raw = if has_content {
        serde_saphyr::from_str::<RawConfig>(content)
            .map_err(|e| ConfigError::from_saphyr_error(path.to_path_buf(), e))?
    } else {
        RawConfig::default()
    };

    validate(raw, path)
}

/// Load and validate a single YAML config file.
pub fn load_file(path: &Path) -> Result<TailConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_str(&content, path)
}

/// Load the effective config.
///
/// An explicit path wins; otherwise the closest discovered file is used.
/// Returns defaults when no config file exists, along with the path used.
pub fn load(
    explicit: Option<&Path>,
    discovery: &DiscoveryResult,
) -> Result<(TailConfig, Option<PathBuf>), ConfigError> {
    match explicit.or(discovery.effective()) {
        Some(path) => Ok((load_file(path)?, Some(path.to_path_buf()))),
        None => Ok((TailConfig::default(), None)),
    }
}

fn validate(raw: RawConfig, path: &Path) -> Result<TailConfig, ConfigError> {
    let defaults = TailConfig::default();
    let invalid = |message: String| ConfigError::Validation {
        path: path.to_path_buf(),
        message,
    };

    let config = TailConfig {
        error_marker: raw.error_marker.unwrap_or(defaults.error_marker),
        warning_marker: raw.warning_marker.unwrap_or(defaults.warning_marker),
        chunk_size: raw.chunk_size.unwrap_or(defaults.chunk_size),
        initial_lines: raw.initial_lines.unwrap_or(defaults.initial_lines),
        page_lines: raw.page_lines.unwrap_or(defaults.page_lines),
        poll_interval_ms: raw.poll_interval_ms.unwrap_or(defaults.poll_interval_ms),
        log_extension: raw
            .log_extension
            .map(|ext| ext.trim_start_matches('.').to_string())
            .unwrap_or(defaults.log_extension),
        log_dir: raw.log_dir.map(|dir| expand_path(&dir)),
    };

    // Empty markers would match every line
    if config.error_marker.is_empty() {
        return Err(invalid("error_marker must not be empty".to_string()));
    }
    if config.warning_marker.is_empty() {
        return Err(invalid("warning_marker must not be empty".to_string()));
    }
    if config.chunk_size == 0 {
        return Err(invalid("chunk_size must be at least 1".to_string()));
    }
    if config.initial_lines == 0 || config.page_lines == 0 {
        return Err(invalid(
            "initial_lines and page_lines must be at least 1".to_string(),
        ));
    }
    if config.poll_interval_ms == 0 {
        return Err(invalid("poll_interval_ms must be at least 1".to_string()));
    }
    if config.log_extension.is_empty() {
        return Err(invalid("log_extension must not be empty".to_string()));
    }

    Ok(config)
}
