//! Config errors, rendered in the compiler's `error: / -->` layout.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("error: cannot read config file\n  --> {}\n  |\n  = {source}\n", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML syntax or schema error, with a field suggestion for typos.
    #[error("error: {message}\n  --> {}\n  |\n{}", .path.display(), help_line(.suggestion))]
    Parse {
        path: PathBuf,
        message: String,
        suggestion: Option<String>,
    },

    /// The file parsed but holds an unusable value.
    #[error("error: {message}\n  --> {}\n  |\n", .path.display())]
    Validation { path: PathBuf, message: String },
}

impl ConfigError {
    pub fn from_saphyr_error(path: PathBuf, err: serde_saphyr::Error) -> Self {
        let message = err.to_string();
        let suggestion = unknown_field_name(&message)
            .and_then(|field| super::loader::suggest_field(field, super::types::KNOWN_FIELDS));
        ConfigError::Parse {
            path,
            message,
            suggestion,
        }
    }

    pub fn path(&self) -> &PathBuf {
        match self {
            ConfigError::Io { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Validation { path, .. } => path,
        }
    }
}

fn help_line(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!("  = help: did you mean `{}`?\n", s))
        .unwrap_or_default()
}

/// Extract `name` from serde's "unknown field `name`" wording.
fn unknown_field_name(message: &str) -> Option<&str> {
    let rest = &message[message.find("unknown field `")? + "unknown field `".len()..];
    rest.find('`').map(|end| &rest[..end])
}
