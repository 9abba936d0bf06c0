//! Config discovery for synctail.
//!
//! Walks parent directories to find `synctail.yaml` and checks for global config
//! at `<config dir>/synctail/config.yaml`.

use std::path::{Path, PathBuf};

/// Project config filename to search for in parent directories.
pub const PROJECT_CONFIG_NAME: &str = "synctail.yaml";

/// Global config filename within the synctail config directory.
pub const GLOBAL_CONFIG_NAME: &str = "config.yaml";

/// Result of config discovery.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryResult {
    /// Full path to the nearest project config file (`synctail.yaml`).
    pub project_config: Option<PathBuf>,
    /// Full path to the global config file.
    pub global_config: Option<PathBuf>,
}

impl DiscoveryResult {
    /// The config that applies: closest wins, project over global.
    pub fn effective(&self) -> Option<&Path> {
        self.project_config
            .as_deref()
            .or(self.global_config.as_deref())
    }
}

/// Discover config files starting from the current working directory.
pub fn discover() -> DiscoveryResult {
    let cwd = std::env::current_dir()
        .ok()
        .map(|dir| dir.canonicalize().unwrap_or(dir));
    discover_from(cwd.as_deref(), dirs::config_dir().as_deref())
}

/// Discover config files walking up from `start`, with `config_dir` as the
/// global config root.
pub fn discover_from(start: Option<&Path>, config_dir: Option<&Path>) -> DiscoveryResult {
    let mut result = DiscoveryResult::default();

    if let Some(config_dir) = config_dir {
        let global_config_path = config_dir.join("synctail").join(GLOBAL_CONFIG_NAME);
        if global_config_path.is_file() {
            result.global_config = Some(global_config_path);
        }
    }

    if let Some(start) = start {
        // Walk ancestors looking for synctail.yaml
        for ancestor in start.ancestors() {
            let config_path = ancestor.join(PROJECT_CONFIG_NAME);
            if config_path.is_file() {
                result.project_config = Some(config_path);
                break;
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_finds_config_in_start_dir() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join(PROJECT_CONFIG_NAME);
        fs::write(&config_path, "page_lines: 10\n").unwrap();

        let result = discover_from(Some(temp.path()), None);
        assert_eq!(result.project_config, Some(config_path.clone()));
        assert_eq!(result.effective(), Some(config_path.as_path()));
    }

    #[test]
    fn test_finds_config_in_parent_dir() {
        let temp = TempDir::new().unwrap();
        let subdir = temp.path().join("logs").join("supplier");
        fs::create_dir_all(&subdir).unwrap();
        let config_path = temp.path().join(PROJECT_CONFIG_NAME);
        fs::write(&config_path, "page_lines: 10\n").unwrap();

        let result = discover_from(Some(&subdir), None);
        assert_eq!(result.project_config, Some(config_path));
    }

    #[test]
    fn test_project_wins_over_global() {
        let project = TempDir::new().unwrap();
        let config_root = TempDir::new().unwrap();
        fs::create_dir_all(config_root.path().join("synctail")).unwrap();
        let global_path = config_root.path().join("synctail").join(GLOBAL_CONFIG_NAME);
        fs::write(&global_path, "initial_lines: 5\n").unwrap();

        let only_global = discover_from(None, Some(config_root.path()));
        assert_eq!(only_global.effective(), Some(global_path.as_path()));

        let project_path = project.path().join(PROJECT_CONFIG_NAME);
        fs::write(&project_path, "initial_lines: 7\n").unwrap();
        let both = discover_from(Some(project.path()), Some(config_root.path()));
        assert_eq!(both.effective(), Some(project_path.as_path()));
        assert_eq!(both.global_config, Some(global_path));
    }

    #[test]
    fn test_nothing_found() {
        let temp = TempDir::new().unwrap();
        let result = discover_from(None, Some(temp.path()));
        assert!(result.effective().is_none());
    }
}
