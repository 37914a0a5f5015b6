use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::core::{AnalysisConfig, EffortConfig, FormsmapConfig, TargetConfig};
use crate::core::{Error, Result};

pub const CONFIG_FILE_NAME: &str = ".formsmap.toml";

const MAX_TRAVERSAL_DEPTH: usize = 10;

/// Parse and validate config from a TOML string.
///
/// A section that fails validation is replaced by its defaults with a
/// warning; only unparseable TOML is an error.
pub fn parse_and_validate_config(contents: &str) -> std::result::Result<FormsmapConfig, String> {
    let mut config = toml::from_str::<FormsmapConfig>(contents)
        .map_err(|e| format!("Failed to parse {CONFIG_FILE_NAME}: {e}"))?;

    if let Err(e) = config.target.validate() {
        warn!("Invalid target settings: {}. Using defaults.", e);
        config.target = TargetConfig::default();
    }
    if let Err(e) = config.effort.validate() {
        warn!("Invalid effort settings: {}. Using defaults.", e);
        config.effort = EffortConfig::default();
    }
    if let Err(e) = config.analysis.validate() {
        warn!("Invalid analysis settings: {}. Using defaults.", e);
        config.analysis = AnalysisConfig::default();
    }

    Ok(config)
}

/// Try loading config from a discovered path. Missing or broken files
/// yield `None` so the search can continue.
fn try_load_config_from_path(config_path: &Path) -> Option<FormsmapConfig> {
    let contents = match fs::read_to_string(config_path) {
        Ok(contents) => contents,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to read config file {}: {}", config_path.display(), e);
            }
            return None;
        }
    };

    match parse_and_validate_config(&contents) {
        Ok(config) => {
            debug!("Loaded config from {}", config_path.display());
            Some(config)
        }
        Err(e) => {
            warn!("{}. Using defaults.", e);
            None
        }
    }
}

/// `start` and its parents, nearest first, at most `max_depth` entries.
pub fn directory_ancestors(start: PathBuf, max_depth: usize) -> impl Iterator<Item = PathBuf> {
    std::iter::successors(Some(start), |dir| {
        let mut parent = dir.clone();
        if parent.pop() {
            Some(parent)
        } else {
            None
        }
    })
    .take(max_depth)
}

/// Find `.formsmap.toml` in `start` or one of its ancestors.
pub fn discover_config(start: PathBuf) -> FormsmapConfig {
    directory_ancestors(start, MAX_TRAVERSAL_DEPTH)
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find_map(|path| try_load_config_from_path(&path))
        .unwrap_or_else(|| {
            debug!(
                "No config found after checking {} directories. Using default config.",
                MAX_TRAVERSAL_DEPTH
            );
            FormsmapConfig::default()
        })
}

/// Discover config starting from the current directory.
pub fn load_config() -> FormsmapConfig {
    match std::env::current_dir() {
        Ok(dir) => discover_config(dir),
        Err(e) => {
            warn!("Failed to get current directory: {}. Using default config.", e);
            FormsmapConfig::default()
        }
    }
}

/// Load an explicitly named config file. Unlike discovery, a missing or
/// unparseable file is an error.
pub fn load_config_from(path: &Path) -> Result<FormsmapConfig> {
    let contents = fs::read_to_string(path)
        .map_err(|e| Error::file_system("Failed to read config file", path, e))?;
    parse_and_validate_config(&contents).map_err(Error::Configuration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_file_gives_defaults() {
        assert_eq!(parse_and_validate_config("").unwrap(), FormsmapConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = parse_and_validate_config("[target]\npage_number = 7\n").unwrap();
        assert_eq!(config.target.page_number, 7);
        assert_eq!(config.target.global_prefix, "G_");
        assert_eq!(config.effort, EffortConfig::default());
    }

    #[test]
    fn test_invalid_section_falls_back() {
        let config =
            parse_and_validate_config("[effort]\nbase_hours = -1.0\n[analysis]\nmax_excerpts = 5\n")
                .unwrap();
        assert_eq!(config.effort, EffortConfig::default());
        assert_eq!(config.analysis.max_excerpts, 5);
    }

    #[test]
    fn test_unparseable_toml_is_error() {
        assert!(parse_and_validate_config("[target\n").is_err());
    }

    #[test]
    fn test_discovery_walks_up() {
        let root = TempDir::new().unwrap();
        fs::write(
            root.path().join(CONFIG_FILE_NAME),
            "[analysis]\nparallel = false\n",
        )
        .unwrap();
        let nested = root.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let config = discover_config(nested);
        assert!(!config.analysis.parallel);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(load_config_from(&dir.path().join("nope.toml")).is_err());
    }

    #[test]
    fn test_directory_ancestors_limit() {
        let dirs: Vec<_> = directory_ancestors(PathBuf::from("/a/b/c/d"), 2).collect();
        assert_eq!(dirs, vec![PathBuf::from("/a/b/c/d"), PathBuf::from("/a/b/c")]);
    }
}
