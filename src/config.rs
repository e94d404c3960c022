//! Configuration loading and root folder resolution
//!
//! Resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`MIDNAM_CATALOG_ROOT`)
//! 3. TOML config file (`~/.config/midnam-catalog/config.toml`)
//! 4. Current directory (fallback)

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_FRESHNESS_SECS;
use crate::error::{Error, Result};
use crate::service::CACHE_FILE_NAME;

/// Environment variable overriding the root folder
pub const ROOT_ENV_VAR: &str = "MIDNAM_CATALOG_ROOT";

const CONFIG_DIR: &str = "midnam-catalog";
const CONFIG_FILE: &str = "config.toml";

/// On-disk configuration file contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root of the MIDI name document tree
    pub root_folder: Option<String>,
    /// Cache file location; defaults to `.catalog-cache.json` under the root
    pub cache_file: Option<String>,
    /// Cache freshness window in seconds; defaults to 3600
    pub freshness_secs: Option<u64>,
}

/// Resolved runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub root_folder: PathBuf,
    pub cache_file: PathBuf,
    pub freshness_secs: u64,
}

impl Config {
    /// Resolve configuration from CLI argument, environment, and TOML file.
    pub fn resolve(cli_root: Option<&str>) -> Result<Config> {
        let toml_config = load_toml_config()?.unwrap_or_default();

        let root_folder = if let Some(path) = cli_root {
            PathBuf::from(path)
        } else if let Ok(path) = std::env::var(ROOT_ENV_VAR) {
            PathBuf::from(path)
        } else if let Some(path) = &toml_config.root_folder {
            PathBuf::from(path)
        } else {
            PathBuf::from(".")
        };

        let cache_file = match &toml_config.cache_file {
            Some(path) => PathBuf::from(path),
            None => root_folder.join(CACHE_FILE_NAME),
        };

        Ok(Config {
            root_folder,
            cache_file,
            freshness_secs: toml_config.freshness_secs.unwrap_or(DEFAULT_FRESHNESS_SECS),
        })
    }
}

/// Read the platform config file when one exists.
fn load_toml_config() -> Result<Option<TomlConfig>> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(None);
    };
    let path = config_dir.join(CONFIG_DIR).join(CONFIG_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("read {} failed: {e}", path.display())))?;
    let config = toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("parse {} failed: {e}", path.display())))?;
    Ok(Some(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_argument_has_highest_priority() {
        let config = Config::resolve(Some("/tmp/midnam")).unwrap();
        assert_eq!(config.root_folder, PathBuf::from("/tmp/midnam"));
        assert_eq!(
            config.cache_file,
            PathBuf::from("/tmp/midnam").join(CACHE_FILE_NAME)
        );
        assert_eq!(config.freshness_secs, DEFAULT_FRESHNESS_SECS);
    }

    #[test]
    fn toml_config_parses_all_fields() {
        let config: TomlConfig = toml::from_str(
            r#"
            root_folder = "/srv/midnam"
            cache_file = "/var/cache/midnam.json"
            freshness_secs = 600
            "#,
        )
        .unwrap();
        assert_eq!(config.root_folder.as_deref(), Some("/srv/midnam"));
        assert_eq!(config.freshness_secs, Some(600));
    }
}
