//! Configuration schema for tlsetup
//!
//! Configuration is stored at `~/.config/tlsetup/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// What to install
    pub install: InstallConfig,

    /// Cache settings
    pub cache: CacheConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Never query CTAN for the newest release
    pub offline: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            offline: false,
        }
    }
}

/// Installation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Release year or "latest"
    pub version: String,

    /// Packages to install
    pub packages: Vec<String>,

    /// File listing packages (plain or DEPENDS.txt format)
    pub package_file: Option<PathBuf>,

    /// Installation root; releases go to `{prefix}/{year}`
    pub prefix: Option<PathBuf>,

    /// Package repository to use instead of the mirror network
    pub repository: Option<String>,

    /// Run `tlmgr update --all` on a restored installation
    pub update_all: bool,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            version: "latest".to_string(),
            packages: Vec::new(),
            package_file: None,
            prefix: None,
            repository: None,
            update_all: false,
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable installation caching
    pub enabled: bool,

    /// Save a fresh snapshot even on a cache hit
    pub force_update: bool,

    /// Directory of the local cache store
    pub dir: Option<PathBuf>,

    /// State file shared between `install` and `save`
    pub state_file: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            force_update: false,
            dir: None,
            state_file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[install]"));
        assert!(toml.contains("[cache]"));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.install.version, "latest");
        assert!(config.cache.enabled);
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [install]
            version = "2023"
            packages = ["amsmath", "hyperref"]
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.install.version, "2023");
        assert_eq!(config.install.packages.len(), 2);
        assert_eq!(config.general.log_format, "text"); // default preserved
    }
}
