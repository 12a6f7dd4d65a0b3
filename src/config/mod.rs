//! Configuration management for tlsetup

pub mod schema;

pub use schema::Config;

use crate::error::{TlsetupError, TlsetupResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tlsetup")
            .join("config.toml")
    }

    /// Get the state directory path
    pub fn state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tlsetup")
    }

    /// State shared between the install and save phases
    pub fn default_state_file() -> PathBuf {
        Self::state_dir().join("state.json")
    }

    /// Widest observed TeX Live release
    pub fn release_snapshot_path() -> PathBuf {
        Self::state_dir().join("release.json")
    }

    /// Installation root when none is configured
    ///
    /// CI runners provide a per-job scratch directory; elsewhere the local
    /// data directory is used.
    pub fn default_prefix() -> PathBuf {
        match std::env::var_os("RUNNER_TEMP") {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir).join("setup-texlive"),
            _ => dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("tlsetup")
                .join("texlive"),
        }
    }

    /// Scratch space for downloads and profiles
    pub fn work_dir() -> PathBuf {
        std::env::temp_dir().join("tlsetup")
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> TlsetupResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> TlsetupResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| TlsetupError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| TlsetupError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
