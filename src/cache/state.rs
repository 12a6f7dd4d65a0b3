//! State handed from the install phase to the save phase
//!
//! Stored as `{"key": ..., "targetPath": ...}`. A missing `key` means there
//! is nothing to save.

use crate::error::{TlsetupError, TlsetupResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_path: Option<PathBuf>,
}

impl SavedState {
    /// Load from `path`; a missing file is an empty state
    pub async fn load(path: &Path) -> TlsetupResult<Self> {
        if !path.exists() {
            debug!("No saved state at {}", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| TlsetupError::io(format!("reading state from {}", path.display()), e))?;
        Ok(serde_json::from_str(&content)?)
    }

    pub async fn store(&self, path: &Path) -> TlsetupResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| TlsetupError::DirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        let content = serde_json::to_string(self)?;
        fs::write(path, content)
            .await
            .map_err(|e| TlsetupError::io(format!("writing state to {}", path.display()), e))
    }

    /// Delete the state file if present
    pub async fn clear(path: &Path) -> TlsetupResult<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TlsetupError::io(
                format!("removing state {}", path.display()),
                e,
            )),
        }
    }
}
