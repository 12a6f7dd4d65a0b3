//! Local cache of extracted tools
//!
//! Layout: `{root}/{tool}/{version}/` with a `{version}.complete` marker next
//! to it. A directory without its marker is a crashed copy and is ignored.

use crate::error::{TlsetupError, TlsetupResult};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Cache of ready-to-run tool directories keyed by (tool, version)
#[async_trait]
pub trait ToolCache: Send + Sync {
    /// Directory holding `tool` at `version`, if cached
    async fn find(&self, tool: &str, version: &str) -> Option<PathBuf>;

    /// Copy `source` into the cache and return the cached directory
    async fn cache_dir(&self, source: &Path, tool: &str, version: &str) -> TlsetupResult<PathBuf>;
}

/// `ToolCache` stored in a plain directory tree
#[derive(Debug, Clone)]
pub struct DirToolCache {
    root: PathBuf,
}

impl DirToolCache {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Default location under the user cache directory
    pub fn default_root() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("tlsetup")
            .join("tools")
    }

    fn entry(&self, tool: &str, version: &str) -> (PathBuf, PathBuf) {
        let base = self.root.join(tool);
        (base.join(version), base.join(format!("{}.complete", version)))
    }
}

#[async_trait]
impl ToolCache for DirToolCache {
    async fn find(&self, tool: &str, version: &str) -> Option<PathBuf> {
        let (dir, marker) = self.entry(tool, version);
        if dir.is_dir() && marker.is_file() {
            debug!("Tool cache hit: {} {}", tool, version);
            Some(dir)
        } else {
            None
        }
    }

    async fn cache_dir(&self, source: &Path, tool: &str, version: &str) -> TlsetupResult<PathBuf> {
        let (dir, marker) = self.entry(tool, version);
        let source = source.to_path_buf();
        let target = dir.clone();
        tokio::task::spawn_blocking(move || -> TlsetupResult<()> {
            if target.exists() {
                fs::remove_dir_all(&target)
                    .map_err(|e| TlsetupError::io(format!("clearing {}", target.display()), e))?;
            }
            copy_tree(&source, &target)?;
            fs::write(&marker, b"")
                .map_err(|e| TlsetupError::io(format!("writing {}", marker.display()), e))
        })
        .await
        .map_err(|e| TlsetupError::Internal(format!("tool cache task failed: {}", e)))??;

        debug!("Cached {} {} at {}", tool, version, dir.display());
        Ok(dir)
    }
}

/// Recursively copy a directory, preserving file permissions
pub(crate) fn copy_tree(source: &Path, target: &Path) -> TlsetupResult<()> {
    fs::create_dir_all(target).map_err(|e| TlsetupError::DirCreate {
        path: target.to_path_buf(),
        source: e,
    })?;
    let entries = fs::read_dir(source)
        .map_err(|e| TlsetupError::io(format!("reading {}", source.display()), e))?;
    for entry in entries {
        let entry = entry.map_err(|e| TlsetupError::io("reading directory entry", e))?;
        let from = entry.path();
        let to = target.join(entry.file_name());
        let file_type = entry
            .file_type()
            .map_err(|e| TlsetupError::io(format!("inspecting {}", from.display()), e))?;
        if file_type.is_dir() {
            copy_tree(&from, &to)?;
        } else {
            fs::copy(&from, &to)
                .map_err(|e| TlsetupError::io(format!("copying {}", from.display()), e))?;
        }
    }
    Ok(())
}
