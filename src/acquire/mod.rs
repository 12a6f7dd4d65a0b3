//! Installer acquisition
//!
//! Produces a runnable installer for a release: from the tool cache when
//! possible, otherwise downloaded from a repository, extracted, patched and
//! registered back into the tool cache.

pub mod archive;
pub mod patch;
pub mod tool_cache;

pub use tool_cache::{DirToolCache, ToolCache};

use crate::classify::{ErrorClassifier, Outcome};
use crate::error::{TlsetupError, TlsetupResult};
use crate::http::HttpClient;
use crate::platform::Platform;
use crate::repository::Repository;
use crate::version::Version;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

/// File in the installer tree naming the release it installs
pub const RELEASE_FILE: &str = "release-texlive.txt";

/// How strictly the installer's self-reported release is checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionCheck {
    /// The operator pinned the release; the repository decides
    Pinned,
    /// Any difference is a failure
    Strict,
    /// A newer release is accepted and reported back
    AcceptNewer,
}

/// A ready-to-run installer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installer {
    /// Installer root directory
    pub dir: PathBuf,
    /// Launcher inside `dir`
    pub executable: PathBuf,
    /// Release the installer installs
    pub version: Version,
}

/// Obtains installers for a platform
pub struct Acquirer {
    http: Arc<dyn HttpClient>,
    tools: Arc<dyn ToolCache>,
    platform: Platform,
    work_dir: PathBuf,
}

impl Acquirer {
    pub fn new(
        http: Arc<dyn HttpClient>,
        tools: Arc<dyn ToolCache>,
        platform: Platform,
        work_dir: PathBuf,
    ) -> Self {
        Self {
            http,
            tools,
            platform,
            work_dir,
        }
    }

    /// Get the installer for `version`, downloading it from `repository`
    /// if it is not cached
    pub async fn acquire(
        &self,
        version: Version,
        repository: &Repository,
        check: VersionCheck,
    ) -> TlsetupResult<Outcome<Installer>> {
        let name = self.platform.installer_executable(version);
        let key = version.to_string();

        if let Some(dir) = self.tools.find(name, &key).await {
            info!("Using cached installer for TeX Live {}", version);
            return Ok(Outcome::Success(Installer {
                executable: dir.join(name),
                dir,
                version,
            }));
        }

        let scratch = self
            .work_dir
            .join(format!("install-tl-{}", uuid::Uuid::new_v4().simple()));
        fs::create_dir_all(&scratch)
            .await
            .map_err(|e| TlsetupError::DirCreate {
                path: scratch.clone(),
                source: e,
            })?;

        let result = self.fetch(version, repository, check, &scratch).await;
        // The scratch tree survives only while the installer runs from it.
        let in_use = matches!(
            &result,
            Ok(Outcome::Success(installer)) if installer.dir.starts_with(&scratch)
        );
        if !in_use {
            if let Err(e) = fs::remove_dir_all(&scratch).await {
                warn!("Failed to remove {}: {}", scratch.display(), e);
            }
        }
        result
    }

    /// Download, extract, check, patch and register into `scratch`
    async fn fetch(
        &self,
        version: Version,
        repository: &Repository,
        check: VersionCheck,
        scratch: &Path,
    ) -> TlsetupResult<Outcome<Installer>> {
        let url = repository.join(self.platform.installer_archive());
        let archive = scratch.join(self.platform.installer_archive());
        info!("Downloading {}", url);
        if let Err(e) = self.http.download(&url, &archive).await {
            return Ok(Outcome::failed(ErrorClassifier::download_failed(
                "download installer",
                &url,
                e,
            )));
        }

        let dir = match archive::extract_installer(&archive, &scratch.join("tree")).await {
            Ok(dir) => dir,
            // A mirror in the middle of a sync serves truncated archives.
            Err(e) => {
                return Ok(Outcome::failed(ErrorClassifier::download_failed(
                    "extract installer",
                    &url,
                    e,
                )))
            }
        };

        let reported = read_release(&dir).await;
        let effective = match (check, reported) {
            (VersionCheck::Pinned, _) | (_, None) => version,
            (_, Some(found)) if found == version => version,
            (VersionCheck::AcceptNewer, Some(found)) if found > version => {
                info!(
                    "Installer reports TeX Live {} instead of {}",
                    found, version
                );
                found
            }
            (_, Some(found)) => {
                return Ok(Outcome::failed(ErrorClassifier::unexpected_version(
                    "install-tl",
                    version,
                    found,
                )))
            }
        };

        let patches = patch::patches_for(self.platform, effective);
        let applied = patch::apply(&dir, &patches).await?;
        if applied > 0 {
            debug!("Applied {} patch(es) to installer", applied);
        }

        let name = self.platform.installer_executable(effective);
        let dir = match self
            .tools
            .cache_dir(&dir, name, &effective.to_string())
            .await
        {
            Ok(cached) => cached,
            Err(e) => {
                warn!("Failed to cache installer: {}", e);
                dir
            }
        };

        Ok(Outcome::Success(Installer {
            executable: dir.join(name),
            dir,
            version: effective,
        }))
    }
}

/// Read the release year from the installer's release file
pub async fn read_release(dir: &Path) -> Option<Version> {
    let content = fs::read_to_string(dir.join(RELEASE_FILE)).await.ok()?;
    parse_release(&content)
}

/// Parse `TeX Live (https://tug.org/texlive) version 2024`
pub fn parse_release(content: &str) -> Option<Version> {
    let first = content.lines().next()?;
    let (_, rest) = first.rsplit_once("version")?;
    let year = rest.trim().get(..4)?;
    year.parse().ok()
}
