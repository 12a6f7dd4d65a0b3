//! The two phases of a CI job
//!
//! [`run_setup`] runs before the job: resolve the release, restore or
//! install, update, install packages and record what the save phase should
//! do. [`save_cache`] runs after the job and stores the snapshot.

use crate::acquire::{Acquirer, ToolCache};
use crate::cache::{self, CacheEntry, CacheKeyManager, CacheStore, SavedState};
use crate::error::{TlsetupError, TlsetupResult};
use crate::exec::ProcessRunner;
use crate::http::HttpClient;
use crate::install::{InstallOrchestrator, Layout};
use crate::platform::{bin_dir_name, Arch, Platform};
use crate::repository::RepositoryLocator;
use crate::tlmgr::Tlmgr;
use crate::update::UpdateOrchestrator;
use crate::version::{ReleaseWindow, Version, VersionCatalog, VersionRequest};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// External collaborators of a run
#[derive(Clone)]
pub struct Services {
    pub http: Arc<dyn HttpClient>,
    pub runner: Arc<dyn ProcessRunner>,
    pub tools: Arc<dyn ToolCache>,
    pub store: Arc<dyn CacheStore>,
}

/// Validated inputs of a run
#[derive(Debug, Clone)]
pub struct Settings {
    pub version: VersionRequest,
    /// Flattened, sorted package names
    pub packages: Vec<String>,
    pub platform: Platform,
    pub arch: Arch,
    /// Installations go to `{prefix}/{version}`
    pub prefix: PathBuf,
    pub repository: Option<String>,
    pub cache_enabled: bool,
    /// Save a snapshot even on a cache hit
    pub force_update: bool,
    pub update_all: bool,
    pub work_dir: PathBuf,
    pub state_file: PathBuf,
    /// Where the widest observed release is remembered
    pub release_snapshot: Option<PathBuf>,
    pub offline: bool,
    /// `$GITHUB_PATH`
    pub github_path: Option<PathBuf>,
    /// `$GITHUB_OUTPUT`
    pub github_output: Option<PathBuf>,
}

/// Result of the setup phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupOutput {
    pub version: Version,
    pub cache_hit: bool,
    pub bin_dir: PathBuf,
}

/// Compute the release window for `settings`
pub async fn release_window(services: &Services, settings: &Settings) -> TlsetupResult<ReleaseWindow> {
    let mut catalog = VersionCatalog::new(services.http.clone())?.offline(settings.offline);
    if let Some(ref path) = settings.release_snapshot {
        catalog = catalog.with_snapshot(path.clone());
    }
    Ok(catalog.resolve().await)
}

/// Install or restore TeX Live and prepare the save phase
pub async fn run_setup(services: &Services, settings: &Settings) -> TlsetupResult<SetupOutput> {
    let window = release_window(services, settings).await?;
    let requested = settings.version.resolve(&window, settings.platform)?;
    info!("Setting up TeX Live {}", requested);
    let candidates =
        RepositoryLocator::new(&window).locate(requested, settings.repository.as_deref())?;

    let mut keys = CacheKeyManager::compute(
        settings.platform,
        settings.arch,
        requested,
        settings.packages.as_slice(),
    );
    let mut entry = if settings.cache_enabled {
        let target = Layout::new(&settings.prefix, requested).texdir;
        cache::restore(services.store.as_ref(), &keys, target).await
    } else {
        CacheEntry::default()
    };
    entry.forced_update |= settings.force_update;

    let version = if entry.restored {
        let tlmgr = tlmgr_for(services, settings, requested);
        UpdateOrchestrator::new(&tlmgr, &window, settings.repository.as_deref())
            .update(&mut entry, settings.update_all)
            .await?;
        if !entry.hit {
            install_packages(&tlmgr, &settings.packages).await?;
        }
        requested
    } else {
        let acquirer = Acquirer::new(
            services.http.clone(),
            services.tools.clone(),
            settings.platform,
            settings.work_dir.clone(),
        );
        let report = InstallOrchestrator::new(
            acquirer,
            services.http.clone(),
            services.runner.clone(),
            settings.prefix.clone(),
            settings.work_dir.clone(),
        )
        .install(requested, settings.version.is_pinned(), &candidates)
        .await?;

        if report.corrected {
            keys = CacheKeyManager::compute(
                settings.platform,
                settings.arch,
                report.version,
                settings.packages.as_slice(),
            );
        }
        let tlmgr = tlmgr_for(services, settings, report.version);
        install_packages(&tlmgr, &settings.packages).await?;
        report.version
    };

    let texdir = Layout::new(&settings.prefix, version).texdir;
    let state = if settings.cache_enabled && entry.needs_save() {
        SavedState {
            key: Some(keys.unique.clone()),
            target_path: Some(texdir.clone()),
        }
    } else {
        SavedState::default()
    };
    state.store(&settings.state_file).await?;

    let output = SetupOutput {
        version,
        cache_hit: entry.hit,
        bin_dir: texdir
            .join("bin")
            .join(bin_dir_name(settings.platform, settings.arch, version)),
    };
    export(settings, &output).await?;
    Ok(output)
}

/// Save the snapshot recorded by the setup phase, then forget it
pub async fn save_cache(store: &dyn CacheStore, state_file: &Path) -> TlsetupResult<()> {
    let state = match SavedState::load(state_file).await {
        Ok(state) => state,
        Err(e) => {
            warn!("Ignoring unreadable state {}: {}", state_file.display(), e);
            SavedState::default()
        }
    };
    match (state.key, state.target_path) {
        (Some(key), Some(target)) => cache::save(store, &key, target).await,
        _ => info!("Nothing to save"),
    }
    SavedState::clear(state_file).await
}

fn tlmgr_for(services: &Services, settings: &Settings, version: Version) -> Tlmgr {
    let bin = Layout::new(&settings.prefix, version)
        .texdir
        .join("bin")
        .join(bin_dir_name(settings.platform, settings.arch, version));
    Tlmgr::new(
        services.runner.clone(),
        bin.join(settings.platform.tlmgr_executable()),
        version,
    )
}

async fn install_packages(tlmgr: &Tlmgr, packages: &[String]) -> TlsetupResult<()> {
    if packages.is_empty() {
        return Ok(());
    }
    info!("Installing {} package(s)", packages.len());
    tlmgr.install(packages).await?.into_result()?;
    Ok(())
}

async fn export(settings: &Settings, output: &SetupOutput) -> TlsetupResult<()> {
    if let Some(ref path) = settings.github_path {
        append(path, &format!("{}\n", output.bin_dir.display())).await?;
    }
    if let Some(ref path) = settings.github_output {
        append(
            path,
            &format!("version={}\ncache-hit={}\n", output.version, output.cache_hit),
        )
        .await?;
    }
    Ok(())
}

async fn append(path: &Path, text: &str) -> TlsetupResult<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| TlsetupError::io(format!("opening {}", path.display()), e))?;
    let write_err = |e| TlsetupError::io(format!("writing {}", path.display()), e);
    file.write_all(text.as_bytes()).await.map_err(write_err)?;
    file.flush().await.map_err(write_err)?;
    file.sync_all().await.map_err(write_err)
}
