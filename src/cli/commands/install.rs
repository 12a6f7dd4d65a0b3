//! Install command - restore or install TeX Live before a job

use super::{services, state_file};
use crate::cli::args::InstallArgs;
use crate::config::{Config, ConfigManager};
use crate::error::TlsetupResult;
use crate::packages;
use crate::platform::{Arch, Platform};
use crate::ui::{self, TaskSpinner, UiContext};
use crate::version::VersionRequest;
use crate::workflow::{self, Settings};
use std::path::PathBuf;
use tracing::debug;

/// Execute the install command
pub async fn execute(args: InstallArgs, config: &Config) -> TlsetupResult<()> {
    let ctx = UiContext::detect();
    let settings = settings(args, config).await?;
    debug!("Settings: {:?}", settings);

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!("Setting up TeX Live {}...", settings.version));
    let output = match workflow::run_setup(&services(config), &settings).await {
        Ok(output) => output,
        Err(e) => {
            spinner.stop_error("TeX Live setup failed");
            return Err(e);
        }
    };

    if output.cache_hit {
        spinner.stop(&format!("TeX Live {} restored from cache", output.version));
    } else {
        spinner.stop(&format!("TeX Live {} ready", output.version));
    }
    if !settings.cache_enabled {
        ui::step_warn(&ctx, "Caching disabled; the installation will not be saved");
    }
    ui::key_value(&ctx, "bin", &output.bin_dir.display().to_string());

    println!("version={}", output.version);
    println!("cache-hit={}", output.cache_hit);
    Ok(())
}

/// Merge configuration, flags and environment into validated settings
async fn settings(args: InstallArgs, config: &Config) -> TlsetupResult<Settings> {
    let version: VersionRequest = args
        .texlive_version
        .as_deref()
        .unwrap_or(&config.install.version)
        .parse()?;

    let mut inline = config.install.packages.clone();
    inline.extend(args.packages);
    let package_file = args.package_file.or_else(|| config.install.package_file.clone());
    let packages = packages::collect(&inline, package_file.as_deref()).await?;

    Ok(Settings {
        version,
        packages,
        platform: Platform::detect()?,
        arch: Arch::detect()?,
        prefix: args
            .prefix
            .or_else(|| config.install.prefix.clone())
            .unwrap_or_else(ConfigManager::default_prefix),
        repository: args
            .repository
            .or_else(|| config.install.repository.clone())
            .filter(|url| !url.trim().is_empty()),
        cache_enabled: config.cache.enabled && !args.no_cache,
        force_update: config.cache.force_update || args.force_update_cache,
        update_all: config.install.update_all || args.update_all,
        work_dir: ConfigManager::work_dir(),
        state_file: state_file(config),
        release_snapshot: Some(ConfigManager::release_snapshot_path()),
        offline: config.general.offline || args.offline,
        github_path: env_path("GITHUB_PATH"),
        github_output: env_path("GITHUB_OUTPUT"),
    })
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}
