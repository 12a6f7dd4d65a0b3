//! Keys command - print the cache key set

use super::services;
use crate::cache::CacheKeyManager;
use crate::cli::args::KeysArgs;
use crate::config::{Config, ConfigManager};
use crate::error::TlsetupResult;
use crate::packages;
use crate::platform::{Arch, Platform};
use crate::version::{VersionCatalog, VersionRequest};

/// Execute the keys command
pub async fn execute(args: KeysArgs, config: &Config) -> TlsetupResult<()> {
    let request: VersionRequest = args.texlive_version.parse()?;
    let platform = Platform::detect()?;
    let window = VersionCatalog::new(services(config).http)?
        .with_snapshot(ConfigManager::release_snapshot_path())
        .offline(args.offline || config.general.offline)
        .resolve()
        .await;
    let version = request.resolve(&window, platform)?;
    let packages = packages::collect(&args.packages, args.package_file.as_deref()).await?;

    let keys = CacheKeyManager::compute(platform, Arch::detect()?, version, packages.as_slice());
    println!("{}", serde_json::to_string_pretty(&keys)?);
    Ok(())
}
