//! Release command - print the current release window

use super::services;
use crate::config::{Config, ConfigManager};
use crate::error::TlsetupResult;
use crate::version::VersionCatalog;

/// Execute the release command
pub async fn execute(offline: bool, config: &Config) -> TlsetupResult<()> {
    let window = VersionCatalog::new(services(config).http)?
        .with_snapshot(ConfigManager::release_snapshot_path())
        .offline(offline || config.general.offline)
        .resolve()
        .await;

    println!("{}", serde_json::to_string_pretty(&window)?);
    Ok(())
}
