//! CLI command implementations

pub mod install;
pub mod keys;
pub mod release;
pub mod save;

pub use install::execute as install;
pub use keys::execute as keys;
pub use release::execute as release;
pub use save::execute as save;

use crate::acquire::DirToolCache;
use crate::cache::LocalCacheStore;
use crate::config::{Config, ConfigManager};
use crate::exec::TokioRunner;
use crate::http::UreqClient;
use crate::workflow::Services;
use std::sync::Arc;

/// Production collaborators
pub(crate) fn services(config: &Config) -> Services {
    let store_dir = config
        .cache
        .dir
        .clone()
        .unwrap_or_else(LocalCacheStore::default_dir);
    Services {
        http: Arc::new(UreqClient::new()),
        runner: Arc::new(TokioRunner),
        tools: Arc::new(DirToolCache::new(DirToolCache::default_root())),
        store: Arc::new(LocalCacheStore::new(store_dir)),
    }
}

/// State file shared between `install` and `save`
pub(crate) fn state_file(config: &Config) -> std::path::PathBuf {
    config
        .cache
        .state_file
        .clone()
        .unwrap_or_else(ConfigManager::default_state_file)
}
