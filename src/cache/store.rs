//! Cache blob storage
//!
//! [`LocalCacheStore`] keeps one `{key}.tar.gz` per saved entry in a
//! directory. Entries are written once and never replaced. Members of the
//! archive are stored as `{index}/{relative path}` so each saved path is
//! restored to where it came from.

use crate::error::{TlsetupError, TlsetupResult};
use async_trait::async_trait;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

const ARCHIVE_SUFFIX: &str = ".tar.gz";

/// Key-addressed storage of directory snapshots
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Restore `paths` from the entry matching `unique_key` exactly, or else
    /// the newest entry whose key starts with one of `restore_keys`, tried in
    /// order. Returns the matched key.
    async fn restore(
        &self,
        paths: &[PathBuf],
        unique_key: &str,
        restore_keys: &[String],
    ) -> TlsetupResult<Option<String>>;

    /// Save `paths` under `key`. Returns the stored size, or `None` when an
    /// entry with that key already exists.
    async fn save(&self, paths: &[PathBuf], key: &str) -> TlsetupResult<Option<u64>>;
}

/// `CacheStore` backed by a local directory
#[derive(Debug, Clone)]
pub struct LocalCacheStore {
    dir: PathBuf,
}

impl LocalCacheStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Default location under the user cache directory
    pub fn default_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("tlsetup")
            .join("cache")
    }

    fn archive_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}{}", key, ARCHIVE_SUFFIX))
    }

    /// Newest stored key starting with `prefix`
    fn newest_with_prefix(&self, prefix: &str) -> Option<String> {
        let entries = fs::read_dir(&self.dir).ok()?;
        entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().to_string();
                let key = name.strip_suffix(ARCHIVE_SUFFIX)?.to_string();
                if !key.starts_with(prefix) {
                    return None;
                }
                let modified = entry
                    .metadata()
                    .and_then(|m| m.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                Some((modified, key))
            })
            .max()
            .map(|(_, key)| key)
    }

    fn find(&self, unique_key: &str, restore_keys: &[String]) -> Option<String> {
        if self.archive_path(unique_key).is_file() {
            return Some(unique_key.to_string());
        }
        restore_keys
            .iter()
            .find_map(|prefix| self.newest_with_prefix(prefix))
    }
}

#[async_trait]
impl CacheStore for LocalCacheStore {
    async fn restore(
        &self,
        paths: &[PathBuf],
        unique_key: &str,
        restore_keys: &[String],
    ) -> TlsetupResult<Option<String>> {
        let store = self.clone();
        let paths = paths.to_vec();
        let unique_key = unique_key.to_string();
        let restore_keys = restore_keys.to_vec();
        tokio::task::spawn_blocking(move || {
            let Some(key) = store.find(&unique_key, &restore_keys) else {
                return Ok(None);
            };
            debug!("Restoring cache entry {}", key);
            restore_staged(&store.archive_path(&key), &paths)?;
            Ok(Some(key))
        })
        .await
        .map_err(|e| TlsetupError::CacheStore(format!("restore task failed: {}", e)))?
    }

    async fn save(&self, paths: &[PathBuf], key: &str) -> TlsetupResult<Option<u64>> {
        let target = self.archive_path(key);
        if target.exists() {
            debug!("Cache entry {} already exists", key);
            return Ok(None);
        }
        let dir = self.dir.clone();
        let paths = paths.to_vec();
        tokio::task::spawn_blocking(move || {
            fs::create_dir_all(&dir).map_err(|e| TlsetupError::DirCreate {
                path: dir.clone(),
                source: e,
            })?;
            let partial = dir.join(format!(".{}.partial", uuid::Uuid::new_v4().simple()));
            pack(&partial, &paths)?;
            fs::rename(&partial, &target)
                .map_err(|e| TlsetupError::io(format!("finalizing {}", target.display()), e))?;
            let size = fs::metadata(&target)
                .map_err(|e| TlsetupError::io(format!("inspecting {}", target.display()), e))?
                .len();
            Ok(Some(size))
        })
        .await
        .map_err(|e| TlsetupError::CacheStore(format!("save task failed: {}", e)))?
    }
}

fn pack(archive: &Path, paths: &[PathBuf]) -> TlsetupResult<()> {
    let store_err = |e: std::io::Error| TlsetupError::CacheStore(format!("{}: {}", archive.display(), e));
    let file = File::create(archive).map_err(store_err)?;
    let mut builder = tar::Builder::new(GzEncoder::new(BufWriter::new(file), Compression::fast()));
    builder.follow_symlinks(false);
    for (index, path) in paths.iter().enumerate() {
        if path.is_dir() {
            builder
                .append_dir_all(index.to_string(), path)
                .map_err(store_err)?;
        }
    }
    builder
        .into_inner()
        .and_then(|gz| gz.finish())
        .and_then(|mut writer| writer.flush())
        .map_err(store_err)?;
    Ok(())
}

/// Unpack into sibling staging directories, then move them into place
///
/// A failed unpack leaves every target as it was.
fn restore_staged(archive: &Path, paths: &[PathBuf]) -> TlsetupResult<()> {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let staging: Vec<PathBuf> = paths.iter().map(|p| staging_path(p, &suffix)).collect();

    if let Err(e) = unpack(archive, &staging) {
        discard(&staging);
        return Err(e);
    }

    for (stage, target) in staging.iter().zip(paths) {
        if !stage.exists() {
            continue;
        }
        if target.exists() {
            fs::remove_dir_all(target).map_err(|e| {
                TlsetupError::io(format!("replacing {}", target.display()), e)
            })?;
        }
        fs::rename(stage, target)
            .map_err(|e| TlsetupError::io(format!("moving {} into place", target.display()), e))?;
    }
    Ok(())
}

fn staging_path(target: &Path, suffix: &str) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    target.with_file_name(format!(".{}.{}.restoring", name, suffix))
}

fn discard(dirs: &[PathBuf]) {
    for dir in dirs.iter().filter(|d| d.exists()) {
        if let Err(e) = fs::remove_dir_all(dir) {
            warn!("Failed to remove {}: {}", dir.display(), e);
        }
    }
}

fn unpack(archive: &Path, paths: &[PathBuf]) -> TlsetupResult<()> {
    let store_err = |e: std::io::Error| TlsetupError::CacheStore(format!("{}: {}", archive.display(), e));
    let file = File::open(archive).map_err(store_err)?;
    let mut tar = tar::Archive::new(GzDecoder::new(BufReader::new(file)));
    for entry in tar.entries().map_err(store_err)? {
        let mut entry = entry.map_err(store_err)?;
        let member = entry.path().map_err(store_err)?.into_owned();
        let mut components = member.components();
        let Some(Component::Normal(first)) = components.next() else {
            continue;
        };
        let index = first.to_str().and_then(|i| i.parse::<usize>().ok());
        let Some(root) = index.and_then(|i| paths.get(i)) else {
            continue;
        };
        let relative = components.as_path();
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            continue;
        }
        let dest = root.join(relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| TlsetupError::DirCreate {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        entry.unpack(&dest).map_err(store_err)?;
    }
    Ok(())
}
