//! Cache key hierarchy
//!
//! ```text
//! secondary    tlsetup-v1-{platform}-{arch}-{version}-
//! primary      {secondary}{digest of package set}
//! unique       {primary}-{random}
//! ```
//!
//! Entries written by older releases use the `tlsetup-` prefix without the
//! format tag; they are tried after their current-format counterparts.

use crate::platform::{Arch, Platform};
use crate::version::Version;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;

/// Prefix of keys written by this release
pub const KEY_PREFIX: &str = "tlsetup-v1";

/// Prefix of keys written before the format tag was introduced
pub const LEGACY_KEY_PREFIX: &str = "tlsetup";

/// Digest of a package set, independent of order and duplicates
pub fn digest<S: AsRef<str>>(packages: &[S]) -> String {
    let sorted: BTreeSet<&str> = packages.iter().map(AsRef::as_ref).collect();
    let mut hasher = Sha256::new();
    for package in sorted {
        hasher.update(package.as_bytes());
        hasher.update(b"\n");
    }
    let hash = hex::encode(hasher.finalize());
    hash[..12].to_string()
}

/// Full key set of one (platform, arch, version, packages) combination
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheKeys {
    pub unique: String,
    pub primary: String,
    pub secondary: String,
    pub old_primary: String,
    pub old_secondary: String,
}

/// How a restore turned out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restoration {
    /// Same package set; nothing to install
    Hit,
    /// Same release, different package set
    Partial,
    Miss,
}

impl fmt::Display for Restoration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Hit => "hit",
            Self::Partial => "partial",
            Self::Miss => "miss",
        };
        f.write_str(text)
    }
}

impl CacheKeys {
    /// Fallback keys in lookup order
    pub fn restore_keys(&self) -> Vec<String> {
        vec![
            self.primary.clone(),
            self.old_primary.clone(),
            self.secondary.clone(),
            self.old_secondary.clone(),
        ]
    }

    /// Classify the key a restore matched
    ///
    /// Legacy secondary matches count as partial like current ones.
    pub fn classify(&self, restored: Option<&str>) -> Restoration {
        match restored {
            None => Restoration::Miss,
            Some(key) if key.starts_with(&self.primary) || key.starts_with(&self.old_primary) => {
                Restoration::Hit
            }
            Some(_) => Restoration::Partial,
        }
    }
}

/// Computes key sets
pub struct CacheKeyManager;

impl CacheKeyManager {
    pub fn compute<S: AsRef<str>>(
        platform: Platform,
        arch: Arch,
        version: Version,
        packages: &[S],
    ) -> CacheKeys {
        let digest = digest(packages);
        let secondary = format!("{}-{}-{}-{}-", KEY_PREFIX, platform, arch, version);
        let old_secondary = format!("{}-{}-{}-{}-", LEGACY_KEY_PREFIX, platform, arch, version);
        let primary = format!("{}{}", secondary, digest);
        CacheKeys {
            unique: format!("{}-{}", primary, uuid::Uuid::new_v4().simple()),
            old_primary: format!("{}{}", old_secondary, digest),
            primary,
            secondary,
            old_secondary,
        }
    }
}
