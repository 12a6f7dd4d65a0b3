//! Package repository selection
//!
//! Current releases come from the CTAN mirror network with the master
//! origin as fallback. Past releases come from the historic archive with a
//! second archive host as fallback. An operator-supplied repository is used
//! as-is with no fallback.

use crate::error::{TlsetupError, TlsetupResult};
use crate::version::{Capability, ReleaseWindow, Version};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Load-balanced mirror network, redirects to a nearby mirror
pub const MIRROR_URL: &str = "https://mirror.ctan.org/systems/texlive/tlnet/";

/// Single high-availability origin
pub const MASTER_URL: &str = "https://ctan.math.illinois.edu/systems/texlive/tlnet/";

/// Permanent archive of past releases
pub const HISTORIC_URL: &str = "https://ftp.math.utah.edu/pub/tex/historic/";

/// Second archive host, updated directly from the master
pub const HISTORIC_MASTER_URL: &str = "https://ftp.tu-chemnitz.de/pub/tug/historic/";

/// Where a repository URL came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryKind {
    Mirror,
    Master,
    Historic,
    User,
}

impl fmt::Display for RepositoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mirror => "mirror",
            Self::Master => "master",
            Self::Historic => "historic",
            Self::User => "user",
        };
        write!(f, "{}", name)
    }
}

/// A package repository base URL, always ending in `/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    url: String,
    kind: RepositoryKind,
}

impl Repository {
    fn new(url: impl Into<String>, kind: RepositoryKind) -> Self {
        let mut url = url.into();
        if !url.ends_with('/') {
            url.push('/');
        }
        Self { url, kind }
    }

    /// The CTAN mirror network
    pub fn mirror() -> Self {
        Self::new(MIRROR_URL, RepositoryKind::Mirror)
    }

    /// The master origin
    pub fn master() -> Self {
        Self::new(MASTER_URL, RepositoryKind::Master)
    }

    /// The frozen repository of a past release
    pub fn historic(version: Version) -> Self {
        Self::historic_at(HISTORIC_URL, version)
    }

    /// The frozen repository of a past release on the second archive host
    pub fn historic_master(version: Version) -> Self {
        Self::historic_at(HISTORIC_MASTER_URL, version)
    }

    fn historic_at(base: &str, version: Version) -> Self {
        Self::new(
            format!("{}systems/texlive/{}/tlnet-final/", base, version),
            RepositoryKind::Historic,
        )
    }

    /// An operator-supplied repository
    pub fn user(url: impl Into<String>) -> Self {
        Self::new(url.into().trim(), RepositoryKind::User)
    }

    /// Same kind, different concrete URL (e.g. after redirect resolution)
    pub fn with_url(&self, url: impl Into<String>) -> Self {
        Self::new(url, self.kind)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn kind(&self) -> RepositoryKind {
        self.kind
    }

    /// URL of a file relative to the repository root
    pub fn join(&self, path: &str) -> String {
        format!("{}{}", self.url, path.trim_start_matches('/'))
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.url, self.kind)
    }
}

/// Computes ordered repository candidates for a release
#[derive(Debug, Clone, Copy)]
pub struct RepositoryLocator<'a> {
    window: &'a ReleaseWindow,
}

impl<'a> RepositoryLocator<'a> {
    pub fn new(window: &'a ReleaseWindow) -> Self {
        Self { window }
    }

    /// Candidates in the order they should be tried
    pub fn locate(
        &self,
        version: Version,
        user_override: Option<&str>,
    ) -> TlsetupResult<Vec<Repository>> {
        if let Some(url) = user_override.filter(|url| !url.trim().is_empty()) {
            if !version.supports(Capability::RepositoryOverride) {
                return Err(TlsetupError::RepositoryOverrideUnsupported(
                    version.to_string(),
                ));
            }
            return Ok(vec![Repository::user(url)]);
        }

        if version >= self.window.previous {
            // Mirrors lag behind a brand-new release; only the master has it.
            if version == self.window.next {
                return Ok(vec![Repository::master()]);
            }
            return Ok(vec![Repository::mirror(), Repository::master()]);
        }

        Ok(vec![
            Repository::historic(version),
            Repository::historic_master(version),
        ])
    }

    /// The repository to switch to when a current-year installation has
    /// fallen behind the network: the archive of its own release
    pub fn archive_of(&self, version: Version) -> Vec<Repository> {
        vec![
            Repository::historic(version),
            Repository::historic_master(version),
        ]
    }
}
