//! TeX Live release years
//!
//! A [`Version`] is always a concrete year. The "latest" sentinel only exists
//! as a [`VersionRequest`] and is resolved against the [`ReleaseWindow`]
//! before anything else looks at it.

pub mod capability;
pub mod catalog;

pub use capability::Capability;
pub use catalog::{ReleaseWindow, VersionCatalog};

use crate::error::{TlsetupError, TlsetupResult};
use crate::platform::Platform;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Oldest release with a usable network installer
pub const OLDEST: u16 = 2008;

/// A concrete TeX Live release year
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Version(u16);

impl Version {
    /// Construct a release year, rejecting anything before 2008
    pub fn new(year: u16) -> TlsetupResult<Self> {
        if !(OLDEST..=9999).contains(&year) {
            return Err(TlsetupError::UnsupportedVersion {
                version: year.to_string(),
                platform_note: String::new(),
            });
        }
        Ok(Self(year))
    }

    /// Construct a release year that must also run on `platform`
    pub fn for_platform(year: u16, platform: Platform) -> TlsetupResult<Self> {
        let version = Self::new(year)?;
        if platform == Platform::MacOS && !version.supports(Capability::MacOsSupported) {
            return Err(TlsetupError::UnsupportedVersion {
                version: version.to_string(),
                platform_note: format!(" on {}", platform.name()),
            });
        }
        Ok(version)
    }

    /// The release year as a number
    pub fn year(self) -> u16 {
        self.0
    }

    /// Whether this release has `capability`
    pub fn supports(self, capability: Capability) -> bool {
        capability::supports(self, capability)
    }

    /// The following release
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// The preceding release (saturates at the oldest supported year)
    pub fn prev(self) -> Self {
        Self(self.0.saturating_sub(1).max(OLDEST))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

impl FromStr for Version {
    type Err = TlsetupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TlsetupError::InvalidVersion(s.to_string()));
        }
        let year: u16 = s
            .parse()
            .map_err(|_| TlsetupError::InvalidVersion(s.to_string()))?;
        Self::new(year)
    }
}

impl TryFrom<u16> for Version {
    type Error = TlsetupError;

    fn try_from(year: u16) -> Result<Self, Self::Error> {
        Self::new(year)
    }
}

impl From<Version> for u16 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// The version asked for by the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionRequest {
    /// Whatever the release window says is current
    Latest,
    /// A pinned release year
    Year(Version),
}

impl VersionRequest {
    /// Whether the operator pinned a release year
    pub fn is_pinned(&self) -> bool {
        matches!(self, Self::Year(_))
    }

    /// Resolve to a concrete year valid for `platform`
    ///
    /// Pinned years past `window.next` are rejected; `next` itself is allowed
    /// so that a release can be used before it is officially announced.
    pub fn resolve(&self, window: &ReleaseWindow, platform: Platform) -> TlsetupResult<Version> {
        let version = match self {
            Self::Latest => window.latest,
            Self::Year(version) => *version,
        };
        if version > window.next {
            return Err(TlsetupError::UnsupportedVersion {
                version: version.to_string(),
                platform_note: format!(" (newest known release is {})", window.latest),
            });
        }
        Version::for_platform(version.year(), platform)
    }
}

impl FromStr for VersionRequest {
    type Err = TlsetupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("latest") {
            return Ok(Self::Latest);
        }
        s.parse().map(Self::Year)
    }
}

impl fmt::Display for VersionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => write!(f, "latest"),
            Self::Year(version) => write!(f, "{}", version),
        }
    }
}
