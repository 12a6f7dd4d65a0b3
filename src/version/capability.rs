//! Release-year capability table
//!
//! Every behavior that differs between TeX Live releases is listed here once
//! as a `{min, max, capability}` fact and looked up by name.

use super::Version;
use std::fmt;

/// A behavior that only some TeX Live releases have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// `install-tl -repository` (older releases only know `-location`)
    RepositoryFlag,
    /// A user-supplied repository can be honored at all
    RepositoryOverride,
    /// `tlmgr update --self`
    SelfUpdate,
    /// Profile keys `instopt_*` / `tlpdbopt_*` instead of `option_*`
    NewOptionNames,
    /// `install-tl -no-interaction` instead of `-no-gui`
    NoInteractionFlag,
    /// `tlmgr repository list|add|remove` and `tlmgr option repository`
    RepositoryTags,
    /// Windows launcher named `install-tl.bat`
    LegacyWindowsLauncher,
    /// macOS binaries live in `bin/universal-darwin`
    UniversalDarwin,
    /// Windows binaries live in `bin/windows` instead of `bin/win32`
    WindowsBinDir,
    /// Release runs on current macOS
    MacOsSupported,
    /// Old Perl modules use `defined(@array)`, fatal on Perl >= 5.22
    DefinedArrayPerl,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

struct Fact {
    capability: Capability,
    min: Option<u16>,
    max: Option<u16>,
}

const fn since(capability: Capability, min: u16) -> Fact {
    Fact {
        capability,
        min: Some(min),
        max: None,
    }
}

const fn until(capability: Capability, max: u16) -> Fact {
    Fact {
        capability,
        min: None,
        max: Some(max),
    }
}

/// Ordered by capability name
const FACTS: &[Fact] = &[
    until(Capability::DefinedArrayPerl, 2014),
    until(Capability::LegacyWindowsLauncher, 2012),
    since(Capability::MacOsSupported, 2013),
    since(Capability::NewOptionNames, 2017),
    since(Capability::NoInteractionFlag, 2023),
    since(Capability::RepositoryFlag, 2012),
    since(Capability::RepositoryOverride, 2012),
    since(Capability::RepositoryTags, 2012),
    since(Capability::SelfUpdate, 2008),
    since(Capability::UniversalDarwin, 2021),
    since(Capability::WindowsBinDir, 2023),
];

/// Whether `version` has `capability`
pub(super) fn supports(version: Version, capability: Capability) -> bool {
    let year = version.year();
    FACTS
        .iter()
        .filter(|fact| fact.capability == capability)
        .any(|fact| {
            fact.min.map_or(true, |min| year >= min) && fact.max.map_or(true, |max| year <= max)
        })
}
