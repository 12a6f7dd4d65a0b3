//! Host platform detection
//!
//! TeX Live names its binary directories and installer launchers
//! differently per operating system and release year.

use crate::error::{TlsetupError, TlsetupResult};
use crate::version::{Capability, Version};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Detected operating system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    MacOS,
    Windows,
}

impl Platform {
    /// Detect the current platform
    pub fn detect() -> TlsetupResult<Self> {
        match std::env::consts::OS {
            "linux" => Ok(Platform::Linux),
            "macos" => Ok(Platform::MacOS),
            "windows" => Ok(Platform::Windows),
            other => Err(TlsetupError::UnsupportedPlatform(other.to_string())),
        }
    }

    /// Get a human-readable platform name
    pub fn name(&self) -> &'static str {
        match self {
            Platform::Linux => "Linux",
            Platform::MacOS => "macOS",
            Platform::Windows => "Windows",
        }
    }

    /// File name of the installer archive served by every repository
    pub fn installer_archive(&self) -> &'static str {
        match self {
            Platform::Windows => "install-tl.zip",
            Platform::Linux | Platform::MacOS => "install-tl-unx.tar.gz",
        }
    }

    /// Executable name of the installer launcher for a release
    pub fn installer_executable(&self, version: Version) -> &'static str {
        match self {
            Platform::Windows if version.supports(Capability::LegacyWindowsLauncher) => {
                "install-tl.bat"
            }
            Platform::Windows => "install-tl-windows.bat",
            Platform::Linux | Platform::MacOS => "install-tl",
        }
    }

    /// Executable name of the package manager
    pub fn tlmgr_executable(&self) -> &'static str {
        match self {
            Platform::Windows => "tlmgr.bat",
            Platform::Linux | Platform::MacOS => "tlmgr",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Linux => "linux",
            Platform::MacOS => "macos",
            Platform::Windows => "windows",
        };
        write!(f, "{}", name)
    }
}

/// CPU architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    X86_64,
    Aarch64,
}

impl Arch {
    /// Detect the current architecture
    pub fn detect() -> TlsetupResult<Self> {
        match std::env::consts::ARCH {
            "x86_64" => Ok(Arch::X86_64),
            "aarch64" => Ok(Arch::Aarch64),
            other => Err(TlsetupError::UnsupportedPlatform(format!(
                "{} ({})",
                std::env::consts::OS,
                other
            ))),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arch::X86_64 => write!(f, "x86_64"),
            Arch::Aarch64 => write!(f, "aarch64"),
        }
    }
}

/// Name of the directory under `TEXDIR/bin` holding the executables
pub fn bin_dir_name(platform: Platform, arch: Arch, version: Version) -> String {
    match platform {
        Platform::Linux => format!("{}-linux", arch),
        Platform::MacOS if version.supports(Capability::UniversalDarwin) => {
            "universal-darwin".to_string()
        }
        Platform::MacOS => format!("{}-darwin", arch),
        Platform::Windows if version.supports(Capability::WindowsBinDir) => "windows".to_string(),
        Platform::Windows => "win32".to_string(),
    }
}
