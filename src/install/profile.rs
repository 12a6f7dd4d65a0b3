//! Installer profile generation
//!
//! `install-tl -profile` reads a plain `key value` file. Releases before 2017
//! use the `option_*` names; later ones use `instopt_*` and `tlpdbopt_*`.

use crate::error::{TlsetupError, TlsetupResult};
use crate::version::{Capability, Version};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Directory layout of one installation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// `{prefix}/{version}`
    pub texdir: PathBuf,
    /// `{prefix}/texmf-local`, shared between releases
    pub texmflocal: PathBuf,
}

impl Layout {
    pub fn new(prefix: &Path, version: Version) -> Self {
        Self {
            texdir: prefix.join(version.to_string()),
            texmflocal: prefix.join("texmf-local"),
        }
    }

    pub fn sysconfig(&self) -> PathBuf {
        self.texdir.join("texmf-config")
    }

    pub fn sysvar(&self) -> PathBuf {
        self.texdir.join("texmf-var")
    }
}

/// Render the profile for an infrastructure-only install of `version`
pub fn render(layout: &Layout, version: Version) -> String {
    let config = layout.sysconfig();
    let var = layout.sysvar();
    let dirs = [
        ("TEXDIR", layout.texdir.as_path()),
        ("TEXMFLOCAL", layout.texmflocal.as_path()),
        ("TEXMFSYSCONFIG", config.as_path()),
        ("TEXMFSYSVAR", var.as_path()),
        ("TEXMFHOME", layout.texmflocal.as_path()),
        ("TEXMFCONFIG", config.as_path()),
        ("TEXMFVAR", var.as_path()),
    ];

    let mut out = String::from("selected_scheme scheme-infraonly\n");
    for (key, path) in dirs {
        // Forward slashes work for install-tl on every platform.
        let _ = writeln!(out, "{} {}", key, path.display().to_string().replace('\\', "/"));
    }

    let options: [(&str, &str); 5] = if version.supports(Capability::NewOptionNames) {
        [
            ("instopt_adjustpath", "0"),
            ("instopt_adjustrepo", "0"),
            ("tlpdbopt_autobackup", "0"),
            ("tlpdbopt_install_docfiles", "0"),
            ("tlpdbopt_install_srcfiles", "0"),
        ]
    } else {
        [
            ("option_path", "0"),
            ("option_adjustrepo", "0"),
            ("option_autobackup", "0"),
            ("option_doc", "0"),
            ("option_src", "0"),
        ]
    };
    for (key, value) in options {
        let _ = writeln!(out, "{} {}", key, value);
    }
    out
}

/// Write the profile into `dir` and return its path
pub async fn write(dir: &Path, layout: &Layout, version: Version) -> TlsetupResult<PathBuf> {
    fs::create_dir_all(dir)
        .await
        .map_err(|e| TlsetupError::DirCreate {
            path: dir.to_path_buf(),
            source: e,
        })?;
    let path = dir.join("texlive.profile");
    fs::write(&path, render(layout, version))
        .await
        .map_err(|e| TlsetupError::io(format!("writing {}", path.display()), e))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(year: u16) -> Version {
        Version::new(year).unwrap()
    }

    #[test]
    fn new_option_names() {
        let layout = Layout::new(Path::new("/opt/texlive"), v(2024));
        let profile = render(&layout, v(2024));
        assert!(profile.starts_with("selected_scheme scheme-infraonly\n"));
        assert!(profile.contains("TEXDIR /opt/texlive/2024\n"));
        assert!(profile.contains("TEXMFLOCAL /opt/texlive/texmf-local\n"));
        assert!(profile.contains("TEXMFSYSVAR /opt/texlive/2024/texmf-var\n"));
        assert!(profile.contains("tlpdbopt_install_docfiles 0\n"));
        assert!(!profile.contains("option_doc"));
    }

    #[test]
    fn old_option_names() {
        let layout = Layout::new(Path::new("/opt/texlive"), v(2016));
        let profile = render(&layout, v(2016));
        assert!(profile.contains("option_doc 0\n"));
        assert!(profile.contains("option_path 0\n"));
        assert!(!profile.contains("instopt_"));
    }

    #[tokio::test]
    async fn writes_profile_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let layout = Layout::new(temp.path(), v(2020));
        let path = write(&temp.path().join("work"), &layout, v(2020)).await.unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content, render(&layout, v(2020)));
    }
}
