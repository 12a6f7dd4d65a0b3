//! Installer archive extraction

use crate::error::{TlsetupError, TlsetupResult};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tar::Archive;

/// Unpack `archive` into `dest` and return the installer root inside it
///
/// Network installer archives contain a single `install-tl-YYYYMMDD/`
/// directory; its path is returned.
pub async fn extract_installer(archive: &Path, dest: &Path) -> TlsetupResult<PathBuf> {
    let archive = archive.to_path_buf();
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || {
        unpack(&archive, &dest)?;
        installer_root(&dest).ok_or_else(|| TlsetupError::Extract {
            archive: archive.display().to_string(),
            reason: "no install-tl directory in archive".to_string(),
        })
    })
    .await
    .map_err(|e| TlsetupError::Internal(format!("extraction task failed: {}", e)))?
}

fn unpack(archive: &Path, dest: &Path) -> TlsetupResult<()> {
    let extract_err = |reason: String| TlsetupError::Extract {
        archive: archive.display().to_string(),
        reason,
    };
    fs::create_dir_all(dest).map_err(|e| TlsetupError::DirCreate {
        path: dest.to_path_buf(),
        source: e,
    })?;
    let file = File::open(archive)
        .map_err(|e| TlsetupError::io(format!("opening {}", archive.display()), e))?;

    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if name.ends_with(".zip") {
        let mut zip = zip::ZipArchive::new(BufReader::new(file))
            .map_err(|e| extract_err(e.to_string()))?;
        zip.extract(dest).map_err(|e| extract_err(e.to_string()))
    } else {
        let mut tar = Archive::new(GzDecoder::new(BufReader::new(file)));
        tar.set_preserve_permissions(true);
        tar.unpack(dest).map_err(|e| extract_err(e.to_string()))
    }
}

fn installer_root(dest: &Path) -> Option<PathBuf> {
    fs::read_dir(dest)
        .ok()?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .find(|path| {
            path.is_dir()
                && path
                    .file_name()
                    .is_some_and(|n| n.to_string_lossy().starts_with("install-tl"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::TempDir;

    fn write_tar_gz(path: &Path, files: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        for (name, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append_data(&mut header, name, content.as_bytes()).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[tokio::test]
    async fn finds_installer_root() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("install-tl-unx.tar.gz");
        write_tar_gz(
            &archive,
            &[
                ("install-tl-20240312/install-tl", "#!/usr/bin/env perl\n"),
                (
                    "install-tl-20240312/release-texlive.txt",
                    "TeX Live (https://tug.org/texlive) version 2024\n",
                ),
            ],
        );

        let root = extract_installer(&archive, &temp.path().join("out")).await.unwrap();
        assert!(root.ends_with("install-tl-20240312"));
        assert!(root.join("install-tl").is_file());
    }

    #[tokio::test]
    async fn archive_without_installer_is_an_error() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("install-tl-unx.tar.gz");
        write_tar_gz(&archive, &[("README", "nothing here")]);

        let err = extract_installer(&archive, &temp.path().join("out"))
            .await
            .unwrap_err();
        assert!(matches!(err, TlsetupError::Extract { .. }));
    }

    #[tokio::test]
    async fn corrupt_archive_is_an_error() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("install-tl-unx.tar.gz");
        fs::write(&archive, b"<html>503 Service Unavailable</html>").unwrap();

        assert!(extract_installer(&archive, &temp.path().join("out")).await.is_err());
    }
}
