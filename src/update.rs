//! Bringing a restored installation up to date
//!
//! A restored installation may be older than what the mirrors serve now.
//! When `tlmgr` says so, the installation is pointed at the frozen archive
//! of its own release and the cache entry is marked for a fresh save.

use crate::cache::CacheEntry;
use crate::classify::{ErrorKind, Outcome};
use crate::error::{TlsetupError, TlsetupResult};
use crate::repository::{Repository, RepositoryLocator};
use crate::tlmgr::{RepositoryTag, Tlmgr, MAIN_TAG};
use crate::version::{Capability, ReleaseWindow, Version};
use futures_util::future::join;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

static CONTRIB_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)contrib\S*/(?P<year>\d{4})/?$").expect("contrib pattern is valid")
});

/// Whether `url` is a staging channel that has served its purpose
///
/// Pretest repositories are obsolete once their release ships. Contrib
/// archives of an earlier year do not match the installed release.
pub fn is_retired_channel(url: &str, version: Version, window: &ReleaseWindow) -> bool {
    if url.contains("tlpretest") {
        return version <= window.latest;
    }
    CONTRIB_YEAR
        .captures(url)
        .and_then(|caps| caps["year"].parse::<Version>().ok())
        .is_some_and(|year| year < version)
}

/// Tags to remove from `tags`; the main repository is never removed
pub fn retired_tags<'t>(
    tags: &'t [RepositoryTag],
    version: Version,
    window: &ReleaseWindow,
) -> Vec<&'t RepositoryTag> {
    tags.iter()
        .filter(|t| t.tag != MAIN_TAG && is_retired_channel(&t.url, version, window))
        .collect()
}

/// Updates the `tlmgr` metadata of a restored installation
pub struct UpdateOrchestrator<'a> {
    tlmgr: &'a Tlmgr,
    window: &'a ReleaseWindow,
    user_override: Option<&'a str>,
}

impl<'a> UpdateOrchestrator<'a> {
    pub fn new(tlmgr: &'a Tlmgr, window: &'a ReleaseWindow, user_override: Option<&'a str>) -> Self {
        Self {
            tlmgr,
            window,
            user_override: user_override.filter(|url| !url.trim().is_empty()),
        }
    }

    /// Run the warm-path update, recording forced saves in `entry`
    pub async fn update(&self, entry: &mut CacheEntry, update_all: bool) -> TlsetupResult<()> {
        let version = self.tlmgr.version();

        if let Some(url) = self.user_override {
            info!("Using repository {}", url);
            self.tlmgr.set_repository(url).await?.into_result()?;
        }

        if self.window.is_frozen(version) {
            debug!("TeX Live {} is frozen, skipping self update", version);
        } else if version.supports(Capability::SelfUpdate) {
            self.update_self(entry).await?;
        }

        if update_all {
            info!("Updating all packages");
            self.tlmgr.update_all().await?.into_result()?;
            entry.forced_update = true;
        }

        self.adjust_tags().await;
        Ok(())
    }

    async fn update_self(&self, entry: &mut CacheEntry) -> TlsetupResult<()> {
        match self.tlmgr.update_self().await? {
            Outcome::Success(_) => Ok(()),
            Outcome::Recoverable(e)
                if e.kind() == ErrorKind::InstalledVersionOlder && self.user_override.is_none() =>
            {
                warn!("Self update failed: {}", e.kind());
                self.move_to_archive().await?;
                entry.forced_update = true;
                Ok(())
            }
            Outcome::Recoverable(e) | Outcome::Fatal(e) => Err(e.into()),
        }
    }

    /// Point the installation at the archive of its own release
    async fn move_to_archive(&self) -> TlsetupResult<()> {
        let version = self.tlmgr.version();
        let candidates = RepositoryLocator::new(self.window).archive_of(version);
        for (i, repository) in candidates.iter().enumerate() {
            info!("Switching repository to {}", repository);
            self.tlmgr
                .set_repository(repository.url())
                .await?
                .into_result()?;
            match self.tlmgr.update_self().await? {
                Outcome::Success(_) => return Ok(()),
                Outcome::Recoverable(e)
                    if e.kind() == ErrorKind::RepositoryNotInitialized
                        && i + 1 < candidates.len() =>
                {
                    warn!("{} is not ready yet: {}", repository, e.kind());
                }
                Outcome::Recoverable(e) | Outcome::Fatal(e) => return Err(e.into()),
            }
        }
        Err(TlsetupError::NoCandidates(version.to_string()))
    }

    /// Drop repositories of retired staging channels
    ///
    /// Never fails; problems are logged.
    pub async fn adjust_tags(&self) {
        let version = self.tlmgr.version();
        if !version.supports(Capability::RepositoryTags) {
            return;
        }

        let (tags, main) = join(self.tlmgr.repository_list(), self.tlmgr.repository()).await;

        match tags {
            Ok(Outcome::Success(tags)) => {
                for tag in retired_tags(&tags, version, self.window) {
                    info!("Removing retired repository {} ({})", tag.url, tag.tag);
                    match self.tlmgr.repository_remove(&tag.tag).await {
                        Ok(Outcome::Success(_)) => {}
                        Ok(Outcome::Recoverable(e) | Outcome::Fatal(e)) => {
                            warn!("Failed to remove repository {}: {}", tag.tag, e)
                        }
                        Err(e) => warn!("Failed to remove repository {}: {}", tag.tag, e),
                    }
                }
            }
            Ok(Outcome::Recoverable(e) | Outcome::Fatal(e)) => {
                warn!("Failed to list repositories: {}", e)
            }
            Err(e) => warn!("Failed to list repositories: {}", e),
        }

        if self.user_override.is_some() {
            return;
        }
        if let Ok(Outcome::Success(Some(url))) = main {
            if is_retired_channel(&url, version, self.window) {
                let target = if version < self.window.latest {
                    Repository::historic(version)
                } else {
                    Repository::master()
                };
                info!("Main repository {} is retired, switching to {}", url, target);
                if let Err(e) = self.tlmgr.set_repository(target.url()).await.and_then(|o| {
                    o.into_result().map_err(TlsetupError::from)
                }) {
                    warn!("Failed to reset main repository: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{HISTORIC_MASTER_URL, HISTORIC_URL};
    use crate::testing::{exit, stdout, ScriptedRunner};
    use std::path::PathBuf;
    use std::sync::Arc;

    const OLDER: &str = "tlmgr: Local TeX Live (2025) is older than remote repository (2026).";
    const NOT_READY: &str = "could not initialize from: https://ftp.math.utah.edu/x/tlpkg/texlive.tlpdb";

    fn v(year: u16) -> Version {
        Version::new(year).unwrap()
    }

    fn window() -> ReleaseWindow {
        ReleaseWindow::new(v(2026))
    }

    fn tlmgr(runner: &Arc<ScriptedRunner>, year: u16) -> Tlmgr {
        Tlmgr::new(runner.clone(), PathBuf::from("tlmgr"), v(year))
    }

    #[test]
    fn retired_channels() {
        let w = window();
        let pretest = "https://ftp.math.utah.edu/pub/tlpretest/";
        assert!(is_retired_channel(pretest, v(2026), &w));
        assert!(!is_retired_channel(pretest, v(2027), &w));
        let contrib = "https://contrib.texlive.info/historic/2024/";
        assert!(is_retired_channel(contrib, v(2025), &w));
        assert!(!is_retired_channel(contrib, v(2024), &w));
        assert!(!is_retired_channel("https://mirror.ctan.org/systems/texlive/tlnet/", v(2026), &w));
    }

    #[test]
    fn main_tag_is_kept() {
        let tags = vec![
            RepositoryTag {
                url: "https://x/tlpretest/".into(),
                tag: MAIN_TAG.into(),
            },
            RepositoryTag {
                url: "https://x/tlpretest/".into(),
                tag: "pretest".into(),
            },
        ];
        let retired = retired_tags(&tags, v(2026), &window());
        assert_eq!(retired.len(), 1);
        assert_eq!(retired[0].tag, "pretest");
    }

    #[tokio::test]
    async fn self_update_success() {
        let runner = Arc::new(ScriptedRunner::default());
        let tl = tlmgr(&runner, 2026);
        let w = window();
        let mut entry = CacheEntry::default();
        UpdateOrchestrator::new(&tl, &w, None).update(&mut entry, false).await.unwrap();
        assert_eq!(runner.count("update --self"), 1);
        assert!(!entry.forced_update);
    }

    #[tokio::test]
    async fn older_installation_moves_to_archive() {
        let runner = Arc::new(
            ScriptedRunner::default().on("update --self", vec![exit(1, OLDER), exit(0, "")]),
        );
        let tl = tlmgr(&runner, 2025);
        let w = window();
        let mut entry = CacheEntry::default();
        UpdateOrchestrator::new(&tl, &w, None).update(&mut entry, false).await.unwrap();

        assert!(entry.forced_update);
        let archive = Repository::historic(v(2025));
        assert!(archive.url().starts_with(HISTORIC_URL));
        assert_eq!(runner.count(&format!("option repository {}", archive.url())), 1);
        assert_eq!(runner.count("update --self"), 2);
    }

    #[tokio::test]
    async fn archive_not_ready_uses_second_host() {
        let runner = Arc::new(ScriptedRunner::default().on(
            "update --self",
            vec![exit(1, OLDER), exit(1, NOT_READY), exit(0, "")],
        ));
        let tl = tlmgr(&runner, 2025);
        let w = window();
        let mut entry = CacheEntry::default();
        UpdateOrchestrator::new(&tl, &w, None).update(&mut entry, false).await.unwrap();

        assert!(entry.forced_update);
        let second = Repository::historic_master(v(2025));
        assert!(second.url().starts_with(HISTORIC_MASTER_URL));
        assert_eq!(runner.count(&format!("option repository {}", second.url())), 1);
        assert_eq!(runner.count("update --self"), 3);
    }

    #[tokio::test]
    async fn older_installation_with_override_is_fatal() {
        let runner = Arc::new(ScriptedRunner::default().on("update --self", vec![exit(1, OLDER)]));
        let tl = tlmgr(&runner, 2025);
        let w = window();
        let mut entry = CacheEntry::default();
        let err = UpdateOrchestrator::new(&tl, &w, Some("https://my.mirror/tlnet/"))
            .update(&mut entry, false)
            .await
            .unwrap_err();
        assert_eq!(err.classified().map(|e| e.kind()), Some(ErrorKind::InstalledVersionOlder));
        assert_eq!(runner.count("option repository https://my.mirror/tlnet/"), 1);
        assert_eq!(runner.count(HISTORIC_URL), 0);
    }

    #[tokio::test]
    async fn frozen_release_skips_self_update() {
        let runner = Arc::new(ScriptedRunner::default());
        let tl = tlmgr(&runner, 2015);
        let w = window();
        let mut entry = CacheEntry::default();
        UpdateOrchestrator::new(&tl, &w, None).update(&mut entry, false).await.unwrap();
        assert_eq!(runner.count("update --self"), 0);
    }

    #[tokio::test]
    async fn update_all_forces_save() {
        let runner = Arc::new(ScriptedRunner::default());
        let tl = tlmgr(&runner, 2026);
        let w = window();
        let mut entry = CacheEntry::default();
        UpdateOrchestrator::new(&tl, &w, None).update(&mut entry, true).await.unwrap();
        assert_eq!(runner.count("update --all"), 1);
        assert!(entry.forced_update);
    }

    #[tokio::test]
    async fn tag_cleanup_removes_retired_channels_and_tolerates_failures() {
        let list = "List of repositories (with tags if set):\n\
                    \thttps://mirror.ctan.org/systems/texlive/tlnet (main)\n\
                    \thttps://ftp.math.utah.edu/pub/tlpretest (pretest)\n\
                    \thttps://contrib.texlive.info/historic/2024 (tlcontrib)\n";
        let runner = Arc::new(
            ScriptedRunner::default()
                .on("repository list", vec![stdout(list)])
                .on("repository remove pretest", vec![exit(1, "cannot remove")]),
        );
        let tl = tlmgr(&runner, 2026);
        let w = window();
        UpdateOrchestrator::new(&tl, &w, None).adjust_tags().await;
        assert_eq!(runner.count("repository remove pretest"), 1);
        assert_eq!(runner.count("repository remove tlcontrib"), 1);
        assert_eq!(runner.count("repository remove main"), 0);
    }

    #[tokio::test]
    async fn retired_main_repository_is_reset() {
        let runner = Arc::new(ScriptedRunner::default().on(
            "option repository",
            vec![stdout("Default package repository (repository): https://x/tlpretest\n")],
        ));
        let tl = tlmgr(&runner, 2026);
        let w = window();
        UpdateOrchestrator::new(&tl, &w, None).adjust_tags().await;
        assert_eq!(
            runner.count(&format!("option repository {}", Repository::master().url())),
            1
        );
    }

    #[tokio::test]
    async fn retired_main_repository_of_past_release_moves_to_archive() {
        let runner = Arc::new(ScriptedRunner::default().on(
            "option repository",
            vec![stdout(
                "Default package repository (repository): https://contrib.texlive.info/historic/2023/\n",
            )],
        ));
        let tl = tlmgr(&runner, 2024);
        let w = window();
        UpdateOrchestrator::new(&tl, &w, None).adjust_tags().await;
        assert_eq!(
            runner.count(&format!("option repository {}", Repository::historic(v(2024)).url())),
            1
        );
        assert_eq!(
            runner.count(&format!("option repository {}", Repository::master().url())),
            0
        );
    }
}
