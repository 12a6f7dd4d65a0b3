//! Fresh installation with repository fallback
//!
//! Candidates are tried in order by a small state machine. A recoverable
//! failure moves to the next candidate; a fatal failure, or a recoverable one
//! on the last candidate, ends the run with that failure unchanged.

pub mod profile;

pub use profile::Layout;

use crate::acquire::{Acquirer, Installer, VersionCheck};
use crate::classify::{ClassifiedError, ErrorClassifier, Outcome, Tool};
use crate::error::{TlsetupError, TlsetupResult};
use crate::exec::{ExecOptions, ProcessRunner};
use crate::http::HttpClient;
use crate::repository::{Repository, RepositoryKind};
use crate::version::{Capability, Version};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Where the fallback loop is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Start,
    TryCandidate(usize),
    Success,
    Fatal,
}

/// What happened in the current state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Started,
    Succeeded,
    Failed { recoverable: bool },
}

/// Next state given `candidates` repositories in total
pub fn transition(state: State, event: Event, candidates: usize) -> State {
    match (state, event) {
        (State::Start, Event::Started) if candidates > 0 => State::TryCandidate(0),
        (State::Start, _) => State::Fatal,
        (State::TryCandidate(_), Event::Succeeded) => State::Success,
        (State::TryCandidate(i), Event::Failed { recoverable: true }) if i + 1 < candidates => {
            State::TryCandidate(i + 1)
        }
        (State::TryCandidate(_), _) => State::Fatal,
        (terminal, _) => terminal,
    }
}

/// Result of a successful installation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Release actually installed
    pub version: Version,
    /// Repository the installation came from
    pub repository: Repository,
    /// Number of candidates tried
    pub attempts: usize,
    /// The installer reported a newer release than requested
    pub corrected: bool,
}

/// Drives `install-tl` over repository candidates
pub struct InstallOrchestrator {
    acquirer: Acquirer,
    http: Arc<dyn HttpClient>,
    runner: Arc<dyn ProcessRunner>,
    prefix: PathBuf,
    work_dir: PathBuf,
}

impl InstallOrchestrator {
    pub fn new(
        acquirer: Acquirer,
        http: Arc<dyn HttpClient>,
        runner: Arc<dyn ProcessRunner>,
        prefix: PathBuf,
        work_dir: PathBuf,
    ) -> Self {
        Self {
            acquirer,
            http,
            runner,
            prefix,
            work_dir,
        }
    }

    /// Install `version` from the first candidate that works
    ///
    /// `pinned` disables the installer version check.
    pub async fn install(
        &self,
        version: Version,
        pinned: bool,
        candidates: &[Repository],
    ) -> TlsetupResult<InstallReport> {
        let total = candidates.len();
        let mut state = State::Start;
        let mut attempts = 0;
        let mut installed = None;
        let mut last_error: Option<ClassifiedError> = None;

        loop {
            state = match state {
                State::Start => transition(state, Event::Started, total),
                State::TryCandidate(i) => {
                    attempts += 1;
                    let check = if pinned {
                        VersionCheck::Pinned
                    } else if i + 1 < total {
                        VersionCheck::Strict
                    } else {
                        VersionCheck::AcceptNewer
                    };
                    match self.attempt(version, &candidates[i], check).await? {
                        Outcome::Success(report) => {
                            installed = Some(report);
                            transition(state, Event::Succeeded, total)
                        }
                        Outcome::Recoverable(e) => {
                            warn!("Installation from {} failed: {}", candidates[i], e.kind());
                            last_error = Some(e);
                            transition(state, Event::Failed { recoverable: true }, total)
                        }
                        Outcome::Fatal(e) => {
                            last_error = Some(e);
                            transition(state, Event::Failed { recoverable: false }, total)
                        }
                    }
                }
                State::Success => {
                    let (installed, repository) = installed.ok_or_else(|| {
                        TlsetupError::Internal("installation finished without a result".into())
                    })?;
                    if installed != version {
                        info!("Installed TeX Live {} (requested {})", installed, version);
                    }
                    return Ok(InstallReport {
                        version: installed,
                        repository,
                        attempts,
                        corrected: installed != version,
                    });
                }
                State::Fatal => {
                    return Err(match last_error {
                        Some(e) => e.into(),
                        None => TlsetupError::NoCandidates(version.to_string()),
                    })
                }
            };
        }
    }

    /// One candidate: acquire the installer and run it
    async fn attempt(
        &self,
        version: Version,
        candidate: &Repository,
        check: VersionCheck,
    ) -> TlsetupResult<Outcome<(Version, Repository)>> {
        let repository = if candidate.kind() == RepositoryKind::Mirror {
            // Pin one concrete mirror so the installer and later tlmgr calls agree.
            match self.http.resolve(candidate.url()).await {
                Ok(url) => candidate.with_url(url),
                Err(e) => {
                    return Ok(Outcome::failed(ErrorClassifier::download_failed(
                        "resolve mirror",
                        candidate.url(),
                        e,
                    )))
                }
            }
        } else {
            candidate.clone()
        };
        info!("Installing TeX Live {} from {}", version, repository);

        let installer = match self.acquirer.acquire(version, &repository, check).await? {
            Outcome::Success(installer) => installer,
            Outcome::Recoverable(e) => return Ok(Outcome::Recoverable(e)),
            Outcome::Fatal(e) => return Ok(Outcome::Fatal(e)),
        };
        let installed = installer.version;
        let outcome = self.run_installer(&installer, &repository).await?;
        Ok(outcome.map(|_| (installed, repository)))
    }

    async fn run_installer(
        &self,
        installer: &Installer,
        repository: &Repository,
    ) -> TlsetupResult<Outcome> {
        let layout = Layout::new(&self.prefix, installer.version);
        let profile = profile::write(&self.work_dir, &layout, installer.version).await?;
        let args = installer_args(installer.version, &profile, repository);
        let options = ExecOptions {
            cwd: Some(installer.dir.clone()),
            stdin: None,
            env: vec![
                ("TEXLIVE_INSTALL_ENV_NOCHECK".to_string(), "1".to_string()),
                ("TEXLIVE_INSTALL_NO_WELCOME".to_string(), "1".to_string()),
            ],
        };
        let program = installer.executable.display().to_string();
        let output = self.runner.exec(&program, &args, &options).await?;
        Ok(ErrorClassifier::classify(Tool::Installer, "install-tl", output))
    }
}

/// Command-line arguments for `install-tl`
pub fn installer_args(version: Version, profile: &Path, repository: &Repository) -> Vec<String> {
    let interaction = if version.supports(Capability::NoInteractionFlag) {
        "-no-interaction"
    } else {
        "-no-gui"
    };
    let location = if version.supports(Capability::RepositoryFlag) {
        "-repository"
    } else {
        "-location"
    };
    vec![
        interaction.to_string(),
        "-profile".to_string(),
        profile.display().to_string(),
        location.to_string(),
        repository.url().to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ErrorKind;
    use crate::platform::Platform;
    use crate::repository::MIRROR_URL;
    use crate::testing::{exit, installer_archive, FakeHttp, MemoryToolCache, ScriptedRunner};
    use tempfile::TempDir;

    fn v(year: u16) -> Version {
        Version::new(year).unwrap()
    }

    fn orchestrator(http: FakeHttp, runner: Arc<ScriptedRunner>, temp: &TempDir) -> InstallOrchestrator {
        let http = Arc::new(http);
        let acquirer = Acquirer::new(
            http.clone(),
            Arc::new(MemoryToolCache::default()),
            Platform::Linux,
            temp.path().join("work"),
        );
        InstallOrchestrator::new(
            acquirer,
            http,
            runner,
            temp.path().join("texlive"),
            temp.path().join("work"),
        )
    }

    fn archive_url(repo: &Repository) -> String {
        repo.join("install-tl-unx.tar.gz")
    }

    #[test]
    fn transitions() {
        let failed = |recoverable| Event::Failed { recoverable };
        assert_eq!(transition(State::Start, Event::Started, 2), State::TryCandidate(0));
        assert_eq!(transition(State::Start, Event::Started, 0), State::Fatal);
        assert_eq!(transition(State::TryCandidate(0), failed(true), 2), State::TryCandidate(1));
        assert_eq!(transition(State::TryCandidate(1), failed(true), 2), State::Fatal);
        assert_eq!(transition(State::TryCandidate(0), failed(false), 2), State::Fatal);
        assert_eq!(transition(State::TryCandidate(1), Event::Succeeded, 2), State::Success);
        assert_eq!(transition(State::Success, failed(true), 2), State::Success);
        assert_eq!(transition(State::Fatal, Event::Succeeded, 2), State::Fatal);
    }

    #[test]
    fn installer_flags_follow_capabilities() {
        let repo = Repository::master();
        let profile = Path::new("/tmp/texlive.profile");
        let new = installer_args(v(2024), profile, &repo);
        assert_eq!(new[0], "-no-interaction");
        assert_eq!(new[3], "-repository");

        let old = installer_args(v(2011), profile, &repo);
        assert_eq!(old[0], "-no-gui");
        assert_eq!(old[3], "-location");
    }

    #[tokio::test]
    async fn not_initialized_falls_back_to_second_candidate() {
        let temp = TempDir::new().unwrap();
        let candidates = [Repository::historic(v(2015)), Repository::historic_master(v(2015))];
        let http = FakeHttp::default()
            .with_file(&archive_url(&candidates[0]), installer_archive(2015))
            .with_file(&archive_url(&candidates[1]), installer_archive(2015));
        let runner = Arc::new(ScriptedRunner::default().on(
            "ftp.math.utah.edu",
            vec![exit(1, "TLPDB::from_file could not initialize from: https://ftp.math.utah.edu/x")],
        ));

        let report = orchestrator(http, runner.clone(), &temp)
            .install(v(2015), true, &candidates)
            .await
            .unwrap();
        assert_eq!(report.attempts, 2);
        assert_eq!(report.repository, candidates[1]);
        assert!(!report.corrected);
        assert_eq!(runner.count("install-tl"), 2);
    }

    #[tokio::test]
    async fn unclassified_failure_stops_after_one_attempt() {
        let temp = TempDir::new().unwrap();
        let candidates = [Repository::historic(v(2015)), Repository::historic_master(v(2015))];
        let http = FakeHttp::default()
            .with_file(&archive_url(&candidates[0]), installer_archive(2015))
            .with_file(&archive_url(&candidates[1]), installer_archive(2015));
        let runner = Arc::new(ScriptedRunner::default().on("install-tl", vec![exit(3, "perl exploded")]));

        let err = orchestrator(http, runner.clone(), &temp)
            .install(v(2015), true, &candidates)
            .await
            .unwrap_err();
        assert_eq!(err.classified().map(|e| e.kind()), Some(ErrorKind::Unclassified));
        assert_eq!(runner.count("install-tl"), 1);
    }

    #[tokio::test]
    async fn recoverable_failure_on_last_candidate_propagates() {
        let temp = TempDir::new().unwrap();
        let candidates = [Repository::master()];
        let runner = Arc::new(ScriptedRunner::default());

        let err = orchestrator(FakeHttp::default(), runner.clone(), &temp)
            .install(v(2024), true, &candidates)
            .await
            .unwrap_err();
        assert_eq!(err.classified().map(|e| e.kind()), Some(ErrorKind::DownloadFailed));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn stale_mirror_falls_back_to_master() {
        let temp = TempDir::new().unwrap();
        let resolved = Repository::mirror().with_url("https://mirror.example.org/tlnet");
        let http = FakeHttp::default()
            .with_redirect(MIRROR_URL, resolved.url())
            .with_file(&archive_url(&resolved), installer_archive(2025))
            .with_file(&archive_url(&Repository::master()), installer_archive(2026));
        let runner = Arc::new(ScriptedRunner::default());

        let report = orchestrator(http, runner.clone(), &temp)
            .install(v(2026), false, &[Repository::mirror(), Repository::master()])
            .await
            .unwrap();
        assert_eq!(report.attempts, 2);
        assert_eq!(report.version, v(2026));
        assert_eq!(report.repository.kind(), RepositoryKind::Master);
        assert_eq!(runner.count("install-tl"), 1);
    }

    #[tokio::test]
    async fn mirror_is_pinned_after_redirect() {
        let temp = TempDir::new().unwrap();
        let resolved = Repository::mirror().with_url("https://mirror.example.org/tlnet/");
        let http = FakeHttp::default()
            .with_redirect(MIRROR_URL, resolved.url())
            .with_file(&archive_url(&resolved), installer_archive(2026));
        let runner = Arc::new(ScriptedRunner::default());

        let report = orchestrator(http, runner.clone(), &temp)
            .install(v(2026), false, &[Repository::mirror(), Repository::master()])
            .await
            .unwrap();
        assert_eq!(report.repository, resolved);
        assert_eq!(runner.count("-repository https://mirror.example.org/tlnet/"), 1);
    }

    #[tokio::test]
    async fn newer_installer_on_last_candidate_is_reported() {
        let temp = TempDir::new().unwrap();
        let http = FakeHttp::default().with_file(&archive_url(&Repository::master()), installer_archive(2027));
        let runner = Arc::new(ScriptedRunner::default());

        let report = orchestrator(http, runner, &temp)
            .install(v(2026), false, &[Repository::master()])
            .await
            .unwrap();
        assert_eq!(report.version, v(2027));
        assert!(report.corrected);
    }
}
