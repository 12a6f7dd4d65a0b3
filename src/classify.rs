//! Failure classification for installer and package-manager runs
//!
//! Each tool has an ordered table of `(exit predicate, stderr pattern,
//! verdict)` rules. The first matching rule decides the [`Outcome`]; named
//! capture groups fill in the remote version, repository URL and package
//! names. Exit codes alone are never trusted: some releases exit non-zero
//! for harmless conditions.
//!
//! [`ClassifiedError`] has private fields, so this module is the only place
//! that can produce one.

use crate::error::TlsetupError;
use crate::exec::ExecOutput;
use crate::version::Version;
use regex::{Captures, Regex};
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

/// The kind of external program that produced some output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    /// `install-tl`
    Installer,
    /// `tlmgr`
    Tlmgr,
}

/// Closed set of recognized failure kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The installer archive or repository content could not be downloaded
    DownloadFailed,
    /// The installer reports a different release than requested
    UnexpectedVersion,
    /// The repository serves a release the installer cannot handle
    IncompatibleRepository,
    /// The repository exists but has no package database yet
    RepositoryNotInitialized,
    /// The package database failed checksum verification
    TlpdbChecksumMismatch,
    /// A package archive failed checksum verification
    PackageChecksumMismatch,
    /// The installation is older than the release the repository serves
    InstalledVersionOlder,
    /// Requested packages do not exist in the repository
    PackageNotFound,
    /// Anything not recognized
    Unclassified,
}

impl ErrorKind {
    /// Whether switching repository can fix this failure
    pub fn drives_fallback(self) -> bool {
        matches!(
            self,
            Self::DownloadFailed
                | Self::UnexpectedVersion
                | Self::IncompatibleRepository
                | Self::RepositoryNotInitialized
                | Self::InstalledVersionOlder
        )
    }

    /// Actionable advice for the operator
    pub fn hint(self) -> Option<&'static str> {
        match self {
            Self::PackageNotFound => Some("Check the package names against https://ctan.org"),
            Self::TlpdbChecksumMismatch | Self::PackageChecksumMismatch => {
                Some("The mirror may be mid-sync; retry the job or set a fixed repository")
            }
            Self::InstalledVersionOlder => {
                Some("Pin the TeX Live version or clear the cache to reinstall")
            }
            _ => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::DownloadFailed => "download failed",
            Self::UnexpectedVersion => "unexpected installer version",
            Self::IncompatibleRepository => "repository incompatible with installer",
            Self::RepositoryNotInitialized => "repository not yet initialized",
            Self::TlpdbChecksumMismatch => "package database checksum mismatch",
            Self::PackageChecksumMismatch => "package checksum mismatch",
            Self::InstalledVersionOlder => "installed version older than repository",
            Self::PackageNotFound => "package not found in repository",
            Self::Unclassified => "tool failure",
        };
        f.write_str(text)
    }
}

/// A tool failure with the details extracted from its output
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ClassifiedError {
    kind: ErrorKind,
    action: String,
    remote_version: Option<Version>,
    repository: Option<String>,
    packages: Vec<String>,
    message: String,
    #[source]
    cause: Option<Box<TlsetupError>>,
}

impl ClassifiedError {
    fn new(kind: ErrorKind, action: &str) -> Self {
        Self {
            kind,
            action: action.to_string(),
            remote_version: None,
            repository: None,
            packages: Vec::new(),
            message: String::new(),
            cause: None,
        }
    }

    fn with_message(mut self, detail: &str) -> Self {
        let mut message = format!("{} failed: {}", self.action, self.kind);
        if let Some(ref version) = self.remote_version {
            message.push_str(&format!(" (remote version {})", version));
        }
        if let Some(ref repository) = self.repository {
            message.push_str(&format!(" (repository {})", repository));
        }
        if !self.packages.is_empty() {
            message.push_str(&format!(": {}", self.packages.join(", ")));
        }
        if !detail.is_empty() {
            message.push('\n');
            message.push_str(detail);
        }
        self.message = message;
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The invocation that failed, e.g. `tlmgr update --self`
    pub fn action(&self) -> &str {
        &self.action
    }

    /// The release the remote side reported
    pub fn remote_version(&self) -> Option<Version> {
        self.remote_version
    }

    /// The repository URL quoted in the failure
    pub fn repository(&self) -> Option<&str> {
        self.repository.as_deref()
    }

    /// Packages named in the failure
    pub fn packages(&self) -> &[String] {
        &self.packages
    }
}

/// What became of a finished invocation
#[derive(Debug)]
pub enum Outcome<T = ExecOutput> {
    Success(T),
    /// Failed in a way a different repository may fix
    Recoverable(ClassifiedError),
    /// Failed for good
    Fatal(ClassifiedError),
}

impl<T> Outcome<T> {
    fn from_error(error: ClassifiedError) -> Self {
        if error.kind.drives_fallback() {
            Self::Recoverable(error)
        } else {
            Self::Fatal(error)
        }
    }

    /// Collapse to a result, treating every failure as an error
    pub fn into_result(self) -> Result<T, ClassifiedError> {
        match self {
            Self::Success(output) => Ok(output),
            Self::Recoverable(e) | Self::Fatal(e) => Err(e),
        }
    }

    /// The failure kind, if any
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success(_) => None,
            Self::Recoverable(e) | Self::Fatal(e) => Some(e.kind),
        }
    }

    /// Replace the success value
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Success(value) => Outcome::Success(f(value)),
            Self::Recoverable(e) => Outcome::Recoverable(e),
            Self::Fatal(e) => Outcome::Fatal(e),
        }
    }

    /// Wrap an error produced outside a process run
    pub fn failed(error: ClassifiedError) -> Self {
        Self::from_error(error)
    }
}

#[derive(Debug, Clone, Copy)]
enum ExitPredicate {
    Any,
    NonZero,
}

impl ExitPredicate {
    fn matches(self, code: i32) -> bool {
        match self {
            Self::Any => true,
            Self::NonZero => code != 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Verdict {
    /// Known-harmless message, whatever the exit code says
    Benign,
    Failure(ErrorKind),
}

struct Rule {
    exit: ExitPredicate,
    pattern: Regex,
    verdict: Verdict,
}

fn rule(exit: ExitPredicate, pattern: &str, verdict: Verdict) -> Rule {
    Rule {
        exit,
        pattern: Regex::new(pattern).expect("classifier patterns are valid"),
        verdict,
    }
}

const INCOMPATIBLE: &str = r"(?s)versions of the local installation\s+and the repository being accessed are not compatible:.*?repository:\s*(?P<remote>\d{4})";
const NOT_INITIALIZED: &str =
    r"(?:could not initialize from|Cannot load TeX Live database from):?\s*(?P<repository>\S+)";
const TLPDB_CHECKSUM: &str =
    r"(?i)checksum (?:error|mismatch) (?:for|on):?\s*(?P<repository>\S*texlive\.tlpdb\S*)";
const PACKAGE_CHECKSUM: &str = r"(?i)checksum (?:error|mismatch) (?:for|on):?\s*(?P<package>\S+)";
const DOWNLOAD_FAILED: &str = r"(?i)(?:download(?:ing)? of (?P<repository>\S+) failed|could not download|failed to download)";

static INSTALLER_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    use ExitPredicate::*;
    vec![
        rule(Any, INCOMPATIBLE, Verdict::Failure(ErrorKind::IncompatibleRepository)),
        rule(NonZero, NOT_INITIALIZED, Verdict::Failure(ErrorKind::RepositoryNotInitialized)),
        rule(NonZero, TLPDB_CHECKSUM, Verdict::Failure(ErrorKind::TlpdbChecksumMismatch)),
        rule(NonZero, PACKAGE_CHECKSUM, Verdict::Failure(ErrorKind::PackageChecksumMismatch)),
        rule(NonZero, DOWNLOAD_FAILED, Verdict::Failure(ErrorKind::DownloadFailed)),
    ]
});

static TLMGR_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    use ExitPredicate::*;
    vec![
        rule(
            Any,
            r"(?i)repository or its tag already defined, no action",
            Verdict::Benign,
        ),
        rule(
            Any,
            r"Local TeX Live \((?P<local>\d{4})\) is older than remote repository \((?P<remote>\d{4})\)",
            Verdict::Failure(ErrorKind::InstalledVersionOlder),
        ),
        rule(Any, INCOMPATIBLE, Verdict::Failure(ErrorKind::IncompatibleRepository)),
        rule(NonZero, NOT_INITIALIZED, Verdict::Failure(ErrorKind::RepositoryNotInitialized)),
        rule(NonZero, TLPDB_CHECKSUM, Verdict::Failure(ErrorKind::TlpdbChecksumMismatch)),
        rule(NonZero, PACKAGE_CHECKSUM, Verdict::Failure(ErrorKind::PackageChecksumMismatch)),
        rule(
            Any,
            r"package (?P<package>\S+) not present in (?:the )?repository",
            Verdict::Failure(ErrorKind::PackageNotFound),
        ),
        rule(NonZero, DOWNLOAD_FAILED, Verdict::Failure(ErrorKind::DownloadFailed)),
    ]
});

/// Converts raw tool output into typed outcomes
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify a finished invocation of `tool`
    ///
    /// `action` names the invocation for error messages.
    pub fn classify(tool: Tool, action: &str, output: ExecOutput) -> Outcome {
        let rules: &[Rule] = match tool {
            Tool::Installer => &INSTALLER_RULES,
            Tool::Tlmgr => &TLMGR_RULES,
        };

        for rule in rules {
            if !rule.exit.matches(output.exit_code) {
                continue;
            }
            let Some(caps) = rule.pattern.captures(&output.stderr) else {
                continue;
            };
            return match rule.verdict {
                Verdict::Benign => Outcome::Success(output),
                Verdict::Failure(kind) => {
                    let mut error = ClassifiedError::new(kind, action);
                    fill_from_captures(&mut error, &caps);
                    if kind == ErrorKind::PackageNotFound {
                        error.packages = rule
                            .pattern
                            .captures_iter(&output.stderr)
                            .filter_map(|c| c.name("package").map(|m| m.as_str().to_string()))
                            .collect();
                    }
                    Outcome::from_error(error.with_message(&output.stderr_tail()))
                }
            };
        }

        if output.success() {
            Outcome::Success(output)
        } else {
            let detail = format!("exit code {}\n{}", output.exit_code, output.stderr_tail());
            Outcome::Fatal(ClassifiedError::new(ErrorKind::Unclassified, action).with_message(&detail))
        }
    }

    /// A download performed by this crate (not by a tool) failed
    pub fn download_failed(action: &str, url: &str, cause: TlsetupError) -> ClassifiedError {
        let mut error = ClassifiedError::new(ErrorKind::DownloadFailed, action);
        error.repository = Some(url.to_string());
        error.cause = Some(Box::new(cause));
        error.with_message("")
    }

    /// The installer tree reports `reported` while `expected` was asked for
    pub fn unexpected_version(action: &str, expected: Version, reported: Version) -> ClassifiedError {
        let mut error = ClassifiedError::new(ErrorKind::UnexpectedVersion, action);
        error.remote_version = Some(reported);
        error.with_message(&format!("expected TeX Live {}", expected))
    }
}

fn fill_from_captures(error: &mut ClassifiedError, caps: &Captures<'_>) {
    error.remote_version = caps
        .name("remote")
        .and_then(|m| m.as_str().parse::<Version>().ok());
    error.repository = caps.name("repository").map(|m| m.as_str().to_string());
    if let Some(package) = caps.name("package") {
        error.packages = vec![package.as_str().to_string()];
    }
}
