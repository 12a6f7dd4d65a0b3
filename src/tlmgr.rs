//! `tlmgr` invocations
//!
//! Every call is classified right after the process exits, so callers only
//! ever branch on [`Outcome`].

use crate::classify::{ErrorClassifier, Outcome, Tool};
use crate::error::TlsetupResult;
use crate::exec::{ExecOptions, ProcessRunner};
use crate::version::{Capability, Version};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Tag `tlmgr` gives the main repository
pub const MAIN_TAG: &str = "main";

/// An entry of `tlmgr repository list`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryTag {
    pub url: String,
    /// Tag name; repositories added without one are tagged by their URL
    pub tag: String,
}

/// Package manager of one installation
pub struct Tlmgr {
    runner: Arc<dyn ProcessRunner>,
    executable: PathBuf,
    version: Version,
}

impl Tlmgr {
    pub fn new(runner: Arc<dyn ProcessRunner>, executable: PathBuf, version: Version) -> Self {
        Self {
            runner,
            executable,
            version,
        }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    async fn run(&self, args: &[&str]) -> TlsetupResult<Outcome> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let action = format!("tlmgr {}", args.join(" "));
        debug!("Running {}", action);
        let program = self.executable.display().to_string();
        let output = self
            .runner
            .exec(&program, &args, &ExecOptions::default())
            .await?;
        let outcome = ErrorClassifier::classify(Tool::Tlmgr, &action, output);
        if let Some(kind) = outcome.error_kind() {
            debug!("{} failed: {}", action, kind);
        }
        Ok(outcome)
    }

    /// `tlmgr update --self`
    pub async fn update_self(&self) -> TlsetupResult<Outcome> {
        self.run(&["update", "--self"]).await
    }

    /// `tlmgr update --all`
    pub async fn update_all(&self) -> TlsetupResult<Outcome> {
        self.run(&["update", "--all", "--reinstall-forcibly-removed"])
            .await
    }

    /// `tlmgr install <packages>`
    pub async fn install(&self, packages: &[String]) -> TlsetupResult<Outcome> {
        let mut args = vec!["install"];
        args.extend(packages.iter().map(String::as_str));
        self.run(&args).await
    }

    /// Point the main repository at `url`
    pub async fn set_repository(&self, url: &str) -> TlsetupResult<Outcome> {
        self.run(&["option", self.repository_option(), url]).await
    }

    /// Current main repository, if the output could be read
    pub async fn repository(&self) -> TlsetupResult<Outcome<Option<String>>> {
        let outcome = self.run(&["option", self.repository_option()]).await?;
        Ok(outcome.map(|output| parse_option_value(&output.stdout)))
    }

    /// `tlmgr repository list`
    pub async fn repository_list(&self) -> TlsetupResult<Outcome<Vec<RepositoryTag>>> {
        let outcome = self.run(&["repository", "list"]).await?;
        Ok(outcome.map(|output| parse_repository_list(&output.stdout)))
    }

    /// `tlmgr repository remove <tag>`
    pub async fn repository_remove(&self, tag: &str) -> TlsetupResult<Outcome> {
        self.run(&["repository", "remove", tag]).await
    }

    fn repository_option(&self) -> &'static str {
        if self.version.supports(Capability::RepositoryTags) {
            "repository"
        } else {
            "location"
        }
    }
}

/// `Default package repository (repository): https://...`
fn parse_option_value(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .find_map(|line| line.split_once("):"))
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Lines of the form `\thttps://host/path (tag)` or just the URL
fn parse_repository_list(stdout: &str) -> Vec<RepositoryTag> {
    stdout
        .lines()
        .filter(|line| line.starts_with(char::is_whitespace))
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| match line.rsplit_once(" (") {
            Some((url, tag)) if tag.ends_with(')') => RepositoryTag {
                url: url.trim().to_string(),
                tag: tag.trim_end_matches(')').to_string(),
            },
            _ => RepositoryTag {
                url: line.to_string(),
                tag: line.to_string(),
            },
        })
        .collect()
}
