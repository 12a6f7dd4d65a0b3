//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// tlsetup - TeX Live for CI jobs
///
/// Installs a TeX Live release, caches the installation between jobs and
/// keeps restored installations up to date.
#[derive(Parser, Debug)]
#[command(name = "tlsetup")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "TLSETUP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format (defaults to the configured one)
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Restore or install TeX Live before a job
    Install(InstallArgs),

    /// Save the installation recorded by `install` to the cache
    Save,

    /// Print the cache keys for a release and package set
    Keys(KeysArgs),

    /// Print the current release window
    Release {
        /// Do not ask CTAN for the newest release
        #[arg(long)]
        offline: bool,
    },
}

/// Arguments for the install command
#[derive(Parser, Debug, Default)]
pub struct InstallArgs {
    /// Release year or "latest"
    #[arg(long = "texlive-version", visible_alias = "tl-version", env = "TEXLIVE_VERSION")]
    pub texlive_version: Option<String>,

    /// Packages to install (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub packages: Vec<String>,

    /// File listing packages, plain or DEPENDS.txt format
    #[arg(long)]
    pub package_file: Option<PathBuf>,

    /// Installation root; the release goes to `{prefix}/{year}`
    #[arg(long, env = "TEXLIVE_INSTALL_PREFIX")]
    pub prefix: Option<PathBuf>,

    /// Package repository to use instead of the mirror network
    #[arg(long, env = "TLSETUP_REPOSITORY")]
    pub repository: Option<String>,

    /// Neither restore nor save a cached installation
    #[arg(long)]
    pub no_cache: bool,

    /// Save a fresh snapshot even on a cache hit
    #[arg(long, env = "TLSETUP_FORCE_UPDATE_CACHE", conflicts_with = "no_cache")]
    pub force_update_cache: bool,

    /// Run `tlmgr update --all` on a restored installation
    #[arg(long)]
    pub update_all: bool,

    /// Do not ask CTAN for the newest release
    #[arg(long)]
    pub offline: bool,
}

/// Arguments for the keys command
#[derive(Parser, Debug)]
pub struct KeysArgs {
    /// Release year or "latest"
    #[arg(long = "texlive-version", visible_alias = "tl-version", default_value = "latest")]
    pub texlive_version: String,

    /// Packages (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub packages: Vec<String>,

    /// File listing packages, plain or DEPENDS.txt format
    #[arg(long)]
    pub package_file: Option<PathBuf>,

    /// Do not ask CTAN for the newest release
    #[arg(long)]
    pub offline: bool,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per event
    Json,
}
