//! tlsetup - TeX Live for CI jobs
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use std::process::ExitCode;
use tlsetup::cli::{Cli, Commands, LogFormat};
use tlsetup::config::ConfigManager;
use tlsetup::error::TlsetupResult;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> TlsetupResult<()> {
    let cli = Cli::parse();

    // Load configuration first; it may select the log format
    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };
    let config = config_manager.load().await?;

    let json = match cli.log_format {
        Some(format) => format == LogFormat::Json,
        None => config.general.log_format.eq_ignore_ascii_case("json"),
    };
    init_logging(cli.verbose, json);
    debug!("Configuration loaded from {}", config_manager.path().display());

    match cli.command {
        Commands::Install(args) => tlsetup::cli::commands::install(args, &config).await,
        Commands::Save => tlsetup::cli::commands::save(&config).await,
        Commands::Keys(args) => tlsetup::cli::commands::keys(args, &config).await,
        Commands::Release { offline } => tlsetup::cli::commands::release(offline, &config).await,
    }
}

/// 0 = warn (spinners only), 1 = info, 2+ = debug; `RUST_LOG` wins when set
fn init_logging(verbose: u8, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("tlsetup=warn"),
        1 => EnvFilter::new("tlsetup=info"),
        _ => EnvFilter::new("tlsetup=debug"),
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
