//! Bar-driven trading CLI application.

mod cli;

use anyhow::Result;
use bartrader_config::{load_config, LoggingConfig};
use bartrader_monitor::setup_logging;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Commands report configuration errors themselves; logging falls back to defaults.
    let logging = load_config(&cli.config)
        .map(|c| c.logging)
        .unwrap_or_else(|_| LoggingConfig::default());
    let level = cli
        .log_level
        .as_ref()
        .map_or(logging.level.as_str(), |l| l.as_str());
    let log_file = cli.log_file.clone().or_else(|| logging.file.as_ref().map(PathBuf::from));
    let _log_guard = setup_logging(level, cli.json_logs || logging.is_json(), log_file.as_deref());

    match cli.command {
        Commands::Paper(args) => cli::commands::paper::run(args, &cli.config).await,
        Commands::Strategies => cli::commands::strategies::run().await,
        Commands::ValidateConfig(args) => cli::commands::validate::run(args, &cli.config).await,
    }
}
