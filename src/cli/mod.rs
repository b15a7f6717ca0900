//! CLI definitions.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bartrader")]
#[command(author, version, about = "Candle-aggregating signal trader")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Log level (overrides `logging.level`)
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Enable JSON log format (or set `logging.format = "json"`)
    #[arg(long)]
    pub json_logs: bool,

    /// Also write JSON logs to this file (overrides `logging.file`)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay recorded bars through the configured workers against the paper broker
    Paper(PaperArgs),
    /// List available strategies
    Strategies,
    /// Validate configuration
    ValidateConfig(ValidateArgs),
}

#[derive(clap::Args)]
pub struct PaperArgs {
    /// Directory holding `<SYMBOL>.csv` sub-bars and optional `<SYMBOL>_history.csv` period bars
    #[arg(short, long, default_value = "data")]
    pub data: PathBuf,

    /// Only replay these symbols (comma-separated)
    #[arg(short = 'S', long, value_delimiter = ',')]
    pub symbols: Vec<String>,

    /// Starting position, e.g. `--position SPY=-100` (repeatable)
    #[arg(long = "position", value_parser = parse_position)]
    pub positions: Vec<(String, Decimal)>,

    /// Shortable shares reported for every symbol
    #[arg(long)]
    pub shortable: Option<Decimal>,

    /// Check regular hours against the wall clock instead of candle time
    #[arg(long)]
    pub wall_clock: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    pub output: String,
}

#[derive(clap::Args)]
pub struct ValidateArgs {
    /// Print the effective configuration as TOML
    #[arg(long)]
    pub print: bool,
}

fn parse_position(raw: &str) -> Result<(String, Decimal), String> {
    let (symbol, quantity) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected SYMBOL=QUANTITY, got {raw}"))?;
    let quantity = quantity
        .trim()
        .parse::<Decimal>()
        .map_err(|e| format!("invalid quantity in {raw}: {e}"))?;
    Ok((symbol.trim().to_string(), quantity))
}
