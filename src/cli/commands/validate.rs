//! Validate configuration command.

use anyhow::Result;
use bartrader_config::load_config;
use std::path::Path;

use crate::cli::ValidateArgs;

pub async fn run(args: ValidateArgs, config_path: &Path) -> Result<()> {
    println!("Validating configuration: {:?}", config_path);

    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("Configuration error: {}", e);
            return Err(e.into());
        }
    };

    println!("Configuration is valid!");
    println!();
    println!("App: {}", config.app.name);
    println!("Environment: {}", config.app.environment);
    println!("Log level: {}", config.logging.level);
    println!(
        "Regular hours: {}-{} (UTC{:+} min)",
        config.session.open, config.session.close, config.session.utc_offset_minutes
    );
    println!("Instruments:");
    for i in &config.instruments {
        println!(
            "  {:<8} {:<12} period {:<4} size {:<6} {:?}/{:?}",
            i.symbol,
            i.strategy.as_str(),
            i.bar_period.to_string(),
            i.order_size.to_string(),
            i.order_kind,
            i.quote
        );
    }

    if args.print {
        println!();
        println!("{}", toml::to_string_pretty(&config)?);
    }

    Ok(())
}
