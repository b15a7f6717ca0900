//! List strategies command.

use anyhow::Result;
use bartrader_strategies::StrategyRegistry;

pub async fn run() -> Result<()> {
    let registry = StrategyRegistry::new();

    println!("Available Strategies");
    println!("═══════════════════════════════════════════════════════════");
    println!();

    for info in registry.list() {
        println!("  {} ({})", info.name, info.kind);
        println!("  ───────────────────────────────────────────────────────");
        println!("  {}", info.description);
        println!(
            "  Needs historical backfill: {}",
            if info.requires_backfill { "yes" } else { "no" }
        );
        println!("  Defaults: {}", info.default_config);
        println!();
    }

    println!("Set `strategy = \"<name>\"` on an [[instruments]] entry to select one.");

    Ok(())
}
