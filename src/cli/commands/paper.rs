//! Paper trading command implementation.
//!
//! Replays recorded sub-bars (and optional historical period bars) through
//! the configured workers against the in-memory paper broker.

use anyhow::{Context, Result};
use bartrader_broker::PaperBroker;
use bartrader_config::load_config;
use bartrader_core::traits::EventSink;
use bartrader_core::types::RawBar;
use bartrader_data::load_csv;
use bartrader_engine::{
    ClientIdPool, Engine, OrderIdAllocator, TimeSource, WorkerExit, WorkerPorts, WorkerSettings,
};
use bartrader_monitor::{CsvAuditLog, FanoutSink, LogEventSink};
use bartrader_strategies::StrategyKind;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::cli::PaperArgs;

const SUBSCRIBE_TIMEOUT: Duration = Duration::from_secs(10);
const WORKER_POLL: Duration = Duration::from_millis(50);

/// Bars found for one symbol.
#[derive(Debug, Default)]
struct Feed {
    live: Vec<RawBar>,
    history: Vec<RawBar>,
}

#[derive(Debug, Serialize)]
struct SymbolSummary {
    symbol: String,
    strategy: String,
    outcome: String,
    orders: usize,
    final_position: Decimal,
}

fn candidates(dir: &Path, symbol: &str, suffix: &str) -> [PathBuf; 2] {
    [
        dir.join(format!("{symbol}{suffix}.csv")),
        dir.join(format!("{}{suffix}.csv", symbol.to_lowercase())),
    ]
}

fn load_feed(dir: &Path, symbol: &str) -> Result<Feed> {
    let live_path = candidates(dir, symbol, "")
        .into_iter()
        .find(|p| p.exists())
        .with_context(|| format!("no {symbol}.csv in {}", dir.display()))?;
    let live = load_csv(&live_path).with_context(|| format!("loading {}", live_path.display()))?;

    let history = match candidates(dir, symbol, "_history").into_iter().find(|p| p.exists()) {
        Some(path) => load_csv(&path).with_context(|| format!("loading {}", path.display()))?,
        None => Vec::new(),
    };

    info!(symbol, live = live.len(), history = history.len(), "Loaded bars");
    Ok(Feed { live, history })
}

/// Wait until every worker has subscribed (or already stopped).
async fn wait_for_subscriptions(broker: &PaperBroker, engines: &[Engine], symbols: &[String]) {
    let deadline = Instant::now() + SUBSCRIBE_TIMEOUT;
    loop {
        let subscribed: HashSet<String> = broker.sessions().into_iter().map(|(s, _)| s).collect();
        let running: HashSet<&str> = engines.iter().flat_map(|e| e.running()).collect();
        let settled = symbols
            .iter()
            .all(|s| subscribed.contains(s) || !running.contains(s.as_str()));
        if settled {
            return;
        }
        if Instant::now() >= deadline {
            warn!("Timed out waiting for workers to subscribe");
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Wait until every worker task has returned.
async fn wait_for_workers(engines: &[Engine]) {
    while engines.iter().any(|e| !e.running().is_empty()) {
        tokio::time::sleep(WORKER_POLL).await;
    }
}

pub async fn run(args: PaperArgs, config_path: &Path) -> Result<()> {
    let config = load_config(config_path).context("Failed to load configuration")?;

    let mut workers: Vec<WorkerSettings> = config
        .worker_settings()?
        .into_iter()
        .filter(|w| args.symbols.is_empty() || args.symbols.contains(&w.symbol))
        .collect();
    if workers.is_empty() {
        anyhow::bail!("None of the requested symbols are configured");
    }
    if !args.wall_clock {
        for worker in &mut workers {
            worker.clock = TimeSource::Candle;
        }
    }

    let mut broker = PaperBroker::new();
    if let Some(shortable) = args.shortable {
        broker = broker.with_default_shortable(shortable);
    }
    for (symbol, quantity) in &args.positions {
        broker.set_position(symbol, *quantity);
    }
    for worker in &workers {
        let feed = load_feed(&args.data, &worker.symbol)?;
        broker.set_live_bars(&worker.symbol, feed.live);
        broker.set_history(&worker.symbol, feed.history);
    }

    let sessions = Arc::new(ClientIdPool::new(config.engine.max_sessions));
    let order_ids = Arc::new(OrderIdAllocator::new(config.engine.first_order_id));

    // One engine per strategy so each writes its own audit files.
    let mut by_strategy: BTreeMap<StrategyKind, Vec<WorkerSettings>> = BTreeMap::new();
    for worker in workers {
        by_strategy.entry(worker.strategy).or_default().push(worker);
    }

    let mut engines = Vec::with_capacity(by_strategy.len());
    let mut symbols = Vec::new();
    for (strategy, group) in by_strategy {
        let mut sink = FanoutSink::new().with(Arc::new(LogEventSink));
        if let Some(dir) = &config.logging.audit_dir {
            let audit = CsvAuditLog::create(dir, strategy.as_str())
                .with_context(|| format!("creating audit log in {dir}"))?;
            sink = sink.with(Arc::new(audit));
        }
        let sink: Arc<dyn EventSink> = Arc::new(sink);

        let mut engine = Engine::new(WorkerPorts {
            broker: Arc::new(broker.clone()),
            feed: Arc::new(broker.clone()),
            sink,
            sessions: Arc::clone(&sessions),
            order_ids: Arc::clone(&order_ids),
        });
        for settings in group {
            symbols.push(settings.symbol.clone());
            engine.start(settings)?;
        }
        engines.push(engine);
    }

    wait_for_subscriptions(&broker, &engines, &symbols).await;
    broker.close_all_feeds();

    let interrupted = tokio::select! {
        _ = wait_for_workers(&engines) => false,
        Ok(()) = tokio::signal::ctrl_c() => true,
    };
    if interrupted {
        warn!("Interrupted, stopping workers");
    }

    let mut summaries = Vec::new();
    for engine in &mut engines {
        let outcomes = if interrupted {
            engine.stop_all().await
        } else {
            engine.join_all().await
        };
        for (symbol, outcome) in outcomes {
            let outcome = match outcome {
                Ok(WorkerExit::FeedEnded) => "completed".to_string(),
                Ok(WorkerExit::Stopped) => "interrupted".to_string(),
                Ok(exit) => format!("{exit:?}"),
                Err(e) => format!("halted: {e}"),
            };
            summaries.push(SymbolSummary {
                strategy: config
                    .instruments
                    .iter()
                    .find(|i| i.symbol == symbol)
                    .map(|i| i.strategy.to_string())
                    .unwrap_or_default(),
                orders: broker.submitted(&symbol).len(),
                final_position: broker.net_position_of(&symbol),
                outcome,
                symbol,
            });
        }
    }

    match args.output.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&summaries)?),
        _ => {
            println!();
            println!("Paper Replay Summary");
            println!("═══════════════════════════════════════════════════════════");
            for s in &summaries {
                println!(
                    "  {:<8} {:<12} orders {:<4} position {:<8} {}",
                    s.symbol,
                    s.strategy,
                    s.orders,
                    s.final_position.to_string(),
                    s.outcome
                );
            }
        }
    }

    Ok(())
}
