//! Worker supervisor.

use std::collections::BTreeMap;

use bartrader_core::error::{TradingError, TradingResult};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::worker::{InstrumentWorker, WorkerExit, WorkerPorts, WorkerSettings};

/// Final result of one worker task.
pub type WorkerOutcome = TradingResult<WorkerExit>;

struct WorkerHandle {
    settings: WorkerSettings,
    stop: watch::Sender<bool>,
    task: JoinHandle<WorkerOutcome>,
}

/// Spawns, stops and restarts one worker per instrument.
///
/// Workers share nothing but the ports and the two allocators in
/// [`WorkerPorts`]; a fatal error halts only the worker that raised it.
pub struct Engine {
    ports: WorkerPorts,
    workers: BTreeMap<String, WorkerHandle>,
}

impl Engine {
    pub fn new(ports: WorkerPorts) -> Self {
        Self {
            ports,
            workers: BTreeMap::new(),
        }
    }

    pub fn ports(&self) -> &WorkerPorts {
        &self.ports
    }

    /// Spawn a worker for `settings.symbol`.
    pub fn start(&mut self, settings: WorkerSettings) -> TradingResult<()> {
        if self
            .workers
            .get(&settings.symbol)
            .is_some_and(|handle| !handle.task.is_finished())
        {
            return Err(TradingError::Config(format!(
                "worker for {} is already running",
                settings.symbol
            )));
        }

        let (stop, stop_rx) = watch::channel(false);
        let worker = InstrumentWorker::new(settings.clone(), self.ports.clone());
        let task = tokio::spawn(async move { worker.run(stop_rx).await });
        info!(symbol = %settings.symbol, strategy = %settings.strategy, "Worker spawned");

        self.workers.insert(
            settings.symbol.clone(),
            WorkerHandle {
                settings,
                stop,
                task,
            },
        );
        Ok(())
    }

    /// Signal a worker to stop and wait for it. `None` if no such worker exists.
    pub async fn stop(&mut self, symbol: &str) -> Option<WorkerOutcome> {
        let handle = self.workers.remove(symbol)?;
        handle.stop.send_replace(true);
        Some(join(symbol, handle.task).await)
    }

    /// Stop a worker and start it again with the same settings.
    ///
    /// The new run queries the account afresh; no in-memory state survives.
    pub async fn restart(&mut self, symbol: &str) -> TradingResult<()> {
        let settings = self
            .workers
            .get(symbol)
            .map(|handle| handle.settings.clone())
            .ok_or_else(|| TradingError::Config(format!("no worker for {symbol}")))?;

        if let Some(outcome) = self.stop(symbol).await {
            info!(symbol, ?outcome, "Worker stopped for restart");
        }
        self.start(settings)
    }

    /// Stop every worker.
    pub async fn stop_all(&mut self) -> Vec<(String, WorkerOutcome)> {
        for handle in self.workers.values() {
            handle.stop.send_replace(true);
        }
        self.join_all().await
    }

    /// Wait for every worker to finish on its own.
    pub async fn join_all(&mut self) -> Vec<(String, WorkerOutcome)> {
        let workers = std::mem::take(&mut self.workers);
        let mut outcomes = Vec::with_capacity(workers.len());
        for (symbol, handle) in workers {
            let outcome = join(&symbol, handle.task).await;
            outcomes.push((symbol, outcome));
        }
        outcomes
    }

    /// Symbols whose worker task is still running.
    pub fn running(&self) -> Vec<&str> {
        self.workers
            .iter()
            .filter(|(_, handle)| !handle.task.is_finished())
            .map(|(symbol, _)| symbol.as_str())
            .collect()
    }
}

async fn join(symbol: &str, task: JoinHandle<WorkerOutcome>) -> WorkerOutcome {
    match task.await {
        Ok(outcome) => outcome,
        Err(err) => {
            warn!(symbol, error = %err, "Worker task did not complete");
            Ok(WorkerExit::Aborted(err.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::{ClientIdPool, OrderIdAllocator};
    use crate::worker::TimeSource;
    use bartrader_broker::PaperBroker;
    use bartrader_core::traits::NullSink;
    use bartrader_core::types::Period;
    use bartrader_strategies::StrategyKind;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::time::Duration;

    fn engine(broker: &PaperBroker) -> Engine {
        Engine::new(WorkerPorts {
            broker: Arc::new(broker.clone()),
            feed: Arc::new(broker.clone()),
            sink: Arc::new(NullSink),
            sessions: Arc::new(ClientIdPool::new(8)),
            order_ids: Arc::new(OrderIdAllocator::new(1)),
        })
    }

    fn settings(symbol: &str) -> WorkerSettings {
        WorkerSettings {
            period: Period::from_secs(10),
            clock: TimeSource::Candle,
            ..WorkerSettings::new(symbol, StrategyKind::HeikinAshi, dec!(100))
        }
    }

    async fn wait_for_sessions(broker: &PaperBroker, count: usize) {
        for _ in 0..200 {
            if broker.sessions().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {count} subscriptions, saw {:?}", broker.sessions());
    }

    #[tokio::test]
    async fn test_stop_running_worker() {
        let broker = PaperBroker::new();
        let mut engine = engine(&broker);
        engine.start(settings("SPY")).unwrap();
        wait_for_sessions(&broker, 1).await;
        assert_eq!(engine.running(), vec!["SPY"]);

        let outcome = engine.stop("SPY").await.unwrap();
        assert_eq!(outcome.unwrap(), WorkerExit::Stopped);
        assert!(engine.running().is_empty());
        assert_eq!(engine.ports().sessions.in_use(), 0);
        assert!(engine.stop("SPY").await.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_start_rejected() {
        let broker = PaperBroker::new();
        let mut engine = engine(&broker);
        engine.start(settings("SPY")).unwrap();
        assert!(engine.start(settings("SPY")).is_err());
        engine.stop_all().await;
    }

    #[tokio::test]
    async fn test_workers_get_distinct_sessions() {
        let broker = PaperBroker::new();
        let mut engine = engine(&broker);
        engine.start(settings("SPY")).unwrap();
        engine.start(settings("QQQ")).unwrap();
        wait_for_sessions(&broker, 2).await;

        let mut ids: Vec<u32> = broker.sessions().iter().map(|(_, id)| *id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);

        let outcomes = engine.stop_all().await;
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes
            .iter()
            .all(|(_, outcome)| matches!(outcome, Ok(WorkerExit::Stopped))));
    }

    #[tokio::test]
    async fn test_restart_requeries_position() {
        let broker = PaperBroker::new();
        let mut engine = engine(&broker);
        engine.start(settings("SPY")).unwrap();
        wait_for_sessions(&broker, 1).await;

        // Account changed while the worker was away.
        broker.set_position("SPY", dec!(150));
        engine.restart("SPY").await.unwrap();

        let outcomes = engine.join_all().await;
        let (symbol, outcome) = &outcomes[0];
        assert_eq!(symbol, "SPY");
        assert!(matches!(
            outcome,
            Err(TradingError::UnexpectedPosition { .. })
        ));
    }

    #[tokio::test]
    async fn test_fatal_error_halts_only_its_worker() {
        let broker = PaperBroker::new();
        broker.set_position("BAD", dec!(42));
        let mut engine = engine(&broker);
        engine.start(settings("BAD")).unwrap();
        engine.start(settings("SPY")).unwrap();
        wait_for_sessions(&broker, 1).await;

        let bad = engine.stop("BAD").await.unwrap();
        assert!(bad.unwrap_err().is_fatal());
        assert_eq!(engine.running(), vec!["SPY"]);

        let outcome = engine.stop("SPY").await.unwrap();
        assert_eq!(outcome.unwrap(), WorkerExit::Stopped);
    }

    #[tokio::test]
    async fn test_restart_unknown_symbol() {
        let broker = PaperBroker::new();
        let mut engine = engine(&broker);
        assert!(matches!(
            engine.restart("NOPE").await,
            Err(TradingError::Config(_))
        ));
    }
}
