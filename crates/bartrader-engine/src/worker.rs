//! Per-instrument trading pipeline.
//!
//! One worker owns the window aggregator, candle series and position state of
//! a single instrument. Events are handled strictly in arrival order:
//! aggregate, build, detect, reconcile, size, construct, submit.

use std::sync::Arc;
use std::time::Duration;

use bartrader_core::error::{TradingError, TradingResult};
use bartrader_core::traits::{Broker, CandleBuilder, EventSink, MarketData, SignalDetector};
use bartrader_core::types::{
    Candle, CandleClosed, CandleSeries, MarketEvent, OrderKind, OrderPlaced, Period,
    QuotePreference, QuoteSnapshot, RawBar, Side, WindowSummary,
};
use bartrader_data::{Aggregation, BarAggregator, WindowAligner};
use bartrader_execution::{
    OrderBuilder, OrderSizer, PositionReconciler, RegularHours, TradeDecision,
};
use bartrader_strategies::{StrategyKind, StrategyRegistry};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::allocator::{ClientIdPool, ClientSession, OrderIdAllocator};

const QUOTE_POLL: Duration = Duration::from_millis(50);

/// Clock used for the regular-hours check when constructing orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSource {
    /// Current wall-clock time.
    #[default]
    Wall,
    /// Close time of the candle the order derives from (replay).
    Candle,
}

impl TimeSource {
    pub fn now(&self, candle_time: i64) -> DateTime<Utc> {
        match self {
            TimeSource::Wall => Utc::now(),
            TimeSource::Candle => DateTime::from_timestamp(candle_time, 0).unwrap_or_else(Utc::now),
        }
    }
}

/// Everything a worker needs to know about its instrument.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub symbol: String,
    pub strategy: StrategyKind,
    /// Strategy parameters, deserialised by the strategy registry
    pub strategy_params: serde_json::Value,
    pub period: Period,
    pub sub_period_secs: u64,
    /// Base order size
    pub order_size: Decimal,
    pub order_kind: OrderKind,
    pub quote: QuotePreference,
    /// Trade the position implied by history at the first live window
    pub align_on_start: bool,
    pub session: RegularHours,
    /// Upper bound on waiting for a limit price
    pub quote_wait: Duration,
    pub clock: TimeSource,
}

impl WorkerSettings {
    /// Settings with defaults for everything but the instrument, strategy and size.
    pub fn new(symbol: impl Into<String>, strategy: StrategyKind, order_size: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            strategy,
            strategy_params: serde_json::Value::Null,
            period: Period::default(),
            sub_period_secs: 5,
            order_size,
            order_kind: OrderKind::Market,
            quote: QuotePreference::Last,
            align_on_start: true,
            session: RegularHours::default(),
            quote_wait: Duration::from_secs(2),
            clock: TimeSource::Wall,
        }
    }
}

/// Shared ports and allocators handed to every worker.
#[derive(Clone)]
pub struct WorkerPorts {
    pub broker: Arc<dyn Broker>,
    pub feed: Arc<dyn MarketData>,
    pub sink: Arc<dyn EventSink>,
    pub sessions: Arc<ClientIdPool>,
    pub order_ids: Arc<OrderIdAllocator>,
}

/// Why a worker returned without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerExit {
    /// A stop was requested.
    Stopped,
    /// The market data stream closed.
    FeedEnded,
    /// The worker task panicked or was aborted.
    Aborted(String),
}

/// A decision waiting to become an order.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingTrade {
    decision: TradeDecision,
    candle_time: i64,
}

/// Mutable state of one worker session. Built fresh on every (re)start.
pub(crate) struct WorkerContext {
    settings: WorkerSettings,
    ports: WorkerPorts,
    session: ClientSession,
    builder: Box<dyn CandleBuilder>,
    detector: Arc<dyn SignalDetector>,
    series: CandleSeries,
    aggregator: BarAggregator,
    reconciler: PositionReconciler,
    sizer: OrderSizer,
    orders: OrderBuilder,
    backfilling: bool,
    /// Decision from the startup history scan, armed by the first live window
    scheduled: Option<TradeDecision>,
    /// Decision waiting for placement (or for the quote feed)
    pending: Option<PendingTrade>,
}

impl WorkerContext {
    pub(crate) fn new(
        settings: &WorkerSettings,
        ports: WorkerPorts,
        session: ClientSession,
        net_position: Decimal,
    ) -> TradingResult<Self> {
        let symbol = settings.symbol.as_str();
        let pair = StrategyRegistry::new().create(settings.strategy, settings.strategy_params.clone())?;
        let aligner = WindowAligner::new(
            settings.period,
            settings.sub_period_secs,
            settings.session.utc_offset_secs(),
        )?;
        let reconciler = PositionReconciler::new(symbol, settings.order_size, net_position)?;

        let backfilling = pair.builder.requires_backfill();
        let mut series = CandleSeries::new(symbol);
        if !backfilling {
            series.set_capacity(pair.builder.retention());
        }

        Ok(Self {
            ports,
            session,
            detector: pair.detector,
            series,
            aggregator: BarAggregator::new(symbol, aligner),
            reconciler,
            sizer: OrderSizer::new(symbol, settings.order_size),
            orders: OrderBuilder::new(
                symbol,
                settings.order_kind,
                settings.quote,
                settings.session.clone(),
            ),
            backfilling,
            scheduled: None,
            pending: None,
            builder: pair.builder,
            settings: settings.clone(),
        })
    }

    pub(crate) fn session_id(&self) -> u32 {
        self.session.id()
    }

    pub(crate) fn wants_backfill(&self) -> bool {
        self.backfilling
    }

    #[cfg(test)]
    pub(crate) fn series(&self) -> &CandleSeries {
        &self.series
    }

    #[cfg(test)]
    pub(crate) fn reconciler(&self) -> &PositionReconciler {
        &self.reconciler
    }

    #[cfg(test)]
    pub(crate) fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    #[cfg(test)]
    pub(crate) fn has_scheduled(&self) -> bool {
        self.scheduled.is_some()
    }

    /// Process one feed event to completion.
    pub(crate) async fn handle(
        &mut self,
        event: MarketEvent,
        stop: &watch::Receiver<bool>,
    ) -> TradingResult<()> {
        match event {
            MarketEvent::Backfill(bar) => self.on_history(bar),
            MarketEvent::BackfillComplete => self.on_backfill_complete(),
            MarketEvent::Bar(bar) => self.on_bar(bar, stop).await,
        }
    }

    fn emit(&self, candle: Candle, historical: bool) {
        self.ports.sink.candle_closed(&CandleClosed {
            symbol: self.settings.symbol.clone(),
            candle,
            historical,
        });
    }

    fn is_stale(&self, time: i64) -> bool {
        match self.series.last() {
            Some(last) if time <= last.time => {
                warn!(
                    symbol = %self.settings.symbol,
                    time,
                    last = last.time,
                    "Dropping duplicate candle"
                );
                true
            }
            _ => false,
        }
    }

    fn on_history(&mut self, bar: RawBar) -> TradingResult<()> {
        if !self.backfilling {
            debug!(symbol = %self.settings.symbol, start = bar.start_time, "historical bar outside backfill");
            return Ok(());
        }
        let window = WindowSummary::from_period_bar(&bar, self.settings.period);
        if self.is_stale(window.closed_at) {
            return Ok(());
        }
        self.builder.build(&window, &mut self.series)?;
        Ok(())
    }

    fn on_backfill_complete(&mut self) -> TradingResult<()> {
        if !self.backfilling {
            return Ok(());
        }
        let symbol = self.settings.symbol.clone();

        self.builder.refresh(&mut self.series)?;
        for candle in self.series.iter() {
            self.emit(*candle, true);
        }

        match self.detector.scan_history(&self.series) {
            Some(side) if self.settings.align_on_start => {
                let outcome = self.reconciler.reconcile_history(side)?;
                self.scheduled = outcome.decision();
            }
            Some(side) => {
                info!(symbol = %symbol, %side, "Startup alignment disabled, ignoring historical signal");
            }
            None => info!(symbol = %symbol, candles = self.series.len(), "No signal found in history"),
        }

        self.builder.finish_backfill(&mut self.series)?;
        self.series.set_capacity(self.builder.retention());
        self.backfilling = false;
        Ok(())
    }

    async fn on_bar(&mut self, bar: RawBar, stop: &watch::Receiver<bool>) -> TradingResult<()> {
        if let Aggregation::Closed(window) = self.aggregator.push(bar)? {
            if let Some(trade) = self.on_window(&window)? {
                if let Some(stale) = self.pending.replace(trade) {
                    info!(
                        symbol = %self.settings.symbol,
                        side = %stale.decision.side,
                        candle_time = stale.candle_time,
                        "Replacing deferred order with a newer decision"
                    );
                }
            }
        }

        match self.pending.take() {
            Some(trade) => self.place(trade, stop).await,
            None => Ok(()),
        }
    }

    /// Build the candle of a closed live window and decide what to trade.
    fn on_window(&mut self, window: &WindowSummary) -> TradingResult<Option<PendingTrade>> {
        if self.backfilling {
            info!(
                symbol = %self.settings.symbol,
                closed_at = window.closed_at,
                "Backfill in progress, dropping live window"
            );
            return Ok(None);
        }
        if self.is_stale(window.closed_at) {
            return Ok(None);
        }

        let candle = self.builder.build(window, &mut self.series)?;
        self.emit(candle, false);

        let scheduled = self.scheduled.take();
        let decision = match self.detector.detect(&self.series) {
            Some(side) => {
                info!(symbol = %self.settings.symbol, %side, time = candle.time, "Signal");
                if scheduled.is_some() {
                    info!(symbol = %self.settings.symbol, "Live signal supersedes startup alignment");
                }
                self.reconciler.evaluate_live(side)?
            }
            None => scheduled,
        };

        Ok(decision.map(|decision| PendingTrade {
            decision,
            candle_time: candle.time,
        }))
    }

    async fn place(&mut self, trade: PendingTrade, stop: &watch::Receiver<bool>) -> TradingResult<()> {
        let symbol = self.settings.symbol.clone();
        if *stop.borrow() {
            info!(symbol = %symbol, "Stop requested, not placing order");
            return Ok(());
        }

        let TradeDecision { side, .. } = trade.decision;
        let net_position = self.reconciler.state().net_position;
        let shortable = match side {
            Side::Sell => self.ports.broker.shortable_shares(&symbol).await?,
            Side::Buy => trade.decision.quantity,
        };
        let Some(quantity) = self
            .sizer
            .size(&trade.decision, net_position, shortable)
            .quantity()
        else {
            return Ok(());
        };

        let now = self.settings.clock.now(trade.candle_time);
        let quote = if self.orders.needs_quote(now) {
            match self.await_quote().await {
                Ok(quote) => quote,
                Err(err @ TradingError::FeedNotReady(_)) => {
                    warn!(symbol = %symbol, error = %err, "Deferring order until the quote feed is ready");
                    self.pending = Some(trade);
                    return Ok(());
                }
                Err(err) => return Err(err),
            }
        } else {
            QuoteSnapshot::default()
        };

        if *stop.borrow() {
            info!(symbol = %symbol, "Stop requested, not placing order");
            return Ok(());
        }

        let client_order_id = self.ports.order_ids.next_id();
        let intent = self.orders.build(
            side,
            quantity,
            &quote,
            now,
            client_order_id,
            trade.candle_time,
        )?;
        let order_id = self.ports.broker.submit_order(&intent).await?;
        self.reconciler.confirm_trade(side, quantity);

        info!(
            symbol = %symbol,
            order_id,
            %side,
            kind = %intent.kind,
            %quantity,
            price = ?intent.limit_price,
            outside_rth = intent.outside_regular_hours,
            position = %self.reconciler.state().net_position,
            "Order placed"
        );
        self.ports.sink.order_placed(&OrderPlaced::from_intent(&intent, order_id));
        Ok(())
    }

    /// Poll the quote feed until a limit price can be derived, up to `quote_wait`.
    async fn await_quote(&self) -> TradingResult<QuoteSnapshot> {
        let deadline = Instant::now() + self.settings.quote_wait;
        loop {
            let quote = self.ports.feed.latest_quote(&self.settings.symbol).await?;
            match self.orders.limit_price(&quote) {
                Ok(_) => return Ok(quote),
                Err(err) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(err);
                    }
                    tokio::time::sleep(QUOTE_POLL.min(deadline - now)).await;
                }
            }
        }
    }
}

/// Long-running worker for one instrument.
#[derive(Clone)]
pub struct InstrumentWorker {
    settings: WorkerSettings,
    ports: WorkerPorts,
}

impl InstrumentWorker {
    pub fn new(settings: WorkerSettings, ports: WorkerPorts) -> Self {
        Self { settings, ports }
    }

    pub fn symbol(&self) -> &str {
        &self.settings.symbol
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    /// Run one session until stopped, the feed ends, or a fatal error.
    ///
    /// Every call re-queries the account and builds a fresh context; nothing
    /// carries over from a previous run.
    pub async fn run(&self, stop: watch::Receiver<bool>) -> TradingResult<WorkerExit> {
        let session = self.ports.sessions.allocate()?;
        let span = info_span!("worker", symbol = %self.settings.symbol, session_id = session.id());

        async move {
            let result = self.run_session(session, stop).await;
            match &result {
                Ok(exit) => info!(?exit, "Worker finished"),
                Err(err) if err.is_fatal() => error!(error = %err, "Halting worker"),
                Err(err) => warn!(error = %err, "Worker ended with a recoverable error"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_session(
        &self,
        session: ClientSession,
        mut stop: watch::Receiver<bool>,
    ) -> TradingResult<WorkerExit> {
        let symbol = self.settings.symbol.as_str();

        let net_position = self.ports.broker.net_position(symbol).await?;
        let mut ctx = WorkerContext::new(&self.settings, self.ports.clone(), session, net_position)?;

        let cancelled = self.ports.broker.cancel_open_orders(symbol).await?;
        if cancelled > 0 {
            info!(cancelled, "Cancelled open orders from a previous session");
        }

        let mut events = self
            .ports
            .feed
            .subscribe(symbol, self.settings.period, ctx.wants_backfill(), ctx.session_id())
            .await?;
        info!(
            strategy = %self.settings.strategy,
            period = %self.settings.period,
            position = %net_position,
            backfill = ctx.wants_backfill(),
            "Worker started"
        );

        loop {
            if *stop.borrow() {
                return Ok(WorkerExit::Stopped);
            }
            let event = tokio::select! {
                biased;
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        return Ok(WorkerExit::Stopped);
                    }
                    continue;
                }
                event = events.recv() => event,
            };

            let Some(event) = event else {
                warn!("Market data stream ended");
                return Ok(WorkerExit::FeedEnded);
            };

            if let Err(err) = ctx.handle(event, &stop).await {
                if err.is_fatal() {
                    return Err(err);
                }
                warn!(error = %err, "Recoverable error, continuing");
            }
        }
    }
}
