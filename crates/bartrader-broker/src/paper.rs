//! Paper broker for replay and simulation.
//!
//! Implements both the order-sink side ([`Broker`]) and the feed side
//! ([`MarketData`]) in memory. Bars are scripted per symbol or pushed while
//! running; orders fill immediately at their limit (or the last price) unless
//! manual fills are requested.

use async_trait::async_trait;
use bartrader_core::error::{BrokerError, DataError};
use bartrader_core::traits::{Broker, MarketData, MarketStream};
use bartrader_core::types::{MarketEvent, OrderIntent, Period, QuoteSnapshot, RawBar};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// When submitted orders are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillMode {
    /// Fill at submission.
    #[default]
    Immediate,
    /// Leave orders working until [`PaperBroker::fill_working_orders`].
    Manual,
}

/// Lifecycle of a paper order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaperOrderStatus {
    Working,
    Filled,
    Cancelled,
}

/// Submitted order plus its status.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperOrder {
    pub intent: OrderIntent,
    pub status: PaperOrderStatus,
}

#[derive(Debug, Default)]
struct FeedScript {
    history: Vec<RawBar>,
    live: Vec<RawBar>,
}

#[derive(Debug, Default)]
struct PaperState {
    connected: bool,
    positions: HashMap<String, Decimal>,
    shortable: HashMap<String, Decimal>,
    quotes: HashMap<String, QuoteSnapshot>,
    orders: BTreeMap<u64, PaperOrder>,
    feeds: HashMap<String, FeedScript>,
    subscribers: HashMap<String, Vec<mpsc::Sender<MarketEvent>>>,
    sessions: Vec<(String, u32)>,
}

impl PaperState {
    fn fill(&mut self, order_id: u64) {
        let Some(order) = self.orders.get_mut(&order_id) else {
            return;
        };
        if order.status != PaperOrderStatus::Working {
            return;
        }
        order.status = PaperOrderStatus::Filled;
        let intent = order.intent.clone();

        *self.positions.entry(intent.symbol.clone()).or_default() += intent.signed_quantity();
        if let Some(price) = intent.limit_price {
            let last = price.to_f64();
            let quote = self.quotes.entry(intent.symbol.clone()).or_default();
            quote.last = last.or(quote.last);
        }
        debug!(order_id, symbol = %intent.symbol, side = %intent.side, quantity = %intent.quantity, "paper fill");
    }
}

fn lock(state: &Mutex<PaperState>) -> MutexGuard<'_, PaperState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory broker and feed.
#[derive(Debug, Clone)]
pub struct PaperBroker {
    state: Arc<Mutex<PaperState>>,
    fill_mode: FillMode,
    default_shortable: Decimal,
    quotes_follow_bars: bool,
    channel_capacity: usize,
}

impl PaperBroker {
    /// Create a connected paper broker with no positions.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(PaperState {
                connected: true,
                ..PaperState::default()
            })),
            fill_mode: FillMode::Immediate,
            default_shortable: dec!(1_000_000),
            quotes_follow_bars: true,
            channel_capacity: 1024,
        }
    }

    /// Set when orders fill.
    pub fn with_fill_mode(mut self, fill_mode: FillMode) -> Self {
        self.fill_mode = fill_mode;
        self
    }

    /// Shortable quantity reported for symbols without an explicit value.
    pub fn with_default_shortable(mut self, shortable: Decimal) -> Self {
        self.default_shortable = shortable;
        self
    }

    /// Whether each bar updates the symbol's quote as the subscriber reads it.
    pub fn with_quotes_from_bars(mut self, enabled: bool) -> Self {
        self.quotes_follow_bars = enabled;
        self
    }

    pub fn set_position(&self, symbol: &str, quantity: Decimal) {
        lock(&self.state).positions.insert(symbol.to_string(), quantity);
    }

    pub fn set_shortable(&self, symbol: &str, quantity: Decimal) {
        lock(&self.state).shortable.insert(symbol.to_string(), quantity);
    }

    pub fn set_quote(&self, symbol: &str, quote: QuoteSnapshot) {
        lock(&self.state).quotes.insert(symbol.to_string(), quote);
    }

    /// Simulate a dropped (or restored) connection.
    pub fn set_connected(&self, connected: bool) {
        lock(&self.state).connected = connected;
    }

    /// Historical period bars delivered at every subscription that asks for backfill.
    pub fn set_history(&self, symbol: &str, bars: Vec<RawBar>) {
        lock(&self.state)
            .feeds
            .entry(symbol.to_string())
            .or_default()
            .history = bars;
    }

    /// Live sub-bars delivered once, to the next subscription.
    pub fn set_live_bars(&self, symbol: &str, bars: Vec<RawBar>) {
        lock(&self.state)
            .feeds
            .entry(symbol.to_string())
            .or_default()
            .live = bars;
    }

    /// Deliver one live bar to every current subscriber of `symbol`.
    pub async fn push_bar(&self, symbol: &str, bar: RawBar) -> usize {
        let senders = lock(&self.state)
            .subscribers
            .get(symbol)
            .cloned()
            .unwrap_or_default();
        let mut delivered = 0;
        for tx in senders {
            if tx.send(MarketEvent::Bar(bar)).await.is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    /// Close the feed of `symbol`; subscribers see end-of-stream once any
    /// scripted bars have been delivered.
    pub fn close_feed(&self, symbol: &str) {
        lock(&self.state).subscribers.remove(symbol);
    }

    pub fn close_all_feeds(&self) {
        lock(&self.state).subscribers.clear();
    }

    /// Fill every working order.
    pub fn fill_working_orders(&self) -> usize {
        let mut state = lock(&self.state);
        let working: Vec<u64> = state
            .orders
            .iter()
            .filter(|(_, o)| o.status == PaperOrderStatus::Working)
            .map(|(id, _)| *id)
            .collect();
        for id in &working {
            state.fill(*id);
        }
        working.len()
    }

    /// Every order submitted so far, in id order.
    pub fn orders(&self) -> Vec<PaperOrder> {
        lock(&self.state).orders.values().cloned().collect()
    }

    /// Intents submitted for `symbol`, in id order.
    pub fn submitted(&self, symbol: &str) -> Vec<OrderIntent> {
        lock(&self.state)
            .orders
            .values()
            .filter(|o| o.intent.symbol == symbol)
            .map(|o| o.intent.clone())
            .collect()
    }

    /// Current paper position of `symbol`, regardless of connection state.
    pub fn net_position_of(&self, symbol: &str) -> Decimal {
        lock(&self.state)
            .positions
            .get(symbol)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// (symbol, session id) of every subscription made.
    pub fn sessions(&self) -> Vec<(String, u32)> {
        lock(&self.state).sessions.clone()
    }

    fn quote_from_bar(state: &mut PaperState, symbol: &str, bar: &RawBar) {
        let quote = state.quotes.entry(symbol.to_string()).or_default();
        quote.last = Some(bar.close);
        quote.bid = Some(bar.close.min(bar.open).max(bar.low));
        quote.ask = Some(bar.close.max(bar.open).min(bar.high));
    }

    fn ensure_connected(&self) -> Result<(), BrokerError> {
        if lock(&self.state).connected {
            Ok(())
        } else {
            Err(BrokerError::Connection("paper broker disconnected".to_string()))
        }
    }
}

impl Default for PaperBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Broker for PaperBroker {
    async fn submit_order(&self, intent: &OrderIntent) -> Result<u64, BrokerError> {
        self.ensure_connected()?;
        if intent.quantity <= Decimal::ZERO {
            return Err(BrokerError::OrderRejected(format!(
                "non-positive quantity {}",
                intent.quantity
            )));
        }
        let order_id = intent.client_order_id;
        let mut state = lock(&self.state);
        if state.orders.contains_key(&order_id) {
            return Err(BrokerError::OrderRejected(format!(
                "duplicate order id {order_id}"
            )));
        }
        state.orders.insert(
            order_id,
            PaperOrder {
                intent: intent.clone(),
                status: PaperOrderStatus::Working,
            },
        );
        info!(
            order_id,
            symbol = %intent.symbol,
            side = %intent.side,
            kind = %intent.kind,
            quantity = %intent.quantity,
            price = ?intent.limit_price,
            "paper order accepted"
        );
        if self.fill_mode == FillMode::Immediate {
            state.fill(order_id);
        }
        Ok(order_id)
    }

    async fn cancel_order(&self, order_id: u64) -> Result<(), BrokerError> {
        self.ensure_connected()?;
        let mut state = lock(&self.state);
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or(BrokerError::OrderNotFound(order_id))?;
        if order.status != PaperOrderStatus::Working {
            return Err(BrokerError::OrderRejected(format!(
                "order {order_id} is no longer working"
            )));
        }
        order.status = PaperOrderStatus::Cancelled;
        Ok(())
    }

    async fn open_orders(&self, symbol: &str) -> Result<Vec<u64>, BrokerError> {
        self.ensure_connected()?;
        Ok(lock(&self.state)
            .orders
            .iter()
            .filter(|(_, o)| o.status == PaperOrderStatus::Working && o.intent.symbol == symbol)
            .map(|(id, _)| *id)
            .collect())
    }

    async fn net_position(&self, symbol: &str) -> Result<Decimal, BrokerError> {
        self.ensure_connected()?;
        Ok(lock(&self.state)
            .positions
            .get(symbol)
            .copied()
            .unwrap_or(Decimal::ZERO))
    }

    async fn shortable_shares(&self, symbol: &str) -> Result<Decimal, BrokerError> {
        self.ensure_connected()?;
        Ok(lock(&self.state)
            .shortable
            .get(symbol)
            .copied()
            .unwrap_or(self.default_shortable))
    }

    fn name(&self) -> &str {
        "Paper Broker"
    }
}

#[async_trait]
impl MarketData for PaperBroker {
    async fn subscribe(
        &self,
        symbol: &str,
        period: Period,
        backfill: bool,
        session_id: u32,
    ) -> Result<MarketStream, DataError> {
        let (tx, rx) = mpsc::channel(self.channel_capacity);

        let (history, live) = {
            let mut state = lock(&self.state);
            if !state.connected {
                return Err(DataError::NoDataAvailable(format!(
                    "{symbol}: paper feed disconnected"
                )));
            }
            state.sessions.push((symbol.to_string(), session_id));
            state
                .subscribers
                .entry(symbol.to_string())
                .or_default()
                .push(tx.clone());
            let script = state.feeds.entry(symbol.to_string()).or_default();
            let history = if backfill { script.history.clone() } else { Vec::new() };
            (history, std::mem::take(&mut script.live))
        };

        info!(
            symbol,
            %period,
            session_id,
            history = history.len(),
            live = live.len(),
            "paper subscription"
        );

        tokio::spawn(async move {
            if backfill {
                for bar in history {
                    if tx.send(MarketEvent::Backfill(bar)).await.is_err() {
                        return;
                    }
                }
                if tx.send(MarketEvent::BackfillComplete).await.is_err() {
                    return;
                }
            }
            for bar in live {
                if tx.send(MarketEvent::Bar(bar)).await.is_err() {
                    return;
                }
            }
        });

        let stream = MarketStream::new(rx);
        if !self.quotes_follow_bars {
            return Ok(stream);
        }
        let state = Arc::clone(&self.state);
        let symbol = symbol.to_string();
        Ok(stream.with_hook(move |event| {
            if let MarketEvent::Bar(bar) = event {
                Self::quote_from_bar(&mut lock(&state), &symbol, bar);
            }
        }))
    }

    async fn latest_quote(&self, symbol: &str) -> Result<QuoteSnapshot, DataError> {
        Ok(lock(&self.state)
            .quotes
            .get(symbol)
            .copied()
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        "Paper Feed"
    }
}
