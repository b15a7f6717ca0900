//! Order intent construction: order kind and limit price policy.

use bartrader_core::error::{TradingError, TradingResult};
use bartrader_core::types::{OrderIntent, OrderKind, QuotePreference, QuoteSnapshot, Side};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::session::RegularHours;

/// Builds order intents for one instrument.
#[derive(Debug, Clone)]
pub struct OrderBuilder {
    symbol: String,
    default_kind: OrderKind,
    quote: QuotePreference,
    session: RegularHours,
}

impl OrderBuilder {
    pub fn new(
        symbol: impl Into<String>,
        default_kind: OrderKind,
        quote: QuotePreference,
        session: RegularHours,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            default_kind,
            quote,
            session,
        }
    }

    /// Order kind to use at `now`: outside regular hours only limit orders are sent.
    pub fn kind_at(&self, now: DateTime<Utc>) -> (OrderKind, bool) {
        if self.session.is_open(now) {
            (self.default_kind, false)
        } else {
            (OrderKind::Limit, true)
        }
    }

    /// Whether an order built at `now` needs a quote.
    pub fn needs_quote(&self, now: DateTime<Utc>) -> bool {
        self.kind_at(now).0 == OrderKind::Limit
    }

    /// Limit price from the configured quote, rounded to cents for midpoints.
    pub fn limit_price(&self, quote: &QuoteSnapshot) -> TradingResult<Decimal> {
        let raw = match self.quote {
            QuotePreference::Mid => quote.mid(),
            QuotePreference::Last => quote.last,
        };
        let price = raw
            .filter(|p| p.is_finite() && *p > 0.0)
            .ok_or_else(|| {
                TradingError::FeedNotReady(format!(
                    "{} has no {:?} price yet",
                    self.symbol, self.quote
                ))
            })?;
        let price = Decimal::try_from(price)
            .map_err(|e| TradingError::FeedNotReady(format!("{}: {e}", self.symbol)))?;
        Ok(match self.quote {
            QuotePreference::Mid => price.round_dp(2),
            QuotePreference::Last => price.normalize(),
        })
    }

    /// Build an intent. Fails with `FeedNotReady` when a limit price is
    /// needed but the quote feed has not reported one.
    pub fn build(
        &self,
        side: Side,
        quantity: Decimal,
        quote: &QuoteSnapshot,
        now: DateTime<Utc>,
        client_order_id: u64,
        candle_time: i64,
    ) -> TradingResult<OrderIntent> {
        let (kind, outside_hours) = self.kind_at(now);
        let intent = match kind {
            OrderKind::Market => {
                OrderIntent::market(self.symbol.clone(), side, quantity, client_order_id)
            }
            OrderKind::Limit => OrderIntent::limit(
                self.symbol.clone(),
                side,
                quantity,
                self.limit_price(quote)?,
                client_order_id,
            ),
        };
        let intent = intent.with_candle_time(candle_time);
        Ok(if outside_hours {
            intent.with_outside_regular_hours()
        } else {
            intent
        })
    }
}
