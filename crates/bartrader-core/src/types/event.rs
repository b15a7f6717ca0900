//! Events flowing into a worker from the feed, and out of it to sinks.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Candle, OrderIntent, OrderKind, RawBar, Side};

/// Inbound feed event for one subscribed instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketEvent {
    /// Pre-aggregated historical bar covering a full period, starting at `start_time`
    Backfill(RawBar),
    /// No more historical bars will follow
    BackfillComplete,
    /// Live sub-period bar
    Bar(RawBar),
}

/// Emitted once per closed window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleClosed {
    pub symbol: String,
    pub candle: Candle,
    /// Whether the candle was built from historical backfill
    pub historical: bool,
}

/// Emitted once per order handed to the order sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub timestamp: DateTime<Utc>,
    pub candle_time: i64,
    pub order_id: u64,
    pub symbol: String,
    pub side: Side,
    pub kind: OrderKind,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
}

impl OrderPlaced {
    pub fn from_intent(intent: &OrderIntent, order_id: u64) -> Self {
        Self {
            timestamp: intent.created_at,
            candle_time: intent.candle_time,
            order_id,
            symbol: intent.symbol.clone(),
            side: intent.side,
            kind: intent.kind,
            quantity: intent.quantity,
            price: intent.limit_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_placed_from_intent() {
        let intent = OrderIntent::limit("MSFT", Side::Buy, dec!(10), dec!(301.12), 42)
            .with_candle_time(1_000);
        let event = OrderPlaced::from_intent(&intent, 42);
        assert_eq!(event.order_id, 42);
        assert_eq!(event.candle_time, 1_000);
        assert_eq!(event.kind, OrderKind::Limit);
        assert_eq!(event.price, Some(dec!(301.12)));
    }

    #[test]
    fn test_market_event_serde() {
        let event = MarketEvent::Bar(RawBar::new(60, 1.0, 2.0, 0.5, 1.5));
        let json = serde_json::to_string(&event).unwrap();
        let back: MarketEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }
}
