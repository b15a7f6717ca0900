//! Order intents handed to the external order sink.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order side (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Get the sign for position calculations (+1 for buy, -1 for sell).
    pub fn sign(&self) -> Decimal {
        match self {
            Side::Buy => Decimal::ONE,
            Side::Sell => -Decimal::ONE,
        }
    }

    /// Whether a signed position points the same way as this side.
    pub fn agrees_with(&self, net_position: Decimal) -> bool {
        match self {
            Side::Buy => net_position > Decimal::ZERO,
            Side::Sell => net_position < Decimal::ZERO,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Order kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    /// Market order - execute immediately at best available price
    #[default]
    Market,
    /// Limit order - execute at specified price or better
    Limit,
}

impl std::fmt::Display for OrderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderKind::Market => write!(f, "MKT"),
            OrderKind::Limit => write!(f, "LMT"),
        }
    }
}

/// Which quote a limit price is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuotePreference {
    /// Best bid / best ask midpoint
    Mid,
    /// Last traded price
    #[default]
    Last,
}

/// Immutable order intent created once per qualifying signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderIntent {
    /// Symbol to trade
    pub symbol: String,
    /// Buy or sell
    pub side: Side,
    /// Quantity to trade
    pub quantity: Decimal,
    /// Kind of order
    pub kind: OrderKind,
    /// Limit price (limit orders only)
    pub limit_price: Option<Decimal>,
    /// Allowed to work outside regular trading hours
    pub outside_regular_hours: bool,
    /// Process-unique order id
    pub client_order_id: u64,
    /// Time of the candle the order was derived from
    pub candle_time: i64,
    /// When the intent was created
    pub created_at: DateTime<Utc>,
}

impl OrderIntent {
    /// Create a market order intent.
    pub fn market(
        symbol: impl Into<String>,
        side: Side,
        quantity: Decimal,
        client_order_id: u64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            quantity,
            kind: OrderKind::Market,
            limit_price: None,
            outside_regular_hours: false,
            client_order_id,
            candle_time: 0,
            created_at: Utc::now(),
        }
    }

    /// Create a limit order intent.
    pub fn limit(
        symbol: impl Into<String>,
        side: Side,
        quantity: Decimal,
        limit_price: Decimal,
        client_order_id: u64,
    ) -> Self {
        Self {
            kind: OrderKind::Limit,
            limit_price: Some(limit_price),
            ..Self::market(symbol, side, quantity, client_order_id)
        }
    }

    /// Allow the order to work outside regular trading hours.
    pub fn with_outside_regular_hours(mut self) -> Self {
        self.outside_regular_hours = true;
        self
    }

    /// Record the candle the order was derived from.
    pub fn with_candle_time(mut self, candle_time: i64) -> Self {
        self.candle_time = candle_time;
        self
    }

    /// Signed change this order applies to the net position.
    pub fn signed_quantity(&self) -> Decimal {
        self.side.sign() * self.quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_intent_market() {
        let intent = OrderIntent::market("AAPL", Side::Buy, dec!(100), 7);
        assert_eq!(intent.symbol, "AAPL");
        assert_eq!(intent.kind, OrderKind::Market);
        assert_eq!(intent.limit_price, None);
        assert!(!intent.outside_regular_hours);
        assert_eq!(intent.signed_quantity(), dec!(100));
    }

    #[test]
    fn test_order_intent_limit() {
        let intent = OrderIntent::limit("AAPL", Side::Sell, dec!(50), dec!(150.25), 8)
            .with_outside_regular_hours()
            .with_candle_time(1_700_000_000);
        assert_eq!(intent.kind, OrderKind::Limit);
        assert_eq!(intent.limit_price, Some(dec!(150.25)));
        assert!(intent.outside_regular_hours);
        assert_eq!(intent.candle_time, 1_700_000_000);
        assert_eq!(intent.signed_quantity(), dec!(-50));
    }

    #[test]
    fn test_side_helpers() {
        assert!(Side::Buy.agrees_with(dec!(100)));
        assert!(!Side::Buy.agrees_with(dec!(-100)));
        assert!(!Side::Sell.agrees_with(Decimal::ZERO));
    }
}
