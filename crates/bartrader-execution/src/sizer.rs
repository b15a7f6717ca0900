//! Order sizing against shortable-share availability.

use bartrader_core::types::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::reconciler::TradeDecision;

/// Outcome of sizing a trade decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeOutcome {
    /// Trade at the requested size.
    Full(Decimal),
    /// Not enough shares to short the doubled size; trade only the base size.
    Capped { requested: Decimal, quantity: Decimal },
    /// Nothing to sell: no shortable shares and no position to unwind.
    Blocked { requested: Decimal, available: Decimal },
}

impl SizeOutcome {
    /// Quantity to send, if the trade goes ahead.
    pub fn quantity(&self) -> Option<Decimal> {
        match self {
            SizeOutcome::Full(q) => Some(*q),
            SizeOutcome::Capped { quantity, .. } => Some(*quantity),
            SizeOutcome::Blocked { .. } => None,
        }
    }
}

/// Applies the shortability policy to trade decisions.
#[derive(Debug, Clone)]
pub struct OrderSizer {
    symbol: String,
    base_size: Decimal,
}

impl OrderSizer {
    pub fn new(symbol: impl Into<String>, base_size: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            base_size,
        }
    }

    /// Size a decision given the current net position and shortable shares.
    ///
    /// Buys are never limited. A sell larger than the shortable quantity is
    /// blocked when flat, and capped to the base size when it would flip an
    /// existing long (unwinding the long needs no borrow).
    pub fn size(
        &self,
        decision: &TradeDecision,
        net_position: Decimal,
        shortable: Decimal,
    ) -> SizeOutcome {
        let requested = decision.quantity;
        if decision.side == Side::Buy || shortable >= requested {
            return SizeOutcome::Full(requested);
        }

        if net_position == Decimal::ZERO {
            warn!(
                symbol = %self.symbol,
                %requested,
                %shortable,
                "No shares available to short, blocking order"
            );
            return SizeOutcome::Blocked {
                requested,
                available: shortable,
            };
        }

        let quantity = self.base_size.min(requested);
        warn!(
            symbol = %self.symbol,
            %requested,
            %shortable,
            %quantity,
            "Insufficient shortable shares, capping order to base size"
        );
        SizeOutcome::Capped {
            requested,
            quantity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn decision(side: Side, quantity: Decimal) -> TradeDecision {
        TradeDecision {
            side,
            quantity,
            first_trade: false,
        }
    }

    #[test]
    fn test_buys_are_unlimited() {
        let sizer = OrderSizer::new("AAPL", dec!(100));
        let outcome = sizer.size(&decision(Side::Buy, dec!(200)), dec!(-100), Decimal::ZERO);
        assert_eq!(outcome, SizeOutcome::Full(dec!(200)));
    }

    #[test]
    fn test_enough_shortable() {
        let sizer = OrderSizer::new("AAPL", dec!(100));
        let outcome = sizer.size(&decision(Side::Sell, dec!(200)), dec!(100), dec!(1000));
        assert_eq!(outcome.quantity(), Some(dec!(200)));
    }

    #[test]
    fn test_flat_short_blocked() {
        let sizer = OrderSizer::new("AAPL", dec!(200));
        let outcome = sizer.size(&decision(Side::Sell, dec!(200)), Decimal::ZERO, dec!(50));
        assert_eq!(
            outcome,
            SizeOutcome::Blocked {
                requested: dec!(200),
                available: dec!(50)
            }
        );
        assert_eq!(outcome.quantity(), None);
    }

    #[test]
    fn test_flip_capped_to_base() {
        let sizer = OrderSizer::new("AAPL", dec!(100));
        let outcome = sizer.size(&decision(Side::Sell, dec!(200)), dec!(100), dec!(50));
        assert_eq!(
            outcome,
            SizeOutcome::Capped {
                requested: dec!(200),
                quantity: dec!(100)
            }
        );
    }
}
