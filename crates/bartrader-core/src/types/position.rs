//! Per-instrument position state.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Net position plus the sizing state derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionState {
    /// Signed quantity (positive for long, negative for short)
    pub net_position: Decimal,
    /// No trade has been confirmed since this state was created
    pub is_first_trade: bool,
    /// Size the next actionable trade will use
    pub current_order_size: Decimal,
}

impl PositionState {
    /// Fresh state from an externally reported position.
    pub fn new(net_position: Decimal, base_size: Decimal) -> Self {
        Self {
            net_position,
            is_first_trade: true,
            current_order_size: base_size,
        }
    }

    /// Check if the position is flat (no shares).
    pub fn is_flat(&self) -> bool {
        self.net_position == Decimal::ZERO
    }
}
