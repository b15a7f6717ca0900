//! Position reconciliation.
//!
//! Combines the externally reported net position with detected signals.
//! The net position must always be one of `{0, ±base, ±2·base}`; anything
//! else means the account was touched outside this worker and trading halts.

use bartrader_core::error::{TradingError, TradingResult};
use bartrader_core::types::{PositionState, Side};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// An actionable trade: side, size and whether it opens from flat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeDecision {
    pub side: Side,
    pub quantity: Decimal,
    pub first_trade: bool,
}

/// Outcome of reconciling the history-derived side with the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reconciliation {
    /// Flat: open in the detected direction.
    Open(TradeDecision),
    /// Already positioned in the detected direction.
    Hold(Side),
    /// Positioned against the detected direction: flip.
    Flip(TradeDecision),
}

impl Reconciliation {
    /// Trade to schedule, if any.
    pub fn decision(&self) -> Option<TradeDecision> {
        match self {
            Reconciliation::Open(d) | Reconciliation::Flip(d) => Some(*d),
            Reconciliation::Hold(_) => None,
        }
    }

    pub fn side(&self) -> Side {
        match self {
            Reconciliation::Open(d) | Reconciliation::Flip(d) => d.side,
            Reconciliation::Hold(side) => *side,
        }
    }
}

/// Owns the [`PositionState`] of one instrument.
#[derive(Debug, Clone)]
pub struct PositionReconciler {
    symbol: String,
    base_size: Decimal,
    state: PositionState,
}

impl PositionReconciler {
    /// Start from a freshly queried net position.
    pub fn new(
        symbol: impl Into<String>,
        base_size: Decimal,
        net_position: Decimal,
    ) -> TradingResult<Self> {
        if base_size <= Decimal::ZERO {
            return Err(TradingError::Config(format!(
                "base order size must be positive, got {base_size}"
            )));
        }
        let mut reconciler = Self {
            symbol: symbol.into(),
            base_size,
            state: PositionState::new(Decimal::ZERO, base_size),
        };
        reconciler.refresh(net_position)?;
        Ok(reconciler)
    }

    pub fn state(&self) -> &PositionState {
        &self.state
    }

    pub fn base_size(&self) -> Decimal {
        self.base_size
    }

    /// Net positions the sizing policy can produce.
    pub fn expected_positions(&self) -> Vec<Decimal> {
        let base = self.base_size;
        vec![Decimal::ZERO, base, -base, base * dec!(2), -base * dec!(2)]
    }

    fn check(&self, net_position: Decimal) -> TradingResult<()> {
        let expected = self.expected_positions();
        if expected.contains(&net_position) {
            Ok(())
        } else {
            Err(TradingError::UnexpectedPosition {
                symbol: self.symbol.clone(),
                position: net_position,
                expected,
            })
        }
    }

    fn size_for(&self, net_position: Decimal) -> Decimal {
        if net_position == Decimal::ZERO {
            self.base_size
        } else {
            self.base_size * dec!(2)
        }
    }

    /// Adopt a re-queried account position.
    pub fn refresh(&mut self, net_position: Decimal) -> TradingResult<()> {
        self.check(net_position)?;
        self.state = PositionState {
            net_position,
            is_first_trade: net_position == Decimal::ZERO,
            current_order_size: self.size_for(net_position),
        };
        Ok(())
    }

    /// Reconcile the side found by the backward history scan.
    pub fn reconcile_history(&self, side: Side) -> TradingResult<Reconciliation> {
        let net = self.state.net_position;
        self.check(net)?;

        let outcome = if self.state.is_flat() {
            Reconciliation::Open(TradeDecision {
                side,
                quantity: self.base_size,
                first_trade: true,
            })
        } else if side.agrees_with(net) {
            Reconciliation::Hold(side)
        } else {
            Reconciliation::Flip(TradeDecision {
                side,
                quantity: self.size_for(net),
                first_trade: false,
            })
        };
        info!(symbol = %self.symbol, %side, position = %net, ?outcome, "Reconciled position with history");
        Ok(outcome)
    }

    /// Decide whether a live signal is actionable. Does not change state.
    pub fn evaluate_live(&self, side: Side) -> TradingResult<Option<TradeDecision>> {
        let net = self.state.net_position;
        self.check(net)?;

        if self.state.is_flat() {
            return Ok(Some(TradeDecision {
                side,
                quantity: self.base_size,
                first_trade: true,
            }));
        }
        if side.agrees_with(net) {
            warn!(
                symbol = %self.symbol,
                %side,
                position = %net,
                "Dropping same-direction signal while positioned"
            );
            return Ok(None);
        }
        Ok(Some(TradeDecision {
            side,
            quantity: self.size_for(net),
            first_trade: false,
        }))
    }

    /// Apply a trade the order sink accepted, with the quantity actually sent.
    pub fn confirm_trade(&mut self, side: Side, quantity: Decimal) {
        let net_position = self.state.net_position + side.sign() * quantity;
        self.state = PositionState {
            net_position,
            is_first_trade: false,
            current_order_size: self.size_for(net_position),
        };
    }
}
