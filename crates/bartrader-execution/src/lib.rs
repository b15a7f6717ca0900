//! Trade execution policy.
//!
//! Position reconciliation, shortability-aware sizing and order intent
//! construction for one instrument.

mod order_builder;
mod reconciler;
mod session;
mod sizer;

pub use order_builder::OrderBuilder;
pub use reconciler::{PositionReconciler, Reconciliation, TradeDecision};
pub use session::RegularHours;
pub use sizer::{OrderSizer, SizeOutcome};
