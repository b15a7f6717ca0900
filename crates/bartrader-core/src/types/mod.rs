//! Core data types for the trading system.

mod bar;
mod candle;
mod event;
mod order;
mod period;
mod position;
mod quote;
mod series;

pub use bar::{RawBar, WindowSummary};
pub use candle::{Candle, Derived, HaColor, HeikinAshi, IndicatorValues};
pub use event::{CandleClosed, MarketEvent, OrderPlaced};
pub use order::{OrderIntent, OrderKind, QuotePreference, Side};
pub use period::Period;
pub use position::PositionState;
pub use quote::QuoteSnapshot;
pub use series::CandleSeries;
