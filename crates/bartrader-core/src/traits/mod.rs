//! Core traits for the trading system.

mod broker;
mod event_sink;
mod indicator;
mod market_data;
mod strategy;

pub use broker::Broker;
pub use event_sink::{EventSink, NullSink};
pub use indicator::Indicator;
pub use market_data::{MarketData, MarketStream};
pub use strategy::{CandleBuilder, SignalDetector};
