//! Strategy implementations.
//!
//! Each strategy is a candle builder paired with a signal detector:
//! - Heikin-Ashi candles, signalling on a change of smoothed color
//! - EMA / linear-regression crossover on plain OHLC candles

mod ema_lrc;
mod heikin_ashi;
mod registry;

pub use ema_lrc::{CrossoverDetector, EmaLrcBuilder, EmaLrcConfig};
pub use heikin_ashi::{smooth, HeikinAshiBuilder, HeikinAshiConfig, HeikinAshiDetector};
pub use registry::{StrategyInfo, StrategyKind, StrategyPair, StrategyRegistry};
