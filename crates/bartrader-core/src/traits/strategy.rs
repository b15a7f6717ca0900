//! Candle-builder and signal-detector capability traits.
//!
//! A worker pipeline is parameterised by one builder and one detector,
//! selected by configuration.

use crate::error::TradingResult;
use crate::types::{Candle, CandleSeries, Side, WindowSummary};

/// Turns closed windows into candles appended to a series.
pub trait CandleBuilder: Send + Sync {
    /// Get the strategy name this builder belongs to.
    fn name(&self) -> &str;

    /// Whether the builder needs a historical backfill before trading.
    fn requires_backfill(&self) -> bool {
        false
    }

    /// Number of candles the series must hold before signals can be read.
    fn warmup_period(&self) -> usize {
        1
    }

    /// Maximum candles retained once trading live (0 = unbounded).
    fn retention(&self) -> usize {
        0
    }

    /// Fold a closed window into a new candle and append it to `series`.
    ///
    /// Returns the candle as stored in the series (including any derived
    /// values recomputed by the append).
    fn build(&mut self, window: &WindowSummary, series: &mut CandleSeries)
        -> TradingResult<Candle>;

    /// Recompute derived values over the whole series.
    fn refresh(&mut self, _series: &mut CandleSeries) -> TradingResult<()> {
        Ok(())
    }

    /// Called once after the last historical candle has been built and the
    /// history has been scanned; switches the builder to live mode.
    fn finish_backfill(&mut self, _series: &mut CandleSeries) -> TradingResult<()> {
        Ok(())
    }
}

/// Decides Buy / Sell / nothing from candles.
pub trait SignalDetector: Send + Sync {
    /// Get the detector name.
    fn name(&self) -> &str;

    /// Core rule: compare a candle with its predecessor.
    fn detect_pair(&self, latest: &Candle, previous: Option<&Candle>) -> Option<Side>;

    /// Signal for the newest candle of the series.
    fn detect(&self, series: &CandleSeries) -> Option<Side> {
        let len = series.len();
        let latest = series.last()?;
        let previous = len.checked_sub(2).and_then(|i| series.get(i));
        self.detect_pair(latest, previous)
    }

    /// Walk backward from the newest candle and return the side of the most
    /// recent crossover event, if any.
    fn scan_history(&self, series: &CandleSeries) -> Option<Side> {
        (0..series.len()).rev().find_map(|i| {
            let latest = series.get(i)?;
            let previous = i.checked_sub(1).and_then(|p| series.get(p));
            self.detect_pair(latest, previous)
        })
    }
}
