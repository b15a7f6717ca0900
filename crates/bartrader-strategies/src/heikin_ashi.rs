//! Heikin-Ashi candle strategy.
//!
//! Builds recursively smoothed candles and signals when the smoothed color
//! changes. Indecision candles (`ha_open == ha_close`) are skipped entirely:
//! they neither fire nor break a run of same-colored candles.

use bartrader_core::error::{TradingError, TradingResult};
use bartrader_core::traits::{CandleBuilder, SignalDetector};
use bartrader_core::types::{
    Candle, CandleSeries, Derived, HaColor, HeikinAshi, Side, WindowSummary,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for the Heikin-Ashi strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeikinAshiConfig {
    /// Candles retained in the series
    pub history_limit: usize,
    /// Seed the series from historical bars before trading
    pub backfill: bool,
}

impl Default for HeikinAshiConfig {
    fn default() -> Self {
        Self {
            history_limit: 1000,
            backfill: false,
        }
    }
}

impl HeikinAshiConfig {
    pub fn validate(&self) -> TradingResult<()> {
        if self.history_limit < 2 {
            return Err(TradingError::Config(
                "history_limit must keep at least 2 candles".into(),
            ));
        }
        Ok(())
    }
}

/// Smooth one closed window against the previous smoothed candle.
///
/// The first candle of a series has no predecessor and opens at the
/// midpoint of its own raw open and close.
pub fn smooth(window: &WindowSummary, prev: Option<&HeikinAshi>) -> HeikinAshi {
    let ha_close = (window.open + window.high + window.low + window.close) / 4.0;
    let ha_open = match prev {
        Some(p) => (p.ha_open + p.ha_close) / 2.0,
        None => (window.open + window.close) / 2.0,
    };
    HeikinAshi {
        ha_open,
        ha_close,
        ha_high: window.high.max(ha_open).max(ha_close),
        ha_low: window.low.min(ha_open).min(ha_close),
        ha_color: HaColor::classify(ha_open, ha_close),
    }
}

/// Candle builder for the Heikin-Ashi transform.
#[derive(Debug, Clone)]
pub struct HeikinAshiBuilder {
    config: HeikinAshiConfig,
}

impl HeikinAshiBuilder {
    pub fn new(config: HeikinAshiConfig) -> Self {
        Self { config }
    }
}

impl CandleBuilder for HeikinAshiBuilder {
    fn name(&self) -> &str {
        "heikin_ashi"
    }

    fn requires_backfill(&self) -> bool {
        self.config.backfill
    }

    fn retention(&self) -> usize {
        self.config.history_limit
    }

    fn build(
        &mut self,
        window: &WindowSummary,
        series: &mut CandleSeries,
    ) -> TradingResult<Candle> {
        let prev = series.last().and_then(|c| c.heikin_ashi().copied());
        let ha = smooth(window, prev.as_ref());
        let candle = Candle {
            time: window.closed_at,
            open: window.open,
            high: window.high,
            low: window.low,
            close: window.close,
            derived: Derived::HeikinAshi(ha),
        };
        debug!(
            symbol = %series.symbol,
            ha_open = ha.ha_open,
            ha_close = ha.ha_close,
            color = %ha.ha_color,
            "heikin-ashi candle"
        );
        series.push(candle).copied()
    }
}

/// Fires on a change of smoothed color.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeikinAshiDetector;

impl HeikinAshiDetector {
    fn color(candle: &Candle) -> Option<HaColor> {
        candle.heikin_ashi().map(|ha| ha.ha_color)
    }

    /// Most recent tradeable candle strictly before `index`.
    fn previous_tradeable(series: &CandleSeries, index: usize) -> Option<&Candle> {
        series
            .iter()
            .take(index)
            .rev()
            .find(|c| Self::color(c).is_some_and(|color| color.is_tradeable()))
    }

    fn detect_at(&self, series: &CandleSeries, index: usize) -> Option<Side> {
        let latest = series.get(index)?;
        self.detect_pair(latest, Self::previous_tradeable(series, index))
    }
}

impl SignalDetector for HeikinAshiDetector {
    fn name(&self) -> &str {
        "heikin_ashi"
    }

    /// `previous` must be the last tradeable candle before `latest`.
    fn detect_pair(&self, latest: &Candle, previous: Option<&Candle>) -> Option<Side> {
        let color = Self::color(latest)?;
        let side = color.side()?;
        match previous.and_then(Self::color) {
            Some(prev_color) if prev_color == color => None,
            _ => Some(side),
        }
    }

    fn detect(&self, series: &CandleSeries) -> Option<Side> {
        let last = series.len().checked_sub(1)?;
        self.detect_at(series, last)
    }

    fn scan_history(&self, series: &CandleSeries) -> Option<Side> {
        (0..series.len()).rev().find_map(|i| self.detect_at(series, i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(closed_at: i64, open: f64, high: f64, low: f64, close: f64) -> WindowSummary {
        WindowSummary {
            closed_at,
            open,
            high,
            low,
            close,
        }
    }

    fn ha_candle(time: i64, ha_open: f64, ha_close: f64) -> Candle {
        Candle {
            time,
            open: ha_open,
            high: ha_open.max(ha_close),
            low: ha_open.min(ha_close),
            close: ha_close,
            derived: Derived::HeikinAshi(HeikinAshi {
                ha_open,
                ha_close,
                ha_high: ha_open.max(ha_close),
                ha_low: ha_open.min(ha_close),
                ha_color: HaColor::classify(ha_open, ha_close),
            }),
        }
    }

    fn series_of(colors: &[(f64, f64)]) -> CandleSeries {
        let mut series = CandleSeries::new("TEST");
        for (i, (o, c)) in colors.iter().enumerate() {
            series.push(ha_candle((i as i64 + 1) * 60, *o, *c)).unwrap();
        }
        series
    }

    const GREEN: (f64, f64) = (1.0, 2.0);
    const RED: (f64, f64) = (2.0, 1.0);
    const FLAT: (f64, f64) = (1.5, 1.5);

    #[test]
    fn test_first_candle_bootstrap() {
        let ha = smooth(&window(60, 10.0, 12.0, 9.0, 11.0), None);
        assert_eq!(ha.ha_open, 10.5);
        assert_eq!(ha.ha_close, 10.5);
        assert_eq!(ha.ha_color, HaColor::Indecision);
        assert_eq!(ha.ha_high, 12.0);
        assert_eq!(ha.ha_low, 9.0);
    }

    #[test]
    fn test_recursion_uses_smoothed_predecessor() {
        let first = smooth(&window(60, 10.0, 12.0, 9.0, 12.0), None);
        // ha_open = 11.0, ha_close = 10.75
        let second = smooth(&window(120, 100.0, 104.0, 99.0, 101.0), Some(&first));
        assert_eq!(second.ha_open, (11.0 + 10.75) / 2.0);
        assert_eq!(second.ha_close, 101.0);
        assert_eq!(second.ha_color, HaColor::Green);
        assert_eq!(second.ha_high, 104.0);
        assert_eq!(second.ha_low, 10.875);
    }

    #[test]
    fn test_builder_is_deterministic() {
        let windows = [
            window(60, 10.0, 11.0, 9.5, 10.8),
            window(120, 10.8, 11.5, 10.5, 11.2),
            window(180, 11.2, 11.3, 10.1, 10.2),
        ];
        let run = || {
            let mut builder = HeikinAshiBuilder::new(HeikinAshiConfig::default());
            let mut series = CandleSeries::new("TEST");
            windows
                .iter()
                .map(|w| builder.build(w, &mut series).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_builder_rejects_duplicate_window() {
        let mut builder = HeikinAshiBuilder::new(HeikinAshiConfig::default());
        let mut series = CandleSeries::new("TEST");
        builder.build(&window(60, 1.0, 2.0, 0.5, 1.5), &mut series).unwrap();
        assert!(builder.build(&window(60, 1.0, 2.0, 0.5, 1.5), &mut series).is_err());
    }

    #[test]
    fn test_color_change_signals() {
        let detector = HeikinAshiDetector;
        let colors = [GREEN, GREEN, RED, RED];
        let signals: Vec<_> = (1..=colors.len())
            .map(|n| detector.detect(&series_of(&colors[..n])))
            .collect();
        assert_eq!(signals, vec![Some(Side::Buy), None, Some(Side::Sell), None]);
    }

    #[test]
    fn test_indecision_never_signals() {
        let detector = HeikinAshiDetector;
        assert_eq!(detector.detect(&series_of(&[GREEN, FLAT])), None);
        assert_eq!(detector.detect(&series_of(&[RED, GREEN, FLAT])), None);
        // skipped, not treated as a break in the run
        assert_eq!(detector.detect(&series_of(&[GREEN, FLAT, GREEN])), None);
        assert_eq!(
            detector.detect(&series_of(&[GREEN, FLAT, RED])),
            Some(Side::Sell)
        );
    }

    #[test]
    fn test_scan_history() {
        let detector = HeikinAshiDetector;
        let series = series_of(&[RED, GREEN, GREEN, FLAT, GREEN]);
        assert_eq!(detector.scan_history(&series), Some(Side::Buy));
        assert_eq!(detector.scan_history(&series_of(&[FLAT, FLAT])), None);
    }
}
