//! EMA / linear-regression crossover strategy.
//!
//! Candles carry the EMA of closes (`average`) and the linear regression
//! line of closes (`trend`), each with its previous-bar value. A Buy fires
//! when the trend line crosses above the average, a Sell when it crosses
//! below.

use bartrader_core::error::{TradingError, TradingResult};
use bartrader_core::traits::{CandleBuilder, Indicator, SignalDetector};
use bartrader_core::types::{Candle, CandleSeries, IndicatorValues, Side, WindowSummary};
use bartrader_indicators::{Ema, LinearRegression};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Configuration for the EMA/LRC crossover strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmaLrcConfig {
    /// EMA lookback
    pub ema_periods: usize,
    /// Linear regression lookback
    pub lrc_periods: usize,
}

impl Default for EmaLrcConfig {
    fn default() -> Self {
        Self {
            ema_periods: 9,
            lrc_periods: 14,
        }
    }
}

impl EmaLrcConfig {
    pub fn validate(&self) -> TradingResult<()> {
        if self.ema_periods == 0 {
            return Err(TradingError::Config("ema_periods must be greater than 0".into()));
        }
        if self.lrc_periods < 2 {
            return Err(TradingError::Config("lrc_periods must be at least 2".into()));
        }
        Ok(())
    }

    /// Candles needed before both indicators are defined.
    pub fn lookback(&self) -> usize {
        self.ema_periods.max(self.lrc_periods)
    }
}

/// Candle builder that layers EMA and regression values onto plain OHLC candles.
///
/// Before the backfill completes the series grows unbounded and indicators
/// are not computed per candle. Afterwards the series is held at
/// `lookback + 1` candles and every append triggers a full recompute.
#[derive(Debug, Clone)]
pub struct EmaLrcBuilder {
    ema: Ema,
    lrc: LinearRegression,
    lookback: usize,
    live: bool,
}

impl EmaLrcBuilder {
    pub fn new(config: &EmaLrcConfig) -> TradingResult<Self> {
        config.validate()?;
        Ok(Self {
            ema: Ema::new(config.ema_periods)?,
            lrc: LinearRegression::new(config.lrc_periods)?,
            lookback: config.lookback(),
            live: false,
        })
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    /// Indicator values for every candle of `closes`, oldest first.
    pub fn compute(&self, closes: &[f64]) -> Vec<IndicatorValues> {
        let average = self.ema.calculate_aligned(closes);
        let trend = self.lrc.calculate_aligned(closes);

        (0..closes.len())
            .map(|i| IndicatorValues {
                average: average[i],
                average_prev: i.checked_sub(1).and_then(|p| average[p]),
                trend: trend[i],
                trend_prev: i.checked_sub(1).and_then(|p| trend[p]),
            })
            .collect()
    }

    fn recompute(&self, series: &mut CandleSeries) {
        let values = self.compute(&series.closes());
        series.apply_indicators(&values);
    }
}

impl CandleBuilder for EmaLrcBuilder {
    fn name(&self) -> &str {
        "ema_lrc"
    }

    fn requires_backfill(&self) -> bool {
        true
    }

    fn warmup_period(&self) -> usize {
        self.lookback
    }

    fn retention(&self) -> usize {
        self.lookback + 1
    }

    fn build(
        &mut self,
        window: &WindowSummary,
        series: &mut CandleSeries,
    ) -> TradingResult<Candle> {
        let placeholder = Candle::with_placeholders(window);
        series.push(placeholder)?;

        if self.live {
            let retained = self.retention();
            if series.len() > retained {
                series.trim_to(retained)?;
            }
            self.recompute(series);
        }

        let candle = series
            .last()
            .copied()
            .ok_or(TradingError::InsufficientHistory {
                required: 1,
                available: 0,
            })?;
        if let Some(values) = candle.indicators() {
            debug!(
                symbol = %series.symbol,
                ema = ?values.average,
                lrc = ?values.trend,
                "indicator candle"
            );
        }
        Ok(candle)
    }

    fn refresh(&mut self, series: &mut CandleSeries) -> TradingResult<()> {
        self.recompute(series);
        Ok(())
    }

    fn finish_backfill(&mut self, series: &mut CandleSeries) -> TradingResult<()> {
        let removed = series.trim_to(self.lookback)?;
        self.recompute(series);
        self.live = true;
        info!(
            symbol = %series.symbol,
            retained = series.len(),
            removed,
            "Historical data collected"
        );
        Ok(())
    }
}

/// Fires on a crossover of the trend line through the average.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossoverDetector;

impl SignalDetector for CrossoverDetector {
    fn name(&self) -> &str {
        "ema_lrc"
    }

    fn detect_pair(&self, latest: &Candle, _previous: Option<&Candle>) -> Option<Side> {
        let (average, average_prev, trend, trend_prev) = latest.indicators()?.defined()?;
        if trend > average && !(trend_prev > average_prev) {
            Some(Side::Buy)
        } else if trend < average && !(trend_prev < average_prev) {
            Some(Side::Sell)
        } else {
            None
        }
    }
}
