//! Raw feed bars and closed-window summaries.

use serde::{Deserialize, Serialize};

use super::Period;

/// Short sub-period bar as delivered by the feed.
/// Uses f64 for fast aggregation and indicator calculations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    /// Unix timestamp in seconds marking the *start* of the sub-period
    pub start_time: i64,
    /// Opening price
    pub open: f64,
    /// Highest price
    pub high: f64,
    /// Lowest price
    pub low: f64,
    /// Closing price
    pub close: f64,
}

impl RawBar {
    /// Create a new bar.
    pub fn new(start_time: i64, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            start_time,
            open,
            high,
            low,
            close,
        }
    }

    /// Check the bar is internally consistent (finite prices, low <= open/close <= high).
    pub fn is_well_formed(&self) -> bool {
        let prices = [self.open, self.high, self.low, self.close];
        prices.iter().all(|p| p.is_finite())
            && self.low <= self.high
            && (self.low..=self.high).contains(&self.open)
            && (self.low..=self.high).contains(&self.close)
    }
}

/// OHLC of one closed aggregation window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowSummary {
    /// Unix timestamp in seconds at which the window closed
    pub closed_at: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl WindowSummary {
    /// Fold a non-empty, time-ordered run of sub-bars into one summary.
    ///
    /// Returns `None` for an empty slice.
    pub fn fold(bars: &[RawBar], sub_period_secs: u64) -> Option<Self> {
        let first = bars.first()?;
        let last = bars.last()?;

        let high = bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let low = bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);

        Some(Self {
            closed_at: last.start_time + sub_period_secs as i64,
            open: first.open,
            high,
            low,
            close: last.close,
        })
    }

    /// Treat a pre-aggregated historical bar starting at `bar.start_time` as a closed window.
    pub fn from_period_bar(bar: &RawBar, period: Period) -> Self {
        Self {
            closed_at: bar.start_time + period.as_secs() as i64,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
        }
    }
}
