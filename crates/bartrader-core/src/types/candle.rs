//! Built candles and their strategy-specific derived values.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Side, WindowSummary};

/// Heikin-Ashi candle color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HaColor {
    Green,
    Red,
    /// `ha_open == ha_close`; never signal-bearing.
    Indecision,
}

impl HaColor {
    /// Classify a smoothed open/close pair.
    pub fn classify(ha_open: f64, ha_close: f64) -> Self {
        if ha_close > ha_open {
            HaColor::Green
        } else if ha_close < ha_open {
            HaColor::Red
        } else {
            HaColor::Indecision
        }
    }

    /// Trade direction implied by the color.
    pub fn side(&self) -> Option<Side> {
        match self {
            HaColor::Green => Some(Side::Buy),
            HaColor::Red => Some(Side::Sell),
            HaColor::Indecision => None,
        }
    }

    pub fn is_tradeable(&self) -> bool {
        !matches!(self, HaColor::Indecision)
    }
}

impl fmt::Display for HaColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HaColor::Green => write!(f, "Green"),
            HaColor::Red => write!(f, "Red"),
            HaColor::Indecision => write!(f, ""),
        }
    }
}

/// Smoothed Heikin-Ashi values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeikinAshi {
    pub ha_open: f64,
    pub ha_close: f64,
    pub ha_high: f64,
    pub ha_low: f64,
    pub ha_color: HaColor,
}

/// Moving-average and regression-line values with their previous-bar values.
///
/// `None` means the indicator is not yet defined for this candle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IndicatorValues {
    pub average: Option<f64>,
    pub average_prev: Option<f64>,
    pub trend: Option<f64>,
    pub trend_prev: Option<f64>,
}

impl IndicatorValues {
    /// All four values, if every one is defined.
    pub fn defined(&self) -> Option<(f64, f64, f64, f64)> {
        Some((
            self.average?,
            self.average_prev?,
            self.trend?,
            self.trend_prev?,
        ))
    }
}

/// Variant-specific derived fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Derived {
    HeikinAshi(HeikinAshi),
    Indicators(IndicatorValues),
}

/// One closed aggregation window, plus its derived transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Unix timestamp in seconds of the window close
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub derived: Derived,
}

impl Candle {
    /// Plain OHLC candle with undefined indicator placeholders.
    pub fn with_placeholders(window: &WindowSummary) -> Self {
        Self {
            time: window.closed_at,
            open: window.open,
            high: window.high,
            low: window.low,
            close: window.close,
            derived: Derived::Indicators(IndicatorValues::default()),
        }
    }

    pub fn heikin_ashi(&self) -> Option<&HeikinAshi> {
        match &self.derived {
            Derived::HeikinAshi(ha) => Some(ha),
            Derived::Indicators(_) => None,
        }
    }

    pub fn indicators(&self) -> Option<&IndicatorValues> {
        match &self.derived {
            Derived::Indicators(values) => Some(values),
            Derived::HeikinAshi(_) => None,
        }
    }
}
