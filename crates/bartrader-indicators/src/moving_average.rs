//! Exponential moving average.

use bartrader_core::error::IndicatorError;
use bartrader_core::traits::Indicator;

fn check_period(period: usize) -> Result<usize, IndicatorError> {
    if period == 0 {
        return Err(IndicatorError::InvalidParameter(
            "period must be greater than 0".to_string(),
        ));
    }
    Ok(period)
}

/// Exponential Moving Average (EMA).
///
/// Seeded with the SMA of the first `period` values, then smoothed with
/// `2 / (period + 1)`.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    multiplier: f64,
}

impl Ema {
    /// Create a new EMA with the specified period.
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        let period = check_period(period)?;
        let multiplier = 2.0 / (period as f64 + 1.0);
        Ok(Self { period, multiplier })
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }
}

impl Indicator for Ema {
    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        if data.len() < self.period {
            return vec![];
        }

        let mut result = Vec::with_capacity(data.len() - self.period + 1);

        let initial_sma: f64 = data[..self.period].iter().sum::<f64>() / self.period as f64;
        result.push(initial_sma);

        let mut ema = initial_sma;
        let one_minus_mult = 1.0 - self.multiplier;

        for &price in &data[self.period..] {
            ema = price * self.multiplier + ema * one_minus_mult;
            result.push(ema);
        }

        result
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "EMA"
    }
}
