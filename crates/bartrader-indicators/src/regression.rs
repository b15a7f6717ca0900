//! Linear regression indicators.

use bartrader_core::error::IndicatorError;
use bartrader_core::traits::Indicator;

/// Linear regression line value.
///
/// Fits a least-squares line over the last N values and reports the line's
/// value at the newest point of the window.
#[derive(Debug, Clone)]
pub struct LinearRegression {
    period: usize,
    sum_x: f64,
    divisor: f64,
}

impl LinearRegression {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        if period < 2 {
            return Err(IndicatorError::InvalidParameter(
                "linear regression needs a period of at least 2".to_string(),
            ));
        }
        let n = period as f64;
        // x = 0..n-1
        let sum_x = n * (n - 1.0) / 2.0;
        let sum_x2 = (n - 1.0) * n * (2.0 * n - 1.0) / 6.0;
        let divisor = n * sum_x2 - sum_x * sum_x;
        Ok(Self {
            period,
            sum_x,
            divisor,
        })
    }

    /// Slope and intercept of the fitted line over one window.
    fn fit(&self, window: &[f64]) -> (f64, f64) {
        let n = self.period as f64;
        let (sum_y, sum_xy) = window
            .iter()
            .enumerate()
            .fold((0.0, 0.0), |(sy, sxy), (i, &y)| (sy + y, sxy + i as f64 * y));
        let slope = (n * sum_xy - self.sum_x * sum_y) / self.divisor;
        let intercept = (sum_y - slope * self.sum_x) / n;
        (slope, intercept)
    }
}

impl Indicator for LinearRegression {
    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        if data.len() < self.period {
            return vec![];
        }
        let last_x = (self.period - 1) as f64;
        data.windows(self.period)
            .map(|w| {
                let (slope, intercept) = self.fit(w);
                intercept + slope * last_x
            })
            .collect()
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "LINEARREG"
    }
}
