//! Batch technical indicators for the indicator-crossover strategy.
//!
//! - Exponential moving average
//! - Linear regression line (value of the least-squares fit at the newest point)
//!
//! Every indicator implements [`Indicator`]; use
//! [`Indicator::calculate_aligned`] to line results up with the input series.

pub mod moving_average;
pub mod regression;

pub use bartrader_core::traits::Indicator;
pub use moving_average::Ema;
pub use regression::LinearRegression;
