//! Error types for the trading core.
//!
//! The taxonomy separates conditions that halt a single instrument worker
//! from conditions that only defer, cap or drop an action.

use rust_decimal::Decimal;
use thiserror::Error;

/// Top-level trading error.
#[derive(Error, Debug)]
pub enum TradingError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Cached sub-bars do not reconcile with the aggregation period.
    #[error("Window inconsistency for {symbol}: {detail}")]
    WindowInconsistency { symbol: String, detail: String },

    /// Retained series is shorter than the lookback the detector needs.
    #[error("Insufficient history: need {required} candles, have {available}")]
    InsufficientHistory { required: usize, available: usize },

    /// Reported net position is outside the set of values the sizing policy can produce.
    #[error("Unexpected position for {symbol}: {position} (expected one of {expected:?})")]
    UnexpectedPosition {
        symbol: String,
        position: Decimal,
        expected: Vec<Decimal>,
    },

    #[error("Quote feed not ready: {0}")]
    FeedNotReady(String),

    #[error("Candle at {time} is not after the last candle at {last}")]
    OutOfOrderCandle { time: i64, last: i64 },

    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Indicator error: {0}")]
    Indicator(#[from] IndicatorError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TradingError {
    /// Whether the error must halt the instrument worker that raised it.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TradingError::WindowInconsistency { .. }
                | TradingError::InsufficientHistory { .. }
                | TradingError::UnexpectedPosition { .. }
                | TradingError::Config(_)
        )
    }
}

/// Errors reported by the broker-side ports.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BrokerError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Order rejected: {0}")]
    OrderRejected(String),

    #[error("Order not found: {0}")]
    OrderNotFound(u64),

    #[error("Subscription error: {0}")]
    Subscription(String),
}

/// Data loading errors.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("No data available: {0}")]
    NoDataAvailable(String),

    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Indicator calculation errors.
#[derive(Error, Debug)]
pub enum IndicatorError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type alias for trading operations.
pub type TradingResult<T> = Result<T, TradingError>;
