//! Ordered, append-only candle history per instrument.

use std::collections::VecDeque;

use super::{Candle, Derived, IndicatorValues};
use crate::error::{TradingError, TradingResult};

/// Time-series container for candles, optimized for sequential access.
#[derive(Debug, Clone)]
pub struct CandleSeries {
    /// Symbol identifier
    pub symbol: String,
    /// Candles stored in a deque for efficient push/pop
    candles: VecDeque<Candle>,
    /// Maximum retained length (0 = unlimited)
    capacity: usize,
}

impl CandleSeries {
    /// Create a new empty, unbounded series.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            candles: VecDeque::new(),
            capacity: 0,
        }
    }

    /// Create a series that drops its oldest candle once `capacity` is reached.
    pub fn with_capacity(symbol: impl Into<String>, capacity: usize) -> Self {
        Self {
            symbol: symbol.into(),
            candles: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Change the retention cap. Existing candles are not trimmed here.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a candle, rejecting duplicate or out-of-order timestamps.
    pub fn push(&mut self, candle: Candle) -> TradingResult<&Candle> {
        if let Some(last) = self.candles.back() {
            if candle.time <= last.time {
                return Err(TradingError::OutOfOrderCandle {
                    time: candle.time,
                    last: last.time,
                });
            }
        }
        if self.capacity > 0 && self.candles.len() >= self.capacity {
            self.candles.pop_front();
        }
        self.candles.push_back(candle);
        Ok(&self.candles[self.candles.len() - 1])
    }

    /// Drop the oldest candles so exactly `len` remain.
    ///
    /// Returns the number of candles removed. Fails without modifying the
    /// series if fewer than `len` candles are available.
    pub fn trim_to(&mut self, len: usize) -> TradingResult<usize> {
        let available = self.candles.len();
        if available < len {
            return Err(TradingError::InsufficientHistory {
                required: len,
                available,
            });
        }
        let excess = available - len;
        self.candles.drain(..excess);
        Ok(excess)
    }

    /// Replace the indicator values of every candle, oldest first.
    ///
    /// Used only by full-series recomputes; `values` must match the series length.
    pub fn apply_indicators(&mut self, values: &[IndicatorValues]) {
        debug_assert_eq!(values.len(), self.candles.len());
        for (candle, v) in self.candles.iter_mut().zip(values) {
            candle.derived = Derived::Indicators(*v);
        }
    }

    /// Get the number of candles.
    #[inline]
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    /// Check if the series is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Get the last candle.
    pub fn last(&self) -> Option<&Candle> {
        self.candles.back()
    }

    /// Get a candle by index (0 = oldest).
    pub fn get(&self, index: usize) -> Option<&Candle> {
        self.candles.get(index)
    }

    /// Extract close prices as a vector.
    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    /// Clear all candles.
    pub fn clear(&mut self) {
        self.candles.clear();
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Candle> + ExactSizeIterator {
        self.candles.iter()
    }
}
