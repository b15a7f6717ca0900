//! Latest quote state fanned in from the quote feed.

use serde::{Deserialize, Serialize};

/// Best bid / best ask / last trade, each unknown until first reported.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub last: Option<f64>,
}

impl QuoteSnapshot {
    pub fn new(bid: f64, ask: f64, last: f64) -> Self {
        Self {
            bid: Some(bid),
            ask: Some(ask),
            last: Some(last),
        }
    }

    /// Get the mid price, if both sides are known.
    pub fn mid(&self) -> Option<f64> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => Some((bid + ask) / 2.0),
            _ => None,
        }
    }

    /// Get the spread, if both sides are known.
    pub fn spread(&self) -> Option<f64> {
        Some(self.ask? - self.bid?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_calculations() {
        let quote = QuoteSnapshot::new(149.95, 150.05, 150.0);
        assert!((quote.mid().unwrap() - 150.0).abs() < 0.001);
        assert!((quote.spread().unwrap() - 0.10).abs() < 0.001);
    }

    #[test]
    fn test_partial_quote() {
        let quote = QuoteSnapshot {
            bid: Some(10.0),
            ask: None,
            last: Some(10.1),
        };
        assert!(quote.mid().is_none());
        assert_eq!(quote.last, Some(10.1));
    }
}
