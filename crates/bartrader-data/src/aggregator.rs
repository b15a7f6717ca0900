//! Per-instrument bar aggregation: window aligner plus bar cache.

use bartrader_core::error::{TradingError, TradingResult};
use bartrader_core::types::{RawBar, WindowSummary};
use tracing::{debug, info};

use crate::aligner::WindowAligner;
use crate::cache::BarCache;

/// Result of feeding one sub-bar to the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregation {
    /// The window is still open.
    Pending,
    /// A complete window closed.
    Closed(WindowSummary),
    /// The first window after a (re)start closed incomplete and was dropped.
    Discarded { bars: usize, expected: usize },
}

/// Folds sub-period bars into period windows.
///
/// Until the first boundary has been seen the aggregator is unprimed: an
/// incomplete window is dropped rather than reported. Once primed, a window
/// whose sub-bars do not reconcile with the period is fatal.
#[derive(Debug, Clone)]
pub struct BarAggregator {
    symbol: String,
    aligner: WindowAligner,
    cache: BarCache,
    last_start: Option<i64>,
    primed: bool,
}

impl BarAggregator {
    pub fn new(symbol: impl Into<String>, aligner: WindowAligner) -> Self {
        Self {
            symbol: symbol.into(),
            aligner,
            cache: BarCache::new(),
            last_start: None,
            primed: false,
        }
    }

    pub fn aligner(&self) -> &WindowAligner {
        &self.aligner
    }

    /// Number of sub-bars cached for the open window.
    pub fn pending(&self) -> usize {
        self.cache.len()
    }

    fn inconsistency(&self, detail: String) -> TradingError {
        TradingError::WindowInconsistency {
            symbol: self.symbol.clone(),
            detail,
        }
    }

    /// Feed one sub-bar, in arrival order.
    pub fn push(&mut self, bar: RawBar) -> TradingResult<Aggregation> {
        debug!(symbol = %self.symbol, start = bar.start_time, close = bar.close, "sub-bar");

        if let Some(last_start) = self.last_start {
            if bar.start_time <= last_start {
                if self.primed {
                    return Err(self.inconsistency(format!(
                        "sub-bar at {} does not follow {}",
                        bar.start_time, last_start
                    )));
                }
                info!(symbol = %self.symbol, "Restarting open window after out-of-order sub-bar");
                self.cache.clear();
            }
        }
        self.last_start = Some(bar.start_time);

        if let Some(first_start) = self.cache.first().map(|b| b.start_time) {
            if self.aligner.window_id(first_start) != self.aligner.window_id(bar.start_time) {
                if self.primed {
                    return Err(self.inconsistency(format!(
                        "window containing {} never closed ({} sub-bars cached)",
                        first_start,
                        self.cache.len()
                    )));
                }
                info!(
                    symbol = %self.symbol,
                    dropped = self.cache.len(),
                    "Dropping stale partial window"
                );
                self.cache.clear();
            }
        }

        self.cache.push(bar);

        if !self.aligner.closes_window(bar.start_time) {
            return Ok(Aggregation::Pending);
        }

        let expected = self.aligner.expected_bars();
        let sub = self.aligner.sub_period_secs();
        let count = self.cache.len();
        let span = self.cache.span_secs(sub);
        let summary = self.cache.summary(sub);
        self.cache.clear();

        if !self.primed {
            self.primed = true;
            if count != expected {
                info!(
                    symbol = %self.symbol,
                    bars = count,
                    expected,
                    "Not enough data for a candle, discarding partial window"
                );
                return Ok(Aggregation::Discarded {
                    bars: count,
                    expected,
                });
            }
        } else if count != expected {
            return Err(self.inconsistency(format!(
                "{count} sub-bars spanning {span}s at window close, expected {expected}"
            )));
        }

        match summary {
            Some(summary) => Ok(Aggregation::Closed(summary)),
            None => Err(self.inconsistency("window closed with an empty cache".to_string())),
        }
    }
}
