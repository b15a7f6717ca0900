//! Bar aggregation and bar loading.
//!
//! - [`WindowAligner`] decides when a sub-bar closes a wall-clock window
//! - [`BarCache`] holds the sub-bars of the open window
//! - [`BarAggregator`] combines both into a per-instrument window stream
//! - [`CsvBarSource`] loads raw or historical bars from CSV

mod aggregator;
mod aligner;
mod cache;
mod csv_source;

pub use aggregator::{Aggregation, BarAggregator};
pub use aligner::WindowAligner;
pub use cache::BarCache;
pub use csv_source::CsvBarSource;

use bartrader_core::error::DataError;
use bartrader_core::types::RawBar;
use std::path::Path;

/// Load bars from a CSV file.
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<RawBar>, DataError> {
    CsvBarSource::new(path)?.load_all()
}
