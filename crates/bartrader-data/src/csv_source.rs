//! CSV bar loader.

use bartrader_core::error::DataError;
use bartrader_core::types::RawBar;
use chrono::{NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CSV record format.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(alias = "Date", alias = "date", alias = "timestamp", alias = "Timestamp", alias = "time")]
    date: String,
    #[serde(alias = "Open", alias = "open")]
    open: f64,
    #[serde(alias = "High", alias = "high")]
    high: f64,
    #[serde(alias = "Low", alias = "low")]
    low: f64,
    #[serde(alias = "Close", alias = "close")]
    close: f64,
}

/// Reads bars from a CSV file with a header row.
///
/// The time column marks the start of each bar; prices are taken as-is.
#[derive(Debug, Clone)]
pub struct CsvBarSource {
    path: PathBuf,
}

impl CsvBarSource {
    /// Create a new CSV source.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DataError::NoDataAvailable(path.display().to_string()));
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Load every bar, sorted by start time.
    pub fn load_all(&self) -> Result<Vec<RawBar>, DataError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|e| DataError::ParseError(e.to_string()))?;

        let mut bars = Vec::new();

        for result in reader.deserialize() {
            let record: CsvRecord = result.map_err(|e| DataError::ParseError(e.to_string()))?;
            let start_time = parse_timestamp(&record.date)?;
            let bar = RawBar::new(start_time, record.open, record.high, record.low, record.close);
            if !bar.is_well_formed() {
                return Err(DataError::ParseError(format!(
                    "malformed bar at {}",
                    record.date
                )));
            }
            bars.push(bar);
        }

        bars.sort_by_key(|b| b.start_time);

        Ok(bars)
    }
}

/// Parse a timestamp into Unix seconds (UTC).
pub(crate) fn parse_timestamp(date_str: &str) -> Result<i64, DataError> {
    let datetime_formats = ["%Y-%m-%d %H:%M:%S", "%Y%m%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
    for format in datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(date_str, format) {
            return Ok(dt.and_utc().timestamp());
        }
    }

    let date_formats = ["%Y-%m-%d", "%Y%m%d", "%Y/%m/%d"];
    for format in date_formats {
        if let Ok(d) = NaiveDate::parse_from_str(date_str, format) {
            if let Some(dt) = d.and_hms_opt(0, 0, 0) {
                return Ok(dt.and_utc().timestamp());
            }
        }
    }

    // Unix timestamp; assume milliseconds if > 10 digits
    if let Ok(ts) = date_str.parse::<i64>() {
        return Ok(if ts > 10_000_000_000 { ts / 1000 } else { ts });
    }

    Err(DataError::ParseError(format!(
        "Could not parse date: {}",
        date_str
    )))
}
