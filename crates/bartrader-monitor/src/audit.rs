//! Append-only CSV audit trail of candles and orders.
//!
//! Rows are written for people and offline analysis only. Nothing in the
//! engine reads them back; positions always come from the broker.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bartrader_core::error::TradingResult;
use bartrader_core::traits::EventSink;
use bartrader_core::types::{CandleClosed, Derived, OrderPlaced};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::error;

#[derive(Debug, Serialize)]
struct CandleRow<'a> {
    time: String,
    symbol: &'a str,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    ha_open: Option<f64>,
    ha_high: Option<f64>,
    ha_low: Option<f64>,
    ha_close: Option<f64>,
    color: Option<String>,
    ema: Option<f64>,
    lrc: Option<f64>,
    historical: bool,
}

impl<'a> CandleRow<'a> {
    fn from_event(event: &'a CandleClosed) -> Self {
        let c = &event.candle;
        let mut row = Self {
            time: format_time(c.time),
            symbol: &event.symbol,
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
            ha_open: None,
            ha_high: None,
            ha_low: None,
            ha_close: None,
            color: None,
            ema: None,
            lrc: None,
            historical: event.historical,
        };
        match &c.derived {
            Derived::HeikinAshi(ha) => {
                row.ha_open = Some(ha.ha_open);
                row.ha_high = Some(ha.ha_high);
                row.ha_low = Some(ha.ha_low);
                row.ha_close = Some(ha.ha_close);
                row.color = Some(ha.ha_color.to_string());
            }
            Derived::Indicators(values) => {
                row.ema = values.average;
                row.lrc = values.trend;
            }
        }
        row
    }
}

#[derive(Debug, Serialize)]
struct OrderRow<'a> {
    time: DateTime<Utc>,
    candle_time: String,
    order_id: u64,
    symbol: &'a str,
    side: String,
    order_type: String,
    size: Decimal,
    price: Option<Decimal>,
}

fn format_time(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| secs.to_string())
}

/// Writes `<dir>/<strategy>_candles.csv` and `<dir>/<strategy>_orders.csv`.
pub struct CsvAuditLog {
    candles_path: PathBuf,
    orders_path: PathBuf,
    candles: Mutex<csv::Writer<File>>,
    orders: Mutex<csv::Writer<File>>,
}

fn open_append(path: &Path) -> TradingResult<csv::Writer<File>> {
    let existing = fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false);
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(csv::WriterBuilder::new()
        .has_headers(!existing)
        .from_writer(file))
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CsvAuditLog {
    /// Open (or create) both files, appending to any existing rows.
    pub fn create(dir: impl AsRef<Path>, strategy: &str) -> TradingResult<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let candles_path = dir.join(format!("{strategy}_candles.csv"));
        let orders_path = dir.join(format!("{strategy}_orders.csv"));
        Ok(Self {
            candles: Mutex::new(open_append(&candles_path)?),
            orders: Mutex::new(open_append(&orders_path)?),
            candles_path,
            orders_path,
        })
    }

    pub fn candles_path(&self) -> &Path {
        &self.candles_path
    }

    pub fn orders_path(&self) -> &Path {
        &self.orders_path
    }
}

impl EventSink for CsvAuditLog {
    fn candle_closed(&self, event: &CandleClosed) {
        let mut writer = lock(&self.candles);
        let result = writer
            .serialize(CandleRow::from_event(event))
            .and_then(|_| writer.flush().map_err(csv::Error::from));
        if let Err(e) = result {
            error!(path = %self.candles_path.display(), error = %e, "Failed to write candle row");
        }
    }

    fn order_placed(&self, event: &OrderPlaced) {
        let row = OrderRow {
            time: event.timestamp,
            candle_time: format_time(event.candle_time),
            order_id: event.order_id,
            symbol: &event.symbol,
            side: event.side.to_string(),
            order_type: event.kind.to_string(),
            size: event.quantity,
            price: event.price,
        };
        let mut writer = lock(&self.orders);
        let result = writer
            .serialize(row)
            .and_then(|_| writer.flush().map_err(csv::Error::from));
        if let Err(e) = result {
            error!(path = %self.orders_path.display(), error = %e, "Failed to write order row");
        }
    }
}
