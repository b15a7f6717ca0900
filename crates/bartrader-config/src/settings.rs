//! Configuration structures.

use std::collections::HashSet;
use std::time::Duration;

use bartrader_core::types::{OrderKind, Period, QuotePreference};
use bartrader_engine::{TimeSource, WorkerSettings};
use bartrader_execution::RegularHours;
use bartrader_strategies::{StrategyKind, StrategyRegistry};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::SettingsError;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub instruments: Vec<InstrumentConfig>,
}

/// General app settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "bartrader".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
    pub file: Option<String>,
    /// Directory for the candle / order CSV audit trail
    pub audit_dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: None,
            audit_dir: None,
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

/// Regular trading hours, in the exchange's local time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// `HH:MM`
    pub open: String,
    /// `HH:MM`
    pub close: String,
    pub utc_offset_minutes: i32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            open: "09:30".to_string(),
            close: "16:00".to_string(),
            utc_offset_minutes: -300,
        }
    }
}

impl SessionConfig {
    pub fn regular_hours(&self) -> Result<RegularHours, SettingsError> {
        RegularHours::parse(&self.open, &self.close, self.utc_offset_minutes)
            .map_err(|e| SettingsError::Invalid(format!("session: {e}")))
    }
}

/// Process-wide engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub first_order_id: u64,
    /// Size of the client-session id pool
    pub max_sessions: u32,
    /// Bounded wait for a limit price, in milliseconds
    pub quote_wait_ms: u64,
    pub clock: TimeSource,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            first_order_id: 1,
            max_sessions: 32,
            quote_wait_ms: 2000,
            clock: TimeSource::Wall,
        }
    }
}

fn default_bar_period() -> Period {
    Period::from_secs(60)
}

fn default_sub_period() -> u64 {
    5
}

fn default_ema() -> usize {
    9
}

fn default_lrc() -> usize {
    14
}

fn default_history_limit() -> usize {
    1000
}

fn default_true() -> bool {
    true
}

/// One traded instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentConfig {
    pub symbol: String,
    pub strategy: StrategyKind,
    /// Aggregation period with unit suffix, e.g. `"1m"`
    #[serde(default = "default_bar_period")]
    pub bar_period: Period,
    /// Feed sub-bar length in seconds
    #[serde(default = "default_sub_period")]
    pub sub_period_secs: u64,
    /// Base order size
    pub order_size: Decimal,
    #[serde(default)]
    pub order_kind: OrderKind,
    #[serde(default)]
    pub quote: QuotePreference,
    #[serde(default = "default_ema")]
    pub ema_periods: usize,
    #[serde(default = "default_lrc")]
    pub lrc_periods: usize,
    #[serde(default = "default_true")]
    pub align_on_start: bool,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Backfill history before trading (Heikin-Ashi only; EMA/LRC always does)
    #[serde(default)]
    pub backfill: bool,
}

impl InstrumentConfig {
    /// Parameters for the strategy registry; each strategy reads its own keys.
    pub fn strategy_params(&self) -> serde_json::Value {
        serde_json::json!({
            "ema_periods": self.ema_periods,
            "lrc_periods": self.lrc_periods,
            "history_limit": self.history_limit,
            "backfill": self.backfill,
        })
    }

    fn validate(&self) -> Result<(), SettingsError> {
        let invalid = |msg: String| SettingsError::Invalid(format!("{}: {msg}", self.symbol));

        if self.symbol.trim().is_empty() {
            return Err(SettingsError::Invalid("instrument symbol is empty".into()));
        }
        if self.order_size <= Decimal::ZERO {
            return Err(invalid(format!("order_size must be positive, got {}", self.order_size)));
        }
        if self.bar_period.sub_bars(self.sub_period_secs).is_none() {
            return Err(invalid(format!(
                "bar_period {} is not a multiple of the {}s sub-period",
                self.bar_period, self.sub_period_secs
            )));
        }
        if !self.bar_period.divides_day() {
            return Err(invalid(format!(
                "bar_period {} does not divide a day evenly",
                self.bar_period
            )));
        }
        StrategyRegistry::new()
            .create(self.strategy, self.strategy_params())
            .map_err(|e| invalid(e.to_string()))?;
        Ok(())
    }
}

impl AppConfig {
    /// Reject configurations no worker could run with.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.instruments.is_empty() {
            return Err(SettingsError::Invalid("no instruments configured".into()));
        }

        let mut seen = HashSet::new();
        for instrument in &self.instruments {
            if !seen.insert(instrument.symbol.as_str()) {
                return Err(SettingsError::Invalid(format!(
                    "duplicate instrument {}",
                    instrument.symbol
                )));
            }
            instrument.validate()?;
        }

        if (self.engine.max_sessions as usize) < self.instruments.len() {
            return Err(SettingsError::Invalid(format!(
                "max_sessions {} is smaller than the {} configured instruments",
                self.engine.max_sessions,
                self.instruments.len()
            )));
        }
        self.session.regular_hours()?;
        Ok(())
    }

    /// Worker settings for every instrument, in configuration order.
    pub fn worker_settings(&self) -> Result<Vec<WorkerSettings>, SettingsError> {
        let session = self.session.regular_hours()?;
        Ok(self
            .instruments
            .iter()
            .map(|i| WorkerSettings {
                symbol: i.symbol.clone(),
                strategy: i.strategy,
                strategy_params: i.strategy_params(),
                period: i.bar_period,
                sub_period_secs: i.sub_period_secs,
                order_size: i.order_size,
                order_kind: i.order_kind,
                quote: i.quote,
                align_on_start: i.align_on_start,
                session: session.clone(),
                quote_wait: Duration::from_millis(self.engine.quote_wait_ms),
                clock: self.engine.clock,
            })
            .collect())
    }
}
