//! Configuration management.

mod settings;

pub use settings::{
    AppConfig, AppSettings, EngineConfig, InstrumentConfig, LoggingConfig, SessionConfig,
};

use config::{Config, ConfigError, Environment, File};
use std::path::Path;
use thiserror::Error;

/// Configuration could not be loaded or does not make sense.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Load configuration from file and environment, then validate it.
///
/// Environment variables prefixed `BARTRADER__` override file values, with
/// `__` separating nested keys (`BARTRADER__ENGINE__QUOTE_WAIT_MS=500`).
pub fn load_config(path: &Path) -> Result<AppConfig, SettingsError> {
    let config = Config::builder()
        .add_source(File::from(path).required(true))
        .add_source(
            Environment::with_prefix("BARTRADER")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let config: AppConfig = config.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bartrader_core::types::{OrderKind, QuotePreference};
    use bartrader_engine::TimeSource;
    use bartrader_strategies::StrategyKind;
    use rust_decimal_macros::dec;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    const TWO_INSTRUMENTS: &str = r#"
[engine]
first_order_id = 1000
clock = "candle"

[[instruments]]
symbol = "SPY"
strategy = "heikin_ashi"
bar_period = "5m"
order_size = 100
order_kind = "limit"
quote = "mid"
backfill = true

[[instruments]]
symbol = "QQQ"
strategy = "ema_lrc"
order_size = 50
ema_periods = 5
lrc_periods = 10
"#;

    #[test]
    fn test_load_instruments_with_defaults() {
        let file = write_config(TWO_INSTRUMENTS);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.instruments.len(), 2);
        let spy = &config.instruments[0];
        assert_eq!(spy.strategy, StrategyKind::HeikinAshi);
        assert_eq!(spy.bar_period.as_secs(), 300);
        assert_eq!(spy.order_size, dec!(100));
        assert_eq!(spy.order_kind, OrderKind::Limit);
        assert_eq!(spy.quote, QuotePreference::Mid);
        assert!(spy.align_on_start);
        assert!(spy.backfill);

        let qqq = &config.instruments[1];
        assert_eq!(qqq.bar_period.as_secs(), 60);
        assert_eq!(qqq.sub_period_secs, 5);
        assert_eq!(qqq.order_kind, OrderKind::Market);
        assert_eq!(qqq.quote, QuotePreference::Last);
        assert_eq!(qqq.ema_periods, 5);

        assert_eq!(config.engine.first_order_id, 1000);
        assert_eq!(config.engine.clock, TimeSource::Candle);
        assert_eq!(config.session.open, "09:30");
    }

    #[test]
    fn test_worker_settings() {
        let file = write_config(TWO_INSTRUMENTS);
        let config = load_config(file.path()).unwrap();
        let workers = config.worker_settings().unwrap();

        assert_eq!(workers.len(), 2);
        assert_eq!(workers[1].symbol, "QQQ");
        assert_eq!(workers[1].strategy_params["lrc_periods"], 10);
        assert_eq!(workers[0].strategy_params["backfill"], true);
        assert_eq!(workers[1].strategy_params["backfill"], false);
        assert_eq!(workers[0].quote_wait.as_millis(), 2000);
        assert_eq!(workers[0].clock, TimeSource::Candle);
    }

    #[test]
    fn test_rejects_duplicate_symbols() {
        let file = write_config(
            r#"
[[instruments]]
symbol = "SPY"
strategy = "heikin_ashi"
order_size = 100

[[instruments]]
symbol = "SPY"
strategy = "ema_lrc"
order_size = 100
"#,
        );
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("duplicate instrument SPY"));
    }

    #[test]
    fn test_rejects_bad_instruments() {
        let cases = [
            (r#"bar_period = "7m""#, "does not divide a day"),
            (r#"bar_period = "62s""#, "not a multiple"),
            ("order_size = 0", "order_size must be positive"),
            ("lrc_periods = 1", "lrc_periods"),
        ];
        for (line, expected) in cases {
            let body = format!(
                "[[instruments]]\nsymbol = \"SPY\"\nstrategy = \"ema_lrc\"\n{}\n{line}\n",
                if line.starts_with("order_size") { "" } else { "order_size = 100" }
            );
            let file = write_config(&body);
            let err = load_config(file.path()).unwrap_err();
            assert!(
                err.to_string().contains(expected),
                "{line}: unexpected error {err}"
            );
        }
    }

    #[test]
    fn test_rejects_empty_and_bad_session() {
        let file = write_config("[app]\nname = \"x\"\nenvironment = \"test\"\n");
        assert!(matches!(
            load_config(file.path()),
            Err(SettingsError::Invalid(_))
        ));

        let file = write_config(
            r#"
[session]
open = "16:00"
close = "09:30"

[[instruments]]
symbol = "SPY"
strategy = "heikin_ashi"
order_size = 100
"#,
        );
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("session"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/bartrader.toml")).unwrap_err();
        assert!(matches!(err, SettingsError::Load(_)));
    }
}
