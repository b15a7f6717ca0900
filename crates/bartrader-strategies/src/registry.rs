//! Strategy registry: selects a candle-builder / signal-detector pair by name.

use crate::{
    CrossoverDetector, EmaLrcBuilder, EmaLrcConfig, HeikinAshiBuilder, HeikinAshiConfig,
    HeikinAshiDetector,
};
use bartrader_core::error::{TradingError, TradingResult};
use bartrader_core::traits::{CandleBuilder, SignalDetector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Built-in strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    HeikinAshi,
    EmaLrc,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 2] = [StrategyKind::HeikinAshi, StrategyKind::EmaLrc];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::HeikinAshi => "heikin_ashi",
            StrategyKind::EmaLrc => "ema_lrc",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = TradingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "heikin_ashi" | "hacandles" => Ok(StrategyKind::HeikinAshi),
            "ema_lrc" | "emalrccrossover" => Ok(StrategyKind::EmaLrc),
            other => Err(TradingError::Config(format!("Unknown strategy: {other}"))),
        }
    }
}

/// Builder and detector for one instrument worker.
pub struct StrategyPair {
    pub builder: Box<dyn CandleBuilder>,
    pub detector: Arc<dyn SignalDetector>,
}

impl fmt::Debug for StrategyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyPair")
            .field("builder", &self.builder.name())
            .field("detector", &self.detector.name())
            .finish()
    }
}

/// Information about a registered strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyInfo {
    pub kind: StrategyKind,
    /// Display name
    pub name: String,
    pub description: String,
    /// Whether a historical backfill is requested before trading
    pub requires_backfill: bool,
    /// Default configuration as JSON
    pub default_config: serde_json::Value,
}

/// Registry for available trading strategies.
pub struct StrategyRegistry {
    strategies: BTreeMap<StrategyKind, StrategyInfo>,
}

impl StrategyRegistry {
    /// Create a new strategy registry with all built-in strategies.
    pub fn new() -> Self {
        let mut strategies = BTreeMap::new();

        strategies.insert(
            StrategyKind::HeikinAshi,
            StrategyInfo {
                kind: StrategyKind::HeikinAshi,
                name: "Heikin-Ashi Candles".to_string(),
                description: "Trades changes of the smoothed Heikin-Ashi candle color".to_string(),
                requires_backfill: false,
                default_config: serde_json::to_value(HeikinAshiConfig::default())
                    .unwrap_or_default(),
            },
        );

        strategies.insert(
            StrategyKind::EmaLrc,
            StrategyInfo {
                kind: StrategyKind::EmaLrc,
                name: "EMA / LRC Crossover".to_string(),
                description: "Trades crossovers of a linear regression line through an EMA"
                    .to_string(),
                requires_backfill: true,
                default_config: serde_json::to_value(EmaLrcConfig::default()).unwrap_or_default(),
            },
        );

        Self { strategies }
    }

    /// List all available strategies.
    pub fn list(&self) -> Vec<&StrategyInfo> {
        self.strategies.values().collect()
    }

    /// Get strategy info by kind.
    pub fn get(&self, kind: StrategyKind) -> Option<&StrategyInfo> {
        self.strategies.get(&kind)
    }

    /// Check if a strategy name is registered.
    pub fn exists(&self, name: &str) -> bool {
        name.parse::<StrategyKind>()
            .map(|kind| self.strategies.contains_key(&kind))
            .unwrap_or(false)
    }

    /// Create a builder/detector pair from configuration.
    ///
    /// Unknown keys in `config` are ignored, so one instrument table can
    /// carry the settings of every strategy. A `null` config selects the
    /// strategy's defaults.
    pub fn create(&self, kind: StrategyKind, config: serde_json::Value) -> TradingResult<StrategyPair> {
        let config = match config {
            serde_json::Value::Null => serde_json::Value::Object(Default::default()),
            other => other,
        };
        match kind {
            StrategyKind::HeikinAshi => {
                let config: HeikinAshiConfig = serde_json::from_value(config)
                    .map_err(|e| TradingError::Config(e.to_string()))?;
                config.validate()?;
                Ok(StrategyPair {
                    builder: Box::new(HeikinAshiBuilder::new(config)),
                    detector: Arc::new(HeikinAshiDetector),
                })
            }
            StrategyKind::EmaLrc => {
                let config: EmaLrcConfig = serde_json::from_value(config)
                    .map_err(|e| TradingError::Config(e.to_string()))?;
                Ok(StrategyPair {
                    builder: Box::new(EmaLrcBuilder::new(&config)?),
                    detector: Arc::new(CrossoverDetector),
                })
            }
        }
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_lists_builtins() {
        let registry = StrategyRegistry::new();
        assert_eq!(registry.list().len(), 2);
        assert!(registry.exists("heikin_ashi"));
        assert!(registry.exists("EmaLrcCrossover"));
        assert!(!registry.exists("rsi"));
    }

    #[test]
    fn test_create_pairs() {
        let registry = StrategyRegistry::new();

        let ha = registry.create(StrategyKind::HeikinAshi, json!({})).unwrap();
        assert_eq!(ha.builder.name(), "heikin_ashi");
        assert!(!ha.builder.requires_backfill());
        assert_eq!(ha.builder.retention(), 1000);

        let seeded = registry
            .create(StrategyKind::HeikinAshi, json!({"backfill": true}))
            .unwrap();
        assert!(seeded.builder.requires_backfill());

        let pair = registry
            .create(
                StrategyKind::EmaLrc,
                json!({"ema_periods": 5, "lrc_periods": 8, "history_limit": 10}),
            )
            .unwrap();
        assert_eq!(pair.detector.name(), "ema_lrc");
        assert!(pair.builder.requires_backfill());
        assert_eq!(pair.builder.warmup_period(), 8);
    }

    #[test]
    fn test_null_config_uses_defaults() {
        let registry = StrategyRegistry::new();

        let ha = registry
            .create(StrategyKind::HeikinAshi, serde_json::Value::Null)
            .unwrap();
        assert_eq!(ha.builder.name(), "heikin_ashi");
        assert_eq!(ha.builder.retention(), 1000);

        let ema = registry
            .create(StrategyKind::EmaLrc, serde_json::Value::Null)
            .unwrap();
        assert_eq!(ema.detector.name(), "ema_lrc");
    }

    #[test]
    fn test_create_rejects_bad_config() {
        let registry = StrategyRegistry::new();
        assert!(registry
            .create(StrategyKind::EmaLrc, json!({"ema_periods": 0}))
            .is_err());
        assert!(registry
            .create(StrategyKind::HeikinAshi, json!({"history_limit": "many"}))
            .is_err());
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in StrategyKind::ALL {
            assert_eq!(kind.as_str().parse::<StrategyKind>().unwrap(), kind);
        }
    }
}
