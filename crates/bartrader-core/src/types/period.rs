//! Aggregation period parsed from a unit-suffixed string.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

/// Candle aggregation period, stored in seconds.
///
/// Accepts `Ns`, `Nm`, `Nh` and `Nd`, e.g. `"90s"`, `"5m"`, `"1h"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Period {
    secs: u64,
}

impl Period {
    /// Create a period from a number of seconds.
    pub const fn from_secs(secs: u64) -> Self {
        Self { secs }
    }

    /// Duration of the period in seconds.
    pub fn as_secs(&self) -> u64 {
        self.secs
    }

    /// Whether the period tiles a calendar day exactly.
    pub fn divides_day(&self) -> bool {
        self.secs > 0 && DAY % self.secs == 0
    }

    /// Number of sub-bars of `sub_period_secs` in one period, if it divides evenly.
    pub fn sub_bars(&self, sub_period_secs: u64) -> Option<u64> {
        if sub_period_secs == 0 || self.secs % sub_period_secs != 0 {
            return None;
        }
        Some(self.secs / sub_period_secs)
    }
}

impl Default for Period {
    fn default() -> Self {
        Self::from_secs(MINUTE)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.secs;
        if s > 0 && s % DAY == 0 {
            write!(f, "{}d", s / DAY)
        } else if s > 0 && s % HOUR == 0 {
            write!(f, "{}h", s / HOUR)
        } else if s > 0 && s % MINUTE == 0 {
            write!(f, "{}m", s / MINUTE)
        } else {
            write!(f, "{}s", s)
        }
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some(unit) = s.chars().last() else {
            return Err("Invalid period: empty".to_string());
        };
        let multiplier = match unit {
            's' => 1,
            'm' => MINUTE,
            'h' => HOUR,
            'd' => DAY,
            'w' => {
                return Err(format!(
                    "Invalid period: {} (weekly periods cannot tile a trading day)",
                    s
                ))
            }
            _ => return Err(format!("Invalid period: {} (expected suffix s/m/h/d)", s)),
        };
        let count: u64 = s[..s.len() - unit.len_utf8()]
            .parse()
            .map_err(|_| format!("Invalid period: {}", s))?;
        if count == 0 {
            return Err(format!("Invalid period: {} (must be positive)", s));
        }
        count
            .checked_mul(multiplier)
            .map(Period::from_secs)
            .ok_or_else(|| format!("Invalid period: {} (too long)", s))
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_parse() {
        assert_eq!(Period::from_str("60s").unwrap().as_secs(), 60);
        assert_eq!(Period::from_str("5m").unwrap().as_secs(), 300);
        assert_eq!(Period::from_str("1h").unwrap().as_secs(), 3600);
        assert_eq!(Period::from_str("1d").unwrap().as_secs(), 86400);
    }

    #[test]
    fn test_period_parse_rejects() {
        assert!(Period::from_str("").is_err());
        assert!(Period::from_str("10").is_err());
        assert!(Period::from_str("0m").is_err());
        assert!(Period::from_str("xm").is_err());
        let err = Period::from_str("1w").unwrap_err();
        assert!(err.contains("weekly"));
    }

    #[test]
    fn test_period_display() {
        assert_eq!(Period::from_secs(60).to_string(), "1m");
        assert_eq!(Period::from_secs(90).to_string(), "90s");
        assert_eq!(Period::from_secs(7200).to_string(), "2h");
        assert_eq!(Period::from_secs(7 * 86400).to_string(), "7d");
    }

    #[test]
    fn test_sub_bars() {
        let period = Period::from_secs(60);
        assert_eq!(period.sub_bars(5), Some(12));
        assert_eq!(period.sub_bars(7), None);
        assert_eq!(period.sub_bars(0), None);
        assert!(period.divides_day());
        assert!(!Period::from_secs(7 * 60).divides_day());
    }

    #[test]
    fn test_period_serde() {
        let period: Period = serde_json::from_str("\"15m\"").unwrap();
        assert_eq!(period.as_secs(), 900);
        assert_eq!(serde_json::to_string(&period).unwrap(), "\"15m\"");
    }
}
