//! Regular trading hours calendar.

use bartrader_core::error::{TradingError, TradingResult};
use chrono::{DateTime, Duration, NaiveTime, Utc};

/// Daily regular-trading-hours window in a fixed UTC offset.
///
/// Only the local time of day is considered; weekends and holidays are the
/// feed's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegularHours {
    open: NaiveTime,
    close: NaiveTime,
    offset_secs: i32,
}

impl RegularHours {
    pub fn new(open: NaiveTime, close: NaiveTime, utc_offset_minutes: i32) -> TradingResult<Self> {
        if open >= close {
            return Err(TradingError::Config(format!(
                "session open {open} must be before close {close}"
            )));
        }
        if utc_offset_minutes.abs() >= 24 * 60 {
            return Err(TradingError::Config(format!(
                "invalid UTC offset: {utc_offset_minutes} minutes"
            )));
        }
        Ok(Self {
            open,
            close,
            offset_secs: utc_offset_minutes * 60,
        })
    }

    /// Parse `HH:MM` open and close times.
    pub fn parse(open: &str, close: &str, utc_offset_minutes: i32) -> TradingResult<Self> {
        let parse = |s: &str| {
            NaiveTime::parse_from_str(s, "%H:%M")
                .map_err(|e| TradingError::Config(format!("invalid session time '{s}': {e}")))
        };
        Self::new(parse(open)?, parse(close)?, utc_offset_minutes)
    }

    /// US equities, 09:30-16:00 Eastern (standard time).
    pub fn us_equities() -> Self {
        let at = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap_or_default();
        Self {
            open: at(9, 30),
            close: at(16, 0),
            offset_secs: -5 * 3600,
        }
    }

    pub fn utc_offset_secs(&self) -> i64 {
        self.offset_secs as i64
    }

    /// Whether `at` falls inside regular hours (open inclusive, close exclusive).
    pub fn is_open(&self, at: DateTime<Utc>) -> bool {
        let local = (at + Duration::seconds(self.offset_secs as i64)).time();
        local >= self.open && local < self.close
    }
}

impl Default for RegularHours {
    fn default() -> Self {
        Self::us_equities()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, h, m, 0).unwrap()
    }

    #[test]
    fn test_us_equities_window() {
        let rth = RegularHours::us_equities();
        // 09:29 / 09:30 / 15:59 / 16:00 Eastern = 14:29 / 14:30 / 20:59 / 21:00 UTC
        assert!(!rth.is_open(utc(14, 29)));
        assert!(rth.is_open(utc(14, 30)));
        assert!(rth.is_open(utc(20, 59)));
        assert!(!rth.is_open(utc(21, 0)));
        assert_eq!(rth.utc_offset_secs(), -5 * 3600);
    }

    #[test]
    fn test_parse() {
        let rth = RegularHours::parse("08:00", "12:00", 0).unwrap();
        assert!(rth.is_open(utc(8, 0)));
        assert!(!rth.is_open(utc(12, 0)));
        assert!(RegularHours::parse("12:00", "08:00", 0).is_err());
        assert!(RegularHours::parse("8am", "12:00", 0).is_err());
        assert!(RegularHours::parse("08:00", "12:00", 24 * 60).is_err());
    }
}
