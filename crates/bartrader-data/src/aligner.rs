//! Wall-clock window alignment.

use bartrader_core::error::DataError;
use bartrader_core::types::Period;

/// Decides whether a sub-bar completes an aggregation window.
///
/// Windows are aligned to the seconds-of-day of the session's UTC offset: a
/// sub-bar starting at `t` closes its window when
/// `(t + utc_offset + sub_period) mod period == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowAligner {
    period: Period,
    sub_period_secs: u64,
    utc_offset_secs: i64,
}

impl WindowAligner {
    /// Create an aligner.
    ///
    /// Fails if the period is not a whole number of sub-periods or does not
    /// tile a day.
    pub fn new(period: Period, sub_period_secs: u64, utc_offset_secs: i64) -> Result<Self, DataError> {
        if period.sub_bars(sub_period_secs).is_none() {
            return Err(DataError::InvalidPeriod(format!(
                "{period} is not a multiple of the {sub_period_secs}s sub-period"
            )));
        }
        if !period.divides_day() {
            return Err(DataError::InvalidPeriod(format!(
                "{period} does not divide a day evenly"
            )));
        }
        Ok(Self {
            period,
            sub_period_secs,
            utc_offset_secs,
        })
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn sub_period_secs(&self) -> u64 {
        self.sub_period_secs
    }

    /// Number of sub-bars a complete window holds.
    pub fn expected_bars(&self) -> usize {
        (self.period.as_secs() / self.sub_period_secs) as usize
    }

    fn local(&self, start_time: i64) -> i64 {
        start_time + self.utc_offset_secs
    }

    /// Whether the sub-bar starting at `start_time` is the last one of its window.
    pub fn closes_window(&self, start_time: i64) -> bool {
        let end = self.local(start_time) + self.sub_period_secs as i64;
        end.rem_euclid(self.period.as_secs() as i64) == 0
    }

    /// Index of the window the sub-bar starting at `start_time` belongs to.
    pub fn window_id(&self, start_time: i64) -> i64 {
        self.local(start_time).div_euclid(self.period.as_secs() as i64)
    }
}
