//! Sub-bar cache for the currently open window.

use bartrader_core::types::{RawBar, WindowSummary};

/// Raw bars of the window that has not closed yet.
#[derive(Debug, Clone, Default)]
pub struct BarCache {
    bars: Vec<RawBar>,
}

impl BarCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a bar to the open window.
    pub fn push(&mut self, bar: RawBar) {
        self.bars.push(bar);
    }

    pub fn first(&self) -> Option<&RawBar> {
        self.bars.first()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Seconds covered from the first cached bar's start to the last one's end.
    pub fn span_secs(&self, sub_period_secs: u64) -> i64 {
        match (self.bars.first(), self.bars.last()) {
            (Some(first), Some(last)) => last.start_time - first.start_time + sub_period_secs as i64,
            _ => 0,
        }
    }

    /// Summarise the cached bars without clearing them.
    pub fn summary(&self, sub_period_secs: u64) -> Option<WindowSummary> {
        WindowSummary::fold(&self.bars, sub_period_secs)
    }

    /// Clear all cached bars.
    pub fn clear(&mut self) {
        self.bars.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_summary_and_clear() {
        let mut cache = BarCache::new();
        assert!(cache.summary(5).is_none());

        cache.push(RawBar::new(0, 10.0, 10.5, 9.5, 10.2));
        cache.push(RawBar::new(5, 10.2, 11.0, 10.0, 10.8));
        assert_eq!(cache.span_secs(5), 10);

        let summary = cache.summary(5).unwrap();
        assert_eq!(summary.high, 11.0);
        assert_eq!(summary.closed_at, 10);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.span_secs(5), 0);
    }
}
