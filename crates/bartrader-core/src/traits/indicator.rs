//! Indicator trait definition.

/// Batch indicator over a price slice.
///
/// `calculate` returns one value per complete lookback window, so the output
/// is `data.len() - period() + 1` long (empty when there is not enough data).
pub trait Indicator: Send + Sync {
    /// Calculate indicator values for the given data.
    fn calculate(&self, data: &[f64]) -> Vec<f64>;

    /// Get the lookback length.
    fn period(&self) -> usize;

    /// Get the name of the indicator.
    fn name(&self) -> &str;

    /// Calculate, then left-pad with `None` so the output lines up with `data`.
    fn calculate_aligned(&self, data: &[f64]) -> Vec<Option<f64>> {
        let values = self.calculate(data);
        let pad = data.len().saturating_sub(values.len());
        std::iter::repeat(None)
            .take(pad)
            .chain(values.into_iter().map(Some))
            .collect()
    }
}
