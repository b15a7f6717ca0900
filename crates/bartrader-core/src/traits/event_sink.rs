//! Sinks for events produced by workers.

use crate::types::{CandleClosed, OrderPlaced};

/// Receives produced events. Implementations must not block for long;
/// they run inline on the worker's pipeline.
pub trait EventSink: Send + Sync {
    fn candle_closed(&self, event: &CandleClosed);

    fn order_placed(&self, event: &OrderPlaced);
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn candle_closed(&self, _event: &CandleClosed) {}

    fn order_placed(&self, _event: &OrderPlaced) {}
}
