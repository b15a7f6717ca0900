//! Event sinks that report to the log.

use std::sync::Arc;

use bartrader_core::traits::EventSink;
use bartrader_core::types::{CandleClosed, Derived, OrderPlaced};
use tracing::{debug, info};

/// Reports every produced event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn candle_closed(&self, event: &CandleClosed) {
        let c = &event.candle;
        if event.historical {
            debug!(symbol = %event.symbol, time = c.time, close = c.close, "historical candle");
            return;
        }
        match &c.derived {
            Derived::HeikinAshi(ha) => info!(
                symbol = %event.symbol,
                time = c.time,
                open = c.open,
                high = c.high,
                low = c.low,
                close = c.close,
                ha_open = ha.ha_open,
                ha_close = ha.ha_close,
                color = ?ha.ha_color,
                "Candle closed"
            ),
            Derived::Indicators(values) => info!(
                symbol = %event.symbol,
                time = c.time,
                open = c.open,
                high = c.high,
                low = c.low,
                close = c.close,
                ema = ?values.average,
                lrc = ?values.trend,
                "Candle closed"
            ),
        }
    }

    fn order_placed(&self, event: &OrderPlaced) {
        info!(
            symbol = %event.symbol,
            order_id = event.order_id,
            candle_time = event.candle_time,
            side = %event.side,
            kind = %event.kind,
            quantity = %event.quantity,
            price = ?event.price,
            "Order sent"
        );
    }
}

/// Forwards each event to several sinks, in order.
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for FanoutSink {
    fn candle_closed(&self, event: &CandleClosed) {
        for sink in &self.sinks {
            sink.candle_closed(event);
        }
    }

    fn order_placed(&self, event: &OrderPlaced) {
        for sink in &self.sinks {
            sink.order_placed(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bartrader_core::types::{Candle, OrderIntent, Side, WindowSummary};
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter {
        candles: AtomicUsize,
        orders: AtomicUsize,
    }

    impl EventSink for Counter {
        fn candle_closed(&self, _event: &CandleClosed) {
            self.candles.fetch_add(1, Ordering::SeqCst);
        }

        fn order_placed(&self, _event: &OrderPlaced) {
            self.orders.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_fanout_reaches_every_sink() {
        let a = Arc::new(Counter::default());
        let b = Arc::new(Counter::default());
        let fanout = FanoutSink::new()
            .with(a.clone())
            .with(b.clone())
            .with(Arc::new(LogEventSink));
        assert_eq!(fanout.len(), 3);

        let candle = Candle::with_placeholders(&WindowSummary {
            closed_at: 60,
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
        });
        fanout.candle_closed(&CandleClosed {
            symbol: "SPY".into(),
            candle,
            historical: false,
        });
        let intent = OrderIntent::market("SPY", Side::Buy, dec!(100), 1);
        fanout.order_placed(&OrderPlaced::from_intent(&intent, 1));

        for counter in [&a, &b] {
            assert_eq!(counter.candles.load(Ordering::SeqCst), 1);
            assert_eq!(counter.orders.load(Ordering::SeqCst), 1);
        }
    }
}
