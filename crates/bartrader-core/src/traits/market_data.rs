//! Market data trait definition.

use crate::error::DataError;
use crate::types::{MarketEvent, Period, QuoteSnapshot};
use async_trait::async_trait;
use std::fmt;
use tokio::sync::mpsc;

/// Callback run on each event as the consumer receives it.
type OnReceive = Box<dyn FnMut(&MarketEvent) + Send>;

/// Event stream of one subscription.
///
/// Feeds that derive state from the events they deliver (e.g. a quote from
/// the last bar) attach a hook so that state advances only as far as the
/// consumer has read, never with what is still queued.
pub struct MarketStream {
    rx: mpsc::Receiver<MarketEvent>,
    on_receive: Option<OnReceive>,
}

impl MarketStream {
    pub fn new(rx: mpsc::Receiver<MarketEvent>) -> Self {
        Self {
            rx,
            on_receive: None,
        }
    }

    pub fn with_hook(mut self, hook: impl FnMut(&MarketEvent) + Send + 'static) -> Self {
        self.on_receive = Some(Box::new(hook));
        self
    }

    /// Next event, or `None` once the feed has closed. Cancel safe.
    pub async fn recv(&mut self) -> Option<MarketEvent> {
        let event = self.rx.recv().await?;
        if let Some(hook) = self.on_receive.as_mut() {
            hook(&event);
        }
        Some(event)
    }
}

impl fmt::Debug for MarketStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarketStream")
            .field("hooked", &self.on_receive.is_some())
            .finish()
    }
}

/// Trait for bar, backfill and quote feeds.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Subscribe to the event stream of one instrument.
    ///
    /// # Arguments
    /// * `symbol` - The symbol to subscribe to
    /// * `period` - Aggregation period; historical bars are delivered pre-aggregated to it
    /// * `backfill` - Whether historical bars should precede live ones
    /// * `session_id` - Client-session id owning the subscription
    ///
    /// # Returns
    /// A stream yielding events in time order. When `backfill` is
    /// set, historical bars arrive first and end with `BackfillComplete`.
    async fn subscribe(
        &self,
        symbol: &str,
        period: Period,
        backfill: bool,
        session_id: u32,
    ) -> Result<MarketStream, DataError>;

    /// Latest known bid / ask / last for a symbol.
    async fn latest_quote(&self, symbol: &str) -> Result<QuoteSnapshot, DataError>;

    /// Get the data source name.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawBar;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_hook_runs_on_receive() {
        let (tx, rx) = mpsc::channel(4);
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let mut stream = MarketStream::new(rx).with_hook(move |event| {
            if matches!(event, MarketEvent::Bar(_)) {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tx.send(MarketEvent::Bar(RawBar::new(0, 1.0, 1.0, 1.0, 1.0))).await.unwrap();
        tx.send(MarketEvent::BackfillComplete).await.unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 0);

        assert!(matches!(stream.recv().await, Some(MarketEvent::Bar(_))));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(stream.recv().await, Some(MarketEvent::BackfillComplete));
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        drop(tx);
        assert_eq!(stream.recv().await, None);
    }
}
