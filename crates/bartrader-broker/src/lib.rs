//! Broker and feed integrations.
//!
//! Only the in-memory paper implementation ships; live integrations plug in
//! by implementing [`Broker`] and [`MarketData`].

mod paper;

pub use bartrader_core::traits::{Broker, MarketData};
pub use paper::{FillMode, PaperBroker, PaperOrder, PaperOrderStatus};
