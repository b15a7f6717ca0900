//! Broker trait definition.

use crate::error::BrokerError;
use crate::types::OrderIntent;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Trait for broker integrations.
///
/// Covers the order sink plus the position and shortability feeds. Workers
/// only ever talk to the account through this trait.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Submit an order intent.
    ///
    /// # Returns
    /// The order id assigned by the broker
    async fn submit_order(&self, intent: &OrderIntent) -> Result<u64, BrokerError>;

    /// Cancel an existing order.
    async fn cancel_order(&self, order_id: u64) -> Result<(), BrokerError>;

    /// Ids of the still-working orders for a symbol.
    async fn open_orders(&self, symbol: &str) -> Result<Vec<u64>, BrokerError>;

    /// Current signed net position for a symbol (zero when none is held).
    async fn net_position(&self, symbol: &str) -> Result<Decimal, BrokerError>;

    /// Quantity currently available to sell short.
    async fn shortable_shares(&self, symbol: &str) -> Result<Decimal, BrokerError>;

    /// Cancel every working order for a symbol, returning how many were cancelled.
    async fn cancel_open_orders(&self, symbol: &str) -> Result<usize, BrokerError> {
        let ids = self.open_orders(symbol).await?;
        for id in &ids {
            self.cancel_order(*id).await?;
        }
        Ok(ids.len())
    }

    /// Get the broker name.
    fn name(&self) -> &str;
}
