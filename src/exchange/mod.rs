//! Exchange boundary
//!
//! Everything the executor needs from an exchange lives behind one trait:
//! order preparation, order submission, collateral balance. Failures cross
//! this boundary as untyped errors and are classified by the executor.

mod clob;

pub use clob::{ClobHttpClient, ClobHttpConfig};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A prepared market buy awaiting submission
///
/// Signing internals stay inside the client implementation; this carries
/// only what submission and logging need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedOrder {
    /// Client-assigned order id
    pub client_id: Uuid,
    /// CLOB token being bought
    pub token_id: String,
    /// Dollar amount of the buy
    pub amount: Decimal,
}

/// Exchange acknowledgement of a submitted order
#[derive(Debug, Clone, Default)]
pub struct OrderResponse {
    /// Exchange-assigned order id
    pub order_id: Option<String>,
    /// Settlement transaction hash, when already known
    pub tx_hash: Option<String>,
    /// Dollar amount actually filled; `None` means fully filled
    pub filled_amount: Option<Decimal>,
}

/// Capabilities the executor requires from an exchange
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Prepare a market buy for `amount` dollars of `token_id`
    async fn create_market_buy(&self, token_id: &str, amount: Decimal)
        -> anyhow::Result<SignedOrder>;

    /// Submit a prepared order
    async fn post_order(&self, order: &SignedOrder) -> anyhow::Result<OrderResponse>;

    /// Collateral balance in dollars
    async fn balance(&self) -> anyhow::Result<Decimal>;
}
