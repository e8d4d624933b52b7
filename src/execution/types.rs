//! Execution types

use crate::market::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Whether the exchange filled the full requested amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillStatus {
    Full,
    Partial,
}

/// Result of a successful buy
#[derive(Debug, Clone)]
pub struct Confirmation {
    /// Client-side order id
    pub order_id: Uuid,
    /// Market the position is in
    pub market_id: String,
    /// Side bought
    pub side: Side,
    /// Dollars requested
    pub requested_usd: Decimal,
    /// Dollars actually filled; differs from requested on partial fills
    pub filled_usd: Decimal,
    pub fill_status: FillStatus,
    /// Settlement hash from the exchange, live fills only
    pub tx_hash: Option<String>,
    /// True for paper fills
    pub simulated: bool,
    /// Reference price the fill is accounted at
    pub price: Decimal,
}

impl Confirmation {
    /// Token count implied by the filled amount at the reference price
    pub fn shares(&self) -> Decimal {
        if self.price > Decimal::ZERO {
            self.filled_usd / self.price
        } else {
            Decimal::ZERO
        }
    }
}

/// Why a buy did not execute
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("order amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    #[error("balance ${balance} below required minimum ${minimum}")]
    InsufficientBalance { balance: Decimal, minimum: Decimal },

    #[error("live mode requires an exchange client")]
    MissingClient,

    #[error("order submission failed after {attempts} attempts: {cause}")]
    SubmissionFailed { attempts: u32, cause: anyhow::Error },
}
