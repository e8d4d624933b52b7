//! Market discovery module
//!
//! Locates the current 15-minute BTC up/down market via the Gamma API and
//! resolves its yes/no prices, falling back to order book mids when the
//! outcome prices are missing from the payload.

mod gamma;
mod pricing;
pub mod slot;

pub use gamma::{GammaClient, GammaConfig, GAMMA_API_URL};
pub use pricing::{BookPricer, CLOB_API_URL};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary market side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy Yes tokens
    Yes,
    /// Buy No tokens
    No,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Yes => "yes",
            Side::No => "no",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a snapshot's prices came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    /// Parsed from the Gamma outcomePrices field
    OutcomePrices,
    /// Mid of best bid/ask from the CLOB order book
    BookMid,
    /// Neither source available; prices defaulted to 0.5
    Fallback,
}

/// Point-in-time view of one 15-minute binary market
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Condition identifier, used as the position key everywhere
    pub id: String,
    /// Market question text
    pub question: String,
    /// Event slug (e.g. "btc-updown-15m-1767638700")
    pub slug: String,
    /// Current Yes price
    pub yes_price: Decimal,
    /// Current No price
    pub no_price: Decimal,
    /// CLOB token for the Yes side, when the payload carried one
    pub yes_token_id: Option<String>,
    /// CLOB token for the No side, when the payload carried one
    pub no_token_id: Option<String>,
    /// Reported trade volume in dollars
    pub volume: Decimal,
    /// How the prices were resolved
    pub price_source: PriceSource,
    /// Snapshot time
    pub fetched_at: DateTime<Utc>,
}

impl MarketSnapshot {
    /// Sum of both sides' prices. A fair book sums to 1.0; the excess is
    /// the market's vig.
    pub fn vig(&self) -> Decimal {
        self.yes_price + self.no_price
    }

    pub fn price_for(&self, side: Side) -> Decimal {
        match side {
            Side::Yes => self.yes_price,
            Side::No => self.no_price,
        }
    }

    pub fn token_for(&self, side: Side) -> Option<&str> {
        match side {
            Side::Yes => self.yes_token_id.as_deref(),
            Side::No => self.no_token_id.as_deref(),
        }
    }
}

/// Source of the current market, so the trading loop can be driven by a
/// scripted sequence in tests
#[async_trait]
pub trait MarketSource: Send + Sync {
    /// Snapshot of the market for the current 15-minute slot.
    /// `None` means the slot has no listed market yet, which is a normal
    /// outcome early in a window.
    async fn current_market(&self) -> anyhow::Result<Option<MarketSnapshot>>;
}
