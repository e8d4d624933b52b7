//! Order book price fallback
//!
//! When the Gamma payload carries no outcomePrices, prices fall back to the
//! mid of best bid/ask from the public CLOB book, one request per token. An
//! empty or unavailable book leaves the 0.5 default in place.

use super::{MarketSnapshot, PriceSource, Side};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

/// CLOB API base URL
pub const CLOB_API_URL: &str = "https://clob.polymarket.com";

/// Resolves prices from the public CLOB order book
pub struct BookPricer {
    base_url: String,
    client: Client,
}

impl BookPricer {
    pub fn new(base_url: &str) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(10))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Replace defaulted prices with book mids for each side whose token id
    /// is known. Book failures are logged and leave the defaults untouched.
    pub async fn refine(&self, snapshot: &mut MarketSnapshot) {
        let mut resolved = false;

        for side in [Side::Yes, Side::No] {
            let Some(token_id) = snapshot.token_for(side).map(str::to_string) else {
                continue;
            };

            match self.book_mid(&token_id).await {
                Ok(Some(mid)) => {
                    match side {
                        Side::Yes => snapshot.yes_price = mid,
                        Side::No => snapshot.no_price = mid,
                    }
                    resolved = true;
                }
                Ok(None) => {
                    tracing::debug!(token_id = %token_id, "Order book empty, keeping default price");
                }
                Err(e) => {
                    tracing::warn!(token_id = %token_id, error = %e, "Order book fetch failed");
                }
            }
        }

        if resolved {
            snapshot.price_source = PriceSource::BookMid;
            tracing::info!(
                yes = %snapshot.yes_price,
                no = %snapshot.no_price,
                vig = %snapshot.vig(),
                "Prices resolved from book mids"
            );
        }
    }

    /// Mid price for a single token from its order book
    async fn book_mid(&self, token_id: &str) -> anyhow::Result<Option<Decimal>> {
        let url = format!("{}/book", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("token_id", token_id)])
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("CLOB book error: {}", response.status());
        }

        let book: BookPayload = response.json().await?;
        Ok(mid_from_book(&book))
    }
}

/// Order book response from the CLOB API
#[derive(Debug, Deserialize)]
struct BookPayload {
    #[serde(default)]
    bids: Vec<BookLevel>,
    #[serde(default)]
    asks: Vec<BookLevel>,
}

/// One price level; the API encodes numbers as strings
#[derive(Debug, Deserialize)]
struct BookLevel {
    price: String,
    #[allow(dead_code)]
    size: Option<String>,
}

/// Mid of the top-of-book bid and ask. `None` when either side is empty
/// or unparseable.
fn mid_from_book(book: &BookPayload) -> Option<Decimal> {
    let bid = book.bids.first().and_then(|l| Decimal::from_str(&l.price).ok())?;
    let ask = book.asks.first().and_then(|l| Decimal::from_str(&l.price).ok())?;
    Some((bid + ask) / Decimal::TWO)
}
