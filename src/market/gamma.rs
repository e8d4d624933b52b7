//! Gamma API client for market discovery
//!
//! Looks up the current 15-minute BTC up/down market by its deterministic
//! slot slug. A missing market for a fresh slot is a normal outcome: markets
//! are listed shortly after each window opens.

use super::pricing::BookPricer;
use super::slot;
use super::{MarketSnapshot, MarketSource, PriceSource, CLOB_API_URL};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

/// Gamma API base URL
pub const GAMMA_API_URL: &str = "https://gamma-api.polymarket.com";

/// Configuration for the Gamma client
#[derive(Debug, Clone)]
pub struct GammaConfig {
    /// Base URL for the Gamma API
    pub base_url: String,
    /// Base URL for the CLOB API, used for the order book price fallback
    pub clob_base_url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for GammaConfig {
    fn default() -> Self {
        Self {
            base_url: GAMMA_API_URL.to_string(),
            clob_base_url: CLOB_API_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Client for Polymarket's Gamma API
pub struct GammaClient {
    config: GammaConfig,
    client: Client,
    pricer: BookPricer,
}

impl GammaClient {
    /// Create a new Gamma API client with default configuration
    pub fn new() -> Self {
        Self::with_config(GammaConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: GammaConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        let pricer = BookPricer::with_timeout(&config.clob_base_url, config.timeout);

        Self {
            config,
            client,
            pricer,
        }
    }

    /// Fetch a market by its event slug
    ///
    /// Returns `None` when no market is listed under the slug yet.
    pub async fn fetch_market_by_slug(&self, slug: &str) -> anyhow::Result<Option<MarketSnapshot>> {
        let url = format!("{}/markets", self.config.base_url);

        tracing::debug!(url = %url, slug = %slug, "Fetching market from Gamma API");

        let response = self.client.get(&url).query(&[("slug", slug)]).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Gamma API error: {} - {}", status, body);
        }

        let markets: Vec<GammaMarket> = response.json().await?;

        let Some(raw) = markets.into_iter().next() else {
            tracing::debug!(slug = %slug, "No market for slot yet, retry next scan");
            return Ok(None);
        };

        Ok(Some(convert_market(raw, slug)))
    }
}

impl Default for GammaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketSource for GammaClient {
    async fn current_market(&self) -> anyhow::Result<Option<MarketSnapshot>> {
        let slug = slot::slot_slug(slot::slot_start(Utc::now()));

        let Some(mut snapshot) = self.fetch_market_by_slug(&slug).await? else {
            return Ok(None);
        };

        if snapshot.price_source == PriceSource::Fallback {
            self.pricer.refine(&mut snapshot).await;
        }

        tracing::info!(
            market_id = %snapshot.id,
            question = %snapshot.question,
            volume = %snapshot.volume,
            yes = %snapshot.yes_price,
            no = %snapshot.no_price,
            "Active slot market"
        );

        Ok(Some(snapshot))
    }
}

/// Raw market response from Gamma API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GammaMarket {
    /// Numeric market identifier
    id: Option<String>,
    /// Condition identifier, preferred as the position key
    condition_id: Option<String>,
    /// Market question
    question: Option<String>,
    /// Event slug
    slug: Option<String>,
    /// CLOB token IDs as JSON string
    clob_token_ids: Option<String>,
    /// Outcome prices as JSON string
    outcome_prices: Option<String>,
    /// Trade volume; the API serves either a string or a number
    volume: Option<serde_json::Value>,
}

/// Convert a GammaMarket to a MarketSnapshot
///
/// Missing token ids and prices degrade rather than fail: tokens become
/// `None` and prices default to 0.5 pending the book fallback.
fn convert_market(raw: GammaMarket, requested_slug: &str) -> MarketSnapshot {
    let (yes_token_id, no_token_id) = match raw.clob_token_ids.as_deref().and_then(parse_token_ids)
    {
        Some((yes, no)) => (Some(yes), Some(no)),
        None => (None, None),
    };

    let (yes_price, no_price, price_source) =
        match raw.outcome_prices.as_deref().and_then(parse_outcome_prices) {
            Some((yes, no)) => (yes, no, PriceSource::OutcomePrices),
            None => (
                Decimal::new(5, 1), // 0.5
                Decimal::new(5, 1),
                PriceSource::Fallback,
            ),
        };

    MarketSnapshot {
        id: raw
            .condition_id
            .or(raw.id)
            .unwrap_or_else(|| requested_slug.to_string()),
        question: raw.question.unwrap_or_else(|| "Unknown".to_string()),
        slug: raw.slug.unwrap_or_else(|| requested_slug.to_string()),
        yes_price,
        no_price,
        yes_token_id,
        no_token_id,
        volume: parse_volume(raw.volume.as_ref()),
        price_source,
        fetched_at: Utc::now(),
    }
}

/// Parse CLOB token IDs from JSON string
///
/// Format: "[\"token1\", \"token2\"]" where token1 is Yes and token2 is No
fn parse_token_ids(token_ids_str: &str) -> Option<(String, String)> {
    let tokens: Vec<String> = match serde_json::from_str(token_ids_str) {
        Ok(tokens) => tokens,
        Err(e) => {
            tracing::warn!(raw = %token_ids_str, error = %e, "Failed to parse clobTokenIds");
            return None;
        }
    };

    if tokens.len() != 2 {
        tracing::warn!(raw = %token_ids_str, count = tokens.len(), "Expected 2 CLOB token ids");
        return None;
    }

    Some((tokens[0].clone(), tokens[1].clone()))
}

/// Parse outcome prices from JSON string
///
/// Format: "[\"0.52\", \"0.48\"]" - Yes price first, No price second
fn parse_outcome_prices(prices_str: &str) -> Option<(Decimal, Decimal)> {
    let prices: Vec<String> = serde_json::from_str(prices_str).ok()?;
    if prices.len() != 2 {
        return None;
    }
    let yes = Decimal::from_str(&prices[0]).ok()?;
    let no = Decimal::from_str(&prices[1]).ok()?;
    Some((yes, no))
}

/// Parse the volume field, tolerating both string and numeric encodings
fn parse_volume(value: Option<&serde_json::Value>) -> Decimal {
    match value {
        Some(serde_json::Value::String(s)) => Decimal::from_str(s).unwrap_or_default(),
        Some(serde_json::Value::Number(n)) => n
            .as_f64()
            .and_then(Decimal::from_f64_retain)
            .unwrap_or_default(),
        _ => Decimal::ZERO,
    }
}
