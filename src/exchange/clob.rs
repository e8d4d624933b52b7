//! CLOB REST client
//!
//! Thin HTTP implementation of [`ExchangeClient`] against Polymarket's CLOB
//! API. L2 credentials come from the environment (a `.env` file is honored);
//! without them the client can still be constructed but authenticated calls
//! fail, which the executor treats as a zero balance.

use super::{ExchangeClient, OrderResponse, SignedOrder};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// USDC uses 6 decimal places on chain
const COLLATERAL_DECIMALS: u32 = 6;

/// Configuration for the CLOB HTTP client
#[derive(Debug, Clone)]
pub struct ClobHttpConfig {
    /// CLOB API base URL
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for ClobHttpConfig {
    fn default() -> Self {
        Self {
            base_url: crate::market::CLOB_API_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// L2 API credentials
#[derive(Debug, Clone)]
struct ApiCreds {
    address: String,
    api_key: String,
    api_secret: String,
    api_passphrase: String,
}

impl ApiCreds {
    /// Read credentials from the environment. Returns `None` unless all
    /// four variables are present.
    fn from_env() -> Option<Self> {
        Some(Self {
            address: std::env::var("POLY_ADDRESS").ok()?,
            api_key: std::env::var("POLY_API_KEY").ok()?,
            api_secret: std::env::var("POLY_API_SECRET").ok()?,
            api_passphrase: std::env::var("POLY_API_PASSPHRASE").ok()?,
        })
    }
}

/// HTTP implementation of the exchange boundary
pub struct ClobHttpClient {
    config: ClobHttpConfig,
    client: Client,
    creds: Option<ApiCreds>,
}

impl ClobHttpClient {
    /// Create a client, loading credentials from the environment
    pub fn from_env(config: ClobHttpConfig) -> Self {
        dotenv::dotenv().ok();

        let creds = ApiCreds::from_env();
        if creds.is_none() {
            tracing::warn!(
                "POLY_ADDRESS / POLY_API_KEY / POLY_API_SECRET / POLY_API_PASSPHRASE not set; \
                 authenticated exchange calls will fail"
            );
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config,
            client,
            creds,
        }
    }

    fn with_auth(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.creds {
            Some(creds) => builder
                .header("POLY-ADDRESS", &creds.address)
                .header("POLY-SIGNATURE", &creds.api_secret)
                .header("POLY-TIMESTAMP", Utc::now().timestamp().to_string())
                .header("POLY-API-KEY", &creds.api_key)
                .header("POLY-PASSPHRASE", &creds.api_passphrase),
            None => builder,
        }
    }
}

#[async_trait]
impl ExchangeClient for ClobHttpClient {
    async fn create_market_buy(
        &self,
        token_id: &str,
        amount: Decimal,
    ) -> anyhow::Result<SignedOrder> {
        Ok(SignedOrder {
            client_id: Uuid::new_v4(),
            token_id: token_id.to_string(),
            amount,
        })
    }

    async fn post_order(&self, order: &SignedOrder) -> anyhow::Result<OrderResponse> {
        let url = format!("{}/order", self.config.base_url);

        let body = PostOrderRequest {
            order: order.clone(),
            order_type: "FOK".to_string(),
        };

        tracing::debug!(
            client_id = %order.client_id,
            token_id = %order.token_id,
            amount = %order.amount,
            "Posting order to CLOB"
        );

        let response = self
            .with_auth(self.client.post(&url))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            anyhow::bail!("CLOB order error: {} - {}", status, text);
        }

        let raw: PostOrderPayload = serde_json::from_str(&text)
            .map_err(|e| anyhow::anyhow!("Failed to parse order response: {} - {}", e, text))?;

        convert_order_response(raw)
    }

    async fn balance(&self) -> anyhow::Result<Decimal> {
        let url = format!("{}/balance-allowance", self.config.base_url);

        let response = self
            .with_auth(self.client.get(&url))
            .query(&[("asset_type", "COLLATERAL")])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            anyhow::bail!("CLOB balance error: {} - {}", status, text);
        }

        let raw: BalancePayload = serde_json::from_str(&text)
            .map_err(|e| anyhow::anyhow!("Failed to parse balance response: {} - {}", e, text))?;

        let usd = native_to_usd(&raw.balance)?;

        tracing::info!(balance_native = %raw.balance, balance_usd = %usd, "Fetched collateral balance");

        Ok(usd)
    }
}

/// Order submission body
#[derive(Debug, Serialize)]
struct PostOrderRequest {
    order: SignedOrder,
    #[serde(rename = "orderType")]
    order_type: String,
}

/// Raw order acknowledgement from the CLOB API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostOrderPayload {
    #[serde(default)]
    success: bool,
    #[serde(rename = "orderID")]
    order_id: Option<String>,
    error_msg: Option<String>,
    transactions_hashes: Option<Vec<String>>,
    /// Dollars spent on a buy, as a string
    making_amount: Option<String>,
}

/// Raw balance-allowance response
#[derive(Debug, Deserialize)]
struct BalancePayload {
    balance: String,
}

fn convert_order_response(raw: PostOrderPayload) -> anyhow::Result<OrderResponse> {
    if !raw.success {
        anyhow::bail!(
            "CLOB rejected order: {}",
            raw.error_msg.unwrap_or_else(|| "no error message".to_string())
        );
    }

    Ok(OrderResponse {
        order_id: raw.order_id,
        tx_hash: raw
            .transactions_hashes
            .and_then(|hashes| hashes.into_iter().next()),
        filled_amount: raw.making_amount.and_then(|s| s.parse().ok()),
    })
}

/// Convert a 6-decimal native collateral amount to dollars
fn native_to_usd(raw: &str) -> anyhow::Result<Decimal> {
    let native: Decimal = raw
        .parse()
        .map_err(|e| anyhow::anyhow!("Failed to parse balance value '{}': {}", raw, e))?;
    Ok(native / Decimal::from(10u64.pow(COLLATERAL_DECIMALS)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_native_to_usd() {
        assert_eq!(native_to_usd("1000000").unwrap(), dec!(1));
        assert_eq!(native_to_usd("2500000").unwrap(), dec!(2.5));
        assert_eq!(native_to_usd("0").unwrap(), dec!(0));
    }

    #[test]
    fn test_native_to_usd_invalid() {
        assert!(native_to_usd("not a number").is_err());
    }

    #[test]
    fn test_convert_order_response_success() {
        let raw: PostOrderPayload = serde_json::from_str(
            r#"{
                "success": true,
                "orderID": "0xorder",
                "transactionsHashes": ["0xhash1", "0xhash2"],
                "makingAmount": "0.48"
            }"#,
        )
        .unwrap();

        let response = convert_order_response(raw).unwrap();
        assert_eq!(response.order_id.as_deref(), Some("0xorder"));
        assert_eq!(response.tx_hash.as_deref(), Some("0xhash1"));
        assert_eq!(response.filled_amount, Some(dec!(0.48)));
    }

    #[test]
    fn test_convert_order_response_rejected() {
        let raw: PostOrderPayload = serde_json::from_str(
            r#"{"success": false, "errorMsg": "not enough balance"}"#,
        )
        .unwrap();

        let err = convert_order_response(raw).unwrap_err();
        assert!(err.to_string().contains("not enough balance"));
    }

    #[test]
    fn test_convert_order_response_minimal() {
        let raw: PostOrderPayload = serde_json::from_str(r#"{"success": true}"#).unwrap();

        let response = convert_order_response(raw).unwrap();
        assert!(response.order_id.is_none());
        assert!(response.tx_hash.is_none());
        assert!(response.filled_amount.is_none());
    }

    #[test]
    fn test_clob_config_default() {
        let config = ClobHttpConfig::default();
        assert_eq!(config.base_url, crate::market::CLOB_API_URL);
        assert_eq!(config.timeout, Duration::from_secs(10));
    }
}
