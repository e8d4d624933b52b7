//! Order executor
//!
//! One entry point for buys in both modes. Paper fills always succeed and
//! are recorded into the ledger at the reference price; a failed local
//! record is logged and the fill still stands. Live fills go through a
//! balance gate and the bounded retry combinator. Live position accounting
//! is the caller's job, driven by the returned confirmation.

use super::retry::{retry_with_backoff, RetryPolicy};
use super::types::{Confirmation, ExecutionError, FillStatus};
use crate::config::ExecutionMode;
use crate::exchange::ExchangeClient;
use crate::market::{MarketSnapshot, Side};
use crate::risk::PositionLedger;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use uuid::Uuid;

/// Fills below this fraction of the requested amount are flagged partial
const PARTIAL_FILL_RATIO: Decimal = dec!(0.95);

/// Executes buys in paper or live mode
pub struct OrderExecutor {
    mode: ExecutionMode,
    client: Option<Arc<dyn ExchangeClient>>,
    ledger: Arc<PositionLedger>,
    retry: RetryPolicy,
    min_balance_usd: Decimal,
}

impl OrderExecutor {
    pub fn new(
        mode: ExecutionMode,
        client: Option<Arc<dyn ExchangeClient>>,
        ledger: Arc<PositionLedger>,
        min_balance_usd: Decimal,
    ) -> Self {
        Self {
            mode,
            client,
            ledger,
            retry: RetryPolicy::default(),
            min_balance_usd,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Buy `amount_usd` of `token_id` on `side` of `market`.
    ///
    /// `reference_price` is the price the fill is accounted at, normally
    /// the side's price from the snapshot that produced the edge.
    pub async fn execute_buy(
        &self,
        token_id: &str,
        amount_usd: Decimal,
        side: Side,
        market: &MarketSnapshot,
        reference_price: Decimal,
    ) -> Result<Confirmation, ExecutionError> {
        match self.mode {
            ExecutionMode::Paper => Ok(self.paper_buy(amount_usd, side, market, reference_price)),
            ExecutionMode::Live => {
                self.live_buy(token_id, amount_usd, side, market, reference_price)
                    .await
            }
        }
    }

    /// Log the collateral balance once at startup. Failures warn and never
    /// block startup; the per-trade balance gate stays authoritative.
    pub async fn log_startup_balance(&self) {
        if self.mode != ExecutionMode::Live {
            return;
        }
        let Some(client) = &self.client else {
            tracing::warn!("Live mode with no exchange client configured");
            return;
        };
        match client.balance().await {
            Ok(balance) if balance < self.min_balance_usd => tracing::warn!(
                balance_usd = %balance,
                minimum_usd = %self.min_balance_usd,
                "Wallet balance below configured minimum"
            ),
            Ok(balance) => tracing::info!(balance_usd = %balance, "Wallet balance"),
            Err(e) => tracing::warn!(error = %e, "Startup balance check failed"),
        }
    }

    fn paper_buy(
        &self,
        amount_usd: Decimal,
        side: Side,
        market: &MarketSnapshot,
        reference_price: Decimal,
    ) -> Confirmation {
        tracing::info!(
            market_id = %market.id,
            side = %side,
            amount_usd = %amount_usd,
            price = %reference_price,
            "Paper fill, no order sent"
        );

        let shares = if reference_price > Decimal::ZERO {
            amount_usd / reference_price
        } else {
            Decimal::ZERO
        };

        if let Err(e) = self
            .ledger
            .open_position(&market.id, side, shares, reference_price)
        {
            tracing::warn!(
                market_id = %market.id,
                error = %e,
                "Local position record failed"
            );
        }

        Confirmation {
            order_id: Uuid::new_v4(),
            market_id: market.id.clone(),
            side,
            requested_usd: amount_usd,
            filled_usd: amount_usd,
            fill_status: FillStatus::Full,
            tx_hash: None,
            simulated: true,
            price: reference_price,
        }
    }

    async fn live_buy(
        &self,
        token_id: &str,
        amount_usd: Decimal,
        side: Side,
        market: &MarketSnapshot,
        reference_price: Decimal,
    ) -> Result<Confirmation, ExecutionError> {
        if amount_usd <= Decimal::ZERO {
            return Err(ExecutionError::NonPositiveAmount(amount_usd));
        }

        let client = self.client.as_ref().ok_or(ExecutionError::MissingClient)?;

        // Fail closed: an unanswerable balance query spends nothing
        let balance = match client.balance().await {
            Ok(balance) => balance,
            Err(e) => {
                tracing::error!(error = %e, "Balance check failed, treating as zero");
                Decimal::ZERO
            }
        };
        if balance < self.min_balance_usd {
            return Err(ExecutionError::InsufficientBalance {
                balance,
                minimum: self.min_balance_usd,
            });
        }

        let submit_client = Arc::clone(client);
        let token = token_id.to_string();
        let result = retry_with_backoff(&self.retry, "order submission", move || {
            let client = Arc::clone(&submit_client);
            let token = token.clone();
            async move {
                let order = client.create_market_buy(&token, amount_usd).await?;
                client.post_order(&order).await
            }
        })
        .await;

        let response = match result {
            Ok(response) => response,
            Err(exhausted) => {
                tracing::error!(
                    market_id = %market.id,
                    side = %side,
                    attempts = exhausted.attempts,
                    error = %exhausted.last_error,
                    "Order submission failed"
                );
                return Err(ExecutionError::SubmissionFailed {
                    attempts: exhausted.attempts,
                    cause: exhausted.last_error,
                });
            }
        };

        let filled_usd = response.filled_amount.unwrap_or(amount_usd);
        let fill_status = if filled_usd < amount_usd * PARTIAL_FILL_RATIO {
            tracing::warn!(
                market_id = %market.id,
                requested_usd = %amount_usd,
                filled_usd = %filled_usd,
                "Partial fill"
            );
            FillStatus::Partial
        } else {
            FillStatus::Full
        };

        tracing::info!(
            market_id = %market.id,
            side = %side,
            filled_usd = %filled_usd,
            tx_hash = ?response.tx_hash,
            "Order filled"
        );

        Ok(Confirmation {
            order_id: Uuid::new_v4(),
            market_id: market.id.clone(),
            side,
            requested_usd: amount_usd,
            filled_usd,
            fill_status,
            tx_hash: response.tx_hash,
            simulated: false,
            price: reference_price,
        })
    }
}
