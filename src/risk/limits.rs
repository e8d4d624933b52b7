//! Position limits
//!
//! Hard pre-trade caps: trades per day, notional per position, concurrent
//! markets, and an aggregate exposure ceiling held at 80% of the theoretical
//! maximum. Checks are pure reads; the caller sequences check, execute, and
//! record. The polling loop is the only writer, so the gap between check and
//! record cannot admit a competing trade.

use crate::config::RiskConfig;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use thiserror::Error;

/// Fraction of the theoretical maximum exposure allowed in aggregate
const EXPOSURE_HEADROOM: Decimal = dec!(0.8);

/// Why a trade was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LimitBreach {
    #[error("daily trade limit reached ({count}/{max})")]
    DailyTradeLimit { count: usize, max: usize },

    #[error("trade ${amount} exceeds per-position maximum ${max}")]
    PositionSize { amount: Decimal, max: Decimal },

    #[error("concurrent position limit reached ({count}/{max})")]
    ConcurrentPositions { count: usize, max: usize },

    #[error("projected exposure ${projected} exceeds ceiling ${ceiling}")]
    ExposureCeiling { projected: Decimal, ceiling: Decimal },
}

/// Snapshot of the limiter's state
#[derive(Debug, Clone)]
pub struct LimitsStatus {
    pub active_positions: usize,
    pub total_exposure_usd: Decimal,
    pub daily_trades: usize,
    pub markets: Vec<String>,
}

/// Tracks active exposure and enforces trading limits
pub struct PositionLimits {
    max_position_usd: Decimal,
    max_concurrent: usize,
    max_daily_trades: usize,
    inner: Mutex<LimitsInner>,
}

struct LimitsInner {
    /// market_id -> dollars at risk
    active: HashMap<String, Decimal>,
    total_exposure_usd: Decimal,
    daily_trades: usize,
}

impl PositionLimits {
    pub fn new(config: &RiskConfig) -> Self {
        Self {
            max_position_usd: config.max_position_usd,
            max_concurrent: config.max_concurrent_positions,
            max_daily_trades: config.max_daily_trades,
            inner: Mutex::new(LimitsInner {
                active: HashMap::new(),
                total_exposure_usd: Decimal::ZERO,
                daily_trades: 0,
            }),
        }
    }

    /// Aggregate exposure ceiling: 80% of max concurrent positions at
    /// maximum size each
    pub fn exposure_ceiling(&self) -> Decimal {
        Decimal::from(self.max_concurrent) * self.max_position_usd * EXPOSURE_HEADROOM
    }

    /// Check whether a trade respects every limit.
    ///
    /// Checks run in a fixed order and the first breach wins: daily trade
    /// count, per-position size, concurrent positions, aggregate exposure.
    /// A market already held does not count against the concurrent limit
    /// (adding to it is not a new market). Values exactly at a cap pass;
    /// only strict excess is refused.
    pub fn can_trade(&self, market_id: &str, amount_usd: Decimal) -> Result<(), LimitBreach> {
        let inner = self.inner.lock();

        if inner.daily_trades >= self.max_daily_trades {
            return Err(LimitBreach::DailyTradeLimit {
                count: inner.daily_trades,
                max: self.max_daily_trades,
            });
        }

        if amount_usd > self.max_position_usd {
            return Err(LimitBreach::PositionSize {
                amount: amount_usd,
                max: self.max_position_usd,
            });
        }

        if inner.active.len() >= self.max_concurrent && !inner.active.contains_key(market_id) {
            return Err(LimitBreach::ConcurrentPositions {
                count: inner.active.len(),
                max: self.max_concurrent,
            });
        }

        let ceiling = self.exposure_ceiling();
        let projected = inner.total_exposure_usd + amount_usd;
        if projected > ceiling {
            return Err(LimitBreach::ExposureCeiling { projected, ceiling });
        }

        Ok(())
    }

    /// Record a new or increased position
    pub fn add_position(&self, market_id: &str, amount_usd: Decimal) {
        let mut inner = self.inner.lock();

        *inner
            .active
            .entry(market_id.to_string())
            .or_insert(Decimal::ZERO) += amount_usd;
        inner.total_exposure_usd += amount_usd;
        inner.daily_trades += 1;

        tracing::info!(
            market_id = %market_id,
            amount_usd = %amount_usd,
            total_exposure_usd = %inner.total_exposure_usd,
            daily_trades = inner.daily_trades,
            "Position added"
        );
    }

    /// Release a closed position's exposure. Unknown markets are a no-op.
    /// Returns the dollars released.
    pub fn close_position(&self, market_id: &str, pnl_usd: Option<Decimal>) -> Option<Decimal> {
        let mut inner = self.inner.lock();

        let amount = inner.active.remove(market_id)?;
        inner.total_exposure_usd -= amount;

        tracing::info!(
            market_id = %market_id,
            amount_usd = %amount,
            pnl_usd = ?pnl_usd,
            remaining_exposure_usd = %inner.total_exposure_usd,
            "Position closed"
        );

        Some(amount)
    }

    /// Reset the daily trade counter. Called on the day boundary; never
    /// fires implicitly.
    pub fn reset_daily(&self) {
        let mut inner = self.inner.lock();
        inner.daily_trades = 0;
        tracing::info!("Daily trade counter reset");
    }

    pub fn status(&self) -> LimitsStatus {
        let inner = self.inner.lock();
        LimitsStatus {
            active_positions: inner.active.len(),
            total_exposure_usd: inner.total_exposure_usd,
            daily_trades: inner.daily_trades,
            markets: inner.active.keys().cloned().collect(),
        }
    }
}
