//! Trade metrics and anomaly alerts
//!
//! Append-only trade log plus a daily loss accumulator and consecutive-loss
//! streak. Threshold breaches are advisory: they log at error level and
//! change no trading behavior. Enforcement belongs to the position limits.

use crate::config::RiskConfig;
use crate::market::Side;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One executed trade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub market_id: String,
    pub side: Side,
    pub amount_usd: Decimal,
    pub price: Decimal,
    /// Paper trade, as opposed to a live order
    pub simulated: bool,
}

/// Aggregate trading statistics
#[derive(Debug, Clone, Default)]
pub struct MetricsStatistics {
    pub total_trades: usize,
    pub simulated_trades: usize,
    pub live_trades: usize,
    pub daily_loss_usd: Decimal,
    pub loss_streak: u32,
}

/// Tracks trading performance and flags anomalies
pub struct TradeMetrics {
    loss_limit_usd: Decimal,
    loss_streak_alert: u32,
    inner: Mutex<MetricsInner>,
}

struct MetricsInner {
    trades: Vec<TradeRecord>,
    daily_loss_usd: Decimal,
    loss_streak: u32,
}

impl TradeMetrics {
    pub fn new(loss_limit_usd: Decimal, loss_streak_alert: u32) -> Self {
        Self {
            loss_limit_usd,
            loss_streak_alert,
            inner: Mutex::new(MetricsInner {
                trades: Vec::new(),
                daily_loss_usd: Decimal::ZERO,
                loss_streak: 0,
            }),
        }
    }

    pub fn from_config(config: &RiskConfig) -> Self {
        Self::new(config.daily_loss_limit_usd, config.loss_streak_alert)
    }

    /// Append an executed trade to the log
    pub fn record_trade(&self, record: TradeRecord) {
        let mut inner = self.inner.lock();
        inner.trades.push(record.clone());

        tracing::info!(
            market_id = %record.market_id,
            side = %record.side,
            amount_usd = %record.amount_usd,
            price = %record.price,
            simulated = record.simulated,
            total_trades = inner.trades.len(),
            "Trade recorded"
        );
    }

    /// Record realized P&L for a closed trade and check the advisory
    /// thresholds.
    ///
    /// A loss grows the daily accumulator and the streak; any non-negative
    /// P&L resets the streak. Breaches alert and nothing more.
    pub fn record_pnl(&self, market_id: &str, pnl_usd: Decimal) {
        let mut inner = self.inner.lock();

        if pnl_usd < Decimal::ZERO {
            inner.daily_loss_usd += pnl_usd.abs();
            inner.loss_streak += 1;

            tracing::info!(
                market_id = %market_id,
                pnl_usd = %pnl_usd,
                daily_loss_usd = %inner.daily_loss_usd,
                loss_streak = inner.loss_streak,
                "Loss recorded"
            );

            if inner.daily_loss_usd > self.loss_limit_usd {
                tracing::error!(
                    daily_loss_usd = %inner.daily_loss_usd,
                    limit_usd = %self.loss_limit_usd,
                    "Daily loss limit breached, consider stopping"
                );
            }

            if inner.loss_streak >= self.loss_streak_alert {
                tracing::error!(
                    loss_streak = inner.loss_streak,
                    threshold = self.loss_streak_alert,
                    "Consecutive loss streak alert, review strategy"
                );
            }
        } else {
            inner.loss_streak = 0;
            tracing::info!(market_id = %market_id, pnl_usd = %pnl_usd, "Win recorded");
        }
    }

    pub fn statistics(&self) -> MetricsStatistics {
        let inner = self.inner.lock();
        let simulated_trades = inner.trades.iter().filter(|t| t.simulated).count();

        MetricsStatistics {
            total_trades: inner.trades.len(),
            simulated_trades,
            live_trades: inner.trades.len() - simulated_trades,
            daily_loss_usd: inner.daily_loss_usd,
            loss_streak: inner.loss_streak,
        }
    }

    /// Reset the daily accumulators. Called on the day boundary; losses
    /// never expire implicitly.
    pub fn reset_daily(&self) {
        let mut inner = self.inner.lock();
        inner.daily_loss_usd = Decimal::ZERO;
        inner.loss_streak = 0;
        tracing::info!("Daily metrics reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn metrics() -> TradeMetrics {
        TradeMetrics::new(dec!(10), 3)
    }

    fn record(simulated: bool) -> TradeRecord {
        TradeRecord {
            timestamp: Utc::now(),
            market_id: "m1".to_string(),
            side: Side::Yes,
            amount_usd: dec!(0.50),
            price: dec!(0.62),
            simulated,
        }
    }

    #[test]
    fn test_record_trade_counts() {
        let m = metrics();
        m.record_trade(record(true));
        m.record_trade(record(true));
        m.record_trade(record(false));

        let stats = m.statistics();
        assert_eq!(stats.total_trades, 3);
        assert_eq!(stats.simulated_trades, 2);
        assert_eq!(stats.live_trades, 1);
    }

    #[test]
    fn test_empty_statistics() {
        let stats = metrics().statistics();
        assert_eq!(stats.total_trades, 0);
        assert_eq!(stats.daily_loss_usd, dec!(0));
        assert_eq!(stats.loss_streak, 0);
    }

    #[test]
    fn test_losses_accumulate_as_positive_magnitude() {
        let m = metrics();
        m.record_pnl("m1", dec!(-2.50));
        m.record_pnl("m2", dec!(-1.25));

        let stats = m.statistics();
        assert_eq!(stats.daily_loss_usd, dec!(3.75));
        assert_eq!(stats.loss_streak, 2);
    }

    #[test]
    fn test_win_resets_streak_but_not_daily_loss() {
        let m = metrics();
        m.record_pnl("m1", dec!(-2.50));
        m.record_pnl("m2", dec!(-1.00));
        m.record_pnl("m3", dec!(0.75));

        let stats = m.statistics();
        assert_eq!(stats.loss_streak, 0);
        // Wins do not pay down the loss accumulator
        assert_eq!(stats.daily_loss_usd, dec!(3.50));
    }

    #[test]
    fn test_zero_pnl_resets_streak() {
        let m = metrics();
        m.record_pnl("m1", dec!(-1.00));
        m.record_pnl("m2", dec!(0));
        assert_eq!(m.statistics().loss_streak, 0);
    }

    #[test]
    fn test_streak_sequence() {
        let m = metrics();
        let pnls = [dec!(-5), dec!(-5), dec!(-5), dec!(1), dec!(-5)];
        let expected = [1u32, 2, 3, 0, 1];

        for (pnl, want) in pnls.iter().zip(expected) {
            m.record_pnl("m1", *pnl);
            assert_eq!(m.statistics().loss_streak, want);
        }
    }

    #[test]
    fn test_alerts_do_not_change_state() {
        let m = metrics();
        // Blow through both thresholds
        for _ in 0..5 {
            m.record_pnl("m1", dec!(-4));
        }

        let stats = m.statistics();
        assert_eq!(stats.daily_loss_usd, dec!(20));
        assert_eq!(stats.loss_streak, 5);

        // Still accepts trades and P&L afterwards
        m.record_trade(record(true));
        m.record_pnl("m1", dec!(-1));
        assert_eq!(m.statistics().loss_streak, 6);
    }

    #[test]
    fn test_reset_daily_clears_accumulators_not_trades() {
        let m = metrics();
        m.record_trade(record(true));
        m.record_pnl("m1", dec!(-5));

        m.reset_daily();

        let stats = m.statistics();
        assert_eq!(stats.daily_loss_usd, dec!(0));
        assert_eq!(stats.loss_streak, 0);
        assert_eq!(stats.total_trades, 1);
    }

    #[test]
    fn test_from_config() {
        let config = RiskConfig {
            max_position_usd: dec!(25),
            max_concurrent_positions: 20,
            max_daily_trades: 100,
            daily_loss_limit_usd: dec!(200),
            loss_streak_alert: 4,
        };
        let m = TradeMetrics::from_config(&config);
        assert_eq!(m.loss_limit_usd, dec!(200));
        assert_eq!(m.loss_streak_alert, 4);
    }
}
