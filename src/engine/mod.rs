//! Trading engine
//!
//! Sequential scan loop driving the whole bot: fetch the current market,
//! mark and settle positions, scan for an edge, risk-check it, execute,
//! and record the result. Every per-tick failure is logged and the loop
//! moves on; nothing here terminates it.
//!
//! The loop is the sole writer of new positions. Ledger, limits, and
//! metrics are shared for concurrent readers, not for concurrent traders.

use crate::config::Config;
use crate::exchange::ExchangeClient;
use crate::execution::{Confirmation, OrderExecutor};
use crate::market::{MarketSnapshot, MarketSource};
use crate::risk::{CloseReason, PositionLedger, PositionLimits, TradeMetrics, TradeRecord};
use crate::signal::{CrowdStrategy, ScanOutcome};
use crate::storage::{TradeRow, TradeStore};
use crate::telemetry::{self, GaugeMetric};
use chrono::{NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use std::sync::Arc;
use std::time::Duration;

/// The scan-and-trade loop
pub struct TradingEngine {
    source: Arc<dyn MarketSource>,
    strategy: CrowdStrategy,
    executor: OrderExecutor,
    ledger: Arc<PositionLedger>,
    limits: Arc<PositionLimits>,
    metrics: Arc<TradeMetrics>,
    store: Option<TradeStore>,
    scan_interval: Duration,
    current_day: NaiveDate,
}

impl TradingEngine {
    pub fn new(
        config: &Config,
        source: Arc<dyn MarketSource>,
        client: Option<Arc<dyn ExchangeClient>>,
        store: Option<TradeStore>,
    ) -> Self {
        let ledger = Arc::new(PositionLedger::new());
        let limits = Arc::new(PositionLimits::new(&config.risk));
        let metrics = Arc::new(TradeMetrics::from_config(&config.risk));
        let executor = OrderExecutor::new(
            config.execution.mode,
            client,
            Arc::clone(&ledger),
            config.execution.min_balance_usd,
        );

        Self {
            source,
            strategy: CrowdStrategy::new(config.strategy.clone()),
            executor,
            ledger,
            limits,
            metrics,
            store,
            scan_interval: Duration::from_secs(config.market.scan_interval_secs),
            current_day: Utc::now().date_naive(),
        }
    }

    pub fn ledger(&self) -> Arc<PositionLedger> {
        Arc::clone(&self.ledger)
    }

    pub fn limits(&self) -> Arc<PositionLimits> {
        Arc::clone(&self.limits)
    }

    pub fn metrics(&self) -> Arc<TradeMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run until ctrl-c, then settle open positions and log a summary
    pub async fn run(&mut self) -> anyhow::Result<()> {
        tracing::info!(
            mode = ?self.executor.mode(),
            interval_secs = self.scan_interval.as_secs(),
            "Trading engine started"
        );
        self.executor.log_startup_balance().await;

        let mut interval = tokio::time::interval(self.scan_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick().await;
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received");
                    break;
                }
            }
        }

        self.shutdown();
        Ok(())
    }

    /// One pass of the trading loop
    pub async fn tick(&mut self) {
        telemetry::count_tick();
        self.roll_day_if_needed();

        let snapshot = match self.source.current_market().await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                tracing::debug!("No market listed for the current slot");
                self.publish_gauges();
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Market fetch failed");
                self.publish_gauges();
                return;
            }
        };

        // Mark any position held in this market to the fresh prices
        self.ledger.update_from_market(&snapshot);

        // Positions from earlier slots settle at their last mark
        self.settle_rollover(&snapshot.id);

        let edge = match self.strategy.scan(&snapshot) {
            ScanOutcome::Edge(edge) => edge,
            ScanOutcome::Skip(reason) => {
                tracing::debug!(market_id = %snapshot.id, reason = ?reason, "No trade this tick");
                self.publish_gauges();
                return;
            }
        };

        // The market state behind a decision is worth keeping
        if let Some(store) = &self.store {
            if let Err(e) = store.record_snapshot(&snapshot).await {
                tracing::warn!(error = %e, "Snapshot record failed");
            }
        }

        if self.ledger.is_open(&edge.market_id) {
            tracing::debug!(market_id = %edge.market_id, "Already holding this market");
            self.publish_gauges();
            return;
        }

        if let Err(breach) = self.limits.can_trade(&edge.market_id, edge.stake_usd) {
            tracing::info!(market_id = %edge.market_id, reason = %breach, "Trade blocked by limits");
            self.publish_gauges();
            return;
        }

        match self
            .executor
            .execute_buy(
                &edge.token_id,
                edge.stake_usd,
                edge.side,
                &snapshot,
                edge.price,
            )
            .await
        {
            Ok(confirmation) => self.record_fill(&snapshot, &confirmation).await,
            Err(e) => {
                tracing::error!(market_id = %edge.market_id, error = %e, "Buy failed");
            }
        }

        self.publish_gauges();
    }

    /// Close every open position that no longer belongs to the current
    /// slot's market, at its last marked price
    fn settle_rollover(&self, current_id: &str) {
        let stale: Vec<_> = self
            .ledger
            .open_positions()
            .into_iter()
            .filter(|p| p.market_id != current_id)
            .collect();

        for position in stale {
            let exit_price = position.current_price;
            if let Some(closed) =
                self.ledger
                    .close_position(&position.market_id, exit_price, CloseReason::MarketClosed)
            {
                self.limits
                    .close_position(&closed.market_id, Some(closed.realized_pnl));
                self.metrics
                    .record_pnl(&closed.market_id, closed.realized_pnl);
            }
        }
    }

    async fn record_fill(&self, snapshot: &MarketSnapshot, conf: &Confirmation) {
        // Live fills enter the ledger here; paper fills were recorded by
        // the executor at the reference price
        if !conf.simulated {
            if let Err(e) =
                self.ledger
                    .open_position(&conf.market_id, conf.side, conf.shares(), conf.price)
            {
                tracing::warn!(market_id = %conf.market_id, error = %e, "Local position record failed");
            }
        }

        self.limits.add_position(&conf.market_id, conf.filled_usd);
        self.metrics.record_trade(TradeRecord {
            timestamp: Utc::now(),
            market_id: conf.market_id.clone(),
            side: conf.side,
            amount_usd: conf.filled_usd,
            price: conf.price,
            simulated: conf.simulated,
        });
        telemetry::count_trade(conf.simulated);

        if let Some(store) = &self.store {
            let row = TradeRow {
                timestamp: Utc::now(),
                market_id: conf.market_id.clone(),
                market_question: snapshot.question.clone(),
                side: conf.side,
                amount_usd: conf.filled_usd,
                price: conf.price,
                simulated: conf.simulated,
                tx_hash: conf.tx_hash.clone(),
            };
            if let Err(e) = store.record_trade(&row).await {
                tracing::warn!(error = %e, "Trade record failed");
            }
        }
    }

    fn roll_day_if_needed(&mut self) {
        let today = Utc::now().date_naive();
        if today != self.current_day {
            tracing::info!(date = %today, "New trading day");
            self.limits.reset_daily();
            self.metrics.reset_daily();
            self.current_day = today;
        }
    }

    fn publish_gauges(&self) {
        let limits = self.limits.status();
        let summary = self.ledger.summary();
        let stats = self.metrics.statistics();

        telemetry::set_gauge(GaugeMetric::OpenPositions, limits.active_positions as f64);
        telemetry::set_gauge(
            GaugeMetric::TotalExposure,
            limits.total_exposure_usd.to_f64().unwrap_or_default(),
        );
        telemetry::set_gauge(
            GaugeMetric::RealizedPnl,
            summary.total_realized_pnl.to_f64().unwrap_or_default(),
        );
        telemetry::set_gauge(
            GaugeMetric::UnrealizedPnl,
            self.ledger.unrealized_total().to_f64().unwrap_or_default(),
        );
        telemetry::set_gauge(
            GaugeMetric::DailyLoss,
            stats.daily_loss_usd.to_f64().unwrap_or_default(),
        );
        telemetry::set_gauge(GaugeMetric::LossStreak, f64::from(stats.loss_streak));
        telemetry::set_gauge(GaugeMetric::DailyTrades, limits.daily_trades as f64);
    }

    /// Settle whatever is still open at its last mark and log a final
    /// summary
    pub fn shutdown(&self) {
        for position in self.ledger.open_positions() {
            let exit_price = position.current_price;
            if let Some(closed) =
                self.ledger
                    .close_position(&position.market_id, exit_price, CloseReason::Manual)
            {
                self.limits
                    .close_position(&closed.market_id, Some(closed.realized_pnl));
                self.metrics
                    .record_pnl(&closed.market_id, closed.realized_pnl);
            }
        }

        let summary = self.ledger.summary();
        let stats = self.metrics.statistics();
        tracing::info!(
            closed_positions = summary.closed_positions,
            total_realized_pnl = %summary.total_realized_pnl,
            total_trades = stats.total_trades,
            "Trading engine stopped"
        );
    }
}
