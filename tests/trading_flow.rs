//! End-to-end trading flow tests
//!
//! Drive the engine through scripted market snapshots and check that the
//! ledger, limits, metrics, and trade history agree afterwards.

use async_trait::async_trait;
use parking_lot::Mutex;
use poly_crowd::config::Config;
use poly_crowd::engine::TradingEngine;
use poly_crowd::exchange::{ExchangeClient, OrderResponse, SignedOrder};
use poly_crowd::market::{MarketSnapshot, MarketSource, PriceSource, Side};
use poly_crowd::risk::CloseReason;
use poly_crowd::storage::TradeStore;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::VecDeque;
use std::sync::Arc;
use uuid::Uuid;

/// Market source that replays a fixed sequence of snapshots
struct ScriptedSource {
    queue: Mutex<VecDeque<MarketSnapshot>>,
}

impl ScriptedSource {
    fn new(snapshots: Vec<MarketSnapshot>) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(snapshots.into()),
        })
    }
}

#[async_trait]
impl MarketSource for ScriptedSource {
    async fn current_market(&self) -> anyhow::Result<Option<MarketSnapshot>> {
        Ok(self.queue.lock().pop_front())
    }
}

/// Exchange stub that fills every order in full
struct FlawlessExchange;

/// Exchange stub whose order endpoint is down
struct UnavailableExchange;

#[async_trait]
impl ExchangeClient for FlawlessExchange {
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

    async fn post_order(&self, _order: &SignedOrder) -> anyhow::Result<OrderResponse> {
        Ok(OrderResponse {
            order_id: Some("0xorder".to_string()),
            tx_hash: Some("0xfill".to_string()),
            filled_amount: None,
        })
    }

    async fn balance(&self) -> anyhow::Result<Decimal> {
        Ok(dec!(50))
    }
}

#[async_trait]
impl ExchangeClient for UnavailableExchange {
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

    async fn post_order(&self, _order: &SignedOrder) -> anyhow::Result<OrderResponse> {
        anyhow::bail!("exchange unavailable")
    }

    async fn balance(&self) -> anyhow::Result<Decimal> {
        Ok(dec!(50))
    }
}

fn snapshot(id: &str, yes: Decimal, no: Decimal, volume: Decimal) -> MarketSnapshot {
    MarketSnapshot {
        id: id.to_string(),
        question: "Bitcoin Up or Down?".to_string(),
        slug: "btc-updown-15m-1767638700".to_string(),
        yes_price: yes,
        no_price: no,
        yes_token_id: Some("tok_yes".to_string()),
        no_token_id: Some("tok_no".to_string()),
        volume,
        price_source: PriceSource::OutcomePrices,
        fetched_at: chrono::Utc::now(),
    }
}

#[tokio::test]
async fn test_paper_flow_across_slots() {
    let source = ScriptedSource::new(vec![
        snapshot("mA", dec!(0.50), dec!(0.50), dec!(1000)),
        snapshot("mA", dec!(0.60), dec!(0.40), dec!(1000)),
        snapshot("mB", dec!(0.50), dec!(0.50), dec!(1000)),
    ]);
    let store = TradeStore::in_memory().await.unwrap();
    let reader = store.clone();

    let mut engine = TradingEngine::new(&Config::default(), source, None, Some(store));

    engine.tick().await; // opens mA: Yes, 1 share at 0.50
    engine.tick().await; // marks mA at 0.60, held market not rebought
    engine.tick().await; // settles mA at the mark, opens mB

    let summary = engine.ledger().summary();
    assert_eq!(summary.open_positions, 1);
    assert_eq!(summary.closed_positions, 1);
    let closed = &summary.recent_closed[0];
    assert_eq!(closed.market_id, "mA");
    assert_eq!(closed.reason, CloseReason::MarketClosed);
    assert_eq!(closed.realized_pnl, dec!(0.10));

    let status = engine.limits().status();
    assert_eq!(status.active_positions, engine.ledger().open_count());
    assert_eq!(status.total_exposure_usd, dec!(0.50));
    assert_eq!(status.daily_trades, 2);

    let stats = engine.metrics().statistics();
    assert_eq!(stats.total_trades, 2);
    assert_eq!(stats.simulated_trades, 2);
    assert_eq!(stats.daily_loss_usd, dec!(0));
    assert_eq!(stats.loss_streak, 0);

    engine.shutdown();

    let summary = engine.ledger().summary();
    assert_eq!(summary.open_positions, 0);
    assert_eq!(summary.closed_positions, 2);
    assert_eq!(summary.total_realized_pnl, dec!(0.10));
    assert_eq!(engine.limits().status().total_exposure_usd, dec!(0));

    // Both fills made it into history, newest first
    let trades = reader.recent_trades(10).await.unwrap();
    assert_eq!(trades.len(), 2);
    assert_eq!(trades[0].market_id, "mB");
    assert_eq!(trades[1].market_id, "mA");
    assert!(trades.iter().all(|t| t.simulated));
    assert!(trades.iter().all(|t| t.amount_usd == dec!(0.50)));
    assert!(trades.iter().all(|t| t.side == "yes"));
}

#[tokio::test]
async fn test_live_fill_enters_ledger_and_history() {
    let mut config = Config::default();
    config.execution.mode = poly_crowd::config::ExecutionMode::Live;

    let source = ScriptedSource::new(vec![snapshot("m77", dec!(0.62), dec!(0.40), dec!(1200))]);
    let store = TradeStore::in_memory().await.unwrap();
    let reader = store.clone();

    let mut engine = TradingEngine::new(
        &config,
        source,
        Some(Arc::new(FlawlessExchange)),
        Some(store),
    );
    engine.tick().await;

    let ledger = engine.ledger();
    assert!(ledger.is_open("m77"));
    let position = &ledger.open_positions()[0];
    assert_eq!(position.side, Side::Yes);
    assert_eq!(position.entry_price, dec!(0.62));

    assert_eq!(engine.limits().status().total_exposure_usd, dec!(0.50));

    let stats = engine.metrics().statistics();
    assert_eq!(stats.live_trades, 1);
    assert_eq!(stats.simulated_trades, 0);

    let trades = reader.recent_trades(10).await.unwrap();
    assert_eq!(trades.len(), 1);
    assert!(!trades[0].simulated);
    assert_eq!(trades[0].tx_hash.as_deref(), Some("0xfill"));
    assert_eq!(trades[0].price, dec!(0.62));
}

#[tokio::test]
async fn test_failed_live_submission_leaves_no_state() {
    let mut config = Config::default();
    config.execution.mode = poly_crowd::config::ExecutionMode::Live;

    let source = ScriptedSource::new(vec![snapshot("m77", dec!(0.62), dec!(0.40), dec!(1200))]);
    let store = TradeStore::in_memory().await.unwrap();
    let reader = store.clone();

    let mut engine = TradingEngine::new(
        &config,
        source,
        Some(Arc::new(UnavailableExchange)),
        Some(store),
    );
    engine.tick().await; // retries through the backoff schedule, then gives up

    assert_eq!(engine.ledger().open_count(), 0);
    let status = engine.limits().status();
    assert_eq!(status.active_positions, 0);
    assert_eq!(status.daily_trades, 0);
    assert_eq!(engine.metrics().statistics().total_trades, 0);
    assert!(reader.recent_trades(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_production_profile_from_toml() {
    let toml = r#"
        [strategy]
        stake_usd = 2.50
        min_threshold = 0.70
        max_threshold = 0.98
        min_volume = 10000
        vig_loose = { low = 0.95, high = 1.05 }

        [execution]
        mode = "paper"
    "#;
    let config: Config = toml::from_str(toml).unwrap();
    assert!(config.validate().is_empty());

    let source = ScriptedSource::new(vec![
        // Too thin for the production volume floor
        snapshot("slot1", dec!(0.74), dec!(0.28), dec!(1200)),
        snapshot("slot2", dec!(0.74), dec!(0.28), dec!(12000)),
    ]);
    let mut engine = TradingEngine::new(&config, source, None, None);

    engine.tick().await;
    assert_eq!(engine.limits().status().daily_trades, 0);

    engine.tick().await;
    assert!(engine.ledger().is_open("slot2"));
    assert_eq!(engine.limits().status().total_exposure_usd, dec!(2.50));
    let position = &engine.ledger().open_positions()[0];
    assert_eq!(position.side, Side::Yes);
    assert_eq!(position.entry_price, dec!(0.74));
}
