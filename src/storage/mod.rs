//! Trade history persistence
//!
//! SQLite store for executed trades and the market snapshots that produced
//! them. Writes are best-effort from the engine's point of view: a store
//! failure is logged and the tick continues.

use crate::market::{MarketSnapshot, Side};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;

/// One executed trade, as handed to the store
#[derive(Debug, Clone)]
pub struct TradeRow {
    pub timestamp: DateTime<Utc>,
    pub market_id: String,
    pub market_question: String,
    pub side: Side,
    pub amount_usd: Decimal,
    pub price: Decimal,
    pub simulated: bool,
    pub tx_hash: Option<String>,
}

/// A trade read back for display
#[derive(Debug, Clone)]
pub struct StoredTrade {
    pub timestamp: String,
    pub market_id: String,
    pub market_question: String,
    pub side: String,
    pub amount_usd: Decimal,
    pub price: Decimal,
    pub simulated: bool,
    pub tx_hash: Option<String>,
}

/// Aggregate counts over a trailing window of days
#[derive(Debug, Clone, Default)]
pub struct TradeStats {
    pub total: i64,
    pub simulated: i64,
    pub live: i64,
    pub avg_price: Decimal,
    pub total_volume_usd: Decimal,
}

/// Persistent trade and snapshot history
#[derive(Clone)]
pub struct TradeStore {
    pool: SqlitePool,
}

impl TradeStore {
    /// Open (or create) the database at `path`
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePool::connect_with(options).await?;
        let store = Self { pool };
        store.init_schema().await?;
        tracing::info!(path = %path.as_ref().display(), "Trade database ready");
        Ok(store)
    }

    /// Private in-memory database. Single connection, so the schema
    /// survives for the pool's lifetime.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trades (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                market_id TEXT NOT NULL,
                market_question TEXT,
                side TEXT NOT NULL,
                amount_usd REAL NOT NULL,
                price REAL NOT NULL,
                simulated INTEGER NOT NULL,
                tx_hash TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS market_snapshots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                market_id TEXT NOT NULL,
                market_data TEXT NOT NULL,
                yes_price REAL NOT NULL,
                no_price REAL NOT NULL,
                vig REAL NOT NULL,
                volume REAL NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_trades_timestamp ON trades(timestamp)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn record_trade(&self, row: &TradeRow) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO trades
            (timestamp, market_id, market_question, side, amount_usd, price, simulated, tx_hash)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(row.timestamp.to_rfc3339())
        .bind(&row.market_id)
        .bind(&row.market_question)
        .bind(row.side.as_str())
        .bind(row.amount_usd.to_f64().unwrap_or_default())
        .bind(row.price.to_f64().unwrap_or_default())
        .bind(i64::from(row.simulated))
        .bind(&row.tx_hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Record the market state that drove a decision
    pub async fn record_snapshot(&self, snapshot: &MarketSnapshot) -> Result<()> {
        let market_data = serde_json::to_string(snapshot)?;
        sqlx::query(
            r#"
            INSERT INTO market_snapshots
            (timestamp, market_id, market_data, yes_price, no_price, vig, volume)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(snapshot.fetched_at.to_rfc3339())
        .bind(&snapshot.id)
        .bind(market_data)
        .bind(snapshot.yes_price.to_f64().unwrap_or_default())
        .bind(snapshot.no_price.to_f64().unwrap_or_default())
        .bind(snapshot.vig().to_f64().unwrap_or_default())
        .bind(snapshot.volume.to_f64().unwrap_or_default())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn recent_trades(&self, limit: i64) -> Result<Vec<StoredTrade>> {
        type Row = (
            String,
            String,
            Option<String>,
            String,
            f64,
            f64,
            i64,
            Option<String>,
        );
        let rows = sqlx::query_as::<_, Row>(
            r#"
            SELECT timestamp, market_id, market_question, side, amount_usd, price, simulated, tx_hash
            FROM trades
            ORDER BY timestamp DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(timestamp, market_id, question, side, amount_usd, price, simulated, tx_hash)| {
                    StoredTrade {
                        timestamp,
                        market_id,
                        market_question: question.unwrap_or_default(),
                        side,
                        amount_usd: Decimal::from_f64(amount_usd).unwrap_or_default(),
                        price: Decimal::from_f64(price).unwrap_or_default(),
                        simulated: simulated != 0,
                        tx_hash,
                    }
                },
            )
            .collect())
    }

    /// Aggregate stats over the trailing `days` days
    pub async fn trade_stats(&self, days: i64) -> Result<TradeStats> {
        let (total, simulated, live, avg_price, total_volume): (
            i64,
            Option<i64>,
            Option<i64>,
            Option<f64>,
            Option<f64>,
        ) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                SUM(CASE WHEN simulated = 1 THEN 1 ELSE 0 END),
                SUM(CASE WHEN simulated = 0 THEN 1 ELSE 0 END),
                AVG(price),
                SUM(amount_usd)
            FROM trades
            WHERE timestamp >= datetime('now', '-' || ?1 || ' days')
            "#,
        )
        .bind(days)
        .fetch_one(&self.pool)
        .await?;

        Ok(TradeStats {
            total,
            simulated: simulated.unwrap_or(0),
            live: live.unwrap_or(0),
            avg_price: avg_price.and_then(Decimal::from_f64).unwrap_or_default(),
            total_volume_usd: total_volume.and_then(Decimal::from_f64).unwrap_or_default(),
        })
    }
}
