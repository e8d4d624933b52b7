//! Status command implementation

use crate::config::Config;
use crate::storage::TradeStore;
use clap::Args;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// How many recent trades to list
    #[arg(long, default_value = "10")]
    pub limit: i64,

    /// Stats window in days
    #[arg(long, default_value = "1")]
    pub days: i64,
}

impl StatusArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let store = TradeStore::open(&config.storage.db_path).await?;

        let stats = store.trade_stats(self.days).await?;
        println!("Last {} day(s):", self.days);
        println!(
            "  {} trades ({} paper, {} live)",
            stats.total, stats.simulated, stats.live
        );
        if stats.total > 0 {
            println!("  Average price: {:.4}", stats.avg_price);
            println!("  Total volume: ${:.2}", stats.total_volume_usd);
        }

        let trades = store.recent_trades(self.limit).await?;
        if trades.is_empty() {
            println!("No trades recorded yet");
            return Ok(());
        }

        println!("Recent trades:");
        for trade in trades {
            let mode = if trade.simulated { "paper" } else { "live" };
            println!(
                "  {} {} {} ${:.2} at {:.4} [{}]",
                trade.timestamp, trade.market_id, trade.side, trade.amount_usd, trade.price, mode
            );
        }

        Ok(())
    }
}
