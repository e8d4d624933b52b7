//! One-shot market scan

use crate::config::Config;
use crate::market::{slot, GammaClient, GammaConfig, MarketSource};
use crate::signal::{CrowdStrategy, ScanOutcome, SkipReason};
use chrono::Utc;
use clap::Args;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Print the snapshot as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

impl ScanArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let source = GammaClient::with_config(GammaConfig {
            base_url: config.market.gamma_base_url.clone(),
            clob_base_url: config.market.clob_base_url.clone(),
            timeout: Duration::from_secs(10),
        });

        let Some(snapshot) = source.current_market().await? else {
            println!("No market listed for the current slot");
            return Ok(());
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            return Ok(());
        }

        println!("Market: {}", snapshot.question);
        println!(
            "Yes: {:.4} | No: {:.4} | Vig: {:.3} | Volume: ${}",
            snapshot.yes_price,
            snapshot.no_price,
            snapshot.vig(),
            snapshot.volume
        );
        println!(
            "Time left in slot: {}s",
            slot::seconds_remaining(Utc::now())
        );

        match CrowdStrategy::new(config.strategy.clone()).scan(&snapshot) {
            ScanOutcome::Edge(edge) => {
                println!(
                    "Edge: buy {} at {:.4} for ${}",
                    edge.side, edge.price, edge.stake_usd
                );
            }
            ScanOutcome::Skip(reason) => {
                let text = match reason {
                    SkipReason::LowVolume(volume) => format!("volume ${volume} below minimum"),
                    SkipReason::VigOutOfRange(vig) => format!("vig {vig:.3} out of range"),
                    SkipReason::NoLopsidedSide => "no lopsided side".to_string(),
                    SkipReason::MissingTokenId(side) => format!("missing token id for {side}"),
                };
                println!("No edge: {text}");
            }
        }

        Ok(())
    }
}
