//! Run command implementation

use crate::config::{Config, ExecutionMode};
use crate::engine::TradingEngine;
use crate::exchange::{ClobHttpClient, ClobHttpConfig, ExchangeClient};
use crate::market::{GammaClient, GammaConfig};
use crate::storage::TradeStore;
use clap::Args;
use std::sync::Arc;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Trade without writing history to the database
    #[arg(long)]
    pub no_store: bool,
}

impl RunArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let source = Arc::new(GammaClient::with_config(GammaConfig {
            base_url: config.market.gamma_base_url.clone(),
            clob_base_url: config.market.clob_base_url.clone(),
            timeout: Duration::from_secs(10),
        }));

        let client: Option<Arc<dyn ExchangeClient>> = match config.execution.mode {
            ExecutionMode::Live => Some(Arc::new(ClobHttpClient::from_env(ClobHttpConfig {
                base_url: config.market.clob_base_url.clone(),
                ..ClobHttpConfig::default()
            }))),
            ExecutionMode::Paper => None,
        };

        let store = if self.no_store {
            None
        } else {
            Some(TradeStore::open(&config.storage.db_path).await?)
        };

        let mut engine = TradingEngine::new(config, source, client, store);
        engine.run().await
    }
}
