//! Configuration types for poly-crowd

use crate::market::{Side, CLOB_API_URL, GAMMA_API_URL};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::PathBuf;

/// Root configuration structure
///
/// Every section has development defaults, so an empty file is a valid
/// paper-trading configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub market: MarketConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Market discovery configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    /// Gamma API base URL
    #[serde(default = "default_gamma_base_url")]
    pub gamma_base_url: String,

    /// CLOB API base URL
    #[serde(default = "default_clob_base_url")]
    pub clob_base_url: String,

    /// Seconds between scans of the current market
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,
}

fn default_gamma_base_url() -> String {
    GAMMA_API_URL.to_string()
}
fn default_clob_base_url() -> String {
    CLOB_API_URL.to_string()
}
fn default_scan_interval_secs() -> u64 {
    10
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            gamma_base_url: default_gamma_base_url(),
            clob_base_url: default_clob_base_url(),
            scan_interval_secs: 10,
        }
    }
}

/// Crowd-follower strategy configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StrategyConfig {
    /// Fixed dollar stake per trade
    #[serde(default = "default_stake_usd")]
    pub stake_usd: Decimal,

    /// Lower bound of the favorite-price band
    #[serde(default = "default_min_threshold")]
    pub min_threshold: Decimal,

    /// Upper bound of the favorite-price band
    #[serde(default = "default_max_threshold")]
    pub max_threshold: Decimal,

    /// Side to prefer when both sides tie on price
    #[serde(default = "default_preferred_side")]
    pub preferred_side: Side,

    /// Minimum market volume in dollars before trading
    #[serde(default = "default_min_volume")]
    pub min_volume: Decimal,

    /// Volume at which the tight vig band applies
    #[serde(default = "default_high_volume_threshold")]
    pub high_volume_threshold: Decimal,

    /// Vig band for high-volume markets
    #[serde(default = "default_vig_tight")]
    pub vig_tight: VigBand,

    /// Vig band for low-volume markets
    #[serde(default = "default_vig_loose")]
    pub vig_loose: VigBand,
}

/// Inclusive acceptance band for the yes+no price sum
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct VigBand {
    pub low: Decimal,
    pub high: Decimal,
}

impl VigBand {
    pub fn contains(&self, vig: Decimal) -> bool {
        self.low <= vig && vig <= self.high
    }
}

fn default_stake_usd() -> Decimal {
    Decimal::new(50, 2) // 0.50
}
fn default_min_threshold() -> Decimal {
    Decimal::new(30, 2) // 0.30
}
fn default_max_threshold() -> Decimal {
    Decimal::new(90, 2) // 0.90
}
fn default_preferred_side() -> Side {
    Side::Yes
}
fn default_min_volume() -> Decimal {
    Decimal::new(500, 0)
}
fn default_high_volume_threshold() -> Decimal {
    Decimal::new(10000, 0)
}
fn default_vig_tight() -> VigBand {
    VigBand {
        low: Decimal::new(98, 2),  // 0.98
        high: Decimal::new(102, 2), // 1.02
    }
}
fn default_vig_loose() -> VigBand {
    VigBand {
        low: Decimal::new(90, 2),  // 0.90
        high: Decimal::new(110, 2), // 1.10
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            stake_usd: default_stake_usd(),
            min_threshold: default_min_threshold(),
            max_threshold: default_max_threshold(),
            preferred_side: Side::Yes,
            min_volume: default_min_volume(),
            high_volume_threshold: default_high_volume_threshold(),
            vig_tight: default_vig_tight(),
            vig_loose: default_vig_loose(),
        }
    }
}

impl StrategyConfig {
    /// Vig band appropriate for a market's volume. High-volume books price
    /// tightly; thin books get the loose band.
    pub fn vig_band(&self, volume: Decimal) -> VigBand {
        if volume >= self.high_volume_threshold {
            self.vig_tight
        } else {
            self.vig_loose
        }
    }
}

/// Risk limit configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfig {
    /// Maximum notional per position in dollars
    #[serde(default = "default_max_position_usd")]
    pub max_position_usd: Decimal,

    /// Maximum number of distinct markets held at once
    #[serde(default = "default_max_concurrent_positions")]
    pub max_concurrent_positions: usize,

    /// Maximum trades per day
    #[serde(default = "default_max_daily_trades")]
    pub max_daily_trades: usize,

    /// Daily loss level that triggers the advisory alert
    #[serde(default = "default_daily_loss_limit_usd")]
    pub daily_loss_limit_usd: Decimal,

    /// Consecutive losses that trigger the advisory alert
    #[serde(default = "default_loss_streak_alert")]
    pub loss_streak_alert: u32,
}

fn default_max_position_usd() -> Decimal {
    Decimal::new(25, 0)
}
fn default_max_concurrent_positions() -> usize {
    20
}
fn default_max_daily_trades() -> usize {
    100
}
fn default_daily_loss_limit_usd() -> Decimal {
    Decimal::new(200, 0)
}
fn default_loss_streak_alert() -> u32 {
    3
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_position_usd: default_max_position_usd(),
            max_concurrent_positions: 20,
            max_daily_trades: 100,
            daily_loss_limit_usd: default_daily_loss_limit_usd(),
            loss_streak_alert: 3,
        }
    }
}

/// Execution engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    /// Paper trading or live order submission
    #[serde(default)]
    pub mode: ExecutionMode,

    /// Minimum collateral balance required before a live order
    #[serde(default = "default_min_balance_usd")]
    pub min_balance_usd: Decimal,
}

fn default_min_balance_usd() -> Decimal {
    Decimal::ONE
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Paper,
            min_balance_usd: Decimal::ONE,
        }
    }
}

/// Execution mode: paper trading or live
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Paper,
    Live,
}

/// Trade history storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// SQLite database path
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("bot_history.db")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Port for the Prometheus exporter; disabled when absent
    #[serde(default)]
    pub metrics_port: Option<u16>,

    /// Default log level when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Optional plain-text log file
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_port: None,
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Validate the configuration, collecting every violation rather than
    /// stopping at the first
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let s = &self.strategy;
        if s.stake_usd <= Decimal::ZERO {
            errors.push("strategy.stake_usd must be > 0".to_string());
        }
        if s.min_threshold < Decimal::ZERO || s.min_threshold > Decimal::ONE {
            errors.push("strategy.min_threshold must be between 0.0 and 1.0".to_string());
        }
        if s.max_threshold < Decimal::ZERO || s.max_threshold > Decimal::ONE {
            errors.push("strategy.max_threshold must be between 0.0 and 1.0".to_string());
        }
        if s.min_threshold > s.max_threshold {
            errors.push("strategy.min_threshold cannot be greater than max_threshold".to_string());
        }
        if s.min_volume < Decimal::ZERO {
            errors.push("strategy.min_volume must be non-negative".to_string());
        }
        for (name, band) in [("vig_tight", s.vig_tight), ("vig_loose", s.vig_loose)] {
            if band.low > band.high {
                errors.push(format!("strategy.{}: low cannot exceed high", name));
            }
        }

        let r = &self.risk;
        if r.max_position_usd <= Decimal::ZERO {
            errors.push("risk.max_position_usd must be > 0".to_string());
        }
        if r.max_concurrent_positions == 0 {
            errors.push("risk.max_concurrent_positions must be > 0".to_string());
        }
        if r.max_daily_trades == 0 {
            errors.push("risk.max_daily_trades must be > 0".to_string());
        }
        if r.daily_loss_limit_usd <= Decimal::ZERO {
            errors.push("risk.daily_loss_limit_usd must be > 0".to_string());
        }

        if self.execution.min_balance_usd < Decimal::ZERO {
            errors.push("execution.min_balance_usd must be >= 0".to_string());
        }

        if self.market.scan_interval_secs == 0 {
            errors.push("market.scan_interval_secs must be > 0".to_string());
        }

        errors
    }
}
