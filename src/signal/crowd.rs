//! Crowd-follower scan
//!
//! Joins the side the market already favors instead of pricing a fair
//! value. A side is a candidate when its price sits inside the configured
//! favorite band; the strongest candidate wins.

use crate::config::StrategyConfig;
use crate::market::{MarketSnapshot, Side};
use rust_decimal::Decimal;
use serde::Serialize;
use std::cmp::Reverse;

/// Result of scanning one market snapshot
#[derive(Debug, Clone)]
pub enum ScanOutcome {
    /// A side worth buying
    Edge(Edge),
    /// Nothing to do this tick
    Skip(SkipReason),
}

/// Reason a snapshot produced no trade
#[derive(Debug, Clone, Serialize)]
pub enum SkipReason {
    /// Traded volume below the minimum
    LowVolume(Decimal),
    /// Yes+no price sum outside the acceptance band
    VigOutOfRange(Decimal),
    /// Neither side's price is inside the favorite band
    NoLopsidedSide,
    /// The chosen side has no token id to trade
    MissingTokenId(Side),
}

/// A tradeable candidate produced by the scan
#[derive(Debug, Clone, Serialize)]
pub struct Edge {
    pub market_id: String,
    pub side: Side,
    pub price: Decimal,
    pub token_id: String,
    pub stake_usd: Decimal,
}

/// Scans snapshots for a lopsided side to follow
pub struct CrowdStrategy {
    config: StrategyConfig,
}

impl CrowdStrategy {
    pub fn new(config: StrategyConfig) -> Self {
        Self { config }
    }

    /// Scan a snapshot. Checks run cheapest-first: volume, vig, then the
    /// favorite band.
    pub fn scan(&self, snapshot: &MarketSnapshot) -> ScanOutcome {
        if snapshot.volume < self.config.min_volume {
            tracing::debug!(
                market_id = %snapshot.id,
                volume = %snapshot.volume,
                min_volume = %self.config.min_volume,
                "Volume below minimum"
            );
            return ScanOutcome::Skip(SkipReason::LowVolume(snapshot.volume));
        }

        let vig = snapshot.vig();
        tracing::debug!(
            market_id = %snapshot.id,
            yes_price = %snapshot.yes_price,
            no_price = %snapshot.no_price,
            vig = %vig,
            "Scanning market"
        );

        let band = self.config.vig_band(snapshot.volume);
        if !band.contains(vig) {
            return ScanOutcome::Skip(SkipReason::VigOutOfRange(vig));
        }

        let mut candidates: Vec<(Side, Decimal)> = Vec::with_capacity(2);
        for side in [Side::Yes, Side::No] {
            let price = snapshot.price_for(side);
            if price >= self.config.min_threshold && price <= self.config.max_threshold {
                candidates.push((side, price));
            }
        }

        // Highest price wins; the configured side breaks exact ties
        candidates.sort_by_key(|(side, price)| (Reverse(*price), *side != self.config.preferred_side));
        let Some(&(side, price)) = candidates.first() else {
            return ScanOutcome::Skip(SkipReason::NoLopsidedSide);
        };

        let Some(token_id) = snapshot.token_for(side) else {
            tracing::info!(
                market_id = %snapshot.id,
                side = %side,
                "Missing token id for selected side"
            );
            return ScanOutcome::Skip(SkipReason::MissingTokenId(side));
        };

        tracing::info!(
            market_id = %snapshot.id,
            side = %side,
            price = %price,
            stake_usd = %self.config.stake_usd,
            "Edge found"
        );

        ScanOutcome::Edge(Edge {
            market_id: snapshot.id.clone(),
            side,
            price,
            token_id: token_id.to_string(),
            stake_usd: self.config.stake_usd,
        })
    }
}
