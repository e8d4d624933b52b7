//! poly-crowd: Crowd-following trading bot for Polymarket 15-minute BTC
//! up/down markets
//!
//! This library provides the core components for:
//! - Market discovery via Gamma API with order book price fallback
//! - Crowd-follower signal scanning
//! - Paper/live order execution with bounded retries
//! - Position ledger, risk limits, and trade metrics
//! - SQLite trade history
//! - Logging and Prometheus metrics

pub mod cli;
pub mod config;
pub mod engine;
pub mod exchange;
pub mod execution;
pub mod market;
pub mod risk;
pub mod signal;
pub mod storage;
pub mod telemetry;
