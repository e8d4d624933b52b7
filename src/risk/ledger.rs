//! Position ledger
//!
//! Market-id-keyed registry of open positions with mark-to-market and
//! close-out accounting. P&L sign convention: a Yes position profits when
//! the price rises, a No position profits when it falls.

use crate::market::{MarketSnapshot, Side};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Closed positions kept in the summary
const RECENT_CLOSED_WINDOW: usize = 10;

/// An open position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// Market the position is in, the ledger key
    pub market_id: String,
    /// Held side
    pub side: Side,
    /// Token count
    pub shares: Decimal,
    /// Price paid per share
    pub entry_price: Decimal,
    /// Last marked price
    pub current_price: Decimal,
    /// Entry timestamp
    pub entry_time: DateTime<Utc>,
}

impl Position {
    /// Unrealized P&L at the last mark
    pub fn unrealized_pnl(&self) -> Decimal {
        signed_pnl(self.side, self.entry_price, self.current_price, self.shares)
    }
}

/// A closed position with realized P&L
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedPosition {
    pub market_id: String,
    pub side: Side,
    pub shares: Decimal,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub realized_pnl: Decimal,
    /// Realized P&L as a percentage of entry notional
    pub realized_pct: Decimal,
    pub reason: CloseReason,
}

/// Why a position was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// The 15-minute window ended
    MarketClosed,
    /// Operator-initiated close, including shutdown
    Manual,
    /// Risk control close
    RiskStop,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CloseReason::MarketClosed => "market_closed",
            CloseReason::Manual => "manual",
            CloseReason::RiskStop => "risk_stop",
        };
        f.write_str(s)
    }
}

/// Mark-to-market result for one position
#[derive(Debug, Clone)]
pub struct PositionMark {
    pub market_id: String,
    pub side: Side,
    pub shares: Decimal,
    pub entry_price: Decimal,
    pub current_price: Decimal,
    pub unrealized_pnl: Decimal,
    pub unrealized_pct: Decimal,
}

/// P&L summary across open and closed positions
#[derive(Debug, Clone)]
pub struct LedgerSummary {
    pub open_positions: usize,
    pub closed_positions: usize,
    pub total_realized_pnl: Decimal,
    /// Most recent closes, newest last, bounded window
    pub recent_closed: Vec<ClosedPosition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("position already open for market {0}")]
    AlreadyOpen(String),
}

/// Thread-safe registry of positions
pub struct PositionLedger {
    inner: Mutex<LedgerInner>,
}

struct LedgerInner {
    open: HashMap<String, Position>,
    closed: Vec<ClosedPosition>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(LedgerInner {
                open: HashMap::new(),
                closed: Vec::new(),
            }),
        }
    }

    /// Record a new position. A market with an open position is rejected;
    /// the first entry stands.
    pub fn open_position(
        &self,
        market_id: &str,
        side: Side,
        shares: Decimal,
        entry_price: Decimal,
    ) -> Result<(), LedgerError> {
        let mut inner = self.inner.lock();

        if inner.open.contains_key(market_id) {
            return Err(LedgerError::AlreadyOpen(market_id.to_string()));
        }

        inner.open.insert(
            market_id.to_string(),
            Position {
                market_id: market_id.to_string(),
                side,
                shares,
                entry_price,
                current_price: entry_price,
                entry_time: Utc::now(),
            },
        );

        tracing::info!(
            market_id = %market_id,
            side = %side,
            shares = %shares,
            entry_price = %entry_price,
            "Position opened"
        );

        Ok(())
    }

    /// Mark a position to a new price and return its unrealized P&L.
    /// Unknown markets are a strict no-op: nothing is created, `None` is
    /// returned.
    pub fn update_price(&self, market_id: &str, current_price: Decimal) -> Option<PositionMark> {
        let mut inner = self.inner.lock();

        let pos = inner.open.get_mut(market_id)?;
        pos.current_price = current_price;

        let unrealized_pnl = signed_pnl(pos.side, pos.entry_price, current_price, pos.shares);

        Some(PositionMark {
            market_id: pos.market_id.clone(),
            side: pos.side,
            shares: pos.shares,
            entry_price: pos.entry_price,
            current_price,
            unrealized_pnl,
            unrealized_pct: pct_of_entry(unrealized_pnl, pos.entry_price, pos.shares),
        })
    }

    /// Mark the position held in `snapshot`'s market, if any, using the
    /// price of the held side
    pub fn update_from_market(&self, snapshot: &MarketSnapshot) {
        let side = {
            let inner = self.inner.lock();
            match inner.open.get(&snapshot.id) {
                Some(pos) => pos.side,
                None => return,
            }
        };
        self.update_price(&snapshot.id, snapshot.price_for(side));
    }

    /// Close a position and realize its P&L. `None` when no position is
    /// open for the market, which is an expected outcome, not a fault.
    pub fn close_position(
        &self,
        market_id: &str,
        exit_price: Decimal,
        reason: CloseReason,
    ) -> Option<ClosedPosition> {
        let mut inner = self.inner.lock();

        let pos = inner.open.remove(market_id)?;
        let realized_pnl = signed_pnl(pos.side, pos.entry_price, exit_price, pos.shares);

        let closed = ClosedPosition {
            market_id: pos.market_id,
            side: pos.side,
            shares: pos.shares,
            entry_price: pos.entry_price,
            exit_price,
            entry_time: pos.entry_time,
            exit_time: Utc::now(),
            realized_pnl,
            realized_pct: pct_of_entry(realized_pnl, pos.entry_price, pos.shares),
            reason,
        };

        inner.closed.push(closed.clone());

        tracing::info!(
            market_id = %market_id,
            side = %closed.side,
            shares = %closed.shares,
            exit_price = %exit_price,
            realized_pnl = %realized_pnl,
            reason = %reason,
            "Position closed"
        );

        Some(closed)
    }

    pub fn is_open(&self, market_id: &str) -> bool {
        self.inner.lock().open.contains_key(market_id)
    }

    pub fn open_count(&self) -> usize {
        self.inner.lock().open.len()
    }

    /// Clones of all open positions
    pub fn open_positions(&self) -> Vec<Position> {
        self.inner.lock().open.values().cloned().collect()
    }

    /// Sum of unrealized P&L across open positions
    pub fn unrealized_total(&self) -> Decimal {
        self.inner
            .lock()
            .open
            .values()
            .map(Position::unrealized_pnl)
            .sum()
    }

    pub fn summary(&self) -> LedgerSummary {
        let inner = self.inner.lock();
        let total_realized_pnl = inner.closed.iter().map(|p| p.realized_pnl).sum();
        let start = inner.closed.len().saturating_sub(RECENT_CLOSED_WINDOW);

        LedgerSummary {
            open_positions: inner.open.len(),
            closed_positions: inner.closed.len(),
            total_realized_pnl,
            recent_closed: inner.closed[start..].to_vec(),
        }
    }
}

impl Default for PositionLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn signed_pnl(side: Side, entry: Decimal, current: Decimal, shares: Decimal) -> Decimal {
    match side {
        Side::Yes => (current - entry) * shares,
        Side::No => (entry - current) * shares,
    }
}

/// P&L as a percentage of entry notional, zero when the notional is zero
fn pct_of_entry(pnl: Decimal, entry_price: Decimal, shares: Decimal) -> Decimal {
    let basis = entry_price * shares;
    if basis > Decimal::ZERO {
        pnl / basis * dec!(100)
    } else {
        Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::PriceSource;

    fn snapshot(id: &str, yes: Decimal, no: Decimal) -> MarketSnapshot {
        MarketSnapshot {
            id: id.to_string(),
            question: "Bitcoin Up or Down?".to_string(),
            slug: "btc-updown-15m-1767638700".to_string(),
            yes_price: yes,
            no_price: no,
            yes_token_id: Some("tok_yes".to_string()),
            no_token_id: Some("tok_no".to_string()),
            volume: dec!(1000),
            price_source: PriceSource::OutcomePrices,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_open_position() {
        let ledger = PositionLedger::new();
        ledger
            .open_position("m1", Side::Yes, dec!(10), dec!(0.40))
            .unwrap();

        assert!(ledger.is_open("m1"));
        assert_eq!(ledger.open_count(), 1);

        let positions = ledger.open_positions();
        assert_eq!(positions[0].entry_price, dec!(0.40));
        // Mark starts at entry
        assert_eq!(positions[0].current_price, dec!(0.40));
        assert_eq!(positions[0].unrealized_pnl(), dec!(0));
    }

    #[test]
    fn test_duplicate_open_rejected() {
        let ledger = PositionLedger::new();
        ledger
            .open_position("m1", Side::Yes, dec!(10), dec!(0.40))
            .unwrap();

        let err = ledger
            .open_position("m1", Side::No, dec!(5), dec!(0.60))
            .unwrap_err();
        assert_eq!(err, LedgerError::AlreadyOpen("m1".to_string()));

        // First entry stands
        let positions = ledger.open_positions();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].side, Side::Yes);
        assert_eq!(positions[0].shares, dec!(10));
    }

    #[test]
    fn test_yes_pnl_sign() {
        let ledger = PositionLedger::new();
        ledger
            .open_position("m1", Side::Yes, dec!(10), dec!(0.40))
            .unwrap();

        // Yes at 0.40 -> 0.60 on 10 shares = +2.00
        let mark = ledger.update_price("m1", dec!(0.60)).unwrap();
        assert_eq!(mark.unrealized_pnl, dec!(2.00));
        assert_eq!(mark.unrealized_pct, dec!(50));
    }

    #[test]
    fn test_no_pnl_sign() {
        let ledger = PositionLedger::new();
        ledger
            .open_position("m1", Side::No, dec!(10), dec!(0.40))
            .unwrap();

        // Same price move, opposite sign for No
        let mark = ledger.update_price("m1", dec!(0.60)).unwrap();
        assert_eq!(mark.unrealized_pnl, dec!(-2.00));
    }

    #[test]
    fn test_update_price_unknown_market_is_noop() {
        let ledger = PositionLedger::new();
        assert!(ledger.update_price("ghost", dec!(0.50)).is_none());
        // Nothing was created
        assert_eq!(ledger.open_count(), 0);
    }

    #[test]
    fn test_update_from_market_uses_held_side_price() {
        let ledger = PositionLedger::new();
        ledger
            .open_position("m1", Side::No, dec!(10), dec!(0.50))
            .unwrap();

        ledger.update_from_market(&snapshot("m1", dec!(0.70), dec!(0.32)));

        let positions = ledger.open_positions();
        assert_eq!(positions[0].current_price, dec!(0.32));
        // No side: (0.50 - 0.32) * 10 = 1.80
        assert_eq!(positions[0].unrealized_pnl(), dec!(1.80));
    }

    #[test]
    fn test_update_from_market_other_market_is_noop() {
        let ledger = PositionLedger::new();
        ledger
            .open_position("m1", Side::Yes, dec!(10), dec!(0.50))
            .unwrap();

        ledger.update_from_market(&snapshot("m2", dec!(0.90), dec!(0.12)));

        let positions = ledger.open_positions();
        assert_eq!(positions[0].current_price, dec!(0.50));
        assert_eq!(ledger.open_count(), 1);
    }

    #[test]
    fn test_close_position_realizes_pnl() {
        let ledger = PositionLedger::new();
        ledger
            .open_position("m1", Side::Yes, dec!(10), dec!(0.40))
            .unwrap();

        let closed = ledger
            .close_position("m1", dec!(0.60), CloseReason::MarketClosed)
            .unwrap();

        assert_eq!(closed.realized_pnl, dec!(2.00));
        assert_eq!(closed.realized_pct, dec!(50));
        assert_eq!(closed.reason, CloseReason::MarketClosed);
        assert!(!ledger.is_open("m1"));
    }

    #[test]
    fn test_close_missing_position_returns_none() {
        let ledger = PositionLedger::new();
        assert!(ledger
            .close_position("ghost", dec!(0.50), CloseReason::Manual)
            .is_none());
    }

    #[test]
    fn test_market_key_reusable_after_close() {
        let ledger = PositionLedger::new();
        ledger
            .open_position("m1", Side::Yes, dec!(10), dec!(0.40))
            .unwrap();
        ledger.close_position("m1", dec!(0.55), CloseReason::MarketClosed);

        // Same key can host the next slot's position
        assert!(ledger
            .open_position("m1", Side::No, dec!(4), dec!(0.70))
            .is_ok());
    }

    #[test]
    fn test_summary_totals_and_window() {
        let ledger = PositionLedger::new();

        for i in 0..13 {
            let id = format!("m{}", i);
            ledger
                .open_position(&id, Side::Yes, dec!(10), dec!(0.40))
                .unwrap();
            ledger.close_position(&id, dec!(0.50), CloseReason::MarketClosed);
        }
        ledger
            .open_position("open1", Side::Yes, dec!(1), dec!(0.50))
            .unwrap();

        let summary = ledger.summary();
        assert_eq!(summary.open_positions, 1);
        assert_eq!(summary.closed_positions, 13);
        // Each close realized (0.50 - 0.40) * 10 = 1.00
        assert_eq!(summary.total_realized_pnl, dec!(13.00));
        // Window stays bounded while the total keeps counting
        assert_eq!(summary.recent_closed.len(), RECENT_CLOSED_WINDOW);
        assert_eq!(summary.recent_closed.last().unwrap().market_id, "m12");
    }

    #[test]
    fn test_unrealized_total() {
        let ledger = PositionLedger::new();
        ledger
            .open_position("m1", Side::Yes, dec!(10), dec!(0.40))
            .unwrap();
        ledger
            .open_position("m2", Side::No, dec!(5), dec!(0.50))
            .unwrap();

        ledger.update_price("m1", dec!(0.50)); // +1.00
        ledger.update_price("m2", dec!(0.40)); // +0.50

        assert_eq!(ledger.unrealized_total(), dec!(1.50));
    }

    #[test]
    fn test_pct_of_entry_zero_basis() {
        assert_eq!(pct_of_entry(dec!(1), dec!(0), dec!(10)), dec!(0));
        assert_eq!(pct_of_entry(dec!(1), dec!(0.5), dec!(0)), dec!(0));
    }

    #[test]
    fn test_close_reason_display() {
        assert_eq!(CloseReason::MarketClosed.to_string(), "market_closed");
        assert_eq!(CloseReason::Manual.to_string(), "manual");
        assert_eq!(CloseReason::RiskStop.to_string(), "risk_stop");
    }
}
