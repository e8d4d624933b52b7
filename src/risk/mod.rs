//! Risk management module
//!
//! Position limits, the position ledger, and trade metrics. Each component
//! owns one lock and is shared by handle; none holds its lock across an
//! await.

mod ledger;
mod limits;
mod metrics;

pub use ledger::{
    CloseReason, ClosedPosition, LedgerError, LedgerSummary, Position, PositionLedger,
    PositionMark,
};
pub use limits::{LimitBreach, LimitsStatus, PositionLimits};
pub use metrics::{MetricsStatistics, TradeMetrics, TradeRecord};
