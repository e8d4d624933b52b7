//! 15-minute slot arithmetic
//!
//! Polymarket's BTC up/down markets run in fixed 15-minute windows whose
//! start times fall on quarter-hour boundaries. Each window has a
//! deterministic event slug derived from the slot's unix start time, so the
//! current market can be looked up directly without searching.

use chrono::{DateTime, Utc};

/// Length of one market window in seconds
pub const SLOT_DURATION_SECS: i64 = 900;

/// Slug prefix for the 15-minute BTC up/down series
pub const SLOT_SLUG_PREFIX: &str = "btc-updown-15m";

/// Unix start time of the slot containing `now`
pub fn slot_start(now: DateTime<Utc>) -> i64 {
    let ts = now.timestamp();
    ts - ts.rem_euclid(SLOT_DURATION_SECS)
}

/// Unix end time of the slot starting at `slot_unix`
pub fn slot_end(slot_unix: i64) -> i64 {
    slot_unix + SLOT_DURATION_SECS
}

/// Event slug for the slot starting at `slot_unix`
pub fn slot_slug(slot_unix: i64) -> String {
    format!("{}-{}", SLOT_SLUG_PREFIX, slot_unix)
}

/// Seconds left in the slot containing `now`, clamped at zero
pub fn seconds_remaining(now: DateTime<Utc>) -> i64 {
    (slot_end(slot_start(now)) - now.timestamp()).max(0)
}
