//! Signal generation
//!
//! Scans market snapshots for a crowd-backed side worth joining

mod crowd;

pub use crowd::{CrowdStrategy, Edge, ScanOutcome, SkipReason};
