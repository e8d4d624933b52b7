//! Order execution
//!
//! Paper and live order paths behind one executor, with a bounded retry
//! combinator for live submissions.

mod executor;
mod retry;
mod types;

pub use executor::OrderExecutor;
pub use retry::{retry_with_backoff, RetryExhausted, RetryPolicy};
pub use types::{Confirmation, ExecutionError, FillStatus};
