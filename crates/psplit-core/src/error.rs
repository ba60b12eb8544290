use crate::time::ClockTime;
use rust_decimal::Decimal;
use thiserror::Error;

/// Contract violations raised by the partitioner and the proration engine.
///
/// Both variants mean a caller skipped its own validation; they are reported
/// before any work is done and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SplitError {
    #[error("court window starts at {start} but ends earlier, at {end}")]
    InvalidWindow { start: ClockTime, end: ClockTime },
    #[error("total cost must not be negative (got {0})")]
    InvalidTotal(Decimal),
}
