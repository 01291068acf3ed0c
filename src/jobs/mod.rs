//! Background jobs.

/// Daily recurring-transaction processing
pub mod recurring;
/// Bounded retry policy
pub mod retry;
