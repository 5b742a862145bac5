//! Per-tenant message quota tracking — day and month counters with atomic
//! check-and-consume against plan limits.

pub mod tracker;

pub use tracker::{QuotaPeriod, QuotaTracker};
