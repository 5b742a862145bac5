//! Per-tenant restriction lists — phone-number deny-lists with optional
//! expiry, plus the periodic cleanup sweep.

pub mod cleanup;
pub mod list;

pub use cleanup::RestrictionCleanupWorker;
pub use list::{RestrictionEntry, RestrictionList, RestrictionReason};
