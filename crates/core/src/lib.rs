//! Shared foundation — configuration, error types, schedule-time
//! normalization and the progress sink contract.

pub mod config;
pub mod error;
pub mod progress;
pub mod time;

pub use config::AppConfig;
pub use error::{WaveError, WaveResult};
