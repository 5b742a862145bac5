//! Campaign dispatch — campaign and delivery state, the outbound transport
//! seam, and the continuously running dispatch engine.

pub mod engine;
pub mod store;
pub mod transport;
pub mod types;

pub use engine::{DispatchEngine, DispatchHandle};
pub use store::{CampaignProgress, CampaignStore};
pub use transport::{LogTransport, OutboundTransport, SendError};
pub use types::{Campaign, CampaignStatus, DeliveryOutcome, DeliveryRecord, MessageTemplate, Recipient};
