//! Campaign and delivery record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Campaign lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Scheduled,
    Running,
    Paused,
    Completed,
    Failed,
}

/// The message template a campaign sends. `{{name}}` in the body is
/// replaced with the recipient's display name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub name: String,
    pub body: String,
}

impl MessageTemplate {
    /// Render the template for one recipient.
    pub fn render(&self, recipient: &Recipient) -> String {
        self.body.replace("{{name}}", &recipient.name)
    }
}

/// One target of a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub phone_number: String,
    pub name: String,
}

/// A bulk send job owned by exactly one tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub connection_id: Uuid,
    pub name: String,
    pub status: CampaignStatus,
    /// Absolute instant; naive inputs are normalized before they get here.
    pub scheduled_at: DateTime<Utc>,
    pub template: MessageTemplate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of one (campaign, recipient) delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Pending,
    Sent,
    Failed,
    SkippedRestricted,
    /// Quota exhausted this cycle; eligible again on a later cycle.
    SkippedQuota,
}

impl DeliveryOutcome {
    /// Terminal outcomes are immutable; `SkippedQuota` is a deferral and
    /// stays eligible for retry.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DeliveryOutcome::Sent | DeliveryOutcome::Failed | DeliveryOutcome::SkippedRestricted
        )
    }
}

/// One per (campaign, recipient) pair, in stable audience insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub campaign_id: Uuid,
    pub recipient: Recipient,
    /// Position in the audience; processing order is ascending position.
    pub position: usize,
    pub outcome: DeliveryOutcome,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub updated_at: DateTime<Utc>,
}
